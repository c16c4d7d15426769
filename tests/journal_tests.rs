//! Journal durability across restarts

use std::fs;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use event_admission::store::{EventFilter, HitFilter, RequestFilter};
use event_admission::types::{AdminStateAction, EventPatch, Location, NewEvent, RequestStatus};
use event_admission::{AppConfig, AppState, EntityStore, InMemoryStore, Journal, ManualClock, StoreError};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 10, 1, 12, 0, 0).unwrap()
}

fn open_state(dir: &TempDir) -> (Arc<InMemoryStore>, AppState) {
    let store = Arc::new(InMemoryStore::with_journal(Journal::open(dir.path()).unwrap()).unwrap());
    let clock = Arc::new(ManualClock::new(start()));
    let state = AppState::new(store.clone(), clock, AppConfig::default());
    (store, state)
}

fn draft() -> NewEvent {
    NewEvent {
        title: "Lecture".to_string(),
        annotation: "Public lecture on astronomy".to_string(),
        description: "Planetarium, hall B".to_string(),
        category: 6,
        location: Location { lat: 48.85, lon: 2.35 },
        paid: true,
        event_date: start() + Duration::days(5),
        participant_limit: 1,
        request_moderation: true,
    }
}

#[test]
fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();

    let (event_id, confirmed_id, rejected_id) = {
        let (_store, state) = open_state(&dir);
        let event = state.lifecycle.create(1, draft()).unwrap();
        state
            .lifecycle
            .apply_admin_edit(event.id, &EventPatch::default(), Some(AdminStateAction::PublishEvent))
            .unwrap();
        let a = state.admission.request_to_join(2, event.id).unwrap();
        let b = state.admission.request_to_join(3, event.id).unwrap();
        state
            .admission
            .bulk_update_status(1, event.id, &[a.id, b.id], RequestStatus::Confirmed)
            .unwrap();
        state.catalog.published_event(event.id, "10.1.1.1").unwrap();
        (event.id, a.id, b.id)
    };

    let (store, state) = open_state(&dir);
    let event = store.find_event(event_id).unwrap().unwrap();
    assert_eq!(event.published_on, Some(start()));
    assert_eq!(
        store.find_request(confirmed_id).unwrap().unwrap().status,
        RequestStatus::Confirmed
    );
    assert_eq!(
        store.find_request(rejected_id).unwrap().unwrap().status,
        RequestStatus::Rejected
    );

    let hits = store
        .list_hits(&HitFilter {
            start: start() - Duration::days(1),
            end: start() + Duration::days(1),
            uris: vec![format!("/events/{}", event_id)],
        })
        .unwrap();
    assert_eq!(hits.len(), 1);

    // Ids continue after the reloaded ones
    let next = state.lifecycle.create(1, draft()).unwrap();
    assert!(next.id > event_id);
    let request = state.admission.request_to_join(4, event_id);
    assert!(request.is_err(), "the only place is taken");
    assert_eq!(
        store
            .count_requests(&RequestFilter::for_event(event_id))
            .unwrap(),
        2
    );
    assert_eq!(store.list_events(&EventFilter::default()).unwrap().len(), 2);
}

#[test]
fn test_corrupted_snapshot_refuses_to_load() {
    let dir = TempDir::new().unwrap();
    {
        let (_store, state) = open_state(&dir);
        state.lifecycle.create(1, draft()).unwrap();
    }

    let journal = Journal::open(dir.path()).unwrap();
    let mut content = fs::read_to_string(journal.state_path()).unwrap();
    content.insert_str(0, "{\"kind\":\"event\",\"id\":\n");
    fs::write(journal.state_path(), content).unwrap();

    assert!(matches!(
        InMemoryStore::with_journal(journal),
        Err(StoreError::Corrupted(_)) | Err(StoreError::Json(_))
    ));
}

#[test]
fn test_torn_write_is_dropped_and_journal_keeps_working() {
    let dir = TempDir::new().unwrap();
    let event_id = {
        let (_store, state) = open_state(&dir);
        state.lifecycle.create(1, draft()).unwrap().id
    };

    // Crash in the middle of appending a write
    let journal = Journal::open(dir.path()).unwrap();
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(journal.state_path())
        .unwrap();
    write!(file, "{{\"kind\":\"requests\",\"requests\":[{{\"id\":9").unwrap();
    drop(file);

    {
        let (store, state) = open_state(&dir);
        assert_eq!(store.event_count(), 1);
        state.lifecycle.create(1, draft()).unwrap();
    }

    let (store, _state) = open_state(&dir);
    assert_eq!(store.event_count(), 2);
    assert!(store.find_event(event_id).unwrap().is_some());
    assert_eq!(store.count_requests(&RequestFilter::for_event(event_id)).unwrap(), 0);
}
