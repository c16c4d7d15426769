//! JSONL journal backing [`super::InMemoryStore`]
//!
//! Two files under the data directory:
//! - `state.jsonl`: a snapshot of events and requests, followed by one line
//!   per write committed since. Lines replay in order, later ones win. The
//!   store rewrites it as a fresh snapshot every
//!   [`Journal::snapshot_threshold`] writes and when it opens.
//! - `hits.jsonl`: append-only hit log

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{StoreError, StoreResult};
use crate::types::{Event, Hit, ParticipationRequest};
use crate::utils::atomic::{remove_stale_temp_files, replace_with};

/// Writes appended to `state.jsonl` before it is compacted
pub const DEFAULT_SNAPSHOT_THRESHOLD: usize = 1000;

/// One line of `state.jsonl`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Record {
    Event(Event),
    Request(ParticipationRequest),
    /// A batch committed by one write; a single line, so it replays whole
    Requests { requests: Vec<ParticipationRequest> },
}

/// Everything recovered from disk at startup
#[derive(Debug, Default)]
pub(crate) struct JournalState {
    pub events: Vec<Event>,
    pub requests: Vec<ParticipationRequest>,
    pub hits: Vec<Hit>,
}

/// File-backed durability for the in-memory tables
#[derive(Debug, Clone)]
pub struct Journal {
    data_dir: PathBuf,
    snapshot_threshold: usize,
}

impl Journal {
    /// Open (and create if needed) a journal directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        let removed = remove_stale_temp_files(&data_dir)?;
        if removed > 0 {
            warn!(removed, dir = %data_dir.display(), "discarded interrupted snapshot writes");
        }

        Ok(Self {
            data_dir,
            snapshot_threshold: DEFAULT_SNAPSHOT_THRESHOLD,
        })
    }

    /// Compact after `threshold` appended writes instead of the default
    pub fn with_snapshot_threshold(mut self, threshold: usize) -> Self {
        self.snapshot_threshold = threshold.max(1);
        self
    }

    pub fn snapshot_threshold(&self) -> usize {
        self.snapshot_threshold
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.jsonl")
    }

    pub fn hits_path(&self) -> PathBuf {
        self.data_dir.join("hits.jsonl")
    }

    /// Replace `state.jsonl` with a snapshot of exactly these records
    pub fn write_snapshot<'a>(
        &self,
        events: impl Iterator<Item = &'a Event>,
        requests: impl Iterator<Item = &'a ParticipationRequest>,
    ) -> StoreResult<()> {
        // Serialize up front so a JSON failure never leaves a half-written temp file
        let mut lines = Vec::new();
        for event in events {
            lines.push(serde_json::to_string(&Record::Event(event.clone()))?);
        }
        for request in requests {
            lines.push(serde_json::to_string(&Record::Request(request.clone()))?);
        }

        replace_with(self.state_path(), |file| {
            for line in &lines {
                writeln!(file, "{}", line)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Log an inserted or updated event
    pub fn append_event(&self, event: &Event) -> StoreResult<()> {
        self.append_state(&Record::Event(event.clone()))
    }

    /// Log a batch of request writes as one line
    pub fn append_requests(&self, requests: &[ParticipationRequest]) -> StoreResult<()> {
        self.append_state(&Record::Requests {
            requests: requests.to_vec(),
        })
    }

    fn append_state(&self, record: &Record) -> StoreResult<()> {
        let line = serde_json::to_string(record)?;
        append_line(&self.state_path(), &line)
    }

    /// Append one hit to the hit log
    pub fn append_hit(&self, hit: &Hit) -> StoreResult<()> {
        let line = serde_json::to_string(hit)?;
        append_line(&self.hits_path(), &line)
    }

    /// Load snapshot, write log and hit log.
    ///
    /// A malformed state line is fatal, except an unterminated last line,
    /// which is a write cut short by a crash and is dropped. A malformed hit
    /// line is skipped, since losing a hit is acceptable.
    pub(crate) fn load(&self) -> StoreResult<JournalState> {
        let mut state = JournalState::default();

        let state_path = self.state_path();
        if state_path.exists() {
            let content = fs::read_to_string(&state_path)?;
            let terminated = content.ends_with('\n');
            let lines: Vec<&str> = content.lines().collect();

            for (line_num, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Record>(line) {
                    Ok(Record::Event(event)) => state.events.push(event),
                    Ok(Record::Request(request)) => state.requests.push(request),
                    Ok(Record::Requests { requests }) => state.requests.extend(requests),
                    Err(e) if !terminated && line_num + 1 == lines.len() => {
                        warn!(line = line_num + 1, error = %e, "dropping torn final write");
                    }
                    Err(e) => {
                        return Err(StoreError::Corrupted(format!(
                            "{} line {}: {}",
                            state_path.display(),
                            line_num + 1,
                            e
                        )))
                    }
                }
            }
        }

        let hits_path = self.hits_path();
        if hits_path.exists() {
            let content = fs::read_to_string(&hits_path)?;
            for (line_num, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Hit>(line) {
                    Ok(hit) => state.hits.push(hit),
                    Err(e) => warn!(line = line_num + 1, error = %e, "skipping unreadable hit"),
                }
            }
        }

        info!(
            events = state.events.len(),
            requests = state.requests.len(),
            hits = state.hits.len(),
            dir = %self.data_dir.display(),
            "journal loaded"
        );
        Ok(state)
    }
}

fn append_line(path: &Path, line: &str) -> StoreResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    file.sync_data()?;
    Ok(())
}
