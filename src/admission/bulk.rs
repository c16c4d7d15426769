//! Planning of a bulk moderation decision
//!
//! Pure functions: they take the requests named by the owner (already
//! scoped to the event, in input order) and decide new statuses. The engine
//! writes the plan as one batch.

use crate::types::{ParticipationRequest, RequestId, RequestStatus};

/// New statuses decided for one bulk call
#[derive(Debug, Default)]
pub(crate) struct BulkPlan {
    pub confirmed: Vec<ParticipationRequest>,
    pub rejected: Vec<ParticipationRequest>,
    /// Input ids the confirm walk never reached
    pub unprocessed: Vec<RequestId>,
}

impl BulkPlan {
    /// Every request whose status changed, confirmations first
    pub fn writes(&self) -> Vec<ParticipationRequest> {
        self.confirmed
            .iter()
            .chain(self.rejected.iter())
            .cloned()
            .collect()
    }
}

/// Confirm pending requests in order until `free_slots` runs out.
///
/// Non-pending requests are skipped without using a slot. Once the slots are
/// gone the walk stops; the ids it did not reach form `unprocessed`, and a
/// second pass rejects those of them that are still pending. Requests in that
/// tail that are not pending stay as they are.
pub(crate) fn plan_confirmation(requests: Vec<ParticipationRequest>, free_slots: usize) -> BulkPlan {
    let mut plan = BulkPlan::default();
    let mut remaining = free_slots;
    let mut requests = requests.into_iter();
    let mut tail = Vec::new();

    for mut request in requests.by_ref() {
        if remaining == 0 {
            tail.push(request);
            break;
        }
        if request.status != RequestStatus::Pending {
            continue;
        }
        request.status = RequestStatus::Confirmed;
        plan.confirmed.push(request);
        remaining -= 1;
    }
    tail.extend(requests);

    plan.unprocessed = tail.iter().map(|r| r.id).collect();
    plan.rejected = reject_pending(tail);
    plan
}

/// Reject every pending request; others are left alone
pub(crate) fn plan_rejection(requests: Vec<ParticipationRequest>) -> BulkPlan {
    BulkPlan {
        rejected: reject_pending(requests),
        ..Default::default()
    }
}

fn reject_pending(requests: Vec<ParticipationRequest>) -> Vec<ParticipationRequest> {
    requests
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .map(|mut r| {
            r.status = RequestStatus::Rejected;
            r
        })
        .collect()
}
