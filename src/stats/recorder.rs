//! Hit recording

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DomainResult;
use crate::store::EntityStore;
use crate::types::{Hit, NewHit};
use crate::utils::time::Clock;

/// Appends one hit per access
pub struct StatsRecorder {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl StatsRecorder {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Record an access stamped with the current time.
    ///
    /// Best effort: a storage failure is logged and dropped so that the read
    /// being counted still succeeds.
    pub fn record_hit(&self, app: &str, uri: &str, ip: &str) {
        let hit = NewHit {
            app: app.to_string(),
            uri: uri.to_string(),
            ip: ip.to_string(),
            timestamp: self.clock.now(),
        };
        match self.store.append_hit(hit) {
            Ok(hit) => debug!(hit_id = hit.id, uri, "hit recorded"),
            Err(e) => warn!(uri, ip, error = %e, "dropping hit"),
        }
    }

    /// Store a hit exactly as submitted, timestamp included
    pub fn save_hit(&self, hit: NewHit) -> DomainResult<Hit> {
        let hit = self.store.append_hit(hit)?;
        debug!(hit_id = hit.id, app = %hit.app, uri = %hit.uri, "hit saved");
        Ok(hit)
    }
}
