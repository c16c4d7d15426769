//! Shared state of the HTTP handlers

use std::sync::Arc;

use crate::admission::{CapacityAdmissionEngine, EventLocks};
use crate::catalog::EventCatalog;
use crate::config::AppConfig;
use crate::lifecycle::EventLifecycleManager;
use crate::stats::{StatsRecorder, ViewCountAggregator};
use crate::store::EntityStore;
use crate::utils::time::Clock;

/// Every service, wired over one store, one clock and one lock registry
pub struct AppState {
    pub lifecycle: EventLifecycleManager,
    pub admission: CapacityAdmissionEngine,
    pub catalog: EventCatalog,
    pub recorder: Arc<StatsRecorder>,
    pub aggregator: Arc<ViewCountAggregator>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        let locks = Arc::new(EventLocks::new());
        let recorder = Arc::new(StatsRecorder::new(store.clone(), clock.clone()));
        let aggregator = Arc::new(ViewCountAggregator::new(store.clone(), clock.clone()));

        Self {
            lifecycle: EventLifecycleManager::new(store.clone(), clock.clone(), locks.clone()),
            admission: CapacityAdmissionEngine::new(store.clone(), clock.clone(), locks),
            catalog: EventCatalog::new(
                store,
                clock,
                recorder.clone(),
                aggregator.clone(),
                config.app_name.clone(),
                config.unique_views,
            ),
            recorder,
            aggregator,
            config,
        }
    }
}
