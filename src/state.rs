use std::sync::Arc;

use crate::model::ModelCatalog;
use crate::services::{HealthMonitor, PipelineCoordinator, WorkerRegistry};
use crate::worker::WorkerTransport;

/// Axum application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkerRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub coordinator: Arc<PipelineCoordinator>,
}

impl AppState {
    /// Wire up the full coordinator stack over the given worker transport
    /// and model catalog.
    pub fn new(transport: Arc<dyn WorkerTransport>, catalog: Arc<dyn ModelCatalog>) -> Self {
        let registry = Arc::new(WorkerRegistry::new());
        let monitor = Arc::new(HealthMonitor::new(registry.clone(), transport.clone()));
        let coordinator = Arc::new(PipelineCoordinator::new(
            registry.clone(),
            monitor.clone(),
            transport,
            catalog,
        ));

        Self {
            registry,
            monitor,
            coordinator,
        }
    }
}
