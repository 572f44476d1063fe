use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::api::error::ApiResult;
use crate::services::registry::{HealthStatus, LayerRange, Worker, WorkerRegistry};
use crate::worker::WorkerTransport;

/// Polls worker `/status` endpoints and writes results into the registry.
///
/// Any transport error, timeout, or non-success response folds to Offline;
/// there is no retry, no backoff, and no quarantine. A flapping worker is
/// simply re-probed on the next cycle and restored to Online when it answers.
pub struct HealthMonitor {
    registry: Arc<WorkerRegistry>,
    transport: Arc<dyn WorkerTransport>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<WorkerRegistry>, transport: Arc<dyn WorkerTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Probe one worker and write the result back into the registry.
    pub async fn probe(&self, worker: &Worker) -> ApiResult<HealthStatus> {
        let status = match self.transport.probe(&worker.addr()).await {
            Ok(report) => {
                let observed_range = if report.layers_loaded {
                    report
                        .layer_range
                        .map(|(start, end)| LayerRange { start, end })
                } else {
                    None
                };
                self.registry.record_probe(
                    &worker.key,
                    HealthStatus::Online,
                    observed_range,
                    report.memory_used,
                )?;
                HealthStatus::Online
            }
            Err(e) => {
                warn!(worker = %worker.key, error = %e, "Probe failed, marking worker offline");
                self.registry
                    .record_probe(&worker.key, HealthStatus::Offline, None, None)?;
                HealthStatus::Offline
            }
        };

        Ok(status)
    }

    /// Probe every registered worker; returns the number now Online.
    pub async fn probe_all(&self) -> ApiResult<usize> {
        let workers = self.registry.list()?;
        let mut online = 0;

        for worker in &workers {
            if self.probe(worker).await? == HealthStatus::Online {
                online += 1;
            }
        }

        debug!(
            total = workers.len(),
            online, "Completed registry probe sweep"
        );

        Ok(online)
    }
}

/// Background task probing the full registry on a fixed interval, keeping
/// displayed worker status fresh between load operations.
pub async fn probe_loop(monitor: Arc<HealthMonitor>, period: Duration) {
    info!(period_secs = period.as_secs(), "Starting health probe loop");

    let mut tick = interval(period);

    loop {
        tick.tick().await;

        if let Err(e) = monitor.probe_all().await {
            error!(error = %e, "Probe sweep failed");
        }
    }
}
