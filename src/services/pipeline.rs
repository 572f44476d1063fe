use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::model::{ModelCatalog, ModelSession};
use crate::services::health::HealthMonitor;
use crate::services::partition::partition;
use crate::services::registry::WorkerRegistry;
use crate::worker::{LoadLayersRequest, PipelineGenerateRequest, WorkerTransport};

/// Sampling temperature applied by the terminal worker; not client-tunable
const TEMPERATURE: f32 = 0.3;

/// Result of a successful model load
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub model_id: String,
    pub total_layers: u32,
    pub worker_count: u32,
}

/// Result of a successful chained generation
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub text: String,
    pub tokens_generated: u32,
    pub workers_used: u32,
    pub elapsed: Duration,
    pub pipeline_id: String,
}

/// Orchestrates model loads and end-to-end generation requests.
///
/// The coordinator never sees intermediate computation: at load time it wires
/// each worker to its successor, and at generate time it calls only the first
/// worker of the chain and blocks for the terminal result.
pub struct PipelineCoordinator {
    registry: Arc<WorkerRegistry>,
    monitor: Arc<HealthMonitor>,
    transport: Arc<dyn WorkerTransport>,
    catalog: Arc<dyn ModelCatalog>,
    /// Swapped whole on every successful load
    session: RwLock<Option<Arc<ModelSession>>>,
    /// Serializes generations: the worker chain holds per-session state and
    /// cannot service two interleaved autoregressive loops
    generation_lock: Mutex<()>,
}

impl PipelineCoordinator {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        monitor: Arc<HealthMonitor>,
        transport: Arc<dyn WorkerTransport>,
        catalog: Arc<dyn ModelCatalog>,
    ) -> Self {
        Self {
            registry,
            monitor,
            transport,
            catalog,
            session: RwLock::new(None),
            generation_lock: Mutex::new(()),
        }
    }

    /// The currently active model session, if any
    pub fn session(&self) -> ApiResult<Option<Arc<ModelSession>>> {
        self.session
            .read()
            .map(|s| s.clone())
            .map_err(|_| ApiError::Internal("Failed to acquire session read lock".to_string()))
    }

    /// Load `model_id` across the currently reachable workers.
    ///
    /// Probes the whole registry first, partitions the model's layers over
    /// the online set, then pushes one load instruction per stage in pipeline
    /// order. The first instruction failure aborts the load attributing that
    /// worker; stages already instructed are left as they are (no rollback),
    /// so a failed load can leave the fleet holding mixed assignments.
    pub async fn load(&self, model_id: &str) -> ApiResult<LoadOutcome> {
        info!(model = %model_id, "Loading model across worker fleet");

        let online_count = self.monitor.probe_all().await?;
        if online_count == 0 {
            return Err(ApiError::NoWorkersAvailable);
        }

        let online = self.registry.online()?;
        let resolved = self.catalog.resolve(model_id)?;
        let stages = partition(resolved.total_layers, &online)?;

        for stage in &stages {
            let request = LoadLayersRequest {
                model_path: model_id.to_string(),
                start_layer: stage.range.start,
                end_layer: stage.range.end,
                device_id: stage.worker.key.clone(),
                next_worker: stage.successor.clone(),
                pipeline_position: stage.position,
                total_workers: stages.len() as u32,
            };

            self.transport
                .load_layers(&stage.worker.addr(), &request)
                .await
                .map_err(|e| {
                    warn!(
                        worker = %stage.worker.key,
                        position = stage.position,
                        error = %e,
                        "Layer load failed, aborting model load"
                    );
                    ApiError::WorkerLoadFailed {
                        worker: stage.worker.key.clone(),
                        reason: e.to_string(),
                    }
                })?;

            self.registry
                .set_layer_range(&stage.worker.key, Some(stage.range))?;

            info!(
                worker = %stage.worker.key,
                start = stage.range.start,
                end = stage.range.end,
                position = stage.position,
                "Worker accepted layer assignment"
            );
        }

        let session = Arc::new(ModelSession {
            model_id: model_id.to_string(),
            total_layers: resolved.total_layers,
            codec: resolved.codec,
            worker_count: stages.len() as u32,
            loaded_at: time::OffsetDateTime::now_utc(),
        });

        {
            let mut slot = self.session.write().map_err(|_| {
                ApiError::Internal("Failed to acquire session write lock".to_string())
            })?;
            *slot = Some(session);
        }

        info!(
            model = %model_id,
            total_layers = resolved.total_layers,
            workers = stages.len(),
            "Pipeline ready"
        );

        Ok(LoadOutcome {
            model_id: model_id.to_string(),
            total_layers: resolved.total_layers,
            worker_count: stages.len() as u32,
        })
    }

    /// Run one end-to-end generation through the worker chain.
    ///
    /// Uses the last-known registry state rather than forcing a fresh probe,
    /// so a worker that died since the last sweep surfaces as a pipeline
    /// failure, not as NoWorkersAvailable. The entire autoregressive loop
    /// executes inside the chain; this call blocks on the first worker's
    /// single response.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> ApiResult<GenerationOutcome> {
        let session = self.session()?.ok_or(ApiError::ModelNotLoaded)?;

        let online = self.registry.online()?;
        if online.is_empty() {
            return Err(ApiError::NoWorkersAvailable);
        }

        // One generation at a time: the chain keeps per-request state keyed
        // by pipeline_id but shares a single set of loaded layers.
        let _serial = self.generation_lock.lock().await;

        let input_ids = session.codec.encode(prompt);
        let pipeline_id = format!("gen-{}", Uuid::new_v4());

        let request = PipelineGenerateRequest {
            input_ids,
            max_tokens,
            temperature: TEMPERATURE,
            pipeline_id: pipeline_id.clone(),
        };

        let first = &online[0];
        info!(
            pipeline_id = %pipeline_id,
            first_worker = %first.key,
            workers = online.len(),
            max_tokens,
            "Dispatching pipeline generation"
        );

        let started = Instant::now();
        let response = self
            .transport
            .pipeline_generate(&first.addr(), &request)
            .await
            .map_err(|e| ApiError::PipelineFailed(e.to_string()))?;
        let elapsed = started.elapsed();

        let output_ids = response.output_ids.into_flat();
        let decoded = session.codec.decode(&output_ids);

        // Decoding is not guaranteed to reproduce the prompt verbatim, so
        // only strip when it actually appears as a prefix.
        let text = match decoded.strip_prefix(prompt) {
            Some(continuation) => continuation.trim().to_string(),
            None => decoded.trim().to_string(),
        };

        info!(
            pipeline_id = %pipeline_id,
            tokens = response.tokens_generated,
            elapsed_ms = elapsed.as_millis() as u64,
            "Pipeline generation complete"
        );

        Ok(GenerationOutcome {
            text,
            tokens_generated: response.tokens_generated,
            workers_used: online.len() as u32,
            elapsed,
            pipeline_id,
        })
    }
}
