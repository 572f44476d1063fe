use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::api::types::{
    GenerateRequest, GenerateResponse, ListWorkersResponse, LoadModelRequest, LoadModelResponse,
    RegisterWorkerRequest, RegisterWorkerResponse, WorkerSummary,
};
use crate::services::registry::{HealthStatus, Worker, WorkerCapability};
use crate::state::AppState;

/// Health check endpoint
#[instrument]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}

/// Register a worker (or overwrite its prior registration)
#[instrument(skip(state, req), fields(ip = %req.ip, port = req.port))]
pub async fn register_worker(
    State(state): State<AppState>,
    Json(req): Json<RegisterWorkerRequest>,
) -> ApiResult<Json<RegisterWorkerResponse>> {
    let worker_id = state.registry.register(
        req.ip,
        req.port,
        WorkerCapability {
            gpu_available: req.gpu_available,
            memory_available: req.memory_available,
        },
    )?;

    Ok(Json(RegisterWorkerResponse {
        success: true,
        worker_id,
    }))
}

/// List registered workers in registration order. Status freshness comes
/// from the background probe loop, not from this handler.
#[instrument(skip(state))]
pub async fn list_workers(
    State(state): State<AppState>,
) -> ApiResult<Json<ListWorkersResponse>> {
    let workers = state
        .registry
        .list()?
        .into_iter()
        .map(summarize)
        .collect();

    Ok(Json(ListWorkersResponse { workers }))
}

fn summarize(worker: Worker) -> WorkerSummary {
    let status = match worker.status {
        HealthStatus::Online => "online",
        HealthStatus::Offline => "offline",
    };

    WorkerSummary {
        worker_id: worker.key.clone(),
        ip: worker.ip,
        port: worker.port,
        status: status.to_string(),
        gpu_available: worker.capability.gpu_available,
        memory_available: worker.capability.memory_available,
        layers: worker
            .layer_range
            .map(|r| format!("{}-{}", r.start, r.end)),
        memory_used: worker.memory_used,
        last_probe_at: worker
            .last_probe_at
            .and_then(|t| t.format(&Rfc3339).ok()),
    }
}

/// Load a model across the currently reachable workers
#[instrument(skip(state, req), fields(model = %req.model_path))]
pub async fn load_model(
    State(state): State<AppState>,
    Json(req): Json<LoadModelRequest>,
) -> ApiResult<Json<LoadModelResponse>> {
    let outcome = state.coordinator.load(&req.model_path).await?;

    Ok(Json(LoadModelResponse {
        success: true,
        model: outcome.model_id,
        total_layers: outcome.total_layers,
        active_workers: outcome.worker_count,
        pipeline_ready: true,
    }))
}

/// Generate a continuation for a prompt through the worker chain
#[instrument(skip(state, req), fields(max_tokens = req.max_tokens))]
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let outcome = state
        .coordinator
        .generate(&req.prompt, req.max_tokens)
        .await?;

    Ok(Json(GenerateResponse {
        response: outcome.text,
        workers_used: outcome.workers_used,
        tokens_generated: outcome.tokens_generated,
        pipeline_time: outcome.elapsed.as_secs_f64(),
    }))
}
