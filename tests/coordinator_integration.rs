//! End-to-end coordinator flow over a scripted worker fleet: register,
//! probe, load, generate — with the failure paths a flaky fleet produces.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use layermesh::model::StaticCatalog;
use layermesh::services::registry::{HealthStatus, WorkerCapability};
use layermesh::worker::{
    LoadLayersRequest, PipelineGenerateRequest, PipelineGenerateResponse, TokenIds,
    TransportError, WorkerStatus, WorkerTransport,
};
use layermesh::AppState;

/// Scripted fleet: per-address reachability, recorded load instructions,
/// echo-style generation.
struct Fleet {
    down: Mutex<Vec<String>>,
    load_log: Mutex<Vec<LoadLayersRequest>>,
    completion: String,
}

impl Fleet {
    fn new(completion: &str) -> Self {
        Self {
            down: Mutex::new(Vec::new()),
            load_log: Mutex::new(Vec::new()),
            completion: completion.to_string(),
        }
    }

    fn take_down(&self, addr: &str) {
        self.down.lock().unwrap().push(addr.to_string());
    }

    fn bring_up(&self, addr: &str) {
        self.down.lock().unwrap().retain(|a| a != addr);
    }

    fn is_down(&self, addr: &str) -> bool {
        self.down.lock().unwrap().iter().any(|a| a == addr)
    }

    fn load_log(&self) -> Vec<LoadLayersRequest> {
        self.load_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerTransport for Fleet {
    async fn probe(&self, addr: &str) -> Result<WorkerStatus, TransportError> {
        if self.is_down(addr) {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(WorkerStatus {
            layers_loaded: false,
            layer_range: None,
            memory_used: Some(0.8),
        })
    }

    async fn load_layers(&self, addr: &str, req: &LoadLayersRequest) -> Result<(), TransportError> {
        if self.is_down(addr) {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        self.load_log.lock().unwrap().push(req.clone());
        Ok(())
    }

    async fn pipeline_generate(
        &self,
        addr: &str,
        req: &PipelineGenerateRequest,
    ) -> Result<PipelineGenerateResponse, TransportError> {
        if self.is_down(addr) {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        let output: Vec<u32> = self.completion.chars().map(|c| c as u32).collect();
        Ok(PipelineGenerateResponse {
            tokens_generated: output.len().saturating_sub(req.input_ids.len()) as u32,
            output_ids: TokenIds::Flat(output),
            generation_time: 0.3,
        })
    }
}

fn register_fleet(state: &AppState, n: u32) {
    for i in 0..n {
        state
            .registry
            .register(
                format!("10.0.0.{}", i + 1),
                8001,
                WorkerCapability {
                    gpu_available: i == 0,
                    memory_available: 2.0,
                },
            )
            .unwrap();
    }
}

#[tokio::test]
async fn test_full_load_and_generate_cycle() {
    let fleet = Arc::new(Fleet::new("Hello world"));
    let state = AppState::new(fleet.clone(), Arc::new(StaticCatalog::new()));
    register_fleet(&state, 3);

    let outcome = state
        .coordinator
        .load("microsoft/DialoGPT-medium")
        .await
        .unwrap();
    assert_eq!(outcome.total_layers, 24);
    assert_eq!(outcome.worker_count, 3);

    // Every stage received a contiguous slice chained to its successor
    let log = fleet.load_log();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].start_layer, 0);
    assert_eq!(log[0].next_worker.as_deref(), Some("10.0.0.2:8001"));
    assert_eq!(log[1].next_worker.as_deref(), Some("10.0.0.3:8001"));
    assert_eq!(log[2].end_layer, 23);
    assert!(log[2].next_worker.is_none());

    // Registry reflects the assignments
    let workers = state.registry.list().unwrap();
    assert!(workers.iter().all(|w| w.layer_range.is_some()));

    let generated = state.coordinator.generate("Hello", 20).await.unwrap();
    assert_eq!(generated.text, "world");
    assert_eq!(generated.workers_used, 3);
}

#[tokio::test]
async fn test_dead_worker_is_excluded_from_next_load() {
    let fleet = Arc::new(Fleet::new("Hello world"));
    let state = AppState::new(fleet.clone(), Arc::new(StaticCatalog::new()));
    register_fleet(&state, 3);

    fleet.take_down("10.0.0.2:8001");

    let outcome = state.coordinator.load("gpt2").await.unwrap();
    assert_eq!(outcome.worker_count, 2);

    let workers = state.registry.list().unwrap();
    let down = workers.iter().find(|w| w.key == "10.0.0.2:8001").unwrap();
    assert_eq!(down.status, HealthStatus::Offline);

    // The dead worker never received an instruction; the chain skips it
    let log = fleet.load_log();
    assert!(log.iter().all(|r| r.device_id != "10.0.0.2:8001"));
    assert_eq!(log[0].next_worker.as_deref(), Some("10.0.0.3:8001"));
}

#[tokio::test]
async fn test_recovered_worker_rejoins_on_reload() {
    let fleet = Arc::new(Fleet::new("Hello world"));
    let state = AppState::new(fleet.clone(), Arc::new(StaticCatalog::new()));
    register_fleet(&state, 2);

    fleet.take_down("10.0.0.2:8001");
    let outcome = state.coordinator.load("gpt2").await.unwrap();
    assert_eq!(outcome.worker_count, 1);

    fleet.bring_up("10.0.0.2:8001");
    let outcome = state.coordinator.load("gpt2").await.unwrap();
    assert_eq!(outcome.worker_count, 2);
}

#[tokio::test]
async fn test_generation_survives_session_replacement() {
    let fleet = Arc::new(Fleet::new("Hello world"));
    let state = AppState::new(fleet.clone(), Arc::new(StaticCatalog::new()));
    register_fleet(&state, 2);

    state.coordinator.load("gpt2").await.unwrap();
    state.coordinator.load("gpt2-medium").await.unwrap();

    let session = state.coordinator.session().unwrap().unwrap();
    assert_eq!(session.model_id, "gpt2-medium");
    assert_eq!(session.total_layers, 24);

    let generated = state.coordinator.generate("Hello", 20).await.unwrap();
    assert_eq!(generated.text, "world");
}

#[tokio::test]
async fn test_concurrent_generations_are_serialized() {
    let fleet = Arc::new(Fleet::new("Hello world"));
    let state = AppState::new(fleet.clone(), Arc::new(StaticCatalog::new()));
    register_fleet(&state, 1);

    state.coordinator.load("gpt2").await.unwrap();

    let a = {
        let coordinator = state.coordinator.clone();
        tokio::spawn(async move { coordinator.generate("Hello", 20).await })
    };
    let b = {
        let coordinator = state.coordinator.clone();
        tokio::spawn(async move { coordinator.generate("Hello", 20).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(a.text, "world");
    assert_eq!(b.text, "world");
    assert_ne!(a.pipeline_id, b.pipeline_id);
}
