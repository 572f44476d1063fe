use serde::{Deserialize, Serialize};

fn default_memory_available() -> f64 {
    2.0
}

fn default_model_path() -> String {
    "microsoft/DialoGPT-medium".to_string()
}

fn default_max_tokens() -> u32 {
    20
}

/// Request to register a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkerRequest {
    pub ip: String,
    pub port: u16,
    /// Whether the worker has an accelerator; declared, never verified
    #[serde(default)]
    pub gpu_available: bool,
    /// Available memory estimate in GB
    #[serde(default = "default_memory_available")]
    pub memory_available: f64,
}

/// Response to worker registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterWorkerResponse {
    pub success: bool,
    /// Generated registry key: `"ip:port"`
    pub worker_id: String,
}

/// One worker in the listing, in registration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker_id: String,
    pub ip: String,
    pub port: u16,
    pub status: String,
    pub gpu_available: bool,
    pub memory_available: f64,
    /// Assigned layer range as `"start-end"` while a model is loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<f64>,
    /// RFC 3339 timestamp of the last probe, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_probe_at: Option<String>,
}

/// Response listing the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWorkersResponse {
    pub workers: Vec<WorkerSummary>,
}

/// Request to load a model across the fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadModelRequest {
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

/// Response to a successful model load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadModelResponse {
    pub success: bool,
    pub model: String,
    pub total_layers: u32,
    pub active_workers: u32,
    pub pipeline_ready: bool,
}

/// Request to generate text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Response carrying the generated continuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub workers_used: u32,
    pub tokens_generated: u32,
    /// Coordinator-side wall time in seconds
    pub pipeline_time: f64,
}
