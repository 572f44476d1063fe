//! Outbound worker protocol.
//!
//! The coordinator only ever talks to workers over three endpoints: a status
//! probe, a layer-load instruction, and the pipeline-generate call made to
//! the first worker of the chain. Everything past that first hop is the
//! workers' business: each stage forwards intermediate state to the successor
//! named in its load instruction, and the terminal stage answers the original
//! HTTP call with the finished token sequence.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::HttpWorkerClient;

/// Errors from outbound worker calls. The health monitor folds all of these
/// into Offline; the pipeline coordinator maps them to its own taxonomy.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failure or timeout
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Worker answered with a non-success status code
    #[error("worker {worker} returned HTTP {status}")]
    Status {
        worker: String,
        status: reqwest::StatusCode,
    },

    /// Response body did not match the expected shape
    #[error("invalid response from {worker}: {reason}")]
    InvalidResponse { worker: String, reason: String },
}

/// Worker-reported status, from `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    /// Whether the worker currently holds a loaded layer slice
    pub layers_loaded: bool,
    /// Loaded range as `[start, end]`, inclusive, when layers_loaded
    #[serde(default)]
    pub layer_range: Option<(u32, u32)>,
    /// Advisory memory usage in GB, as reported by the worker
    #[serde(default)]
    pub memory_used: Option<f64>,
}

/// Layer-load instruction, `POST /load_layers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadLayersRequest {
    /// Model identifier the worker should fetch its slice from
    pub model_path: String,
    /// First layer of the assigned range (inclusive)
    pub start_layer: u32,
    /// Last layer of the assigned range (inclusive)
    pub end_layer: u32,
    /// The worker's own registry key, echoed back for its logs
    pub device_id: String,
    /// `"ip:port"` of the pipeline successor, None for the terminal stage
    pub next_worker: Option<String>,
    /// 0-based position in the pipeline ordering
    pub pipeline_position: u32,
    /// Total number of participating workers
    pub total_workers: u32,
}

/// Chained generation request, `POST /pipeline_generate`, sent to the first
/// pipeline worker only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineGenerateRequest {
    /// Encoded prompt token ids
    pub input_ids: Vec<u32>,
    /// Generation budget for the whole chain
    pub max_tokens: u32,
    /// Sampling temperature applied by the terminal stage
    pub temperature: f32,
    /// Unique id disambiguating concurrent sessions on the chain
    pub pipeline_id: String,
}

/// Terminal worker's response to a pipeline-generate call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineGenerateResponse {
    /// Complete output sequence; some worker implementations return it
    /// nested one level (a batch of one)
    pub output_ids: TokenIds,
    #[serde(default)]
    pub tokens_generated: u32,
    /// Chain-side wall time in seconds
    #[serde(default)]
    pub generation_time: f64,
}

/// Token id sequence that may arrive flat or batch-nested
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenIds {
    Flat(Vec<u32>),
    Nested(Vec<Vec<u32>>),
}

impl TokenIds {
    /// Flatten to a single sequence, taking the first row of a nested batch
    pub fn into_flat(self) -> Vec<u32> {
        match self {
            TokenIds::Flat(ids) => ids,
            TokenIds::Nested(mut rows) => {
                if rows.is_empty() {
                    Vec::new()
                } else {
                    rows.remove(0)
                }
            }
        }
    }
}

/// Outbound boundary to the worker fleet.
///
/// The coordinator is strictly a first-hop caller; this trait is that
/// boundary made explicit so the pipeline logic can be exercised against a
/// scripted fleet in tests.
#[async_trait]
pub trait WorkerTransport: Send + Sync {
    /// Bounded-time status probe against `addr` (`"ip:port"`)
    async fn probe(&self, addr: &str) -> Result<WorkerStatus, TransportError>;

    /// Push a layer-load instruction to `addr`
    async fn load_layers(
        &self,
        addr: &str,
        req: &LoadLayersRequest,
    ) -> Result<(), TransportError>;

    /// Dispatch a chained generation to the first pipeline worker at `addr`
    /// and block for the terminal result
    async fn pipeline_generate(
        &self,
        addr: &str,
        req: &PipelineGenerateRequest,
    ) -> Result<PipelineGenerateResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_layers_wire_format() {
        let req = LoadLayersRequest {
            model_path: "gpt2".to_string(),
            start_layer: 0,
            end_layer: 7,
            device_id: "10.0.0.1:8001".to_string(),
            next_worker: Some("10.0.0.2:8001".to_string()),
            pipeline_position: 0,
            total_workers: 3,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model_path"], "gpt2");
        assert_eq!(json["start_layer"], 0);
        assert_eq!(json["end_layer"], 7);
        assert_eq!(json["next_worker"], "10.0.0.2:8001");
        assert_eq!(json["pipeline_position"], 0);
        assert_eq!(json["total_workers"], 3);
    }

    #[test]
    fn test_terminal_stage_has_null_successor() {
        let req = LoadLayersRequest {
            model_path: "gpt2".to_string(),
            start_layer: 16,
            end_layer: 24,
            device_id: "10.0.0.3:8001".to_string(),
            next_worker: None,
            pipeline_position: 2,
            total_workers: 3,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert!(json["next_worker"].is_null());
    }

    #[test]
    fn test_status_missing_optional_fields() {
        let status: WorkerStatus = serde_json::from_str(r#"{"layers_loaded": false}"#).unwrap();
        assert!(!status.layers_loaded);
        assert!(status.layer_range.is_none());
        assert!(status.memory_used.is_none());
    }

    #[test]
    fn test_status_with_range() {
        let status: WorkerStatus =
            serde_json::from_str(r#"{"layers_loaded": true, "layer_range": [8, 15], "memory_used": 1.4}"#)
                .unwrap();
        assert_eq!(status.layer_range, Some((8, 15)));
        assert_eq!(status.memory_used, Some(1.4));
    }

    #[test]
    fn test_output_ids_flat() {
        let resp: PipelineGenerateResponse =
            serde_json::from_str(r#"{"output_ids": [1, 2, 3], "tokens_generated": 3}"#).unwrap();
        assert_eq!(resp.output_ids.into_flat(), vec![1, 2, 3]);
    }

    #[test]
    fn test_output_ids_nested_one_level() {
        let resp: PipelineGenerateResponse =
            serde_json::from_str(r#"{"output_ids": [[4, 5, 6]], "tokens_generated": 3}"#).unwrap();
        assert_eq!(resp.output_ids.into_flat(), vec![4, 5, 6]);
    }

    #[test]
    fn test_output_ids_empty_nested() {
        let ids = TokenIds::Nested(Vec::new());
        assert!(ids.into_flat().is_empty());
    }

    #[test]
    fn test_generation_time_defaults_to_zero() {
        let resp: PipelineGenerateResponse =
            serde_json::from_str(r#"{"output_ids": [1]}"#).unwrap();
        assert_eq!(resp.generation_time, 0.0);
        assert_eq!(resp.tokens_generated, 0);
    }
}
