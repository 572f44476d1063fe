use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::worker::{
    LoadLayersRequest, PipelineGenerateRequest, PipelineGenerateResponse, TransportError,
    WorkerStatus, WorkerTransport,
};

/// Status probes must answer quickly or the worker is treated as Offline
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Load instructions may trigger model-weight fetching on the worker
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// The chained generate call covers the entire autoregressive loop
const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

/// reqwest-backed implementation of [`WorkerTransport`].
///
/// One shared client, per-call timeouts. Timeouts only bound the local wait:
/// a generate call that times out here does not stop the remote chain.
pub struct HttpWorkerClient {
    client: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request {
                url: "<client construction>".to_string(),
                source: e,
            })?;
        Ok(Self { client })
    }

    fn url(addr: &str, path: &str) -> String {
        format!("http://{}{}", addr, path)
    }
}

#[async_trait]
impl WorkerTransport for HttpWorkerClient {
    async fn probe(&self, addr: &str) -> Result<WorkerStatus, TransportError> {
        let url = Self::url(addr, "/status");
        debug!(worker = %addr, "Probing worker status");

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status,
            });
        }

        response
            .json::<WorkerStatus>()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                worker: addr.to_string(),
                reason: e.to_string(),
            })
    }

    async fn load_layers(
        &self,
        addr: &str,
        req: &LoadLayersRequest,
    ) -> Result<(), TransportError> {
        let url = Self::url(addr, "/load_layers");
        debug!(
            worker = %addr,
            start = req.start_layer,
            end = req.end_layer,
            "Sending layer-load instruction"
        );

        let response = self
            .client
            .post(&url)
            .timeout(LOAD_TIMEOUT)
            .json(req)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status,
            });
        }

        Ok(())
    }

    async fn pipeline_generate(
        &self,
        addr: &str,
        req: &PipelineGenerateRequest,
    ) -> Result<PipelineGenerateResponse, TransportError> {
        let url = Self::url(addr, "/pipeline_generate");
        debug!(
            worker = %addr,
            pipeline_id = %req.pipeline_id,
            input_len = req.input_ids.len(),
            "Dispatching pipeline generation to first worker"
        );

        let response = self
            .client
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(req)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                worker: addr.to_string(),
                status,
            });
        }

        response
            .json::<PipelineGenerateResponse>()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                worker: addr.to_string(),
                reason: e.to_string(),
            })
    }
}
