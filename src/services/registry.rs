use crate::api::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;
use tracing::info;

/// Registry key for a worker: `"ip:port"`
pub type WorkerKey = String;

/// Derived worker health; never declared by the worker itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Online,
    Offline,
}

/// Inclusive layer range assigned to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRange {
    pub start: u32,
    pub end: u32,
}

impl LayerRange {
    /// Number of layers covered; ranges are inclusive so this is never zero
    pub fn count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// Capability a worker declares at registration. Taken at face value and
/// never re-validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCapability {
    pub gpu_available: bool,
    /// Available memory estimate in GB
    pub memory_available: f64,
}

/// A registered worker and its last-known state
#[derive(Debug, Clone)]
pub struct Worker {
    pub key: WorkerKey,
    pub ip: String,
    pub port: u16,
    pub capability: WorkerCapability,
    pub status: HealthStatus,
    /// Set while a model is loaded across the pipeline
    pub layer_range: Option<LayerRange>,
    /// Advisory, worker-reported memory usage in GB
    pub memory_used: Option<f64>,
    pub registered_at: OffsetDateTime,
    pub last_probe_at: Option<OffsetDateTime>,
}

impl Worker {
    /// `"ip:port"` address, identical to the registry key
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

struct RegistryInner {
    workers: HashMap<WorkerKey, Worker>,
    /// Registration (insertion) order; this ordering becomes the pipeline
    /// ordering. Re-registration keeps the original slot.
    order: Vec<WorkerKey>,
}

/// Authoritative in-memory worker registry.
///
/// All reads and writes go through one lock so registration, probing, and
/// partitioning never observe a torn entry. Workers are never deleted; an
/// offline entry persists until the process restarts.
pub struct WorkerRegistry {
    inner: RwLock<RegistryInner>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                workers: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Create or overwrite the entry keyed by `ip:port`. Always succeeds;
    /// re-registration under the same key replaces prior attributes.
    pub fn register(
        &self,
        ip: String,
        port: u16,
        capability: WorkerCapability,
    ) -> ApiResult<WorkerKey> {
        let key = format!("{}:{}", ip, port);

        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApiError::Internal("Failed to acquire registry write lock".to_string()))?;

        let worker = Worker {
            key: key.clone(),
            ip,
            port,
            capability,
            status: HealthStatus::Online,
            layer_range: None,
            memory_used: None,
            registered_at: OffsetDateTime::now_utc(),
            last_probe_at: None,
        };

        if inner.workers.insert(key.clone(), worker).is_none() {
            inner.order.push(key.clone());
        }

        info!(worker = %key, "Worker registered");
        Ok(key)
    }

    /// All workers in registration order
    pub fn list(&self) -> ApiResult<Vec<Worker>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApiError::Internal("Failed to acquire registry read lock".to_string()))?;

        Ok(inner
            .order
            .iter()
            .filter_map(|key| inner.workers.get(key).cloned())
            .collect())
    }

    /// Workers whose last-known status is Online, in registration order
    pub fn online(&self) -> ApiResult<Vec<Worker>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|w| w.status == HealthStatus::Online)
            .collect())
    }

    pub fn get(&self, key: &str) -> ApiResult<Option<Worker>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| ApiError::Internal("Failed to acquire registry read lock".to_string()))?;
        Ok(inner.workers.get(key).cloned())
    }

    /// Health monitor writeback: status plus whatever the probe observed
    pub fn record_probe(
        &self,
        key: &str,
        status: HealthStatus,
        observed_range: Option<LayerRange>,
        memory_used: Option<f64>,
    ) -> ApiResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApiError::Internal("Failed to acquire registry write lock".to_string()))?;

        if let Some(worker) = inner.workers.get_mut(key) {
            worker.status = status;
            worker.last_probe_at = Some(OffsetDateTime::now_utc());
            if status == HealthStatus::Online {
                worker.layer_range = observed_range;
                worker.memory_used = memory_used;
            }
        }

        Ok(())
    }

    /// Partitioner writeback after a worker accepts its load instruction
    pub fn set_layer_range(&self, key: &str, range: Option<LayerRange>) -> ApiResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| ApiError::Internal("Failed to acquire registry write lock".to_string()))?;

        if let Some(worker) = inner.workers.get_mut(key) {
            worker.layer_range = range;
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
