pub mod health;
pub mod partition;
pub mod pipeline;
pub mod registry;

pub use health::{probe_loop, HealthMonitor};
pub use partition::{partition, StageAssignment};
pub use pipeline::{GenerationOutcome, LoadOutcome, PipelineCoordinator};
pub use registry::{HealthStatus, LayerRange, Worker, WorkerCapability, WorkerRegistry};
