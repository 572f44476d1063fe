use crate::api::error::{ApiError, ApiResult};
use crate::services::registry::{LayerRange, Worker};

/// One stage of the computed pipeline: a worker, its contiguous layer range,
/// its 0-based position, and the address of its successor (None terminates
/// the chain).
#[derive(Debug, Clone)]
pub struct StageAssignment {
    pub worker: Worker,
    pub range: LayerRange,
    pub position: u32,
    pub successor: Option<String>,
}

/// Partition `total_layers` across `workers` (healthy, in registration
/// order) into an ordered, gap-free pipeline.
///
/// Each worker gets `chunk = max(1, total_layers / n)` layers starting at
/// `i * chunk`; the last worker's end is unconditionally forced to
/// `total_layers - 1`, so it absorbs any remainder and may carry a larger
/// share than the others.
///
/// When more workers are offered than there are layers, the active set is
/// capped to the first `total_layers` workers; the excess take no part in
/// the pipeline. Without the cap, middle workers would receive start indices
/// past the end of the model.
pub fn partition(total_layers: u32, workers: &[Worker]) -> ApiResult<Vec<StageAssignment>> {
    if workers.is_empty() {
        return Err(ApiError::NoWorkersAvailable);
    }

    let active: &[Worker] = if workers.len() as u32 > total_layers {
        &workers[..total_layers as usize]
    } else {
        workers
    };

    let n = active.len() as u32;
    let chunk = std::cmp::max(1, total_layers / n);

    let mut stages = Vec::with_capacity(active.len());
    for (i, worker) in active.iter().enumerate() {
        let i = i as u32;
        let start = i * chunk;
        let end = if i == n - 1 {
            // Last worker absorbs the remainder regardless of the arithmetic
            total_layers - 1
        } else {
            std::cmp::min((i + 1) * chunk - 1, total_layers - 1)
        };

        let successor = active.get(i as usize + 1).map(|next| next.addr());

        stages.push(StageAssignment {
            worker: worker.clone(),
            range: LayerRange { start, end },
            position: i,
            successor,
        });
    }

    Ok(stages)
}
