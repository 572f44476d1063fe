//! Model session and the two external collaborators the coordinator leans
//! on as black boxes: the text codec (tokenizer) and the model catalog that
//! resolves an identifier to a total layer count.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::api::error::ApiResult;

/// Layer count assumed when the catalog has no entry for a model
const FALLBACK_TOTAL_LAYERS: u32 = 24;

/// Text to token-id conversion, used only at the prompt/response boundary.
pub trait TextCodec: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;
    fn decode(&self, ids: &[u32]) -> String;
}

/// Resolved model metadata plus a codec handle for it.
pub struct ResolvedModel {
    pub total_layers: u32,
    pub codec: Arc<dyn TextCodec>,
}

/// Model identifier to metadata lookup. The real registry lives outside this
/// process; the coordinator only calls it once per load.
pub trait ModelCatalog: Send + Sync {
    fn resolve(&self, model_id: &str) -> ApiResult<ResolvedModel>;
}

/// Process-wide record of the currently partitioned model. At most one is
/// active; a successful load unconditionally replaces it, and in-flight
/// generations against the old session get no consistency guarantee.
#[derive(Clone)]
pub struct ModelSession {
    pub model_id: String,
    pub total_layers: u32,
    pub codec: Arc<dyn TextCodec>,
    /// Number of workers participating in the pipeline built at load time
    pub worker_count: u32,
    pub loaded_at: OffsetDateTime,
}

/// Character-level codec: one token id per Unicode scalar value.
///
/// Stand-in for a real tokenizer. Decode drops ids that are not valid scalar
/// values, which is also why decoded text is not guaranteed to reproduce the
/// prompt as an exact prefix.
pub struct CharCodec;

impl TextCodec for CharCodec {
    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(|c| c as u32).collect()
    }

    fn decode(&self, ids: &[u32]) -> String {
        ids.iter().filter_map(|&id| char::from_u32(id)).collect()
    }
}

/// Built-in catalog with a small table of known layer counts and the
/// character codec. Unknown models fall back to a default depth rather than
/// failing, matching how the coordinator is used against ad-hoc models.
pub struct StaticCatalog {
    layer_counts: HashMap<String, u32>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        let mut layer_counts = HashMap::new();
        layer_counts.insert("microsoft/DialoGPT-small".to_string(), 12);
        layer_counts.insert("microsoft/DialoGPT-medium".to_string(), 24);
        layer_counts.insert("gpt2".to_string(), 12);
        layer_counts.insert("gpt2-medium".to_string(), 24);
        layer_counts.insert("gpt2-large".to_string(), 36);
        Self { layer_counts }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelCatalog for StaticCatalog {
    fn resolve(&self, model_id: &str) -> ApiResult<ResolvedModel> {
        let total_layers = self
            .layer_counts
            .get(model_id)
            .copied()
            .unwrap_or(FALLBACK_TOTAL_LAYERS);

        Ok(ResolvedModel {
            total_layers,
            codec: Arc::new(CharCodec),
        })
    }
}
