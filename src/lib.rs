pub mod api;
pub mod model;
pub mod services;
pub mod state;
pub mod worker;

pub use model::{ModelCatalog, ModelSession, TextCodec};
pub use state::AppState;
