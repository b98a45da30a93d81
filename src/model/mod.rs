pub mod config;
pub mod extracted;
pub mod qa;
pub mod record;

pub use config::{ModelRates, PipelineConfig, TierRates};
pub use extracted::*;
pub use qa::*;
pub use record::*;
