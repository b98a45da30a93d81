pub mod extraction;
pub mod llm;
pub mod parser;
pub mod pipeline;
pub mod verification;

pub use extraction::Extractor;
pub use llm::{CompletionBackend, CostMeter, CostReport, ModelTier, OpenAiBackend};
pub use pipeline::{CompanyOutcome, OutcomeStatus, Pipeline};
pub use verification::Verifier;
