//! Corporate-debt structure extraction from SEC filings.
//!
//! Extracts a company's legal-entity tree and debt instruments from filing
//! text with an LLM, verifies the candidate record against the source with a
//! weighted check battery, and iterates targeted fixes until the record
//! reaches the acceptance threshold or both model tiers run out of budget.
//! The terminal [`CompanyOutcome`] always carries the best candidate seen
//! and its score, so a sub-threshold run is reviewable rather than lost.
//!
//! ```no_run
//! use debt_intel::model::{CompanyProfile, PipelineConfig};
//! use debt_intel::service::llm::OpenAiBackend;
//! use debt_intel::{FilingSet, Pipeline};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let backend = Arc::new(OpenAiBackend::from_env(&config)?);
//! let pipeline = Pipeline::new(backend, config);
//!
//! let mut filings = FilingSet::new();
//! filings.insert("10-K_2025-12-31", "...filing text...", None);
//! filings.insert("exhibit_21_2026-02-15", "...subsidiary list...", None);
//!
//! let outcome = pipeline
//!     .run(&CompanyProfile::new("Transocean Ltd."), &filings)
//!     .await;
//! println!("{}: {:?}", outcome.company, outcome.status);
//! # Ok(())
//! # }
//! ```

pub mod filing;
pub mod model;
pub mod normalize;
pub mod service;

pub use filing::{FilingSet, PreparedFiling};
pub use model::{ExtractionRecord, PipelineConfig, QaScore};
pub use service::pipeline::{CompanyOutcome, OutcomeStatus, Pipeline, ScoredCandidate};
