//! Verification engine
//!
//! Runs the check battery against a candidate record and aggregates the
//! verdicts into a [`QaScore`]. Internal consistency is pure and runs
//! inline; the model-assisted checks are issued concurrently and awaited
//! together. A provider error inside one check degrades that check to SKIP
//! without touching its siblings.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::filing::PreparedFiling;
use crate::model::{CheckKind, CheckResult, ExtractionRecord, PipelineConfig, QaScore};
use crate::service::llm::{
    complete_metered, CompletionBackend, CostMeter, LlmError, ModelRequest, ModelTier,
};
use crate::service::parser::{self, ParserError};

mod amounts;
mod completeness;
mod consistency;
mod debt;
mod entities;
mod grounding;
mod jv_vie;
mod prompts;
mod score;
mod structure;

/// Failure of one model-assisted check's call. Contained to that check.
#[derive(Debug, Error)]
pub(crate) enum CheckCallError {
    #[error(transparent)]
    Call(#[from] LlmError),
    #[error(transparent)]
    Parse(#[from] ParserError),
}

/// Read-only inputs shared by every check in one verification pass.
pub(crate) struct CheckContext<'a> {
    pub record: &'a ExtractionRecord,
    pub prepared: &'a PreparedFiling,
    pub backend: &'a dyn CompletionBackend,
    pub meter: &'a CostMeter,
    pub config: &'a PipelineConfig,
}

impl CheckContext<'_> {
    /// One structured model call on the primary tier. Checks never escalate;
    /// the verification budget stays on the cheap tier regardless of which
    /// tier produced the candidate.
    pub(crate) async fn model_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, CheckCallError> {
        let request = ModelRequest {
            tier: ModelTier::Primary,
            system: system.to_string(),
            prompt: prompt.to_string(),
        };
        let raw = complete_metered(self.backend, self.meter, &request).await?;
        Ok(parser::parse_as::<T>(&raw)?)
    }

    pub(crate) fn skip_on_error(
        &self,
        kind: CheckKind,
        weight: f64,
        error: CheckCallError,
    ) -> CheckResult {
        tracing::warn!(check = ?kind, error = %error, "Check degraded to SKIP");
        CheckResult::skip(kind, weight, format!("check could not run: {error}"))
    }
}

/// Runs the full check battery for candidate records.
pub struct Verifier {
    backend: Arc<dyn CompletionBackend>,
    config: PipelineConfig,
}

impl Verifier {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Score one candidate against the prepared filing content.
    pub async fn verify(
        &self,
        record: &ExtractionRecord,
        prepared: &PreparedFiling,
        meter: &CostMeter,
    ) -> QaScore {
        let ctx = CheckContext {
            record,
            prepared,
            backend: self.backend.as_ref(),
            meter,
            config: &self.config,
        };

        let mut checks = vec![consistency::run(record)];

        let mut pending: Vec<Pin<Box<dyn Future<Output = CheckResult> + Send + '_>>> = vec![
            Box::pin(entities::run(&ctx)),
            Box::pin(debt::run(&ctx)),
            Box::pin(completeness::run(&ctx)),
            Box::pin(structure::run(&ctx)),
        ];
        if self.config.jv_vie_check {
            pending.push(Box::pin(jv_vie::run(&ctx)));
        }
        checks.extend(join_all(pending).await);

        let score = score::aggregate(checks, &self.config);
        tracing::info!(
            company = %record.company,
            score_pct = score.score_pct,
            passed = score.passed,
            "Verification complete"
        );
        score
    }
}
