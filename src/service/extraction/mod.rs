//! Extraction Invoker
//!
//! Issues the full-extraction and targeted-fix calls, feeds every raw reply
//! through the robust parser, and retries each call at most once: after a
//! provider failure with a short backoff, after an unparseable reply with an
//! addendum naming the parse failure. A second failure surfaces to the
//! iteration controller, which books it as a failed iteration.

pub mod convert;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::model::{ExtractedRecord, ExtractionRecord, FixTarget};
use crate::service::llm::{complete_metered, CompletionBackend, CostMeter, LlmError, ModelRequest, ModelTier};
use crate::service::parser::{self, ParserError};

const RETRY_DELAY_MS: u64 = 500;

/// Error type for extraction operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("extraction call failed: {0}")]
    CallFailed(#[from] LlmError),
    #[error(transparent)]
    Malformed(#[from] ParserError),
}

/// Service issuing structured-extraction and targeted-fix calls
pub struct Extractor {
    backend: Arc<dyn CompletionBackend>,
    meter: CostMeter,
}

impl Extractor {
    pub fn new(backend: Arc<dyn CompletionBackend>, meter: CostMeter) -> Self {
        Self { backend, meter }
    }

    /// Full structured extraction from prepared filing content.
    pub async fn extract(
        &self,
        company: &str,
        content: &str,
        tier: ModelTier,
    ) -> Result<ExtractionRecord, ExtractionError> {
        tracing::debug!(
            company = %company,
            tier = ?tier,
            content_chars = content.len(),
            "Issuing extraction call"
        );
        let system = prompts::extraction_preamble();
        let prompt = prompts::build_extraction_prompt(company, content);
        let extracted = self.call_with_retry(&system, &prompt, tier).await?;
        Ok(convert::to_domain_record(extracted, company))
    }

    /// Targeted fix of an existing candidate, scoped to the findings in
    /// `target`. Returns the complete corrected record.
    pub async fn fix(
        &self,
        company: &str,
        candidate: &ExtractionRecord,
        target: &FixTarget,
        source_excerpts: &str,
        tier: ModelTier,
    ) -> Result<ExtractionRecord, ExtractionError> {
        tracing::debug!(
            company = %company,
            tier = ?tier,
            findings = target.items.len(),
            "Issuing targeted fix call"
        );
        let system = prompts::fix_preamble();
        let prompt = prompts::build_fix_prompt(company, candidate, target, source_excerpts);
        let extracted = self.call_with_retry(&system, &prompt, tier).await?;
        Ok(convert::to_domain_record(extracted, company))
    }

    /// One call plus at most one retry. The retry prompt differs by failure
    /// mode: provider errors get the same prompt after a delay, parse
    /// failures get an addendum naming the failure.
    async fn call_with_retry(
        &self,
        system: &str,
        prompt: &str,
        tier: ModelTier,
    ) -> Result<ExtractedRecord, ExtractionError> {
        match self.call_once(system, prompt, tier).await {
            Ok(extracted) => Ok(extracted),
            Err(ExtractionError::Malformed(err)) => {
                let ParserError::MalformedResponse { reason, .. } = &err;
                tracing::warn!(tier = ?tier, reason = %reason, "Unparseable reply, retrying with format addendum");
                let retry_prompt =
                    format!("{prompt}{}", prompts::malformed_retry_addendum(reason));
                self.call_once(system, &retry_prompt, tier).await
            }
            Err(ExtractionError::CallFailed(err)) => {
                tracing::warn!(tier = ?tier, error = %err, "Provider call failed, retrying once");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                self.call_once(system, prompt, tier).await
            }
        }
    }

    async fn call_once(
        &self,
        system: &str,
        prompt: &str,
        tier: ModelTier,
    ) -> Result<ExtractedRecord, ExtractionError> {
        let request = ModelRequest {
            tier,
            system: system.to_string(),
            prompt: prompt.to_string(),
        };
        let raw = complete_metered(self.backend.as_ref(), &self.meter, &request).await?;
        let extracted = parser::parse_as::<ExtractedRecord>(&raw)?;
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TierRates;
    use crate::service::llm::stub::{StubBackend, StubReply};

    const VALID_REPLY: &str = r#"{
        "company": "Acme Corp",
        "entities": [
            {"name": "Acme Corp", "owners": []},
            {"name": "Acme Finance LLC", "owners": [{"owner": "Acme Corp", "stake_bps": 10000}]}
        ],
        "instruments": [
            {"name": "Term Loan B", "issuer": "Acme Finance LLC", "outstanding_minor": 120000000000}
        ]
    }"#;

    fn extractor(backend: StubBackend) -> (Extractor, CostMeter) {
        let meter = CostMeter::new(TierRates::default());
        (
            Extractor::new(Arc::new(backend), meter.clone()),
            meter,
        )
    }

    #[tokio::test]
    async fn test_extract_parses_fenced_reply() {
        let fenced = format!("```json\n{VALID_REPLY}\n```");
        let backend = StubBackend::new().on_text("structured extraction", &[&fenced]);
        let (extractor, meter) = extractor(backend);

        let record = extractor
            .extract("Acme Corp", "filing content", ModelTier::Primary)
            .await
            .unwrap();
        assert_eq!(record.entities.len(), 2);
        assert_eq!(record.instruments[0].outstanding_minor, 120_000_000_000);
        assert_eq!(meter.report().primary.calls, 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_retried_with_addendum() {
        // The addendum names the parse failure, so only the retry prompt
        // matches the second rule.
        let backend = StubBackend::new()
            .on_text("could not be parsed", &[VALID_REPLY])
            .on_text("structured extraction", &["no json here at all"]);
        let (extractor, _meter) = extractor(backend);

        let record = extractor
            .extract("Acme Corp", "filing content", ModelTier::Primary)
            .await
            .unwrap();
        assert_eq!(record.company, "Acme Corp");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_retried_then_surfaced() {
        let backend = StubBackend::new().on(
            "structured extraction",
            vec![StubReply::Fail, StubReply::Fail],
        );
        let (extractor, meter) = extractor(backend);
        let err = extractor
            .extract("Acme Corp", "filing content", ModelTier::Primary)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::CallFailed(_)));
        // Failed calls are not metered
        assert_eq!(meter.report().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fix_returns_complete_record() {
        let corrected = r#"{
            "company": "Acme Corp",
            "entities": [{"name": "Acme Corp", "owners": []}],
            "instruments": []
        }"#;
        let backend = StubBackend::new().on_text("targeted fix", &[corrected]);
        let (extractor, _meter) = extractor(backend);

        let candidate = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![],
            instruments: vec![],
        };
        let target = FixTarget::default();
        let record = extractor
            .fix("Acme Corp", &candidate, &target, "excerpts", ModelTier::Escalated)
            .await
            .unwrap();
        assert_eq!(record.entities.len(), 1);
    }
}
