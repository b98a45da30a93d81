//! Shared LLM client, model tiers and per-company cost metering
//!
//! All provider interaction goes through the [`CompletionBackend`] trait so
//! extraction and verification logic can run against scripted responses in
//! tests. The production backend wraps the rig OpenAI client; it is the only
//! place in the crate that touches the provider API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PipelineConfig, TierRates};

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Error type for provider interaction
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,
    #[error("failed to create OpenAI client: {0}")]
    ClientInit(String),
    #[error("model call failed: {0}")]
    CallFailed(String),
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    #[error("empty response from model")]
    EmptyResponse,
}

/// Model tier selection. Explicit input everywhere, never implicit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Primary,
    Escalated,
}

impl ModelTier {
    /// Model name for this tier, config override first, provider default
    /// otherwise.
    pub fn model_name(self, config: &PipelineConfig) -> String {
        match self {
            ModelTier::Primary => config
                .primary_model
                .clone()
                .unwrap_or_else(|| openai::GPT_4O_MINI.to_string()),
            ModelTier::Escalated => config
                .escalated_model
                .clone()
                .unwrap_or_else(|| openai::GPT_4O.to_string()),
        }
    }
}

/// One model call
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub tier: ModelTier,
    /// System prompt / preamble
    pub system: String,
    pub prompt: String,
}

/// Seam between services and the model provider.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError>;
}

/// Estimated token usage for one call.
///
/// The plain completion path does not expose provider-reported usage, so the
/// meter runs on the standard four-characters-per-token estimate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn estimate(prompt_chars: usize, completion_chars: usize) -> Self {
        Self {
            prompt_tokens: (prompt_chars as u64).div_ceil(4),
            completion_tokens: (completion_chars as u64).div_ceil(4),
        }
    }
}

/// Accumulated calls, tokens and cost for one tier
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TierCost {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub microdollars: u64,
}

/// Per-company cost report, handed to batch reporting with the outcome
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CostReport {
    pub primary: TierCost,
    pub escalated: TierCost,
}

impl CostReport {
    pub fn total_calls(&self) -> u64 {
        self.primary.calls + self.escalated.calls
    }

    pub fn total_microdollars(&self) -> u64 {
        self.primary.microdollars + self.escalated.microdollars
    }
}

/// Thread-safe per-company call meter, shared by the extraction invoker and
/// the concurrent verification checks.
#[derive(Clone)]
pub struct CostMeter {
    rates: TierRates,
    totals: Arc<Mutex<CostReport>>,
}

impl CostMeter {
    pub fn new(rates: TierRates) -> Self {
        Self {
            rates,
            totals: Arc::new(Mutex::new(CostReport::default())),
        }
    }

    pub fn record(&self, tier: ModelTier, usage: TokenUsage) {
        let rates = match tier {
            ModelTier::Primary => self.rates.primary,
            ModelTier::Escalated => self.rates.escalated,
        };
        let microdollars = usage.prompt_tokens * rates.prompt_microdollars_per_mtok / 1_000_000
            + usage.completion_tokens * rates.completion_microdollars_per_mtok / 1_000_000;

        let mut totals = self.totals.lock().unwrap_or_else(|e| e.into_inner());
        let tier_cost = match tier {
            ModelTier::Primary => &mut totals.primary,
            ModelTier::Escalated => &mut totals.escalated,
        };
        tier_cost.calls += 1;
        tier_cost.prompt_tokens += usage.prompt_tokens;
        tier_cost.completion_tokens += usage.completion_tokens;
        tier_cost.microdollars += microdollars;
    }

    pub fn report(&self) -> CostReport {
        *self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Run one call through the backend and record its estimated cost.
pub async fn complete_metered(
    backend: &dyn CompletionBackend,
    meter: &CostMeter,
    request: &ModelRequest,
) -> Result<String, LlmError> {
    let response = backend.complete(request).await?;
    meter.record(
        request.tier,
        TokenUsage::estimate(
            request.system.len() + request.prompt.len(),
            response.len(),
        ),
    );
    Ok(response)
}

/// rig-backed completion backend covering both tiers
pub struct OpenAiBackend {
    client: openai::Client,
    primary_model: String,
    escalated_model: String,
    timeout: Duration,
}

impl OpenAiBackend {
    /// Create a backend with the provided API key
    pub fn new(api_key: &str, config: &PipelineConfig) -> Result<Self, LlmError> {
        let client = openai::Client::builder(api_key)
            .build()
            .map_err(|e| LlmError::ClientInit(e.to_string()))?;

        let primary_model = ModelTier::Primary.model_name(config);
        let escalated_model = ModelTier::Escalated.model_name(config);
        tracing::info!(
            primary = %primary_model,
            escalated = %escalated_model,
            timeout_secs = config.call_timeout_secs,
            "LLM backend initialized"
        );

        Ok(Self {
            client,
            primary_model,
            escalated_model,
            timeout: Duration::from_secs(config.call_timeout_secs),
        })
    }

    /// Create a backend from the `OPENAI_API_KEY` environment variable
    pub fn from_env(config: &PipelineConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(ENV_OPENAI_API_KEY).map_err(|_| LlmError::MissingApiKey)?;
        Self::new(&api_key, config)
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Primary => &self.primary_model,
            ModelTier::Escalated => &self.escalated_model,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        let model = self.model_for(request.tier);

        // temperature=0.0 and a fixed seed for reproducible output
        let agent = self
            .client
            .agent(model)
            .preamble(&request.system)
            .temperature(0.0)
            .additional_params(serde_json::json!({ "seed": 42 }))
            .build();

        let start_time = std::time::Instant::now();
        let response = tokio::time::timeout(self.timeout, agent.prompt(request.prompt.as_str()))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| LlmError::CallFailed(e.to_string()))?;

        tracing::debug!(
            model = %model,
            tier = ?request.tier,
            elapsed_ms = start_time.elapsed().as_millis(),
            prompt_chars = request.prompt.len(),
            response_chars = response.len(),
            "Model call completed"
        );

        if response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(response)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimate() {
        let usage = TokenUsage::estimate(800, 100);
        assert_eq!(usage.prompt_tokens, 200);
        assert_eq!(usage.completion_tokens, 25);
    }

    #[test]
    fn test_cost_meter_accumulates_per_tier() {
        let meter = CostMeter::new(TierRates::default());
        meter.record(
            ModelTier::Primary,
            TokenUsage {
                prompt_tokens: 1_000_000,
                completion_tokens: 0,
            },
        );
        meter.record(
            ModelTier::Escalated,
            TokenUsage {
                prompt_tokens: 1_000_000,
                completion_tokens: 1_000_000,
            },
        );
        let report = meter.report();
        assert_eq!(report.primary.calls, 1);
        assert_eq!(report.primary.microdollars, 150_000);
        assert_eq!(report.escalated.microdollars, 12_500_000);
        assert_eq!(report.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_stub_routes_and_counts() {
        use stub::{StubBackend, StubReply};

        let backend = StubBackend::new()
            .on_text("entity verification", &[r#"{"ok": 1}"#])
            .on("extraction", vec![StubReply::Fail]);

        let req = ModelRequest {
            tier: ModelTier::Primary,
            system: "You perform entity verification.".to_string(),
            prompt: "check these".to_string(),
        };
        assert_eq!(backend.complete(&req).await.unwrap(), r#"{"ok": 1}"#);
        // Sticky last reply repeats
        assert_eq!(backend.complete(&req).await.unwrap(), r#"{"ok": 1}"#);
        assert_eq!(backend.hits("entity verification"), 2);

        let req2 = ModelRequest {
            tier: ModelTier::Primary,
            system: "structured extraction".to_string(),
            prompt: "go".to_string(),
        };
        assert!(backend.complete(&req2).await.is_err());
    }
}
