//! Iteration controller
//!
//! Drives the extract, verify, fix loop for one company: bounded iterations
//! per model tier, threshold-based acceptance, and a single escalation from
//! the primary tier to the escalated tier. The loop always terminates with
//! an outcome carrying the best candidate seen across both tiers, so a
//! sub-threshold run still hands the caller something to review.

use std::sync::Arc;

use crate::filing::{FilingSet, PreparedFiling};
use crate::model::{CompanyProfile, ExtractionRecord, PipelineConfig, QaScore};
use crate::service::extraction::Extractor;
use crate::service::llm::{CompletionBackend, CostMeter, ModelTier};
use crate::service::verification::Verifier;

mod planner;
mod state;

pub use state::{CompanyOutcome, IterationRecord, LoopState, OutcomeStatus, ScoredCandidate};

/// Extract-verify-fix pipeline, invoked once per company. No mutable state
/// is shared between invocations; batch drivers may run several companies
/// concurrently against one `Pipeline`.
pub struct Pipeline {
    backend: Arc<dyn CompletionBackend>,
    verifier: Verifier,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: PipelineConfig) -> Self {
        let verifier = Verifier::new(backend.clone(), config.clone());
        Self {
            backend,
            verifier,
            config,
        }
    }

    /// Prepare the filing set, then run the loop.
    pub async fn run(&self, profile: &CompanyProfile, filings: &FilingSet) -> CompanyOutcome {
        let prepared = filings.prepare(self.config.content_budget_chars, self.config.window_chars);
        self.run_prepared(profile, &prepared).await
    }

    /// Run the loop against already prepared content.
    pub async fn run_prepared(
        &self,
        profile: &CompanyProfile,
        prepared: &PreparedFiling,
    ) -> CompanyOutcome {
        let meter = CostMeter::new(self.config.rates);
        let extractor = Extractor::new(self.backend.clone(), meter.clone());
        let max = self.config.max_iterations;

        let mut tier = if profile.known_complex {
            ModelTier::Escalated
        } else {
            ModelTier::Primary
        };
        let mut escalated_tried = profile.known_complex;
        let mut state = LoopState::Extracting;
        // Extraction calls issued at the current tier, extract and fix alike
        let mut iterations: u32 = 0;
        let mut candidate: Option<ExtractionRecord> = None;
        let mut last_score: Option<QaScore> = None;
        let mut tier_scores: Vec<f64> = Vec::new();
        let mut best: Option<ScoredCandidate> = None;
        let mut history: Vec<IterationRecord> = Vec::new();

        if profile.known_complex {
            tracing::info!(
                company = %profile.name,
                "Known-complex company, starting at the escalated tier"
            );
        }

        let status = loop {
            match state {
                LoopState::Extracting => {
                    iterations += 1;
                    match extractor
                        .extract(&profile.name, &prepared.content, tier)
                        .await
                    {
                        Ok(record) => {
                            candidate = Some(record);
                            state = LoopState::Verifying;
                        }
                        Err(error) => {
                            tracing::error!(
                                company = %profile.name,
                                tier = ?tier,
                                iteration = iterations,
                                error = %error,
                                "Extraction iteration failed"
                            );
                            history.push(IterationRecord {
                                tier,
                                iteration: iterations,
                                score_pct: None,
                                failure: Some(error.to_string()),
                            });
                            state = if iterations >= max {
                                tier_exhausted(escalated_tried)
                            } else {
                                // Nothing to fix yet, extract from scratch
                                LoopState::Extracting
                            };
                        }
                    }
                }
                LoopState::Verifying => {
                    let Some(record) = candidate.as_ref() else {
                        state = LoopState::Extracting;
                        continue;
                    };
                    let score = self.verifier.verify(record, prepared, &meter).await;
                    history.push(IterationRecord {
                        tier,
                        iteration: iterations,
                        score_pct: Some(score.score_pct),
                        failure: None,
                    });
                    if let Some(previous) = tier_scores.last()
                        && score.score_pct <= *previous
                    {
                        // Logged only; the iteration budget is the sole
                        // termination mechanism
                        tracing::warn!(
                            company = %profile.name,
                            tier = ?tier,
                            iteration = iterations,
                            previous_pct = *previous,
                            score_pct = score.score_pct,
                            "No improvement over the previous iteration"
                        );
                    }
                    tier_scores.push(score.score_pct);
                    if best
                        .as_ref()
                        .is_none_or(|b| score.score_pct > b.score.score_pct)
                    {
                        best = Some(ScoredCandidate {
                            record: record.clone(),
                            score: score.clone(),
                        });
                    }
                    state = if score.passed {
                        LoopState::Accepted
                    } else if iterations < max {
                        LoopState::Fixing
                    } else {
                        tier_exhausted(escalated_tried)
                    };
                    last_score = Some(score);
                }
                LoopState::Fixing => {
                    let (Some(record), Some(score)) = (candidate.as_ref(), last_score.as_ref())
                    else {
                        state = LoopState::Extracting;
                        continue;
                    };
                    let (target, excerpts) =
                        planner::plan(score, prepared, self.config.footnote_budget_chars);
                    iterations += 1;
                    let attempt = if target.is_empty() {
                        // Below threshold with nothing actionable, so a
                        // targeted fix has no instructions to give
                        extractor
                            .extract(&profile.name, &prepared.content, tier)
                            .await
                    } else {
                        extractor
                            .fix(&profile.name, record, &target, &excerpts, tier)
                            .await
                    };
                    match attempt {
                        Ok(fixed) => {
                            candidate = Some(fixed);
                            state = LoopState::Verifying;
                        }
                        Err(error) => {
                            tracing::error!(
                                company = %profile.name,
                                tier = ?tier,
                                iteration = iterations,
                                error = %error,
                                "Fix iteration failed"
                            );
                            history.push(IterationRecord {
                                tier,
                                iteration: iterations,
                                score_pct: None,
                                failure: Some(error.to_string()),
                            });
                            state = if iterations >= max {
                                tier_exhausted(escalated_tried)
                            } else {
                                LoopState::Fixing
                            };
                        }
                    }
                }
                LoopState::Escalating => {
                    tracing::info!(
                        company = %profile.name,
                        best_pct = best.as_ref().map(|b| b.score.score_pct),
                        "Primary tier exhausted, escalating"
                    );
                    tier = ModelTier::Escalated;
                    escalated_tried = true;
                    iterations = 0;
                    tier_scores.clear();
                    candidate = None;
                    last_score = None;
                    state = LoopState::Extracting;
                }
                LoopState::Accepted => break OutcomeStatus::Accepted,
                LoopState::Exhausted => break OutcomeStatus::Exhausted,
            }
        };

        let cost = meter.report();
        match status {
            OutcomeStatus::Accepted => tracing::info!(
                company = %profile.name,
                score_pct = best.as_ref().map(|b| b.score.score_pct),
                iterations = history.len(),
                total_microdollars = cost.total_microdollars(),
                "Record accepted"
            ),
            OutcomeStatus::Exhausted => tracing::warn!(
                company = %profile.name,
                best_pct = best.as_ref().map(|b| b.score.score_pct),
                iterations = history.len(),
                total_microdollars = cost.total_microdollars(),
                "Both tiers exhausted without reaching threshold"
            ),
        }

        CompanyOutcome {
            company: profile.name.clone(),
            status,
            best,
            history,
            cost,
        }
    }
}

fn tier_exhausted(escalated_tried: bool) -> LoopState {
    if escalated_tried {
        LoopState::Exhausted
    } else {
        LoopState::Escalating
    }
}
