//! Loop state and per-company outcome types

use serde::{Deserialize, Serialize};

use crate::model::{ExtractionRecord, QaScore};
use crate::service::llm::{CostReport, ModelTier};

/// Control state of the extract-verify-fix loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Extracting,
    Verifying,
    Accepted,
    Fixing,
    Escalating,
    Exhausted,
}

/// How the loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A candidate reached the threshold.
    Accepted,
    /// Both tiers ran out of budget; the best candidate is still returned.
    Exhausted,
}

/// Ledger entry for one iteration, kept for telemetry and batch reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub tier: ModelTier,
    /// 1-based iteration number within the tier.
    pub iteration: u32,
    /// Score of the candidate this iteration produced, if one parsed.
    pub score_pct: Option<f64>,
    /// What went wrong when no candidate was produced.
    pub failure: Option<String>,
}

/// A candidate record paired with the score it earned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: ExtractionRecord,
    pub score: QaScore,
}

/// Terminal result of one company's loop. Always carries the best candidate
/// seen across both tiers when any iteration produced one, so the caller can
/// accept a sub-threshold record, queue it for review, or discard it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyOutcome {
    pub company: String,
    pub status: OutcomeStatus,
    pub best: Option<ScoredCandidate>,
    pub history: Vec<IterationRecord>,
    pub cost: CostReport,
}

impl CompanyOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self.status, OutcomeStatus::Accepted)
    }
}
