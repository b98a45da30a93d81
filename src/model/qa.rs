//! Verification outcome types

use serde::{Deserialize, Serialize};

/// Identifier of one verification check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    InternalConsistency,
    EntityVerification,
    DebtVerification,
    Completeness,
    StructureVerification,
    JvVieVerification,
}

/// Verdict of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
    /// Required source material was unavailable or the check itself could
    /// not run; excluded from scoring entirely
    Skip,
}

/// One verification check's outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub verdict: Verdict,
    /// Relative weight in the aggregate score
    pub weight: f64,
    /// Free-text finding, displayed and routed verbatim into fix prompts
    pub finding: String,
}

impl CheckResult {
    pub fn pass(kind: CheckKind, weight: f64, finding: impl Into<String>) -> Self {
        Self::new(kind, Verdict::Pass, weight, finding)
    }

    pub fn warn(kind: CheckKind, weight: f64, finding: impl Into<String>) -> Self {
        Self::new(kind, Verdict::Warn, weight, finding)
    }

    pub fn fail(kind: CheckKind, weight: f64, finding: impl Into<String>) -> Self {
        Self::new(kind, Verdict::Fail, weight, finding)
    }

    pub fn skip(kind: CheckKind, weight: f64, finding: impl Into<String>) -> Self {
        Self::new(kind, Verdict::Skip, weight, finding)
    }

    fn new(kind: CheckKind, verdict: Verdict, weight: f64, finding: impl Into<String>) -> Self {
        Self {
            kind,
            verdict,
            weight,
            finding: finding.into(),
        }
    }
}

/// Aggregate of all check results for one candidate record.
///
/// Computed fresh for every candidate, never mutated, superseded by the next
/// iteration's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaScore {
    /// Weighted percentage over the applicable (non-skipped) checks
    pub score_pct: f64,
    /// Threshold the score was judged against
    pub threshold_pct: f64,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
}

impl QaScore {
    pub fn check(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.kind == kind)
    }

    /// Checks whose verdicts call for a targeted fix.
    pub fn actionable_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks
            .iter()
            .filter(|c| matches!(c.verdict, Verdict::Fail | Verdict::Warn))
    }
}

/// One failing or warning finding routed into a fix prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixItem {
    pub kind: CheckKind,
    pub verdict: Verdict,
    pub finding: String,
}

/// The subset of the record needing correction, derived from a QaScore.
/// Ephemeral; recomputed every iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixTarget {
    pub items: Vec<FixItem>,
}

impl FixTarget {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
