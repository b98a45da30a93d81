//! Check weights, ratio banding and score aggregation

use crate::model::{CheckKind, CheckResult, PipelineConfig, QaScore, Verdict};

/// Relative weight of each check in the aggregate score.
pub(crate) fn check_weight(kind: CheckKind) -> f64 {
    match kind {
        CheckKind::InternalConsistency => 25.0,
        CheckKind::EntityVerification => 20.0,
        CheckKind::DebtVerification => 20.0,
        CheckKind::Completeness => 15.0,
        CheckKind::StructureVerification => 10.0,
        CheckKind::JvVieVerification => 10.0,
    }
}

/// Convert a corroboration ratio (percent) into a verdict using the
/// configured floors. Both comparisons are inclusive, so a ratio exactly at
/// a floor takes the better verdict.
pub(crate) fn band(ratio_pct: f64, config: &PipelineConfig) -> Verdict {
    if ratio_pct >= config.check_pass_floor_pct {
        Verdict::Pass
    } else if ratio_pct >= config.check_warn_floor_pct {
        Verdict::Warn
    } else {
        Verdict::Fail
    }
}

/// Aggregate check results into the weighted score.
///
/// PASS earns full weight, WARN earns the configured partial credit, FAIL
/// earns nothing. SKIP leaves both numerator and denominator untouched, so
/// missing source material never penalizes the record.
pub(crate) fn aggregate(checks: Vec<CheckResult>, config: &PipelineConfig) -> QaScore {
    let mut earned = 0.0;
    let mut applicable = 0.0;
    for check in &checks {
        match check.verdict {
            Verdict::Pass => {
                earned += check.weight;
                applicable += check.weight;
            }
            Verdict::Warn => {
                earned += check.weight * config.warn_credit;
                applicable += check.weight;
            }
            Verdict::Fail => applicable += check.weight,
            Verdict::Skip => {}
        }
    }
    let score_pct = if applicable > 0.0 {
        earned / applicable * 100.0
    } else {
        0.0
    };
    QaScore {
        score_pct,
        threshold_pct: config.qa_threshold_pct,
        passed: score_pct >= config.qa_threshold_pct,
        checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_cover_all_six_checks() {
        let total: f64 = [
            CheckKind::InternalConsistency,
            CheckKind::EntityVerification,
            CheckKind::DebtVerification,
            CheckKind::Completeness,
            CheckKind::StructureVerification,
            CheckKind::JvVieVerification,
        ]
        .into_iter()
        .map(check_weight)
        .sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_banding_floors_are_inclusive() {
        let config = PipelineConfig::default();
        assert_eq!(band(100.0, &config), Verdict::Pass);
        assert_eq!(band(80.0, &config), Verdict::Pass);
        assert_eq!(band(79.9, &config), Verdict::Warn);
        assert_eq!(band(50.0, &config), Verdict::Warn);
        assert_eq!(band(49.9, &config), Verdict::Fail);
        assert_eq!(band(0.0, &config), Verdict::Fail);
    }

    #[test]
    fn test_skip_excluded_from_denominator() {
        let config = PipelineConfig::default();
        let with_skip = aggregate(
            vec![
                CheckResult::pass(CheckKind::InternalConsistency, 25.0, "ok"),
                CheckResult::skip(CheckKind::EntityVerification, 20.0, "no exhibit"),
                CheckResult::pass(CheckKind::DebtVerification, 20.0, "ok"),
            ],
            &config,
        );
        assert_eq!(with_skip.score_pct, 100.0);
        assert!(with_skip.passed);

        // Same outcome as never running the skipped check at all
        let without = aggregate(
            vec![
                CheckResult::pass(CheckKind::InternalConsistency, 25.0, "ok"),
                CheckResult::pass(CheckKind::DebtVerification, 20.0, "ok"),
            ],
            &config,
        );
        assert_eq!(with_skip.score_pct, without.score_pct);
    }

    #[test]
    fn test_warn_earns_partial_credit() {
        let config = PipelineConfig::default();
        let score = aggregate(
            vec![CheckResult::warn(CheckKind::EntityVerification, 20.0, "low ratio")],
            &config,
        );
        assert!((score.score_pct - 70.0).abs() < 1e-9);
        assert!(!score.passed);
    }

    #[test]
    fn test_fail_contributes_zero() {
        let config = PipelineConfig::default();
        let score = aggregate(
            vec![
                CheckResult::fail(CheckKind::InternalConsistency, 25.0, "orphaned reference"),
                CheckResult::pass(CheckKind::EntityVerification, 25.0, "ok"),
            ],
            &config,
        );
        assert_eq!(score.score_pct, 50.0);
    }

    #[test]
    fn test_all_skipped_scores_zero() {
        let config = PipelineConfig::default();
        let score = aggregate(
            vec![CheckResult::skip(CheckKind::EntityVerification, 20.0, "no exhibit")],
            &config,
        );
        assert_eq!(score.score_pct, 0.0);
        assert!(!score.passed);
    }
}
