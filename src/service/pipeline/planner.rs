//! Fix planning
//!
//! Translates a failing or warning verification outcome into one combined
//! fix request. Findings are routed verbatim; the planner decides only
//! which source sections to attach. PASS and SKIP checks contribute
//! nothing, so fields the checks already accepted are left alone.

use crate::filing::{truncate_chars, PreparedFiling};
use crate::model::{CheckKind, FixItem, FixTarget, QaScore};

/// Derive the fix target and the source excerpts supporting it.
///
/// Each attached section is clipped to `excerpt_budget` characters. Checks
/// that share a section attach it once.
pub(crate) fn plan(
    score: &QaScore,
    prepared: &PreparedFiling,
    excerpt_budget: usize,
) -> (FixTarget, String) {
    let items: Vec<FixItem> = score
        .actionable_checks()
        .map(|check| FixItem {
            kind: check.kind,
            verdict: check.verdict,
            finding: check.finding.clone(),
        })
        .collect();

    let mut want_exhibit = false;
    let mut want_footnote = false;
    let mut want_content = false;
    for item in &items {
        match item.kind {
            CheckKind::EntityVerification => want_exhibit = true,
            CheckKind::DebtVerification => want_footnote = true,
            CheckKind::Completeness
            | CheckKind::StructureVerification
            | CheckKind::JvVieVerification => want_content = true,
            // Consistency violations are repairable from the record alone
            CheckKind::InternalConsistency => {}
        }
    }

    let mut excerpts = String::new();
    if want_exhibit && prepared.has_exhibit() {
        push_section(
            &mut excerpts,
            "Subsidiary Exhibit",
            &prepared.exhibit,
            excerpt_budget,
        );
    }
    if want_footnote && prepared.has_footnotes() {
        push_section(
            &mut excerpts,
            "Debt Footnote",
            &prepared.footnote_excerpt,
            excerpt_budget,
        );
    }
    if want_content && !prepared.content.trim().is_empty() {
        push_section(
            &mut excerpts,
            "Filing Content",
            &prepared.content,
            excerpt_budget,
        );
    }

    (FixTarget { items }, excerpts)
}

fn push_section(out: &mut String, title: &str, body: &str, budget: usize) {
    out.push_str("## ");
    out.push_str(title);
    out.push_str("\n\n");
    out.push_str(truncate_chars(body, budget));
    out.push_str("\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckResult;

    fn score_with(checks: Vec<CheckResult>) -> QaScore {
        QaScore {
            score_pct: 60.0,
            threshold_pct: 85.0,
            passed: false,
            checks,
        }
    }

    fn prepared() -> PreparedFiling {
        PreparedFiling {
            content: "General filing narrative.".to_string(),
            exhibit: "Exhibit 21 subsidiary list.".to_string(),
            footnote_excerpt: "Note 8 long-term debt.".to_string(),
        }
    }

    #[test]
    fn test_only_fail_and_warn_checks_become_fix_items() {
        let score = score_with(vec![
            CheckResult::pass(CheckKind::InternalConsistency, 25.0, "ok"),
            CheckResult::warn(CheckKind::EntityVerification, 20.0, "one entity uncorroborated"),
            CheckResult::fail(CheckKind::DebtVerification, 20.0, "amount mismatch"),
            CheckResult::skip(CheckKind::Completeness, 15.0, "no content"),
        ]);
        let (target, _) = plan(&score, &prepared(), 10_000);
        let kinds: Vec<CheckKind> = target.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![CheckKind::EntityVerification, CheckKind::DebtVerification]
        );
        assert_eq!(target.items[1].finding, "amount mismatch");
    }

    #[test]
    fn test_sections_follow_the_failing_checks() {
        let score = score_with(vec![CheckResult::fail(
            CheckKind::DebtVerification,
            20.0,
            "amount mismatch",
        )]);
        let (_, excerpts) = plan(&score, &prepared(), 10_000);
        assert!(excerpts.contains("## Debt Footnote"));
        assert!(!excerpts.contains("## Subsidiary Exhibit"));
        assert!(!excerpts.contains("## Filing Content"));
    }

    #[test]
    fn test_consistency_failure_attaches_no_source() {
        let score = score_with(vec![CheckResult::fail(
            CheckKind::InternalConsistency,
            25.0,
            "orphaned guarantor",
        )]);
        let (target, excerpts) = plan(&score, &prepared(), 10_000);
        assert!(!target.is_empty());
        assert!(excerpts.is_empty());
    }

    #[test]
    fn test_content_section_attached_once_for_multiple_checks() {
        let score = score_with(vec![
            CheckResult::fail(CheckKind::Completeness, 15.0, "missing subsidiary"),
            CheckResult::warn(CheckKind::StructureVerification, 10.0, "root questioned"),
        ]);
        let (_, excerpts) = plan(&score, &prepared(), 10_000);
        assert_eq!(excerpts.matches("## Filing Content").count(), 1);
    }

    #[test]
    fn test_missing_source_sections_are_left_out() {
        let score = score_with(vec![CheckResult::fail(
            CheckKind::EntityVerification,
            20.0,
            "nothing corroborated",
        )]);
        let mut p = prepared();
        p.exhibit.clear();
        let (_, excerpts) = plan(&score, &p, 10_000);
        assert!(excerpts.is_empty());
    }
}
