//! Internal consistency check
//!
//! The record cross-references entities by name: every declared owner, every
//! instrument issuer and every guarantor must resolve, after normalization,
//! to an entity in the same record. An orphaned reference means the record
//! is structurally broken whatever the source says, so any violation is an
//! outright FAIL. Pure and zero-cost.

use crate::model::{CheckKind, CheckResult, ExtractionRecord};
use crate::normalize::normalize_name;
use crate::service::verification::score;

pub(crate) fn run(record: &ExtractionRecord) -> CheckResult {
    let kind = CheckKind::InternalConsistency;
    let weight = score::check_weight(kind);
    let known = record.entity_names_normalized();
    let mut violations = Vec::new();

    for (position, entity) in record.entities.iter().enumerate() {
        for ownership in entity.owners.iter().flatten() {
            if !known.contains(&normalize_name(&ownership.owner)) {
                violations.push(format!(
                    "entity {} '{}' declares owner '{}' which matches no entity in the record",
                    position + 1,
                    entity.name,
                    ownership.owner
                ));
            }
        }
    }

    for instrument in &record.instruments {
        if !known.contains(&normalize_name(&instrument.issuer)) {
            violations.push(format!(
                "instrument '{}' names issuer '{}' which matches no entity in the record",
                instrument.name, instrument.issuer
            ));
        }
        for guarantor in &instrument.guarantors {
            if !known.contains(&normalize_name(guarantor)) {
                violations.push(format!(
                    "instrument '{}' names guarantor '{}' which matches no entity in the record",
                    instrument.name, guarantor
                ));
            }
        }
    }

    if violations.is_empty() {
        CheckResult::pass(
            kind,
            weight,
            "all owner, issuer and guarantor references resolve",
        )
    } else {
        CheckResult::fail(kind, weight, violations.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Consolidation, DebtInstrument, Entity, EntityType, InstrumentType, Ownership,
        SecurityType, Seniority, Verdict,
    };

    fn entity(name: &str, owners: Option<Vec<Ownership>>) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: EntityType::Corporation,
            jurisdiction: None,
            owners,
            is_vie: false,
            consolidation: Consolidation::Full,
        }
    }

    fn owned_by(owner: &str) -> Option<Vec<Ownership>> {
        Some(vec![Ownership {
            owner: owner.to_string(),
            stake_bps: Some(10_000),
        }])
    }

    fn instrument(name: &str, issuer: &str, guarantors: &[&str]) -> DebtInstrument {
        DebtInstrument {
            name: name.to_string(),
            instrument_type: InstrumentType::Notes,
            issuer: issuer.to_string(),
            guarantors: guarantors.iter().map(|g| g.to_string()).collect(),
            outstanding_minor: 50_000_000_000,
            currency: "USD".to_string(),
            rate_bps: Some(662),
            maturity: None,
            seniority: Seniority::Senior,
            security: SecurityType::Unsecured,
        }
    }

    #[test]
    fn test_resolvable_references_pass() {
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![
                entity("Acme Corp", Some(vec![])),
                // Punctuation and case drift still resolves
                entity("Acme Finance, LLC", owned_by("ACME CORP")),
            ],
            instruments: vec![instrument(
                "Senior Notes due 2025",
                "Acme Finance LLC",
                &["Acme Corp"],
            )],
        };
        let result = run(&record);
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn test_orphaned_owner_fails_and_names_the_entity() {
        // Five entities, the third declaring an owner nothing resolves to.
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![
                entity("Acme Corp", Some(vec![])),
                entity("Acme Finance LLC", owned_by("Acme Corp")),
                entity("Acme Shipping Ltd", owned_by("Foo Corp")),
                entity("Acme Drilling Inc", owned_by("Acme Corp")),
                entity("Acme Services LLC", owned_by("Acme Corp")),
            ],
            instruments: vec![],
        };
        let result = run(&record);
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.finding.contains("entity 3 'Acme Shipping Ltd'"));
        assert!(result.finding.contains("'Foo Corp'"));
    }

    #[test]
    fn test_orphaned_guarantor_fails() {
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![entity("Acme Corp", Some(vec![]))],
            instruments: vec![instrument(
                "Term Loan B",
                "Acme Corp",
                &["Acme Guarantee Co"],
            )],
        };
        let result = run(&record);
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.finding.contains("guarantor 'Acme Guarantee Co'"));
    }

    #[test]
    fn test_unknown_parent_is_not_a_violation() {
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![entity("Acme Corp", Some(vec![])), entity("Mystery Sub", None)],
            instruments: vec![],
        };
        assert_eq!(run(&record).verdict, Verdict::Pass);
    }

    #[test]
    fn test_missing_issuer_fails() {
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![entity("Acme Corp", Some(vec![]))],
            instruments: vec![instrument("Term Loan B", "", &[])],
        };
        let result = run(&record);
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.finding.contains("issuer ''"));
    }
}
