//! Joint-venture and VIE coverage
//!
//! Asks the model which joint ventures and variable interest entities the
//! filing discusses, keeps only claims whose quoted evidence occurs in the
//! source, then checks each one is present in the record with ownership
//! metadata that reflects partial ownership rather than a flattened
//! wholly-owned subsidiary.

use serde::Deserialize;

use crate::filing::truncate_chars;
use crate::model::{CheckKind, CheckResult, Consolidation, Entity};
use crate::service::verification::{grounding, prompts, score, CheckContext};

const JV_CONTENT_CHARS: usize = 120_000;

#[derive(Debug, Deserialize)]
struct JvVieReply {
    #[serde(default)]
    items: Vec<JvVieItem>,
}

#[derive(Debug, Deserialize)]
struct JvVieItem {
    name: String,
    #[serde(default)]
    evidence: Option<String>,
}

pub(crate) async fn run(ctx: &CheckContext<'_>) -> CheckResult {
    let kind = CheckKind::JvVieVerification;
    let weight = score::check_weight(kind);

    if ctx.record.entities.is_empty() && ctx.record.instruments.is_empty() {
        return CheckResult::skip(kind, weight, "record is empty");
    }
    if ctx.prepared.content.trim().is_empty() {
        return CheckResult::skip(kind, weight, "no source content available");
    }

    let content = truncate_chars(&ctx.prepared.content, JV_CONTENT_CHARS);
    let prompt = prompts::build_jv_vie_prompt(&ctx.record.company, content);
    let reply: JvVieReply = match ctx.model_json(prompts::JV_VIE_SYSTEM_PROMPT, &prompt).await {
        Ok(reply) => reply,
        Err(error) => return ctx.skip_on_error(kind, weight, error),
    };

    let mut violations = Vec::new();
    let mut grounded_total = 0usize;
    for item in &reply.items {
        let grounded = item
            .evidence
            .as_deref()
            .is_some_and(|e| grounding::excerpt_grounded(e, content));
        if !grounded {
            continue;
        }
        grounded_total += 1;
        match ctx.record.find_entity(&item.name) {
            None => violations.push(format!("'{}' is discussed in the filing but absent from the record", item.name)),
            Some(entity) => {
                if !reflects_partial_ownership(entity) {
                    violations.push(format!(
                        "'{}' is recorded as a plain wholly-owned subsidiary",
                        entity.name
                    ));
                }
            }
        }
    }

    if grounded_total == 0 {
        return CheckResult::pass(
            kind,
            weight,
            "filing discusses no corroborated joint ventures or VIEs",
        );
    }
    let covered = grounded_total - violations.len();
    let ratio_pct = covered as f64 / grounded_total as f64 * 100.0;
    let verdict = score::band(ratio_pct, ctx.config);
    let finding = if violations.is_empty() {
        format!("{grounded_total} joint venture(s)/VIE(s) all carried with partial-ownership metadata")
    } else {
        violations.join("; ")
    };
    CheckResult {
        kind,
        verdict,
        weight,
        finding,
    }
}

/// Whether the entity's metadata records anything short of a fully owned,
/// fully consolidated subsidiary.
fn reflects_partial_ownership(entity: &Entity) -> bool {
    entity.is_vie
        || !matches!(entity.consolidation, Consolidation::Full)
        || entity
            .owners
            .as_ref()
            .is_some_and(|owners| owners.iter().any(|o| o.stake_bps.is_some_and(|s| s < 10_000)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, Ownership};

    fn entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: EntityType::Llc,
            jurisdiction: None,
            owners: None,
            is_vie: false,
            consolidation: Consolidation::Full,
        }
    }

    #[test]
    fn test_wholly_owned_full_consolidation_is_flattened() {
        let mut e = entity("Acme Shipping JV");
        e.owners = Some(vec![Ownership {
            owner: "Acme Corp".to_string(),
            stake_bps: Some(10_000),
        }]);
        assert!(!reflects_partial_ownership(&e));
    }

    #[test]
    fn test_vie_flag_counts_as_partial() {
        let mut e = entity("Acme Shipping JV");
        e.is_vie = true;
        assert!(reflects_partial_ownership(&e));
    }

    #[test]
    fn test_equity_method_counts_as_partial() {
        let mut e = entity("Acme Shipping JV");
        e.consolidation = Consolidation::EquityMethod;
        assert!(reflects_partial_ownership(&e));
    }

    #[test]
    fn test_minority_stake_counts_as_partial() {
        let mut e = entity("Acme Shipping JV");
        e.owners = Some(vec![Ownership {
            owner: "Acme Corp".to_string(),
            stake_bps: Some(4_900),
        }]);
        assert!(reflects_partial_ownership(&e));
    }

    // find_entity goes through name normalization, so model spellings with
    // different casing or punctuation still resolve
    #[test]
    fn test_lookup_tolerates_name_drift() {
        use crate::model::ExtractionRecord;
        let record = ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: vec![entity("Acme Shipping, LLC")],
            instruments: vec![],
        };
        assert!(record.find_entity("acme shipping llc").is_some());
    }
}
