//! Completeness review
//!
//! The model lists what the source names; the comparison against the record
//! is deterministic. An item counts as present when its normalized name
//! equals, contains or is contained by a record entity or instrument name,
//! which tolerates the "Acme Finance" vs "Acme Finance LLC" drift between
//! narrative text and the legal name.

use serde::Deserialize;

use crate::filing::truncate_chars;
use crate::model::{CheckKind, CheckResult, ExtractionRecord};
use crate::normalize::normalize_name;
use crate::service::verification::{grounding, prompts, score, CheckContext};

#[derive(Debug, Deserialize)]
struct CompletenessReply {
    #[serde(default)]
    mentions: Vec<Mention>,
}

#[derive(Debug, Deserialize)]
struct Mention {
    name: String,
    #[serde(default)]
    evidence: Option<String>,
}

pub(crate) async fn run(ctx: &CheckContext<'_>) -> CheckResult {
    let kind = CheckKind::Completeness;
    let weight = score::check_weight(kind);
    if ctx.prepared.content.trim().is_empty() {
        return CheckResult::skip(kind, weight, "no filing content available");
    }

    let content = truncate_chars(&ctx.prepared.content, ctx.config.footnote_budget_chars);
    let summary = record_summary(ctx.record);
    let prompt = prompts::build_completeness_prompt(&summary, content);
    let reply: CompletenessReply = match ctx
        .model_json(prompts::COMPLETENESS_SYSTEM_PROMPT, &prompt)
        .await
    {
        Ok(reply) => reply,
        Err(error) => return ctx.skip_on_error(kind, weight, error),
    };

    let grounded: Vec<&Mention> = reply
        .mentions
        .iter()
        .filter(|m| {
            m.evidence
                .as_deref()
                .is_some_and(|e| grounding::excerpt_grounded(e, content))
        })
        .collect();

    if grounded.is_empty() {
        return CheckResult::pass(
            kind,
            weight,
            "source names no entities or instruments beyond boilerplate",
        );
    }

    let total = grounded.len();
    let mut missing = Vec::new();
    let mut present = 0usize;
    for mention in grounded {
        if mentioned_in_record(ctx.record, &mention.name) {
            present += 1;
        } else {
            missing.push(mention.name.as_str());
        }
    }

    let ratio_pct = present as f64 / total as f64 * 100.0;
    let finding = if missing.is_empty() {
        format!("all {total} source-mentioned items appear in the record")
    } else {
        format!(
            "{present} of {total} source-mentioned items appear in the record; missing: {}",
            missing.join(", ")
        )
    };
    CheckResult {
        kind,
        verdict: score::band(ratio_pct, ctx.config),
        weight,
        finding,
    }
}

fn record_summary(record: &ExtractionRecord) -> String {
    let entities = record
        .entities
        .iter()
        .map(|e| format!("- {}", e.name))
        .collect::<Vec<_>>()
        .join("\n");
    let instruments = record
        .instruments
        .iter()
        .map(|i| format!("- {}", i.name))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Entities:\n{entities}\n\nInstruments:\n{instruments}")
}

fn mentioned_in_record(record: &ExtractionRecord, name: &str) -> bool {
    let wanted = normalize_name(name);
    if wanted.is_empty() {
        return true;
    }
    let covers = |candidate: &str| {
        let normalized = normalize_name(candidate);
        normalized == wanted || normalized.contains(&wanted) || wanted.contains(&normalized)
    };
    record.entities.iter().any(|e| covers(&e.name))
        || record.instruments.iter().any(|i| covers(&i.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Consolidation, Entity, EntityType};

    fn record_with(names: &[&str]) -> ExtractionRecord {
        ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities: names
                .iter()
                .map(|n| Entity {
                    name: n.to_string(),
                    entity_type: EntityType::Corporation,
                    jurisdiction: None,
                    owners: None,
                    is_vie: false,
                    consolidation: Consolidation::Full,
                })
                .collect(),
            instruments: vec![],
        }
    }

    #[test]
    fn test_mention_matching_tolerates_suffix_drift() {
        let record = record_with(&["Acme Finance LLC"]);
        assert!(mentioned_in_record(&record, "Acme Finance"));
        assert!(mentioned_in_record(&record, "ACME FINANCE, LLC"));
        assert!(!mentioned_in_record(&record, "Baker Drilling"));
    }
}
