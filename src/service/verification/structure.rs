//! Structure verification
//!
//! Tree shape is checked deterministically: the ownership graph must be
//! acyclic and rooted at exactly one entity with an empty owners list. Any
//! shape violation is FAIL without spending a model call. Only the holdco
//! plausibility judgment, which needs the filing's description of the
//! parent, goes to the model.

use std::collections::HashMap;

use serde::Deserialize;

use crate::filing::truncate_chars;
use crate::model::{CheckKind, CheckResult, ExtractionRecord};
use crate::normalize::normalize_name;
use crate::service::verification::{prompts, score, CheckContext};

/// Head of content handed to the plausibility prompt. Filings identify the
/// registrant early, so the head is enough.
const PLAUSIBILITY_CONTENT_CHARS: usize = 20_000;

#[derive(Debug, Deserialize)]
struct StructureReply {
    #[serde(default)]
    plausible: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) async fn run(ctx: &CheckContext<'_>) -> CheckResult {
    let kind = CheckKind::StructureVerification;
    let weight = score::check_weight(kind);

    if ctx.record.entities.is_empty() {
        return CheckResult::fail(kind, weight, "record contains no entities");
    }
    let roots = ctx.record.root_entities();
    match roots.len() {
        0 => {
            return CheckResult::fail(
                kind,
                weight,
                "no entity declares an empty owner list as the root",
            );
        }
        1 => {}
        _ => {
            let names: Vec<&str> = roots.iter().map(|e| e.name.as_str()).collect();
            return CheckResult::fail(
                kind,
                weight,
                format!("multiple root entities: {}", names.join(", ")),
            );
        }
    }
    if let Some(cycle) = find_cycle(ctx.record) {
        return CheckResult::fail(
            kind,
            weight,
            format!("ownership cycle: {}", cycle.join(" -> ")),
        );
    }
    let root_name = roots[0].name.clone();

    if ctx.prepared.content.trim().is_empty() {
        return CheckResult::pass(
            kind,
            weight,
            format!(
                "tree is acyclic with single root '{root_name}'; no content available to judge the designation"
            ),
        );
    }

    let content = truncate_chars(&ctx.prepared.content, PLAUSIBILITY_CONTENT_CHARS);
    let prompt = prompts::build_structure_prompt(&ctx.record.company, &root_name, content);
    let reply: StructureReply = match ctx.model_json(prompts::STRUCTURE_SYSTEM_PROMPT, &prompt).await
    {
        Ok(reply) => reply,
        Err(error) => return ctx.skip_on_error(kind, weight, error),
    };

    let reason = reply.reason.unwrap_or_default();
    if reply.plausible {
        CheckResult::pass(
            kind,
            weight,
            format!("tree is acyclic, rooted at '{root_name}'; designation corroborated: {reason}"),
        )
    } else {
        // Model doubt about the holdco is a warning, not proof of breakage
        CheckResult::warn(
            kind,
            weight,
            format!("root designation '{root_name}' questioned: {reason}"),
        )
    }
}

/// First ownership cycle found, as entity names in walk order.
fn find_cycle(record: &ExtractionRecord) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        InStack,
        Done,
    }

    fn visit(
        record: &ExtractionRecord,
        index: &HashMap<String, usize>,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        current: usize,
    ) -> Option<Vec<String>> {
        marks[current] = Mark::InStack;
        path.push(current);
        for ownership in record.entities[current].owners.iter().flatten() {
            let Some(&owner_idx) = index.get(&normalize_name(&ownership.owner)) else {
                // Orphaned references are the consistency check's finding
                continue;
            };
            match marks[owner_idx] {
                Mark::New => {
                    if let Some(cycle) = visit(record, index, marks, path, owner_idx) {
                        return Some(cycle);
                    }
                }
                Mark::InStack => {
                    let start = path.iter().position(|&p| p == owner_idx).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&p| record.entities[p].name.clone())
                        .collect();
                    cycle.push(record.entities[owner_idx].name.clone());
                    return Some(cycle);
                }
                Mark::Done => {}
            }
        }
        path.pop();
        marks[current] = Mark::Done;
        None
    }

    let index: HashMap<String, usize> = record
        .entities
        .iter()
        .enumerate()
        .map(|(i, e)| (normalize_name(&e.name), i))
        .collect();
    let mut marks = vec![Mark::New; record.entities.len()];
    let mut path = Vec::new();
    for start in 0..record.entities.len() {
        if marks[start] == Mark::New
            && let Some(cycle) = visit(record, &index, &mut marks, &mut path, start)
        {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Consolidation, Entity, EntityType, Ownership};

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
            stake_bps: None,
        }])
    }

    fn record(entities: Vec<Entity>) -> ExtractionRecord {
        ExtractionRecord {
            company: "Acme Corp".to_string(),
            entities,
            instruments: vec![],
        }
    }

    #[test]
    fn test_acyclic_tree_has_no_cycle() {
        let record = record(vec![
            entity("Acme Corp", Some(vec![])),
            entity("Acme Mid BV", owned_by("Acme Corp")),
            entity("Acme Finance LLC", owned_by("Acme Mid BV")),
        ]);
        assert!(find_cycle(&record).is_none());
    }

    #[test]
    fn test_cycle_detected_and_named() {
        let record = record(vec![
            entity("Acme Corp", Some(vec![])),
            entity("Acme A", owned_by("Acme B")),
            entity("Acme B", owned_by("Acme A")),
        ]);
        let cycle = find_cycle(&record).unwrap();
        assert!(cycle.contains(&"Acme A".to_string()));
        assert!(cycle.contains(&"Acme B".to_string()));
        // Walk closes back on the entity it started from
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_self_ownership_is_a_cycle() {
        let record = record(vec![entity("Acme Corp", owned_by("Acme Corp"))]);
        assert!(find_cycle(&record).is_some());
    }

    #[test]
    fn test_diamond_ownership_is_not_a_cycle() {
        // Two parents holding the same subsidiary is legitimate
        let record = record(vec![
            entity("Acme Corp", Some(vec![])),
            entity("Acme A", owned_by("Acme Corp")),
            entity("Acme B", owned_by("Acme Corp")),
            entity(
                "Acme JV",
                Some(vec![
                    Ownership {
                        owner: "Acme A".to_string(),
                        stake_bps: Some(5_000),
                    },
                    Ownership {
                        owner: "Acme B".to_string(),
                        stake_bps: Some(5_000),
                    },
                ]),
            ),
        ]);
        assert!(find_cycle(&record).is_none());
    }
}
