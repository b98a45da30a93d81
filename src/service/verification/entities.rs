//! Entity verification against the subsidiary exhibit
//!
//! The model judges which extracted entities the exhibit corroborates; each
//! corroboration only counts when its evidence excerpt actually occurs in
//! the exhibit text.

use std::collections::HashSet;

use serde::Deserialize;

use crate::filing::truncate_chars;
use crate::model::{CheckKind, CheckResult};
use crate::normalize::normalize_name;
use crate::service::verification::{grounding, prompts, score, CheckContext};

#[derive(Debug, Deserialize)]
struct EntityReply {
    #[serde(default)]
    entities: Vec<EntityJudgment>,
}

#[derive(Debug, Deserialize)]
struct EntityJudgment {
    name: String,
    #[serde(default)]
    corroborated: bool,
    #[serde(default)]
    evidence: Option<String>,
}

pub(crate) async fn run(ctx: &CheckContext<'_>) -> CheckResult {
    let kind = CheckKind::EntityVerification;
    let weight = score::check_weight(kind);
    if !ctx.prepared.has_exhibit() {
        return CheckResult::skip(kind, weight, "no subsidiary exhibit available");
    }
    if ctx.record.entities.is_empty() {
        return CheckResult::fail(kind, weight, "record lists no entities to corroborate");
    }

    let exhibit = truncate_chars(&ctx.prepared.exhibit, ctx.config.footnote_budget_chars);
    let prompt = prompts::build_entity_prompt(&ctx.record.entities, exhibit);
    let reply: EntityReply = match ctx.model_json(prompts::ENTITY_SYSTEM_PROMPT, &prompt).await {
        Ok(reply) => reply,
        Err(error) => return ctx.skip_on_error(kind, weight, error),
    };

    let mut corroborated: HashSet<String> = HashSet::new();
    for judgment in &reply.entities {
        if judgment.corroborated
            && let Some(evidence) = &judgment.evidence
            && grounding::excerpt_grounded(evidence, exhibit)
        {
            corroborated.insert(normalize_name(&judgment.name));
        }
    }

    let total = ctx.record.entities.len();
    let mut uncorroborated = Vec::new();
    let mut hits = 0usize;
    for entity in &ctx.record.entities {
        if corroborated.contains(&normalize_name(&entity.name)) {
            hits += 1;
        } else {
            uncorroborated.push(entity.name.as_str());
        }
    }

    let ratio_pct = hits as f64 / total as f64 * 100.0;
    let finding = if uncorroborated.is_empty() {
        format!("all {total} entities corroborated by the subsidiary exhibit")
    } else {
        format!(
            "{hits} of {total} entities corroborated by the subsidiary exhibit; uncorroborated: {}",
            uncorroborated.join(", ")
        )
    };
    CheckResult {
        kind,
        verdict: score::band(ratio_pct, ctx.config),
        weight,
        finding,
    }
}
