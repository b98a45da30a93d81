//! Debt verification against the debt footnote
//!
//! The model only locates the footnote passage for each instrument; the
//! amount comparison itself is deterministic. The passage must occur in the
//! footnote text, its amounts are scanned and classified by
//! [`super::amounts`], and the extracted outstanding figure must fall within
//! the configured tolerance of the passage's outstanding amount.

use std::collections::HashMap;

use serde::Deserialize;

use crate::filing::truncate_chars;
use crate::model::{CheckKind, CheckResult};
use crate::normalize::normalize_name;
use crate::service::verification::{amounts, grounding, prompts, score, CheckContext};

#[derive(Debug, Deserialize)]
struct DebtReply {
    #[serde(default)]
    instruments: Vec<InstrumentPassage>,
}

#[derive(Debug, Deserialize)]
struct InstrumentPassage {
    name: String,
    #[serde(default)]
    passage: Option<String>,
}

pub(crate) async fn run(ctx: &CheckContext<'_>) -> CheckResult {
    let kind = CheckKind::DebtVerification;
    let weight = score::check_weight(kind);
    if !ctx.prepared.has_footnotes() {
        return CheckResult::skip(kind, weight, "no debt footnote content available");
    }
    if ctx.record.instruments.is_empty() {
        return CheckResult::pass(kind, weight, "record lists no instruments to verify");
    }

    let footnote = truncate_chars(&ctx.prepared.footnote_excerpt, ctx.config.footnote_budget_chars);
    let prompt = prompts::build_debt_prompt(&ctx.record.instruments, footnote);
    let reply: DebtReply = match ctx.model_json(prompts::DEBT_SYSTEM_PROMPT, &prompt).await {
        Ok(reply) => reply,
        Err(error) => return ctx.skip_on_error(kind, weight, error),
    };

    let passages: HashMap<String, &str> = reply
        .instruments
        .iter()
        .filter_map(|item| {
            item.passage
                .as_deref()
                .map(|p| (normalize_name(&item.name), p))
        })
        .collect();

    let total = ctx.record.instruments.len();
    let mut matched = 0usize;
    let mut problems = Vec::new();
    for instrument in &ctx.record.instruments {
        match passages.get(&normalize_name(&instrument.name)) {
            Some(passage) if grounding::excerpt_grounded(passage, footnote) => {
                match amounts::comparison_amount(passage) {
                    Some(reference)
                        if amounts::within_tolerance(
                            instrument.outstanding_minor,
                            reference,
                            ctx.config.amount_tolerance_pct,
                        ) =>
                    {
                        matched += 1;
                    }
                    Some(reference) => problems.push(format!(
                        "'{}' extracted {} but the footnote states {}",
                        instrument.name, instrument.outstanding_minor, reference
                    )),
                    None => problems.push(format!(
                        "'{}' footnote passage states no comparable amount",
                        instrument.name
                    )),
                }
            }
            Some(_) => problems.push(format!(
                "'{}' cited passage does not occur in the footnote text",
                instrument.name
            )),
            None => problems.push(format!(
                "'{}' not located in the debt footnote",
                instrument.name
            )),
        }
    }

    let ratio_pct = matched as f64 / total as f64 * 100.0;
    let finding = if problems.is_empty() {
        format!("all {total} instrument amounts match the debt footnote")
    } else {
        format!(
            "{matched} of {total} instrument amounts match the debt footnote; {}",
            problems.join("; ")
        )
    };
    CheckResult {
        kind,
        verdict: score::band(ratio_pct, ctx.config),
        weight,
        finding,
    }
}
