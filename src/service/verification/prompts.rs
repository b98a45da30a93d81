//! Prompts for the model-assisted verification checks
//!
//! Every check demands verbatim evidence excerpts; replies whose evidence
//! does not occur in the supplied source are discarded by the caller, so the
//! prompts are explicit that paraphrased evidence counts as absent.

use crate::model::{DebtInstrument, Entity};

/// System prompt for entity verification against the subsidiary exhibit
pub const ENTITY_SYSTEM_PROMPT: &str = r#"You perform entity verification for corporate-debt records. Given a list of extracted entity names and the text of the company's subsidiary exhibit, decide for each entity whether the exhibit corroborates its existence.

## Critical Rules

1. **Corroboration requires the exhibit to actually name the entity.**
   - Minor punctuation and suffix differences are acceptable ("Acme Finance LLC" vs "Acme Finance, L.L.C.").
   - A similarly named but different entity is NOT corroboration.
2. **Evidence must be verbatim.** Copy the exhibit line that names the entity exactly as it appears. Paraphrased evidence is treated as no evidence.
3. The ultimate parent itself often does not appear in its own subsidiary exhibit; corroborate it from the exhibit header when it is named there, otherwise mark it uncorroborated and say why.

## Output Requirements

Return a single JSON object:
- entities: array of {"name": entity name exactly as given, "corroborated": true | false, "evidence": verbatim exhibit text or null}

No markdown fences, no commentary."#;

/// System prompt for debt verification against the debt footnote
pub const DEBT_SYSTEM_PROMPT: &str = r#"You perform debt verification for corporate-debt records. Given a list of extracted debt instruments and the company's debt-footnote text, locate for each instrument the footnote passage that discusses it.

## Critical Rules

1. **The passage must be verbatim.** Copy the footnote sentences that state the instrument's amounts exactly as they appear, including every dollar figure in them. Paraphrased passages are treated as no passage.
2. Include the passage stating the CURRENT OUTSTANDING amount (carrying value, balance) when the footnote states several amounts for one instrument. Original issuance amounts alone do not verify an instrument.
3. An instrument the footnote never discusses gets "passage": null. Do not force a match.

## Output Requirements

Return a single JSON object:
- instruments: array of {"name": instrument name exactly as given, "passage": verbatim footnote text or null}

No markdown fences, no commentary."#;

/// System prompt for the completeness review of the extracted record
pub const COMPLETENESS_SYSTEM_PROMPT: &str = r#"You perform a completeness review of a corporate-debt record. Given the extracted record and the source filing content, list the entities and debt instruments the SOURCE mentions so the caller can find what the record missed.

## Critical Rules

1. **Only list items the source explicitly names.** Subsidiaries, joint ventures, issuers, notes, loans, facilities. Generic references ("certain subsidiaries", "various notes") are not items.
2. **Evidence must be verbatim.** Copy the source sentence naming the item exactly as it appears.
3. List an item whether or not it already appears in the record; the caller does the comparison.
4. Aggregate totals are not instruments.

## Output Requirements

Return a single JSON object:
- mentions: array of {"name": item name, "kind": "entity" | "instrument", "evidence": verbatim source text}

Return an empty mentions array if the source names nothing beyond boilerplate. No markdown fences, no commentary."#;

/// System prompt for the holdco plausibility half of structure verification
pub const STRUCTURE_SYSTEM_PROMPT: &str = r#"You verify the ownership structure of a corporate-debt record. The record designates one entity as the ultimate parent (holdco). Given filing content, judge whether that designation is plausible.

## Critical Rules

1. The designated holdco should be the entity the filing treats as the registrant or ultimate parent, not an intermediate holding company or financing subsidiary.
2. Name mismatches in suffix or punctuation alone do not make a designation implausible.
3. If the filing content does not identify the parent either way, judge the designation plausible; absence of evidence is not implausibility.

## Output Requirements

Return a single JSON object:
- plausible: true | false
- reason: one or two sentences naming the filing language you relied on

No markdown fences, no commentary."#;

/// System prompt for joint-venture / VIE verification
pub const JV_VIE_SYSTEM_PROMPT: &str = r#"You verify joint venture and variable-interest-entity coverage in a corporate-debt record. Given filing content, list every joint venture, VIE, and partially owned entity the filing discusses so the caller can confirm the record represents them with real stakes and consolidation metadata.

## Critical Rules

1. **Only list entities the filing explicitly identifies** as a joint venture, a variable interest entity, or partially owned (a stated ownership percentage below 100%).
2. **Evidence must be verbatim.** Copy the source sentence identifying the entity exactly as it appears.
3. Wholly owned subsidiaries do not belong in the list.

## Output Requirements

Return a single JSON object:
- items: array of {"name": entity name, "kind": "joint_venture" | "vie" | "partial_ownership", "evidence": verbatim source text}

Return an empty items array if the filing discusses none. No markdown fences, no commentary."#;

/// Build the entity-verification prompt
pub fn build_entity_prompt(entities: &[Entity], exhibit: &str) -> String {
    let names = entities
        .iter()
        .map(|e| format!("- {}", e.name))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Verify the following extracted entities against the subsidiary exhibit.

## Extracted Entities

{names}

## Subsidiary Exhibit

{exhibit}

---

Return the JSON object described in your instructions, one item per extracted entity."#
    )
}

/// Build the debt-verification prompt
pub fn build_debt_prompt(instruments: &[DebtInstrument], footnote: &str) -> String {
    let listed = instruments
        .iter()
        .map(|i| {
            format!(
                "- {} (issuer: {}, extracted outstanding: {} minor units)",
                i.name, i.issuer, i.outstanding_minor
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Locate the footnote passage for each of the following instruments.

## Extracted Instruments

{listed}

## Debt Footnote

{footnote}

---

Return the JSON object described in your instructions, one item per instrument."#
    )
}

/// Build the completeness-review prompt
pub fn build_completeness_prompt(record_summary: &str, content: &str) -> String {
    format!(
        r#"List the entities and debt instruments this filing content mentions.

## Extracted Record (for reference)

{record_summary}

## Filing Content

{content}

---

Return the JSON object described in your instructions."#
    )
}

/// Build the holdco-plausibility prompt
pub fn build_structure_prompt(company: &str, root_name: &str, content: &str) -> String {
    format!(
        r#"The record for {company} designates "{root_name}" as the ultimate parent. Judge whether the filing content supports that designation.

## Filing Content

{content}

---

Return the JSON object described in your instructions."#
    )
}

/// Build the JV/VIE prompt
pub fn build_jv_vie_prompt(company: &str, content: &str) -> String {
    format!(
        r#"List every joint venture, variable interest entity, and partially owned entity this filing content discusses for {company}.

## Filing Content

{content}

---

Return the JSON object described in your instructions."#
    )
}
