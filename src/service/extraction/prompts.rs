//! Prompts for structured debt extraction

use crate::model::{ExtractedRecord, ExtractionRecord, FixTarget};

/// System prompt for the full structured extraction call
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a corporate-debt analyst. Your task is structured extraction: read SEC filing content and produce the company's legal-entity structure and debt instruments as a single JSON object.

## Critical Rules

1. **Report individual instruments, never aggregated totals.**
   - "6.625% Senior Notes due 2025" → one instrument
   - "Total long-term debt of $4.2 billion" → NOT an instrument (aggregate line)
   - A credit facility and the term loan drawn under it are separate instruments if both are disclosed.

2. **All amounts are integers in minor currency units (cents).**
   - "$520 million outstanding" → 52000000000
   - Report the current outstanding amount, never the original issuance amount.
   - All rates are integers in basis points: "6.625%" → 662 (round to the nearest basis point).
   - Ownership stakes are integers in basis points of equity: a wholly owned subsidiary → 10000.

3. **Cross-references are exact names.**
   - Every instrument's issuer and every guarantor must repeat, character for character, the name of an entity in the entities array.
   - Every owner named in an entity's owners array must likewise appear as an entity.

4. **Exactly one entity is the ultimate parent (holdco).**
   - Give it an empty owners array: "owners": [].
   - An entity whose parent the filing does not disclose gets "owners": null.
   - Every other entity lists its owner(s) with stakes where disclosed.

5. **Preserve joint ventures and variable interest entities.**
   - A partially owned entity keeps its real stake, never rounded up to full ownership.
   - Set is_vie true and the stated consolidation method where the filing identifies a VIE.

## Output Requirements

- Return exactly one JSON object matching the schema below. No markdown fences, no commentary before or after.
- Use null for unknown optional fields rather than guessing.
- Dates are ISO format YYYY-MM-DD.
- Currency is the ISO 4217 code, e.g. "USD".
"#;

/// System prompt for the targeted fix call
pub const FIX_SYSTEM_PROMPT: &str = r#"You are a corporate-debt analyst performing a targeted fix of a previously extracted record. Reviewers have flagged specific problems; your task is to correct exactly those problems.

## Critical Rules

1. **Correct only what the findings flag.** Fields not implicated by a finding must be returned unchanged, character for character. Do not re-extract the record from scratch.
2. **Return the complete corrected record**, not a diff and not only the changed fields.
3. The corrected record obeys the same conventions as the original extraction: individual instruments, integer amounts in minor currency units (cents), integer rates in basis points, exact-name cross-references, exactly one entity with an empty owners array.
4. Where a finding says a value could not be corroborated, re-read the supplied source excerpts before changing it. If the source supports the current value, keep it.

## Output Requirements

- Return exactly one JSON object matching the schema below. No markdown fences, no commentary before or after.
"#;

fn schema_json() -> String {
    let schema = schemars::schema_for!(ExtractedRecord);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Extraction system prompt with the target schema attached
pub fn extraction_preamble() -> String {
    format!(
        "{EXTRACTION_SYSTEM_PROMPT}\n## Target Schema\n\n{}",
        schema_json()
    )
}

/// Fix system prompt with the target schema attached
pub fn fix_preamble() -> String {
    format!("{FIX_SYSTEM_PROMPT}\n## Target Schema\n\n{}", schema_json())
}

/// Build the full-extraction prompt from prepared filing content
pub fn build_extraction_prompt(company: &str, content: &str) -> String {
    format!(
        r#"Extract the legal-entity structure and debt instruments of {company} from the following filing content.

## Filing Content

{content}

---

Return a single JSON object with:
- company: the company name
- entities: every legal entity, the ultimate parent with "owners": []
- instruments: every individual debt instrument with its current outstanding amount in cents

Return only the JSON object."#
    )
}

/// Build the targeted-fix prompt from the current candidate and the
/// verification findings
pub fn build_fix_prompt(
    company: &str,
    candidate: &ExtractionRecord,
    target: &FixTarget,
    source_excerpts: &str,
) -> String {
    let candidate_json = serde_json::to_string_pretty(candidate).unwrap_or_default();
    let findings = target
        .items
        .iter()
        .map(|item| format!("- [{:?}/{:?}] {}", item.kind, item.verdict, item.finding))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The extracted record for {company} below failed verification. Correct it.

## Current Record

{candidate_json}

## Verification Findings

{findings}

## Source Excerpts

{source_excerpts}

---

Return the complete corrected record as a single JSON object. Change only what the findings require; leave every other field exactly as it is."#
    )
}

/// Addendum appended to the retry prompt after an unparseable reply
pub fn malformed_retry_addendum(reason: &str) -> String {
    format!(
        r#"

---

Your previous reply could not be parsed: {reason}.
Return only a single valid JSON object. No markdown fences, no trailing commas, no single quotes, no text before or after the object. If you are running out of space, omit the least important instruments rather than truncating mid-object."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CheckKind, FixItem, Verdict};

    #[test]
    fn test_preamble_embeds_schema() {
        let preamble = extraction_preamble();
        assert!(preamble.contains("## Target Schema"));
        assert!(preamble.contains("outstanding_minor"));
        assert!(preamble.contains("structured extraction"));
    }

    #[test]
    fn test_fix_prompt_carries_findings_verbatim() {
        let record = ExtractionRecord {
            company: "Acme".to_string(),
            entities: vec![],
            instruments: vec![],
        };
        let target = FixTarget {
            items: vec![FixItem {
                kind: CheckKind::DebtVerification,
                verdict: Verdict::Fail,
                finding: "instrument 'Term Loan B' amount 120000000000 not found near any footnote amount".to_string(),
            }],
        };
        let prompt = build_fix_prompt("Acme", &record, &target, "footnote text");
        assert!(prompt.contains("amount 120000000000 not found"));
        assert!(prompt.contains("## Source Excerpts"));
    }
}
