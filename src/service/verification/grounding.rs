//! Evidence grounding for model-assisted checks
//!
//! A verifying model can hallucinate corroboration just as easily as an
//! extracting model can hallucinate data, so every claim of corroboration
//! must carry a verbatim excerpt, and the excerpt must actually occur in the
//! source before it counts. Minor whitespace and punctuation drift is
//! tolerated; paraphrase of more than ~30% of the excerpt is not.

use crate::normalize::normalize_whitespace;

/// Fraction of the excerpt that must survive matching.
const MATCH_RATIO: f32 = 0.70;

/// Whether an evidence excerpt occurs in the source.
///
/// Tried in order: exact containment after whitespace normalization and
/// lowercasing, a contiguous word-run match covering at least 70% of the
/// excerpt's words, then a 70% in-order word-subsequence match (absorbs
/// punctuation drift like "7.5%" vs "7.5 %").
pub(crate) fn excerpt_grounded(excerpt: &str, source: &str) -> bool {
    let excerpt_norm = normalize_whitespace(excerpt).to_lowercase();
    if excerpt_norm.is_empty() {
        return false;
    }
    let source_norm = normalize_whitespace(source).to_lowercase();
    if source_norm.contains(&excerpt_norm) {
        return true;
    }
    contiguous_run_present(&excerpt_norm, &source_norm)
        || words_in_order_present(&excerpt_norm, &source_norm)
}

/// Some contiguous run of at least 70% of the excerpt's words occurs in the
/// source as a phrase. Catches the model tacking an introduction or citation
/// onto an otherwise verbatim quote.
fn contiguous_run_present(excerpt: &str, source: &str) -> bool {
    let words: Vec<&str> = excerpt.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let min_run = ((words.len() as f32) * MATCH_RATIO).ceil() as usize;
    for run_len in (min_run..=words.len()).rev() {
        for start in 0..=(words.len() - run_len) {
            let phrase = words[start..start + run_len].join(" ");
            if source.contains(&phrase) {
                return true;
            }
        }
    }
    false
}

/// At least 70% of the excerpt's words appear in the source in order.
fn words_in_order_present(excerpt: &str, source: &str) -> bool {
    let excerpt_words: Vec<String> = excerpt
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();
    if excerpt_words.is_empty() {
        return false;
    }
    let source_words: Vec<String> = source
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();

    let mut source_idx = 0;
    let mut matched = 0;
    for word in &excerpt_words {
        while source_idx < source_words.len() {
            let hit = source_words[source_idx] == *word;
            source_idx += 1;
            if hit {
                matched += 1;
                break;
            }
        }
    }
    (matched as f32 / excerpt_words.len() as f32) >= MATCH_RATIO
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "As of December 31, 2023, the Company had $520 million \
        aggregate principal amount of 6.625% Senior Notes due 2025 outstanding. \
        The Notes are guaranteed by Acme Finance LLC.";

    #[test]
    fn test_exact_quote_grounds() {
        assert!(excerpt_grounded(
            "$520 million aggregate principal amount of 6.625% Senior Notes due 2025 outstanding",
            SOURCE
        ));
    }

    #[test]
    fn test_whitespace_and_case_drift_tolerated() {
        assert!(excerpt_grounded(
            "the notes are   guaranteed by ACME Finance LLC.",
            SOURCE
        ));
    }

    #[test]
    fn test_quote_with_added_preamble_grounds() {
        // Model prepended its own framing to an otherwise verbatim run
        assert!(excerpt_grounded(
            "guaranteed by Acme Finance LLC",
            SOURCE
        ));
    }

    #[test]
    fn test_fabricated_evidence_rejected() {
        assert!(!excerpt_grounded(
            "the Company had no outstanding indebtedness of any kind whatsoever at year end",
            SOURCE
        ));
    }

    #[test]
    fn test_empty_excerpt_rejected() {
        assert!(!excerpt_grounded("   ", SOURCE));
    }

    #[test]
    fn test_punctuation_drift_matches_by_subsequence() {
        assert!(excerpt_grounded(
            "the Company had $520 million aggregate principal amount of 6.625 % Senior Notes due 2025, outstanding",
            SOURCE
        ));
    }
}
