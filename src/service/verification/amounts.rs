//! Dollar-amount scanning for debt verification
//!
//! Footnotes routinely state two amounts for one instrument: the original
//! issuance ("$3.8 billion aggregate principal amount issued in 2009") and
//! the current outstanding balance ("$520 million outstanding"). The record
//! carries current outstanding, so comparing against the issuance figure
//! produces false failures. Each scanned amount is classified by the cue
//! words in its own sentence and the outstanding amount is preferred.

use std::sync::LazyLock;

use regex::Regex;

static DOLLAR_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*(billion|million|thousand|bn|mm|mn)?\b")
        .unwrap()
});

const OUTSTANDING_CUES: &[&str] = &["outstanding", "carrying value", "carrying amount", "balance"];
const ISSUED_CUES: &[&str] = &[
    "issued",
    "issuance",
    "aggregate principal amount",
    "original principal",
];

/// How the surrounding sentence characterizes an amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AmountClass {
    Outstanding,
    Issued,
    Unclassified,
}

#[derive(Debug, Clone)]
pub(crate) struct ScannedAmount {
    /// Minor currency units (cents)
    pub minor: i64,
    pub class: AmountClass,
}

/// Scan a passage for dollar amounts, in document order, each classified by
/// its sentence.
pub(crate) fn scan_amounts(passage: &str) -> Vec<ScannedAmount> {
    let mut amounts = Vec::new();
    for capture in DOLLAR_AMOUNT.captures_iter(passage) {
        let Some(full) = capture.get(0) else { continue };
        let number = capture.get(1).map_or("", |m| m.as_str());
        let scale = capture.get(2).map(|m| m.as_str());
        let Some(minor) = to_minor(number, scale) else {
            continue;
        };
        let sentence = sentence_around(passage, full.start(), full.end());
        amounts.push(ScannedAmount {
            minor,
            class: classify(sentence),
        });
    }
    amounts
}

/// The amount a record's outstanding figure should be compared against:
/// the first outstanding amount, else the first unclassified one, else the
/// issuance figure as a last resort.
pub(crate) fn comparison_amount(passage: &str) -> Option<i64> {
    let amounts = scan_amounts(passage);
    for wanted in [
        AmountClass::Outstanding,
        AmountClass::Unclassified,
        AmountClass::Issued,
    ] {
        if let Some(amount) = amounts.iter().find(|a| a.class == wanted) {
            return Some(amount.minor);
        }
    }
    None
}

/// Integer tolerance comparison. `tolerance_pct` is a percentage of the
/// reference amount.
pub(crate) fn within_tolerance(extracted: i64, reference: i64, tolerance_pct: f64) -> bool {
    if reference == 0 {
        return extracted == 0;
    }
    let tolerance_bps = (tolerance_pct * 100.0).round() as i128;
    let difference = (extracted as i128 - reference as i128).abs();
    difference * 10_000 <= (reference as i128).abs() * tolerance_bps
}

fn to_minor(number: &str, scale: Option<&str>) -> Option<i64> {
    let cleaned = number.replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    let multiplier = match scale.map(str::to_lowercase).as_deref() {
        Some("billion") | Some("bn") => 1e9,
        Some("million") | Some("mm") | Some("mn") => 1e6,
        Some("thousand") => 1e3,
        _ => 1.0,
    };
    // Footnote magnitudes stay far below 2^53, so the rounding is exact
    let minor = value * multiplier * 100.0;
    (minor.is_finite() && minor.abs() < 9.0e18).then_some(minor.round() as i64)
}

fn classify(sentence: &str) -> AmountClass {
    let lower = sentence.to_lowercase();
    if OUTSTANDING_CUES.iter().any(|cue| lower.contains(cue)) {
        AmountClass::Outstanding
    } else if ISSUED_CUES.iter().any(|cue| lower.contains(cue)) {
        AmountClass::Issued
    } else {
        AmountClass::Unclassified
    }
}

/// The sentence containing `[start, end)`, clipped at sentence breaks on
/// either side and capped so runaway unpunctuated text stays cheap.
fn sentence_around(text: &str, start: usize, end: usize) -> &str {
    const CAP: usize = 300;
    let bytes = text.as_bytes();

    let floor = start.saturating_sub(CAP);
    let mut from = floor;
    for i in (floor..start).rev() {
        if is_sentence_break(bytes, i) {
            from = i + 1;
            break;
        }
    }
    while from < text.len() && !text.is_char_boundary(from) {
        from += 1;
    }

    let ceiling = (end + CAP).min(text.len());
    let mut to = ceiling;
    for i in end.min(text.len())..ceiling {
        if is_sentence_break(bytes, i) {
            to = i;
            break;
        }
    }
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }

    &text[from..to]
}

fn is_sentence_break(bytes: &[u8], i: usize) -> bool {
    match bytes[i] {
        b';' | b'\n' => true,
        // A period ends a sentence only before whitespace; the decimal
        // point in "7.5% Senior Notes" stays inside it
        b'.' => i + 1 >= bytes.len() || bytes[i + 1].is_ascii_whitespace(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_to_minor_units() {
        assert_eq!(to_minor("3.8", Some("billion")), Some(380_000_000_000));
        assert_eq!(to_minor("520", Some("million")), Some(52_000_000_000));
        assert_eq!(to_minor("750", Some("thousand")), Some(75_000_000));
        assert_eq!(to_minor("4,200", None), Some(420_000));
    }

    #[test]
    fn test_issued_vs_outstanding_classification() {
        let passage = "The Company issued $3.8 billion aggregate principal amount of the \
            Notes in 2009. As of December 31, 2023, $520 million was outstanding.";
        let amounts = scan_amounts(passage);
        assert_eq!(amounts.len(), 2);
        assert_eq!(amounts[0].class, AmountClass::Issued);
        assert_eq!(amounts[0].minor, 380_000_000_000);
        assert_eq!(amounts[1].class, AmountClass::Outstanding);
        assert_eq!(amounts[1].minor, 52_000_000_000);
    }

    #[test]
    fn test_comparison_prefers_outstanding_over_issuance() {
        let passage = "$3.8 billion aggregate principal amount issued in 2009. \
            $520 million outstanding.";
        assert_eq!(comparison_amount(passage), Some(52_000_000_000));
    }

    #[test]
    fn test_comparison_falls_back_when_only_issuance_stated() {
        let passage = "The Company issued $1.5 billion aggregate principal amount of notes.";
        assert_eq!(comparison_amount(passage), Some(150_000_000_000));
    }

    #[test]
    fn test_unclassified_beats_issuance() {
        let passage = "Notes issued at par for $2.0 billion. The facility totals $450 million.";
        assert_eq!(comparison_amount(passage), Some(45_000_000_000));
    }

    #[test]
    fn test_no_amounts_yields_none() {
        assert_eq!(comparison_amount("The Notes bear interest semi-annually."), None);
    }

    #[test]
    fn test_tolerance_bands() {
        // ±10% of $520M
        assert!(within_tolerance(52_000_000_000, 52_000_000_000, 10.0));
        assert!(within_tolerance(47_000_000_000, 52_000_000_000, 10.0));
        assert!(!within_tolerance(40_000_000_000, 52_000_000_000, 10.0));
        assert!(within_tolerance(0, 0, 10.0));
        assert!(!within_tolerance(1, 0, 10.0));
    }

    #[test]
    fn test_sentence_clipping_keeps_cues_apart() {
        // The issuance sentence must not leak the later "outstanding" cue.
        let passage = "Issued $900 million in 2019. Balance of $340 million.";
        let amounts = scan_amounts(passage);
        assert_eq!(amounts[0].class, AmountClass::Issued);
        assert_eq!(amounts[1].class, AmountClass::Outstanding);
    }

    #[test]
    fn test_decimal_rate_does_not_end_the_sentence() {
        let passage =
            "As of December 31, 2025, $520 million of the 7.5% Senior Notes due 2030 \
             remained outstanding.";
        let amounts = scan_amounts(passage);
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].class, AmountClass::Outstanding);
    }
}
