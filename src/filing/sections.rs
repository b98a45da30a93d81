//! Debt-section windowing for oversized filings
//!
//! Naive truncation at a character limit regularly cuts a debt footnote in
//! half. Instead, oversized content is reduced to fixed-size windows around
//! debt-disclosure keyword hits, merged where they overlap and emitted in
//! document order.

use regex::Regex;
use std::sync::LazyLock;

/// Priority patterns that anchor debt-relevant excerpt windows.
static DEBT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Numbered footnote headings: "NOTE 9. LONG-TERM DEBT"
        r"(?i)\bnote\s+\d+[.:\s-]*\s*(?:long-term\s+|short-term\s+)?(?:debt|borrowings|financing)",
        // Instrument titles: "6.625% Senior Notes due 2025"
        r"(?i)\d+(?:\.\d+)?\s*%\s+(?:[a-z]+\s+){0,4}(?:notes|debentures|bonds)\s+due",
        r"(?i)\bcredit\s+(?:agreement|facilit(?:y|ies))",
        r"(?i)\bterm\s+loan",
        r"(?i)\brevolving\s+(?:credit|loan|facility)",
        r"(?i)\bindentures?\b",
        r"(?i)\baggregate\s+principal\s+amount",
        r"(?i)\b(?:long|short)-term\s+(?:debt|borrowings)",
        r"(?i)\bsenior\s+(?:secured\s+|subordinated\s+)?notes\b",
        r"(?i)\bcommercial\s+paper\b",
        r"(?i)\bfinance\s+lease\s+obligations?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// How far a window edge may travel to land on a line boundary.
const SNAP_SLACK: usize = 200;

/// Extract merged keyword-anchored windows of roughly `window_chars` each.
/// Returns an empty string when no debt keyword occurs.
pub fn debt_windows(text: &str, window_chars: usize) -> String {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let half = (window_chars / 2).max(1);
    for re in DEBT_PATTERNS.iter() {
        for m in re.find_iter(text) {
            let start = snap_backward(text, m.start().saturating_sub(half));
            let end = snap_forward(text, (m.start() + half).min(text.len()));
            spans.push((start, end));
        }
    }
    if spans.is_empty() {
        return String::new();
    }

    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    merged
        .iter()
        .map(|&(s, e)| text[s..e].trim())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Whether the text mentions any debt-disclosure keyword at all.
pub fn mentions_debt(text: &str) -> bool {
    DEBT_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Truncate at a char boundary without splitting a code point.
pub fn truncate_chars(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

/// Move a window start back to the beginning of its line, within slack.
fn snap_backward(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    let floor = i.saturating_sub(SNAP_SLACK);
    match text[..i].rfind('\n') {
        Some(nl) if nl + 1 >= floor => nl + 1,
        _ => i,
    }
}

/// Move a window end forward to the end of its line, within slack.
fn snap_forward(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    let ceil = (i + SNAP_SLACK).min(text.len());
    match text[i..ceil].find('\n') {
        Some(nl) => i + nl,
        None => i,
    }
}
