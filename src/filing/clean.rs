//! Filing text cleanup
//!
//! SEC filings arrive as HTML or inline-XBRL (XHTML) with heavy table markup.
//! Cleanup strips the markup to plain text while keeping paragraph boundaries
//! intact, because section windowing anchors on them.

use regex::Regex;
use std::sync::LazyLock;

static TAG_SOUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static NONVISIBLE_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|ix:header)\b.*?</\s*(script|style|ix:header)\s*>").unwrap()
});

static XBRL_ESCAPED_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&lt;/?[a-z][^&]*&gt;").unwrap());

/// Clean one raw filing document to plain text.
///
/// HTML and inline-XBRL markup is stripped; plain-text filings pass through
/// with whitespace normalization only. Paragraph breaks survive as blank
/// lines.
pub fn clean_filing_text(raw: &str) -> String {
    let text = if looks_like_markup(raw) {
        let scrubbed = NONVISIBLE_BLOCKS.replace_all(raw, " ");
        let converted =
            htmd::convert(&scrubbed).unwrap_or_else(|_| strip_tags(&scrubbed));
        decode_entities(&converted)
    } else {
        decode_entities(raw)
    };
    normalize_paragraphs(&text)
}

/// Cheap markup sniff. EDGAR plain-text filings contain angle brackets only
/// in rare tabular art, so a closing tag or doctype is the signal.
fn looks_like_markup(text: &str) -> bool {
    let head: String = text.chars().take(4096).collect();
    let lower = head.to_lowercase();
    lower.contains("</")
        || lower.contains("<html")
        || lower.contains("<!doctype")
        || lower.contains("<div")
        || lower.contains("<p>")
        || lower.contains("<ix:")
}

/// Last-resort tag removal when markdown conversion fails.
fn strip_tags(text: &str) -> String {
    TAG_SOUP.replace_all(text, " ").into_owned()
}

/// Decode the handful of entities that survive conversion in EDGAR documents.
fn decode_entities(text: &str) -> String {
    let text = XBRL_ESCAPED_TAGS.replace_all(text, " ");
    // `&amp;` last, so it cannot manufacture new decodable sequences
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&#8217;", "'")
        .replace("&#8220;", "\"")
        .replace("&#8221;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse horizontal whitespace per line and squeeze blank-line runs down
/// to a single paragraph break.
fn normalize_paragraphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            if blank_run > 0 {
                out.push_str("\n\n");
            } else {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(&collapsed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_stripped_to_text() {
        let raw = "<html><body><p>6.625% Senior Notes due 2025</p>\
                   <p>Outstanding: $520 million</p></body></html>";
        let cleaned = clean_filing_text(raw);
        assert!(cleaned.contains("6.625% Senior Notes due 2025"));
        assert!(cleaned.contains("Outstanding: $520 million"));
        assert!(!cleaned.contains('<'));
    }

    #[test]
    fn test_script_and_style_removed() {
        let raw = "<html><style>p { color: red }</style><script>var debt = 9;</script>\
                   <p>Credit Agreement</p></html>";
        let cleaned = clean_filing_text(raw);
        assert!(cleaned.contains("Credit Agreement"));
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.contains("var debt"));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let raw = "NOTE 9.  LONG-TERM DEBT\n\nThe Company had   $520 million outstanding.";
        let cleaned = clean_filing_text(raw);
        assert_eq!(
            cleaned,
            "NOTE 9. LONG-TERM DEBT\n\nThe Company had $520 million outstanding."
        );
    }

    #[test]
    fn test_paragraph_boundaries_preserved() {
        let raw = "First paragraph.\n\n\n\n\nSecond paragraph.";
        assert_eq!(
            clean_filing_text(raw),
            "First paragraph.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_entities_decoded() {
        let raw = "Senior&nbsp;Notes &amp; Debentures";
        assert_eq!(clean_filing_text(raw), "Senior Notes & Debentures");
    }
}
