//! Name normalization for cross-reference resolution
//!
//! Extracted records reference entities by name, not by durable identifier.
//! Legal names vary in case, punctuation and spacing between the entity list,
//! the subsidiary exhibit and the debt footnotes, so every comparison goes
//! through the same normalization.

/// Normalize an entity or company name for comparison.
///
/// Lowercases, replaces punctuation with spaces, collapses runs of whitespace.
/// "Transocean Ltd." and "TRANSOCEAN LTD" normalize to the same key, as do
/// "Altice USA, Inc." and "altice usa inc".
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Whether two names refer to the same entity after normalization.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// Collapse runs of whitespace to single spaces and trim.
///
/// Used before substring containment checks so that line wrapping and
/// indentation differences between filing text and model excerpts do not
/// defeat the comparison.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_punctuation_insensitive() {
        assert_eq!(
            normalize_name("Transocean Ltd."),
            normalize_name("TRANSOCEAN LTD")
        );
        assert_eq!(
            normalize_name("Altice USA, Inc."),
            normalize_name("altice usa inc")
        );
    }

    #[test]
    fn test_interior_punctuation_becomes_space() {
        assert_eq!(normalize_name("AT&T Inc."), "at t inc");
        assert_eq!(normalize_name("U.S. Steel"), "u s steel");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            normalize_name("  CSC  Holdings,   LLC "),
            "csc holdings llc"
        );
    }

    #[test]
    fn test_distinct_names_stay_distinct() {
        assert!(!names_match("Foo Corp", "Foo Corporation"));
        assert!(names_match("Foo Corp.", "foo corp"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  6.625%\n  Senior   Notes\tdue 2025 "),
            "6.625% Senior Notes due 2025"
        );
    }
}
