//! Filing content preparation
//!
//! Callers hand over raw filing documents keyed by a `{form-type}_{date}`
//! naming convention (`10-K_2023-12-31`, `exhibit_21_2024-02-15`,
//! `indenture_{date}_{exhibit-id}`, `credit_agreement_{date}_{exhibit-id}`).
//! Preparation cleans each document, locates the subsidiary exhibit, combines
//! documents 10-K first, and windows oversized content down to the
//! debt-relevant excerpts.

mod clean;
mod sections;

use std::collections::BTreeMap;

use url::Url;

pub use clean::clean_filing_text;
pub use sections::{debt_windows, mentions_debt, truncate_chars};

/// One raw filing document plus where it came from.
#[derive(Debug, Clone)]
pub struct FilingDocument {
    pub content: String,
    pub source_url: Option<Url>,
}

/// The set of filings retrieved for one company.
#[derive(Debug, Clone, Default)]
pub struct FilingSet {
    documents: BTreeMap<String, FilingDocument>,
}

/// Cleaned, budgeted content handed to extraction and verification.
#[derive(Debug, Clone, Default)]
pub struct PreparedFiling {
    /// Combined cleaned content, 10-K first, windowed when oversized
    pub content: String,
    /// Cleaned subsidiary-exhibit text, empty string when the filing set has
    /// no exhibit-21-equivalent document
    pub exhibit: String,
    /// Debt-footnote excerpt windows, empty string when no debt disclosure
    /// was found
    pub footnote_excerpt: String,
}

impl PreparedFiling {
    pub fn has_exhibit(&self) -> bool {
        !self.exhibit.trim().is_empty()
    }

    pub fn has_footnotes(&self) -> bool {
        !self.footnote_excerpt.trim().is_empty()
    }
}

/// Ordering rank for document combination. Lower ranks are placed first and
/// survive budget trimming longer.
fn form_rank(key: &str) -> u8 {
    let k = key.to_lowercase();
    if k.starts_with("10-k") {
        0
    } else if k.starts_with("10-q") {
        1
    } else if k.starts_with("8-k") {
        2
    } else if k.starts_with("indenture") || k.starts_with("credit_agreement") {
        3
    } else {
        4
    }
}

fn is_exhibit_21_key(key: &str) -> bool {
    let k = key.to_lowercase();
    k.contains("exhibit_21") || k.contains("exhibit-21") || k.contains("ex21") || k.contains("ex-21")
}

impl FilingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<String>, source_url: Option<Url>) {
        self.documents.insert(
            key.into(),
            FilingDocument {
                content: content.into(),
                source_url,
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn get(&self, key: &str) -> Option<&FilingDocument> {
        self.documents.get(key)
    }

    pub fn source_url(&self, key: &str) -> Option<&Url> {
        self.documents.get(key).and_then(|d| d.source_url.as_ref())
    }

    /// The filing key holding the subsidiary exhibit, matched by substring
    /// because date suffixes vary. First match in key order wins.
    pub fn exhibit_21_key(&self) -> Option<&str> {
        self.documents
            .keys()
            .map(String::as_str)
            .find(|k| is_exhibit_21_key(k))
    }

    /// Keys in combination order: 10-K, 10-Q, 8-K, agreement exhibits, then
    /// the rest; newest first within a form type.
    pub fn ordered_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        keys.sort_by(|a, b| {
            form_rank(a)
                .cmp(&form_rank(b))
                .then_with(|| b.cmp(a))
        });
        keys
    }

    /// Clean, combine and budget the filing set.
    ///
    /// Content over `budget_chars` is reduced per document to keyword
    /// windows of `window_chars`. 10-K content is placed first and is the
    /// last to be trimmed. An entirely boilerplate filing produces empty
    /// content so that downstream checks skip instead of failing.
    pub fn prepare(&self, budget_chars: usize, window_chars: usize) -> PreparedFiling {
        let exhibit = self
            .exhibit_21_key()
            .and_then(|k| self.documents.get(k))
            .map(|d| clean_filing_text(&d.content))
            .unwrap_or_default();

        let mut cleaned: Vec<(&str, String)> = Vec::new();
        for key in self.ordered_keys() {
            if let Some(doc) = self.documents.get(key) {
                let text = clean_filing_text(&doc.content);
                if !text.trim().is_empty() {
                    cleaned.push((key, text));
                }
            }
        }

        let total: usize = cleaned.iter().map(|(_, t)| t.len()).sum();
        let oversized = total > budget_chars;

        let mut content = String::new();
        let mut remaining = budget_chars;
        for (key, text) in &cleaned {
            let section = if oversized {
                let windows = debt_windows(text, window_chars);
                if windows.is_empty() {
                    // No debt keywords; keep a head slice so the document is
                    // still represented
                    truncate_chars(text, window_chars).to_string()
                } else {
                    windows
                }
            } else {
                text.clone()
            };

            let keep = if form_rank(key) == 0 {
                // 10-K content is never dropped in favor of later documents
                section.as_str()
            } else {
                truncate_chars(&section, remaining)
            };
            if keep.trim().is_empty() {
                continue;
            }
            if !content.is_empty() {
                content.push_str("\n\n");
            }
            content.push_str(&format!("[Document: {key}]\n"));
            content.push_str(keep);
            remaining = remaining.saturating_sub(keep.len());
        }

        let footnote_excerpt = debt_windows(&content, window_chars);

        tracing::debug!(
            documents = self.documents.len(),
            combined_chars = content.len(),
            oversized,
            exhibit_found = !exhibit.is_empty(),
            footnote_chars = footnote_excerpt.len(),
            "Prepared filing content"
        );

        PreparedFiling {
            content,
            exhibit,
            footnote_excerpt,
        }
    }
}
