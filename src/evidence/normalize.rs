//! Quote normalization and deduplication.
//!
//! Quotes and page text are compared in a canonical form: whitespace runs
//! collapsed to a single space, leading/trailing whitespace dropped, every
//! char lowercased. Several evidence items citing the same text share one
//! key, so each distinct string is searched only once.

use std::collections::BTreeMap;

use crate::domain::EvidenceItem;

/// Lowercase a single char, appending every char of its lowercase form
fn push_lowercase(out: &mut String, c: char) {
    out.extend(c.to_lowercase());
}

/// Normalize a quote into its search key.
///
/// Returns `None` for empty or whitespace-only input.
pub fn normalize_quote(quote: &str) -> Option<String> {
    let mut key = String::with_capacity(quote.len());
    for (i, word) in quote.split_whitespace().enumerate() {
        if i > 0 {
            key.push(' ');
        }
        for c in word.chars() {
            push_lowercase(&mut key, c);
        }
    }

    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Map of normalized quote key -> labels citing it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteIndex {
    keys: BTreeMap<String, Vec<String>>,
    quoted_items: usize,
}

impl QuoteIndex {
    /// Build the index from an evidence list. Labels keep evidence order.
    pub fn build(evidence: &[EvidenceItem]) -> Self {
        let mut index = Self::default();
        for item in evidence {
            if let Some(key) = item.quote.as_deref().and_then(normalize_quote) {
                index.keys.entry(key).or_default().push(item.label.clone());
                index.quoted_items += 1;
            }
        }
        index
    }

    /// Distinct keys to search for
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Labels citing `key`
    pub fn labels(&self, key: &str) -> &[String] {
        self.keys.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of evidence items that carried a usable quote
    pub fn quoted_items(&self) -> usize {
        self.quoted_items
    }
}
