//! Per-page search index with back-references to glyph geometry.
//!
//! The page text is flattened into `original` chars with a parallel
//! `geometry` list (one entry per char, `None` for markers). The searchable
//! `normalized` text collapses whitespace runs and lowercases; every
//! normalized char records the original index it came from, so a match in
//! normalized space maps straight back to glyph boxes.

use crate::domain::BBox;

use super::{LayoutNode, TextUnit};

/// Searchable text of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTextIndex {
    original: Vec<char>,
    geometry: Vec<Option<BBox>>,
    normalized: Vec<char>,
    correspondence: Vec<usize>,
}

impl PageTextIndex {
    /// Index a page's layout tree
    pub fn build(page: &LayoutNode) -> Self {
        Self::from_units(page.units())
    }

    /// Index a sequence of terminal units in reading order
    pub fn from_units(units: impl IntoIterator<Item = TextUnit>) -> Self {
        let mut original = Vec::new();
        let mut geometry = Vec::new();

        for unit in units {
            match unit.bbox {
                Some(bbox) => {
                    original.push(unit.ch);
                    geometry.push(Some(bbox));
                }
                None => {
                    original.push(' ');
                    geometry.push(None);
                }
            }
        }

        let (normalized, correspondence) = normalize_with_correspondence(&original);

        Self {
            original,
            geometry,
            normalized,
            correspondence,
        }
    }

    /// Concatenated page text, markers rendered as spaces
    pub fn original_text(&self) -> String {
        self.original.iter().collect()
    }

    /// Whitespace-collapsed, lowercased page text
    pub fn normalized_text(&self) -> String {
        self.normalized.iter().collect()
    }

    pub fn normalized_chars(&self) -> &[char] {
        &self.normalized
    }

    /// `correspondence()[i]` is the original index of normalized char `i`
    pub fn correspondence(&self) -> &[usize] {
        &self.correspondence
    }

    /// Box of the original char at `index`; `None` for markers
    pub fn geometry_at(&self, index: usize) -> Option<BBox> {
        self.geometry.get(index).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Collapse whitespace and lowercase, recording where each output char came from.
///
/// A whitespace run becomes one space pointing at the run's first char;
/// leading whitespace is dropped. A char with a multi-char lowercase form
/// emits every char, each pointing at the same original index.
fn normalize_with_correspondence(original: &[char]) -> (Vec<char>, Vec<usize>) {
    let mut normalized = Vec::with_capacity(original.len());
    let mut correspondence = Vec::with_capacity(original.len());

    let mut i = 0;
    while i < original.len() {
        let c = original[i];
        if c.is_whitespace() {
            if normalized.last().map_or(false, |&last| last != ' ') {
                normalized.push(' ');
                correspondence.push(i);
            }
            i += 1;
            while i < original.len() && original[i].is_whitespace() {
                i += 1;
            }
        } else {
            for lower in c.to_lowercase() {
                normalized.push(lower);
                correspondence.push(i);
            }
            i += 1;
        }
    }

    (normalized, correspondence)
}
