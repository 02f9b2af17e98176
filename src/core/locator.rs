//! Occurrence search over a page's normalized text.
//!
//! Every occurrence of a key is reported, including overlapping ones: after a
//! hit at `i` the scan resumes at `i + 1`. Hits are mapped back through the
//! page's correspondence table to the boxes of the glyphs they cover.

use crate::domain::BBox;
use crate::layout::PageTextIndex;

/// One occurrence of a key on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Start offset in the page's normalized text
    pub start: usize,

    /// Boxes of the covered glyphs, markers excluded, in text order
    pub boxes: Vec<BBox>,
}

/// Find all (possibly overlapping) start offsets of `needle` in `haystack`
pub fn find_overlapping(haystack: &[char], needle: &[char]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(i, _)| i)
        .collect()
}

/// Locate every occurrence of a normalized key on a page.
///
/// Occurrences whose covered glyphs are all markers are dropped.
pub fn locate(index: &PageTextIndex, key: &[char]) -> Vec<Occurrence> {
    let correspondence = index.correspondence();

    find_overlapping(index.normalized_chars(), key)
        .into_iter()
        .filter_map(|start| {
            let mut boxes = Vec::new();
            let mut last_original = None;

            for &original in &correspondence[start..start + key.len()] {
                // Expanded lowercase forms repeat an original index
                if last_original == Some(original) {
                    continue;
                }
                last_original = Some(original);

                if let Some(bbox) = index.geometry_at(original) {
                    boxes.push(bbox);
                }
            }

            if boxes.is_empty() {
                None
            } else {
                Some(Occurrence { start, boxes })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutNode, TextUnit};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn page(text: &str) -> PageTextIndex {
        let units = text.chars().enumerate().map(|(i, ch)| TextUnit {
            ch,
            bbox: Some(BBox::new(i as f32, 0.0, i as f32 + 1.0, 10.0)),
        });
        PageTextIndex::from_units(units)
    }

    #[test]
    fn test_find_overlapping() {
        assert_eq!(find_overlapping(&chars("aaaa"), &chars("aa")), vec![0, 1, 2]);
        assert_eq!(find_overlapping(&chars("abcabc"), &chars("abc")), vec![0, 3]);
        assert!(find_overlapping(&chars("abc"), &chars("")).is_empty());
        assert!(find_overlapping(&chars("ab"), &chars("abc")).is_empty());
    }

    #[test]
    fn test_locate_maps_to_boxes() {
        let index = page("Total Due: 42");
        let hits = locate(&index, &chars("due: 42"));

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, 6);
        assert_eq!(hits[0].boxes.len(), 7);
        assert_eq!(hits[0].boxes[0].x0, 6.0);
    }

    #[test]
    fn test_locate_skips_marker_geometry() {
        let page = LayoutNode::Container(vec![
            LayoutNode::glyph('a', BBox::new(0.0, 0.0, 5.0, 10.0)),
            LayoutNode::Marker('\n'),
            LayoutNode::glyph('b', BBox::new(0.0, -12.0, 5.0, -2.0)),
        ]);
        let index = PageTextIndex::build(&page);
        let hits = locate(&index, &chars("a b"));

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].boxes.len(), 2);
    }

    #[test]
    fn test_locate_marker_only_occurrence_dropped() {
        let page = LayoutNode::Container(vec![
            LayoutNode::glyph('a', BBox::new(0.0, 0.0, 5.0, 10.0)),
            LayoutNode::Marker(' '),
            LayoutNode::glyph('b', BBox::new(9.0, 0.0, 14.0, 10.0)),
        ]);
        let index = PageTextIndex::build(&page);
        assert!(locate(&index, &chars(" ")).is_empty());
    }

    #[test]
    fn test_locate_expanded_lowercase_single_box() {
        let index = page("İx");
        let key: Vec<char> = "İx".to_lowercase().chars().collect();
        let hits = locate(&index, &key);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].boxes.len(), 2);
    }
}
