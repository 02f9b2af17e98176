//! Text layout: positioned glyphs per page and the searchable page index.
//!
//! A page's text layer is a tree of [`LayoutNode`]s. Leaves are glyphs with a
//! bounding box or markers standing for inferred whitespace (word gaps, line
//! breaks) that have no geometry of their own. Containers group lines and
//! blocks in reading order.
//!
//! Documents expose their pages through the [`TextLayer`] trait; the PDF
//! backend lives in [`pdf`].

mod encoding;
pub mod fonts;
pub mod index;
pub mod pdf;

use thiserror::Error;

use crate::domain::BBox;

pub use index::PageTextIndex;
pub use pdf::{LayoutOptions, PdfDocument};

/// Errors raised while reading a document's text layer
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Page {0} is out of range")]
    PageOutOfRange(usize),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Malformed page content: {0}")]
    Malformed(String),
}

/// One node of a page's layout tree
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    /// A rendered character with its box
    Glyph { ch: char, bbox: BBox },
    /// Inferred whitespace (`' '` between words, `'\n'` after a line)
    Marker(char),
    /// Ordered children (page, block, line)
    Container(Vec<LayoutNode>),
}

impl LayoutNode {
    pub fn glyph(ch: char, bbox: BBox) -> Self {
        LayoutNode::Glyph { ch, bbox }
    }

    /// Walk the tree in reading order, yielding terminal units
    pub fn units(&self) -> Units<'_> {
        Units {
            stack: vec![std::slice::from_ref(self).iter()],
        }
    }
}

/// A terminal unit of the layout tree; `bbox` is `None` for markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextUnit {
    pub ch: char,
    pub bbox: Option<BBox>,
}

/// Iterative pre-order traversal over a layout tree
pub struct Units<'a> {
    stack: Vec<std::slice::Iter<'a, LayoutNode>>,
}

impl<'a> Iterator for Units<'a> {
    type Item = TextUnit;

    fn next(&mut self) -> Option<TextUnit> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(LayoutNode::Glyph { ch, bbox }) => {
                    return Some(TextUnit {
                        ch: *ch,
                        bbox: Some(*bbox),
                    })
                }
                Some(LayoutNode::Marker(ch)) => {
                    return Some(TextUnit { ch: *ch, bbox: None })
                }
                Some(LayoutNode::Container(children)) => {
                    self.stack.push(children.iter());
                }
            }
        }
    }
}

/// A document viewed as a sequence of page layouts
pub trait TextLayer {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Layout tree of one page (0-based)
    fn page_layout(&self, page: usize) -> Result<LayoutNode, LayoutError>;
}

impl TextLayer for [LayoutNode] {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_layout(&self, page: usize) -> Result<LayoutNode, LayoutError> {
        self.get(page).cloned().ok_or(LayoutError::PageOutOfRange(page))
    }
}

impl TextLayer for Vec<LayoutNode> {
    fn page_count(&self) -> usize {
        self.as_slice().page_count()
    }

    fn page_layout(&self, page: usize) -> Result<LayoutNode, LayoutError> {
        self.as_slice().page_layout(page)
    }
}
