//! Grouping of matched glyph boxes into per-line highlight regions.

use crate::domain::{BBox, Quad};

/// Default vertical tolerance, in PDF units, for two boxes to share a line
pub const DEFAULT_LINE_TOLERANCE: f32 = 5.0;

/// Cluster boxes into visual lines and emit one quad per line.
///
/// Boxes are sorted by top edge, highest first. A box joins the open line
/// while its top edge is within `tolerance` of the line's first box;
/// otherwise it opens a new line. Each line becomes the quad of its
/// enveloping rectangle.
pub fn group_lines(boxes: &[BBox], tolerance: f32) -> Vec<Quad> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by(|a, b| b.y1.total_cmp(&a.y1));

    let mut quads = Vec::new();
    let mut line: Option<(f32, BBox)> = None;

    for bbox in sorted {
        line = match line {
            Some((top, envelope)) if (bbox.y1 - top).abs() <= tolerance => {
                Some((top, envelope.union(&bbox)))
            }
            Some((_, envelope)) => {
                quads.push(envelope.to_quad());
                Some((bbox.y1, bbox))
            }
            None => Some((bbox.y1, bbox)),
        };
    }

    if let Some((_, envelope)) = line {
        quads.push(envelope.to_quad());
    }

    quads
}
