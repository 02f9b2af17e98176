//! Page geometry: glyph boxes and highlight quadrilaterals.
//!
//! All coordinates are in PDF user space, y increasing upward.

use serde::{Deserialize, Serialize};

/// An axis-aligned box `(x0, y0, x1, y1)` with `x0 <= x1` and `y0 <= y1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a box, normalizing corner order
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box enclosing every point
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self {
            x0: x,
            y0: y,
            x1: x,
            y1: y,
        };
        for (x, y) in iter {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    /// Envelope of two boxes
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Highlight quadrilateral in QuadPoints order:
    /// top-left, top-right, bottom-left, bottom-right
    pub fn to_quad(&self) -> Quad {
        [
            self.x0, self.y1, self.x1, self.y1, self.x0, self.y0, self.x1, self.y0,
        ]
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// Eight numbers describing one highlighted region
pub type Quad = [f32; 8];

/// Bounding rectangle over the coordinates of a group of quads
pub fn quads_bounds(quads: &[Quad]) -> Option<BBox> {
    BBox::from_points(
        quads
            .iter()
            .flat_map(|q| q.chunks_exact(2).map(|p| (p[0], p[1]))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let b = BBox::new(10.0, 20.0, 5.0, 2.0);
        assert_eq!(b.to_array(), [5.0, 2.0, 10.0, 20.0]);
    }

    #[test]
    fn test_to_quad_corner_order() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(b.to_quad(), [1.0, 4.0, 3.0, 4.0, 1.0, 2.0, 3.0, 2.0]);
    }

    #[test]
    fn test_quads_bounds() {
        let quads = vec![
            BBox::new(10.0, 700.0, 200.0, 712.0).to_quad(),
            BBox::new(10.0, 680.0, 90.0, 692.0).to_quad(),
        ];
        let bounds = quads_bounds(&quads).unwrap();
        assert_eq!(bounds.to_array(), [10.0, 680.0, 200.0, 712.0]);

        assert!(quads_bounds(&[]).is_none());
    }
}
