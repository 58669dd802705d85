//! Axis-aligned rectangle arithmetic in page points.
//!
//! The working frame is top-left origin (y grows downward), matching OCR
//! output. `to_pdf_rect` converts back to the PDF bottom-left frame for the
//! widget writer.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `{x, y, width, height}` in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from two corners (`x1,y1` top-left, `x2,y2` bottom-right).
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Area, or 0.0 for degenerate boxes.
    pub fn area(&self) -> f32 {
        if self.has_positive_size() {
            self.width * self.height
        } else {
            0.0
        }
    }

    pub fn has_positive_size(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Intersection area: `max(0, minRight − maxLeft) × max(0, minBottom − maxTop)`.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let overlap_w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let overlap_h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        overlap_w * overlap_h
    }

    /// Intersection as a percentage of the smaller box's area.
    ///
    /// Symmetric in its arguments. Returns 0.0 when either box is degenerate.
    pub fn overlap_pct(&self, other: &BoundingBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / smaller * 100.0
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_coords(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Round every coordinate to 2 decimal places for stable serialization.
    pub fn rounded(&self) -> BoundingBox {
        BoundingBox::new(
            round2(self.x),
            round2(self.y),
            round2(self.width),
            round2(self.height),
        )
    }

    /// Multiply every coordinate (pixel → point conversion and the like).
    pub fn scaled(&self, factor: f32) -> BoundingBox {
        BoundingBox::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Convert to a PDF `[llx, lly, urx, ury]` rectangle (bottom-left origin).
    pub fn to_pdf_rect(&self, page_height: f32) -> [f32; 4] {
        [
            self.x,
            page_height - self.bottom(),
            self.right(),
            page_height - self.y,
        ]
    }
}

/// Round to 2 decimal places.
#[inline]
pub fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
