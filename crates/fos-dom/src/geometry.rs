//! Geometry APIs
//!
//! DOMRect, element sizes, and the layout boxes the window reports from.

use serde::{Deserialize, Serialize};

/// DOMRect - rectangle geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DOMRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DOMRect {
    /// Create empty rect
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with dimensions
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Top edge (same as y)
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Right edge
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Left edge (same as x)
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Width and height as a size
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Same rect moved by an offset
    pub fn translate(&self, dx: f64, dy: f64) -> DOMRect {
        DOMRect::from_xywh(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Check if point is inside
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Check if rects intersect
    pub fn intersects(&self, other: &DOMRect) -> bool {
        !(self.right() < other.x
            || self.x > other.right()
            || self.bottom() < other.y
            || self.y > other.bottom())
    }
}

/// Width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Edge thicknesses (padding or border)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    /// Same thickness on every edge
    pub fn uniform(v: f64) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Geometry the layout engine assigned to an element
///
/// `border_box` is in document coordinates; client rects subtract the
/// viewport scroll offset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutBox {
    pub border_box: DOMRect,
    pub padding: Insets,
    pub border: Insets,
}

impl LayoutBox {
    /// Border box only, no padding or border
    pub fn from_rect(border_box: DOMRect) -> Self {
        Self {
            border_box,
            ..Default::default()
        }
    }

    pub fn with_padding(mut self, padding: Insets) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_border(mut self, border: Insets) -> Self {
        self.border = border;
        self
    }

    /// Border-box size
    pub fn border_box_size(&self) -> Size {
        self.border_box.size()
    }

    /// Content-box size (border box minus padding and border, clamped at zero)
    pub fn content_box_size(&self) -> Size {
        Size::new(
            (self.border_box.width - self.padding.horizontal() - self.border.horizontal()).max(0.0),
            (self.border_box.height - self.padding.vertical() - self.border.vertical()).max(0.0),
        )
    }

    /// Content rect relative to the padding edge (ResizeObserver `contentRect`)
    pub fn content_rect(&self) -> DOMRect {
        let size = self.content_box_size();
        DOMRect::from_xywh(self.padding.left, self.padding.top, size.width, size.height)
    }
}
