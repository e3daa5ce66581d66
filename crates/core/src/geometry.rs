//! Screen-space and document-space primitives.
//!
//! Document space is page-relative and zoom-independent: `x` and `y` are
//! fractions of the page's width and height, origin at the page's top-left.

use serde::Serialize;

/// Point in view (widget) pixels, origin at the viewport's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Normalized page coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pins the point onto the page.
    pub fn clamped(self) -> Self {
        Self { x: self.x.clamp(0.0, 1.0), y: self.y.clamp(0.0, 1.0) }
    }
}

/// Normalized page rectangle with `left <= right` and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl DocRect {
    /// Builds the rectangle spanned by two opposite corners, in any order.
    pub fn from_corners(a: DocPoint, b: DocPoint) -> Self {
        Self { left: a.x.min(b.x), top: a.y.min(b.y), right: a.x.max(b.x), bottom: a.y.max(b.y) }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn top_left(&self) -> DocPoint {
        DocPoint::new(self.left, self.top)
    }

    pub fn bottom_right(&self) -> DocPoint {
        DocPoint::new(self.right, self.bottom)
    }
}

/// Result of mapping a screen point onto a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageHit {
    pub page_index: u32,
    pub point: DocPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_corners_normalizes_order() {
        let rect = DocRect::from_corners(DocPoint::new(0.8, 0.1), DocPoint::new(0.2, 0.6));
        assert_eq!(rect, DocRect { left: 0.2, top: 0.1, right: 0.8, bottom: 0.6 });
        assert!((rect.width() - 0.6).abs() < 1e-6);
        assert!(!rect.is_empty());
    }

    #[test]
    fn degenerate_rect_is_empty() {
        let p = DocPoint::new(0.4, 0.4);
        assert!(DocRect::from_corners(p, p).is_empty());
        assert!(DocRect::from_corners(p, DocPoint::new(0.9, 0.4)).is_empty());
    }

    #[test]
    fn clamped_point_stays_on_page() {
        assert_eq!(DocPoint::new(-0.2, 1.7).clamped(), DocPoint::new(0.0, 1.0));
    }

    #[test]
    fn screen_rect_contains_edges() {
        let rect = ScreenRect::new(10.0, 10.0, 100.0, 50.0);
        assert!(rect.contains(ScreenPoint::new(10.0, 60.0)));
        assert!(!rect.contains(ScreenPoint::new(9.9, 20.0)));
    }
}
