#![forbid(unsafe_code)]

//! Geometric primitives and viewport clamping.
//!
//! Coordinates are CSS-style viewport pixels: origin at the top-left, `x`
//! grows right, `y` grows down. Positions of the evasive control are its
//! top-left corner.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Off-screen tolerance for placements that are allowed to poke past the
/// viewport edge (hide, tunnel, and peek-edge spots).
pub const HIDE_OFFSCREEN_TOLERANCE: f32 = 14.0;

/// A point in viewport space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Translate by a vector.
    #[inline]
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Linear interpolation toward `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f32) -> Point {
        let t = t.clamp(0.0, 1.0);
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Multiply both dimensions by `factor`.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    /// Check if either dimension is zero or negative.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle used for obstacle bounds and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f32,
    /// Top edge (inclusive).
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from a top-left point and a size.
    #[inline]
    pub const fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// A rectangle that can stand in for a measured element: both
    /// dimensions positive and finite.
    pub fn is_measurable(&self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Grow the rectangle by `pad` on every side.
    #[must_use]
    pub fn inflate(&self, pad: f32) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    /// Axis-aligned overlap test.
    ///
    /// Strict inequalities: rectangles that only touch along an edge do
    /// not intersect.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Clamp a single axis to `[-allow_off, extent - element + allow_off]`.
///
/// When the element is larger than the extent the upper bound would fall
/// below the lower bound; the lower (margin-only) bound wins.
#[inline]
fn clamp_axis(value: f32, element: f32, extent: f32, allow_off: f32) -> f32 {
    let min = -allow_off;
    let max = (extent - element + allow_off).max(min);
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Clamp a desired top-left position so the element stays inside the
/// viewport, allowing it to hang `allow_off` pixels past any edge.
pub fn clamp_to_viewport(desired: Point, element: Size, viewport: Size, allow_off: f32) -> Point {
    let allow_off = allow_off.max(0.0);
    Point::new(
        clamp_axis(desired.x, element.width, viewport.width, allow_off),
        clamp_axis(desired.y, element.height, viewport.height, allow_off),
    )
}

/// Check whether `pos` already satisfies the bounds enforced by
/// [`clamp_to_viewport`] for the given tolerance.
pub fn within_viewport(pos: Point, element: Size, viewport: Size, allow_off: f32) -> bool {
    clamp_to_viewport(pos, element, viewport, allow_off) == pos
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Size = Size::new(400.0, 300.0);
    const ELEM: Size = Size::new(100.0, 40.0);

    #[test]
    fn clamp_keeps_inside_point() {
        let p = Point::new(50.0, 60.0);
        assert_eq!(clamp_to_viewport(p, ELEM, VIEW, 0.0), p);
    }

    #[test]
    fn clamp_pulls_back_past_right_and_bottom() {
        let p = clamp_to_viewport(Point::new(390.0, 290.0), ELEM, VIEW, 0.0);
        assert_eq!(p, Point::new(300.0, 260.0));
    }

    #[test]
    fn clamp_allows_tolerance() {
        let p = clamp_to_viewport(Point::new(-50.0, 500.0), ELEM, VIEW, 14.0);
        assert_eq!(p, Point::new(-14.0, 274.0));
    }

    #[test]
    fn element_larger_than_viewport_uses_margin_bound() {
        let tiny = Size::new(60.0, 20.0);
        let p = clamp_to_viewport(Point::new(30.0, 10.0), ELEM, tiny, 0.0);
        assert_eq!(p, Point::new(0.0, 0.0));
        let p = clamp_to_viewport(Point::new(30.0, 10.0), ELEM, tiny, 14.0);
        assert_eq!(p, Point::new(-14.0, -14.0));
    }

    #[test]
    fn nan_clamps_to_lower_bound() {
        let p = clamp_to_viewport(Point::new(f32::NAN, 5.0), ELEM, VIEW, 0.0);
        assert_eq!(p, Point::new(0.0, 5.0));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(0.0, 10.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn overlapping_rects_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(9.5, 9.5, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn inflate_grows_all_sides() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0).inflate(5.0);
        assert_eq!(r, Rect::new(5.0, 5.0, 30.0, 30.0));
    }

    #[test]
    fn measurable_rejects_degenerate() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_measurable());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).is_measurable());
        assert!(!Rect::new(f32::INFINITY, 0.0, 1.0, 1.0).is_measurable());
    }

    #[test]
    fn lerp_clamps_fraction() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.5), Point::new(5.0, 10.0));
        assert_eq!(a.lerp(b, 2.0), b);
    }
}
