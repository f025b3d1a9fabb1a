//! Core geometry types: Offset, Size, Region.
//!
//! Node boxes, icon anchors and interactable markers are all expressed in
//! layout units. The rendering backend converts layout units to screen pixels
//! (see [`RenderBackend::to_screen`](crate::platform::RenderBackend::to_screen)).

use std::ops::{Add, Neg, Sub};

use crate::schema::records::{Point16, Rect16};

// ---------------------------------------------------------------------------
// Offset
// ---------------------------------------------------------------------------

/// A 2D position or displacement in layout units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    /// Create a new offset.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan (taxicab) distance to `other`.
    #[inline]
    pub fn manhattan_distance(self, other: Offset) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl From<Point16> for Offset {
    fn from(p: Point16) -> Self {
        Offset::new(i32::from(p.x), i32::from(p.y))
    }
}

impl Add for Offset {
    type Output = Offset;
    #[inline]
    fn add(self, rhs: Offset) -> Offset {
        Offset { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl Sub for Offset {
    type Output = Offset;
    #[inline]
    fn sub(self, rhs: Offset) -> Offset {
        Offset { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl Neg for Offset {
    type Output = Offset;
    #[inline]
    fn neg(self) -> Offset {
        Offset { x: -self.x, y: -self.y }
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// A 2D size in layout units (width x height).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// A zero-sized size.
    pub const ZERO: Size = Size { width: 0, height: 0 };

    /// Create a new size.
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Convert to a [`Region`] positioned at the origin.
    #[inline]
    pub const fn to_region(self) -> Region {
        Region { x: 0, y: 0, width: self.width, height: self.height }
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A rectangular box defined by position and size.
///
/// A node's `position` is a `Region` relative to its parent's top-left corner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    /// An empty region at the origin.
    pub const EMPTY: Region = Region { x: 0, y: 0, width: 0, height: 0 };

    /// Create a new region.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// The right edge (exclusive): `x + width`.
    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.width
    }

    /// The bottom edge (exclusive): `y + height`.
    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.height
    }

    /// The top-left corner as an [`Offset`].
    #[inline]
    pub const fn offset(self) -> Offset {
        Offset { x: self.x, y: self.y }
    }

    /// The dimensions as a [`Size`].
    #[inline]
    pub const fn size(self) -> Size {
        Size { width: self.width, height: self.height }
    }

    /// Whether the point lies inside this region.
    #[inline]
    pub const fn contains(self, point: Offset) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Translate the region by an [`Offset`].
    #[inline]
    pub const fn translate(self, offset: Offset) -> Region {
        Region { x: self.x + offset.x, y: self.y + offset.y, width: self.width, height: self.height }
    }

    /// Same position, new dimensions.
    #[inline]
    pub const fn with_size(self, size: Size) -> Region {
        Region { x: self.x, y: self.y, width: size.width, height: size.height }
    }

    /// Same dimensions, new position.
    #[inline]
    pub const fn with_offset(self, offset: Offset) -> Region {
        Region { x: offset.x, y: offset.y, width: self.width, height: self.height }
    }

    /// Chebyshev distance from `point` to the nearest edge of the box.
    ///
    /// Zero when the point is inside.
    pub fn distance_to(self, point: Offset) -> i32 {
        let dx = if point.x < self.x {
            self.x - point.x
        } else if point.x >= self.right() {
            point.x - self.right() + 1
        } else {
            0
        };
        let dy = if point.y < self.y {
            self.y - point.y
        } else if point.y >= self.bottom() {
            point.y - self.bottom() + 1
        } else {
            0
        };
        dx.max(dy)
    }
}

impl From<Rect16> for Region {
    fn from(r: Rect16) -> Self {
        Region::new(
            i32::from(r.x),
            i32::from(r.y),
            i32::from(r.width),
            i32::from(r.height),
        )
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_add_sub_neg() {
        let a = Offset::new(1, 2);
        let b = Offset::new(3, 4);
        assert_eq!(a + b, Offset::new(4, 6));
        assert_eq!(b - a, Offset::new(2, 2));
        assert_eq!(-a, Offset::new(-1, -2));
    }

    #[test]
    fn offset_manhattan_distance() {
        let a = Offset::new(1, 2);
        let b = Offset::new(4, -1);
        assert_eq!(a.manhattan_distance(b), 6);
        assert_eq!(a.manhattan_distance(a), 0);
    }

    #[test]
    fn region_edges_and_parts() {
        let r = Region::new(5, 10, 20, 30);
        assert_eq!(r.right(), 25);
        assert_eq!(r.bottom(), 40);
        assert_eq!(r.offset(), Offset::new(5, 10));
        assert_eq!(r.size(), Size::new(20, 30));
        assert_eq!(Size::new(20, 30).to_region(), Region::new(0, 0, 20, 30));
    }

    #[test]
    fn region_contains_is_half_open() {
        let r = Region::new(5, 5, 10, 10);
        assert!(r.contains(Offset::new(5, 5)));
        assert!(r.contains(Offset::new(14, 14)));
        assert!(!r.contains(Offset::new(15, 14)));
        assert!(!r.contains(Offset::new(4, 5)));
    }

    #[test]
    fn region_zero_size_contains_nothing() {
        assert!(!Region::new(3, 3, 0, 0).contains(Offset::new(3, 3)));
    }

    #[test]
    fn region_translate_and_replace() {
        let r = Region::new(1, 1, 4, 4);
        assert_eq!(r.translate(Offset::new(2, -1)), Region::new(3, 0, 4, 4));
        assert_eq!(r.with_size(Size::new(9, 8)), Region::new(1, 1, 9, 8));
        assert_eq!(r.with_offset(Offset::new(7, 7)), Region::new(7, 7, 4, 4));
    }

    #[test]
    fn region_distance_to() {
        let r = Region::new(0, 0, 10, 10);
        assert_eq!(r.distance_to(Offset::new(5, 5)), 0);
        assert_eq!(r.distance_to(Offset::new(-3, 5)), 3);
        assert_eq!(r.distance_to(Offset::new(12, 15)), 6);
    }

    #[test]
    fn from_schema_records() {
        let p = Point16 { x: -2, y: 7 };
        assert_eq!(Offset::from(p), Offset::new(-2, 7));
        let r = Rect16 { x: 1, y: 2, width: 3, height: 4 };
        assert_eq!(Region::from(r), Region::new(1, 2, 3, 4));
    }
}
