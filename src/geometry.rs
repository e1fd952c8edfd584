//! Core 2D primitives: [`Point`], axis-aligned bounding boxes, and the small
//! set of predicates (signed area, strict point-in-polygon, quantized keys)
//! that every pipeline stage builds on.
//!
//! Orientation tests route through [`robust::orient2d`] rather than a naive
//! cross product, the same defense the teacher crate takes against
//! epsilon-fragile degeneracies in boolean/containment predicates.

use crate::float_types::{EPSILON, Real};
use robust::{Coord, orient2d};

/// A finite 2D point. Construction never accepts NaN/Inf; callers that need
/// to check a point's provenance use [`Point::is_finite`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: Real,
    pub y: Real,
}

impl Point {
    #[must_use]
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> Real {
        self.distance_squared_to(other).sqrt()
    }

    #[must_use]
    pub fn distance_squared_to(self, other: Self) -> Real {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// A key quantized to a grid of side `eps`, used to merge endpoints that
    /// are meant to coincide but differ by floating-point noise.
    #[must_use]
    pub fn quantize(self, eps: Real) -> (i64, i64) {
        (
            (self.x / eps).round() as i64,
            (self.y / eps).round() as i64,
        )
    }

    fn as_coord(self) -> Coord<Real> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Mul<Real> for Point {
    type Output = Self;
    fn mul(self, rhs: Real) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Signed orientation of the triangle `(a, b, c)`: positive when `c` is left
/// of the directed line `a -> b`.
#[must_use]
pub fn orient(a: Point, b: Point, c: Point) -> Real {
    orient2d(a.as_coord(), b.as_coord(), c.as_coord())
}

/// Shoelace signed area of a point sequence, implicitly closed (last point
/// connects back to the first). Positive for CCW winding.
#[must_use]
pub fn signed_area(points: &[Point]) -> Real {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Perimeter length of an open polyline (no implicit closing edge).
#[must_use]
pub fn polyline_length(points: &[Point]) -> Real {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(pair[1]))
        .sum()
}

/// Arithmetic mean of a point sequence.
#[must_use]
pub fn centroid_mean(points: &[Point]) -> Point {
    let n = points.len() as Real;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Polygon centroid via the shoelace formula. Falls back to the arithmetic
/// mean when the signed area is too small to divide by safely (caller is
/// expected to then try the next candidate in the interior-sample chain).
#[must_use]
pub fn centroid_shoelace(points: &[Point]) -> Option<Point> {
    let area = signed_area(points);
    if area.abs() < EPSILON {
        return None;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    let factor = 1.0 / (6.0 * area);
    Some(Point::new(cx * factor, cy * factor))
}

/// Strict point-in-polygon test: points exactly on an edge are *not*
/// considered inside. Uses even-odd ray casting with [`orient`] to resolve
/// the on-edge case precisely rather than by a loose epsilon band.
#[must_use]
pub fn point_in_polygon_strict(pt: Point, closed_pts: &[Point]) -> bool {
    if closed_pts.len() < 3 {
        return false;
    }
    let n = closed_pts.len();
    let mut inside = false;
    for i in 0..n {
        let a = closed_pts[i];
        let b = closed_pts[(i + 1) % n];
        if point_on_segment(pt, a, b) {
            return false;
        }
        let straddles = (a.y > pt.y) != (b.y > pt.y);
        if straddles {
            let x_at_y = a.x + (pt.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if x_at_y > pt.x {
                inside = !inside;
            }
        }
    }
    inside
}

fn point_on_segment(pt: Point, a: Point, b: Point) -> bool {
    let cross = orient(a, b, pt);
    if cross.abs() > EPSILON {
        return false;
    }
    let min_x = a.x.min(b.x) - EPSILON;
    let max_x = a.x.max(b.x) + EPSILON;
    let min_y = a.y.min(b.y) - EPSILON;
    let max_y = a.y.max(b.y) + EPSILON;
    pt.x >= min_x && pt.x <= max_x && pt.y >= min_y && pt.y <= max_y
}

/// An axis-aligned bounding box over 2D points. `None` (absence of a bbox)
/// is represented by the owner, not by this type -- an `Aabb` is only ever
/// constructed from at least one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
}

impl Aabb {
    #[must_use]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let mut iter = points.iter();
        let first = *iter.next()?;
        let mut bbox = Self {
            min: first,
            max: first,
        };
        for &p in iter {
            bbox.expand(p);
        }
        Some(bbox)
    }

    pub fn expand(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    #[must_use]
    pub fn width(self) -> Real {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(self) -> Real {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn area(self) -> Real {
        self.width().max(0.0) * self.height().max(0.0)
    }

    #[must_use]
    pub fn min_side(self) -> Real {
        self.width().min(self.height())
    }

    #[must_use]
    pub fn contains_point(self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[must_use]
    pub fn contains_bbox(self, other: Self) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Fraction of `self`'s area covered by the intersection with `other`,
    /// relative to `self` (used for bbox-overlap heuristics, §4.8/§4.11).
    #[must_use]
    pub fn overlap_fraction(self, other: Self) -> Real {
        let ix_min = self.min.x.max(other.min.x);
        let iy_min = self.min.y.max(other.min.y);
        let ix_max = self.max.x.min(other.max.x);
        let iy_max = self.max.y.min(other.max.y);
        let iw = (ix_max - ix_min).max(0.0);
        let ih = (iy_max - iy_min).max(0.0);
        let self_area = self.area();
        if self_area <= EPSILON {
            return 0.0;
        }
        (iw * ih) / self_area
    }

    /// Smallest distance from any edge of the outer frame `[min, max]` to
    /// `self`'s own nearest edge -- used by the fragmented-sheet heuristic to
    /// decide whether a root loop "touches" the source bounding box.
    #[must_use]
    pub fn distance_to_frame_edge(self, frame: Self) -> Real {
        let left = (self.min.x - frame.min.x).abs();
        let right = (frame.max.x - self.max.x).abs();
        let bottom = (self.min.y - frame.min.y).abs();
        let top = (frame.max.y - self.max.y).abs();
        left.min(right).min(bottom).min(top)
    }
}
