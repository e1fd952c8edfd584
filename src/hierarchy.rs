//! The [`Loop`] arena type and the hierarchy resolver (stage 6): assigns
//! each loop its smallest enclosing parent, with depth parity defining
//! outer (even) vs. hole (odd).
//!
//! Ownership follows the design note directly: loops live in a flat arena
//! indexed by position, parent/child links are indices (never
//! back-pointers), and depth is computed by an explicit-stack iterative
//! walk from the roots rather than memoized recursion, so a wide flat tree
//! (hundreds of sibling holes, as in the dense-perforation scenario) never
//! grows the native call stack.

use crate::float_types::{HIERARCHY_AREA_SLACK, Real};
use crate::geometry::{Aabb, Point, centroid_mean, centroid_shoelace, point_in_polygon_strict};

/// A closed loop owned by the hierarchy arena. `parent`/`depth` start
/// unresolved (`None`/`0`) and are filled in by [`resolve_hierarchy`].
#[derive(Debug, Clone)]
pub struct Loop {
    pub open_pts: Vec<Point>,
    pub signed_area: Real,
    pub bbox: Aabb,
    pub interior_sample: Point,
    pub parent: Option<usize>,
    pub depth: usize,
    /// Set by the pseudo-hole normalizer when this loop is a duplicated
    /// border offset rather than a real cutout; skipped loops are excluded
    /// from the final shape assembly but stay in the arena so indices
    /// elsewhere stay valid.
    pub skipped: bool,
}

impl Loop {
    /// Builds a loop from an ordered point sequence, computing its area,
    /// bbox, and interior sample. Returns `None` if the loop is degenerate
    /// (fewer than 3 points, or `|signedArea| <= 1e-8`).
    #[must_use]
    pub fn new(open_pts: Vec<Point>) -> Option<Self> {
        if open_pts.len() < 3 {
            return None;
        }
        let signed_area = crate::geometry::signed_area(&open_pts);
        if signed_area.abs() <= 1e-8 {
            return None;
        }
        let bbox = Aabb::from_points(&open_pts)?;
        let interior_sample = pick_interior_sample(&open_pts)?;
        Some(Self {
            open_pts,
            signed_area,
            bbox,
            interior_sample,
            parent: None,
            depth: 0,
            skipped: false,
        })
    }

    #[must_use]
    pub fn area(&self) -> Real {
        self.signed_area.abs()
    }

    #[must_use]
    pub fn is_outer(&self) -> bool {
        self.depth % 2 == 0
    }
}

/// Tries, in order: shoelace centroid, arithmetic mean, first-edge midpoint,
/// first vertex. Returns the first candidate strictly inside the loop.
fn pick_interior_sample(open_pts: &[Point]) -> Option<Point> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(c) = centroid_shoelace(open_pts) {
        candidates.push(c);
    }
    candidates.push(centroid_mean(open_pts));
    if open_pts.len() >= 2 {
        candidates.push(open_pts[0].midpoint(open_pts[1]));
    }
    candidates.push(open_pts[0]);

    candidates
        .into_iter()
        .find(|&c| point_in_polygon_strict(c, open_pts))
}

/// Finds loop `i`'s smallest-area enclosing loop, or `None` if it is a root.
fn find_parent(i: usize, loops: &[Loop]) -> Option<usize> {
    let sample = loops[i].interior_sample;
    let area_i = loops[i].area();
    let mut best: Option<(usize, Real)> = None;
    for (j, candidate) in loops.iter().enumerate() {
        if j == i {
            continue;
        }
        let area_j = candidate.area();
        if area_j <= area_i + HIERARCHY_AREA_SLACK {
            continue;
        }
        if !candidate.bbox.contains_point(sample) {
            continue;
        }
        if !point_in_polygon_strict(sample, &candidate.open_pts) {
            continue;
        }
        if best.is_none_or(|(_, best_area)| area_j < best_area) {
            best = Some((j, area_j));
        }
    }
    best.map(|(j, _)| j)
}

/// Builds a parent-indexed children list from the current `parent` fields.
#[must_use]
pub fn children_map(loops: &[Loop]) -> Vec<Vec<usize>> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); loops.len()];
    for (i, l) in loops.iter().enumerate() {
        if let Some(p) = l.parent {
            children[p].push(i);
        }
    }
    children
}

/// Recomputes `depth` from the current `parent` fields via an explicit-stack
/// walk from the roots. Used both by [`resolve_hierarchy`] and by the
/// pseudo-hole normalizer after it re-parents loops.
pub fn recompute_depth(loops: &mut [Loop]) {
    let children = children_map(loops);
    let roots: Vec<usize> = (0..loops.len()).filter(|&i| loops[i].parent.is_none()).collect();
    let mut stack: Vec<(usize, usize)> = roots.into_iter().map(|r| (r, 0)).collect();
    while let Some((idx, depth)) = stack.pop() {
        loops[idx].depth = depth;
        for &child in &children[idx] {
            stack.push((child, depth + 1));
        }
    }
}

/// Resolves `parent` and `depth` for every loop in the arena.
pub fn resolve_hierarchy(loops: &mut [Loop]) {
    let parents: Vec<Option<usize>> = (0..loops.len()).map(|i| find_parent(i, loops)).collect();
    for (i, parent) in parents.into_iter().enumerate() {
        loops[i].parent = parent;
    }
    recompute_depth(loops);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: Real, max: Real) -> Vec<Point> {
        vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ]
    }

    #[test]
    fn nested_squares_get_alternating_depth() {
        let outer = Loop::new(square(0.0, 10.0)).unwrap();
        let hole = Loop::new(square(3.0, 7.0)).unwrap();
        let mut loops = vec![outer, hole];
        resolve_hierarchy(&mut loops);
        assert_eq!(loops[0].depth, 0);
        assert_eq!(loops[1].depth, 1);
        assert_eq!(loops[1].parent, Some(0));
        assert!(loops[0].is_outer());
        assert!(!loops[1].is_outer());
    }

    #[test]
    fn disjoint_squares_are_both_roots() {
        let a = Loop::new(square(0.0, 10.0)).unwrap();
        let b = Loop::new(square(100.0, 110.0)).unwrap();
        let mut loops = vec![a, b];
        resolve_hierarchy(&mut loops);
        assert_eq!(loops[0].parent, None);
        assert_eq!(loops[1].parent, None);
    }

    #[test]
    fn parent_area_strictly_exceeds_child_area() {
        let outer = Loop::new(square(0.0, 100.0)).unwrap();
        let mid = Loop::new(square(10.0, 90.0)).unwrap();
        let inner = Loop::new(square(40.0, 60.0)).unwrap();
        let mut loops = vec![outer, mid, inner];
        resolve_hierarchy(&mut loops);
        assert_eq!(loops[2].parent, Some(1));
        assert_eq!(loops[1].parent, Some(0));
        assert!(loops[0].area() > loops[1].area());
        assert!(loops[1].area() > loops[2].area());
    }
}
