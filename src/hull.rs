//! Hull fallback gate (stage 9): optionally injects a convex hull of all
//! input points as a synthetic outer loop when no other loop looks like a
//! plausible outline.
//!
//! Grounded directly on the teacher's `mesh/convex_hull.rs`: the same
//! `chull::ConvexHullWrapper::try_new(points, None)` call, with the same
//! graceful empty-result fallback on `Err`. The teacher reconstructs 3D
//! triangle polygons from `hull.vertices_indices()`; this module instead
//! feeds the hull's boundary edges back through the loop extractor
//! (`loop_extractor::extract_loops`) to recover a single ordered 2D ring,
//! since `chull` reports a simplicial facet list rather than a walked
//! polygon boundary.

use crate::contour::Segment;
use crate::float_types::{
    HULL_CONTAINER_AREA_VS_SECOND, HULL_CONTAINER_MIN_AREA_FRACTION, HULL_CONTAINER_MIN_OTHERS,
    HULL_FRAGMENT_MAX_LARGEST_ROOT_FRACTION, HULL_FRAGMENT_MIN_ROOTS, HULL_FRAGMENT_MIN_TINY_LOOPS,
    HULL_FRAGMENT_TINY_AREA_FRACTION, HULL_NO_LOOP_AREA_FRACTION, HULL_TINY_MAX_LOOP_AREA_FRACTION,
    Real,
};
use crate::geometry::{Aabb, Point};
use crate::hierarchy::Loop;
use crate::loop_extractor::extract_loops_with_epsilons;
use chull::ConvexHullWrapper;

/// Computes the convex hull of `points` and returns it as a single ordered
/// [`Loop`], or `None` if the hull degenerates (fewer than 3 distinct
/// points, or `chull` itself fails).
#[must_use]
pub fn convex_hull_loop(points: &[Point]) -> Option<Loop> {
    if points.len() < 3 {
        return None;
    }
    let points_for_hull: Vec<Vec<Real>> = points.iter().map(|p| vec![p.x, p.y]).collect();
    let hull = match ConvexHullWrapper::try_new(&points_for_hull, None) {
        Ok(hull) => hull,
        Err(err) => {
            log::debug!("convex hull computation failed: {err:?}");
            return None;
        }
    };
    let (verts, indices) = hull.vertices_indices();
    let hull_points: Vec<Point> = verts.iter().map(|v| Point::new(v[0], v[1])).collect();

    let segments: Vec<Segment> = indices
        .chunks(2)
        .filter_map(|pair| {
            let (&i, &j) = (pair.first()?, pair.get(1)?);
            Segment::new(hull_points[i], hull_points[j])
        })
        .collect();
    let loops = extract_loops_with_epsilons(&segments, &[1e-6, 1e-3]);
    let loop_ = loops.into_iter().find_map(Loop::new);
    if loop_.is_none() {
        log::debug!("convex hull produced {} boundary segment(s) but no closed ring", segments.len());
    }
    loop_
}

/// A loop that contains most of the other loops' interior samples and
/// dwarfs the second-largest loop -- a pre-existing outline that the hull
/// gate must not override.
fn has_strong_container(loops: &[Loop]) -> bool {
    if loops.len() < 2 {
        return false;
    }
    let mut areas: Vec<Real> = loops.iter().map(Loop::area).collect();
    areas.sort_by(|a, b| b.total_cmp(a));
    let second_largest = areas.get(1).copied().unwrap_or(0.0);

    loops.iter().enumerate().any(|(i, candidate)| {
        let contained = loops
            .iter()
            .enumerate()
            .filter(|&(j, other)| {
                j != i && candidate.bbox.contains_point(other.interior_sample)
                    && crate::geometry::point_in_polygon_strict(
                        other.interior_sample,
                        &candidate.open_pts,
                    )
            })
            .count();
        contained >= HULL_CONTAINER_MIN_OTHERS.min(loops.len() - 1)
            && candidate.area()
                >= (HULL_CONTAINER_AREA_VS_SECOND * second_largest)
                    .max(HULL_CONTAINER_MIN_AREA_FRACTION)
    })
}

/// Whether gate condition 1+2 (§4.9) fire: no loop looks like a real outer
/// boundary, so a hull overlay is worth considering.
#[must_use]
pub fn should_consider_hull(loops: &[Loop], source_bbox_area: Real) -> bool {
    if loops.is_empty() {
        return true;
    }
    let max_area = loops.iter().map(Loop::area).fold(0.0, Real::max);
    let no_likely_outer = max_area <= HULL_NO_LOOP_AREA_FRACTION * source_bbox_area;
    if !no_likely_outer {
        return false;
    }
    max_area <= HULL_TINY_MAX_LOOP_AREA_FRACTION * source_bbox_area || !has_strong_container(loops)
}

/// Fragmented-sheet alternative trigger (§4.9): many small root loops all
/// touching the source bbox frame, none large enough to be a true outline.
#[must_use]
pub fn is_fragmented_sheet(loops: &[Loop], source_bbox: Aabb) -> bool {
    let min_side = source_bbox.min_side().max(1.0);
    let touch_tol = (min_side * 0.06).max(4.0);
    let source_area = source_bbox.area();

    let roots: Vec<&Loop> = loops.iter().filter(|l| l.parent.is_none()).collect();
    let touching_roots = roots
        .iter()
        .filter(|l| l.bbox.distance_to_frame_edge(source_bbox) <= touch_tol)
        .count();
    let tiny_loops = loops
        .iter()
        .filter(|l| l.area() <= HULL_FRAGMENT_TINY_AREA_FRACTION * source_area)
        .count();
    let largest_root = roots.iter().map(|l| l.area()).fold(0.0, Real::max);

    touching_roots >= HULL_FRAGMENT_MIN_ROOTS
        && tiny_loops >= HULL_FRAGMENT_MIN_TINY_LOOPS
        && largest_root < HULL_FRAGMENT_MAX_LARGEST_ROOT_FRACTION * source_area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hull_of_square_corners_recovers_the_square() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let hull = convex_hull_loop(&pts).unwrap();
        assert_eq!(hull.open_pts.len(), 4);
        assert!((hull.area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_has_no_hull() {
        assert!(convex_hull_loop(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn gate_fires_when_no_loops_exist() {
        assert!(should_consider_hull(&[], 100.0));
    }

    #[test]
    fn gate_does_not_fire_when_a_dominant_outer_already_exists() {
        let outer = Loop::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .unwrap();
        assert!(!should_consider_hull(std::slice::from_ref(&outer), 100.0));
    }
}
