//! Shape assembler (stage 8): turns the resolved loop hierarchy into
//! emitted `Shape`/`Document` values, with the dense-perforated fast path
//! (§4.7) and the artifact-overlay filter (§4.8).

use crate::errors::Diagnostic;
use crate::float_types::{
    DENSE_FAST_PATH_CHILD_AREA_FRACTION, DENSE_FAST_PATH_MIN_CHILDREN,
    DENSE_FAST_PATH_MIN_DEDUP_HOLES, DENSE_FAST_PATH_MIN_LOOPS, DENSE_FAST_PATH_OUTER_AREA_FRACTION,
    OVERLAY_AREA_RATIO_FLOOR, OVERLAY_AREA_RATIO_RANGE, OVERLAY_BBOX_OVERLAP_MIN,
    OVERLAY_COLLAPSE_AREA_RATIO_MIN, OVERLAY_COLLAPSE_DENSITY_RATIO_MAX,
    OVERLAY_COLLAPSE_MIN_HOLES, OVERLAY_DENSITY_RATIO_MAX, OVERLAY_DOMINANT_MIN_AREA_FRACTION,
    OVERLAY_DOMINANT_MIN_HOLES, Real,
};
use crate::geometry::{Aabb, Point, point_in_polygon_strict, signed_area};
use crate::hierarchy::Loop;
use geo::orient::Direction;
use geo::{Coord, LineString, Orient, Polygon};

/// A simple outer polygon with its holes, ready for extrusion or export.
/// `outer` is CCW, every hole is CW; both are simple (no self-intersection
/// guaranteed beyond what upstream stages already resolved).
#[derive(Debug, Clone)]
pub struct Shape {
    pub outer: Vec<Point>,
    pub holes: Vec<Vec<Point>>,
}

impl Shape {
    #[must_use]
    pub fn outer_area(&self) -> Real {
        signed_area(&self.outer).abs()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<Aabb> {
        Aabb::from_points(&self.outer)
    }
}

/// A reconstructed document: all emitted shapes plus the local coordinate
/// frame they were normalized into.
#[derive(Debug, Clone)]
pub struct Document {
    pub width: Real,
    pub height: Real,
    pub shapes: Vec<Shape>,
}

/// Orients a ring via `geo`'s own `Orient` trait rather than a hand-rolled
/// reverse, so the winding convention this crate emits (CCW outer, CW hole)
/// is the same one `geo`-based downstream consumers already expect.
fn oriented(points: &[Point], want_ccw: bool) -> Option<Vec<Point>> {
    if points.len() < 3 {
        return None;
    }
    let coords: Vec<Coord<Real>> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let polygon = Polygon::new(LineString(coords), vec![]);
    let direction = if want_ccw {
        Direction::Default
    } else {
        Direction::Reversed
    };
    let oriented = polygon.orient(direction);
    Some(
        oriented
            .exterior()
            .coords()
            .map(|c| Point::new(c.x, c.y))
            .collect(),
    )
}

/// Assembles one [`Shape`] per non-skipped even-depth loop, attaching its
/// non-skipped odd-depth direct children as holes. The terminal stage of
/// the main pipeline (§4.10).
#[must_use]
pub fn assemble_shapes(loops: &[Loop]) -> Vec<Shape> {
    let mut shapes = Vec::new();
    for (i, l) in loops.iter().enumerate() {
        if l.skipped || l.depth % 2 != 0 {
            continue;
        }
        let Some(outer) = oriented(&l.open_pts, true) else {
            continue;
        };
        let holes: Vec<Vec<Point>> = loops
            .iter()
            .enumerate()
            .filter(|&(j, child)| j != i && !child.skipped && child.parent == Some(i))
            .filter_map(|(_, child)| oriented(&child.open_pts, false))
            .collect();
        shapes.push(Shape { outer, holes });
    }
    shapes
}

/// Dense-perforated fast path (§4.7): when the candidate loop set is large
/// enough, skip the general hierarchy/pseudo-hole machinery entirely and
/// build the single outer-plus-holes shape directly by area/quantization
/// heuristics.
#[must_use]
pub fn try_dense_fast_path(loops: &[Loop], source_bbox_area: Real) -> Option<(Shape, usize)> {
    if loops.len() < DENSE_FAST_PATH_MIN_LOOPS {
        return None;
    }
    let (outer_idx, outer) = loops
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.area().total_cmp(&b.1.area()))?;
    if outer.area() < DENSE_FAST_PATH_OUTER_AREA_FRACTION * source_bbox_area {
        return None;
    }

    let children: Vec<&Loop> = loops
        .iter()
        .enumerate()
        .filter(|&(i, l)| {
            i != outer_idx
                && l.area() <= DENSE_FAST_PATH_CHILD_AREA_FRACTION * source_bbox_area
                && outer.bbox.contains_point(l.interior_sample)
                && point_in_polygon_strict(l.interior_sample, &outer.open_pts)
        })
        .map(|(_, l)| l)
        .collect();
    if children.len() < DENSE_FAST_PATH_MIN_CHILDREN {
        return None;
    }

    let mut dims: Vec<Real> = children.iter().map(|c| c.bbox.min_side()).collect();
    dims.sort_by(Real::total_cmp);
    let median_min_dim = dims[dims.len() / 2];
    let quant = (median_min_dim * 0.03).clamp(1e-4, 0.25);

    let mut best: hashbrown::HashMap<(i64, i64), &Loop> = hashbrown::HashMap::new();
    for &c in &children {
        let key = c.interior_sample.quantize(quant);
        best.entry(key)
            .and_modify(|existing| {
                if c.area() > existing.area() {
                    *existing = c;
                }
            })
            .or_insert(c);
    }
    if best.len() < DENSE_FAST_PATH_MIN_DEDUP_HOLES {
        return None;
    }

    let outer_pts = oriented(&outer.open_pts, true)?;
    let holes: Vec<Vec<Point>> = best
        .values()
        .filter_map(|c| oriented(&c.open_pts, false))
        .collect();
    let hole_count = holes.len();
    log::debug!(
        "dense fast path: {} candidate loop(s) -> {} deduplicated hole(s)",
        loops.len(),
        hole_count
    );
    Some((
        Shape {
            outer: outer_pts,
            holes,
        },
        hole_count,
    ))
}

fn dominant_shape(shapes: &[Shape], source_bbox_area: Real) -> Option<usize> {
    shapes.iter().enumerate().find_map(|(i, s)| {
        (s.holes.len() >= OVERLAY_DOMINANT_MIN_HOLES
            && s.outer_area() >= OVERLAY_DOMINANT_MIN_AREA_FRACTION * source_bbox_area)
            .then_some(i)
    })
}

fn shape_density(s: &Shape) -> Real {
    let area = s.outer_area();
    if area <= crate::float_types::EPSILON {
        return 0.0;
    }
    s.holes.len() as Real / area
}

/// A non-dominant shape plus the inside/ratio facts computed for it, kept
/// around past the per-shape drop decision so the collapse check (§4.8's
/// second paragraph) can look at what's still standing.
struct Evaluated {
    shape: Shape,
    inside_dominant: bool,
    area_ratio: Real,
    density_ratio: Real,
}

/// Artifact-overlay filter (§4.8): post-assembly pruning of non-dominant
/// shapes that sit inside a dominant perforated pattern and look like
/// stray duplicate outlines rather than genuine separate parts, with a
/// final collapse-to-dominant-alone pass when everything left over is such
/// an artifact.
pub fn filter_overlay_artifacts(
    mut shapes: Vec<Shape>,
    source_bbox_area: Real,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Shape> {
    let Some(dominant_idx) = dominant_shape(&shapes, source_bbox_area) else {
        return shapes;
    };
    let dominant_density = shape_density(&shapes[dominant_idx]);
    let dominant_area = shapes[dominant_idx].outer_area();
    let Some(dominant_bbox) = shapes[dominant_idx].bbox() else {
        return shapes;
    };
    let dominant_hole_count = shapes[dominant_idx].holes.len();
    let dominant = shapes.swap_remove(dominant_idx);

    let mut survivors: Vec<Evaluated> = Vec::with_capacity(shapes.len());
    let mut dropped_count = 0usize;
    for s in shapes {
        if s.outer.is_empty() {
            survivors.push(Evaluated {
                shape: s,
                inside_dominant: false,
                area_ratio: 0.0,
                density_ratio: 0.0,
            });
            continue;
        }
        let sample = crate::geometry::centroid_mean(&s.outer);
        let inside_dominant =
            dominant_bbox.contains_point(sample) && point_in_polygon_strict(sample, &dominant.outer);
        let area_ratio = if dominant_area > crate::float_types::EPSILON {
            s.outer_area() / dominant_area
        } else {
            0.0
        };
        let density_ratio = if dominant_density > crate::float_types::EPSILON {
            shape_density(&s) / dominant_density
        } else {
            0.0
        };
        if !inside_dominant {
            survivors.push(Evaluated {
                shape: s,
                inside_dominant,
                area_ratio,
                density_ratio,
            });
            continue;
        }

        let cond_a = area_ratio >= OVERLAY_AREA_RATIO_RANGE.0 && area_ratio <= OVERLAY_AREA_RATIO_RANGE.1;
        let cond_b = density_ratio < OVERLAY_DENSITY_RATIO_MAX || s.holes.len() <= 2;
        let bbox_overlap = s
            .bbox()
            .map(|b| b.overlap_fraction(dominant_bbox))
            .unwrap_or(0.0);
        let cond_c =
            area_ratio >= OVERLAY_AREA_RATIO_FLOOR || bbox_overlap >= OVERLAY_BBOX_OVERLAP_MIN || s.holes.len() <= 1;

        if cond_a && cond_b && cond_c {
            dropped_count += 1;
            diagnostics.push(Diagnostic::OverlayShapeDropped);
        } else {
            survivors.push(Evaluated {
                shape: s,
                inside_dominant,
                area_ratio,
                density_ratio,
            });
        }
    }
    if dropped_count > 0 {
        log::debug!("overlay filter dropped {dropped_count} artifact shape(s)");
    }

    let all_remaining_inside = !survivors.is_empty() && survivors.iter().all(|e| e.inside_dominant);
    let any_collapse_candidate = survivors.iter().any(|e| {
        e.area_ratio >= OVERLAY_COLLAPSE_AREA_RATIO_MIN && e.density_ratio < OVERLAY_COLLAPSE_DENSITY_RATIO_MAX
    });
    if all_remaining_inside && any_collapse_candidate && dominant_hole_count >= OVERLAY_COLLAPSE_MIN_HOLES {
        log::debug!(
            "overlay filter collapsed {} remaining shape(s) into the dominant shape",
            survivors.len()
        );
        for _ in &survivors {
            diagnostics.push(Diagnostic::OverlayShapeDropped);
        }
        return vec![dominant];
    }

    let mut result = Vec::with_capacity(survivors.len() + 1);
    result.push(dominant);
    result.extend(survivors.into_iter().map(|e| e.shape));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::resolve_hierarchy;

    fn square(min: Real, max: Real) -> Vec<Point> {
        vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ]
    }

    #[test]
    fn single_square_has_no_holes() {
        let mut loops = vec![Loop::new(square(0.0, 10.0)).unwrap()];
        resolve_hierarchy(&mut loops);
        let shapes = assemble_shapes(&loops);
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].holes.is_empty());
        assert!(signed_area(&shapes[0].outer) > 0.0);
    }

    #[test]
    fn square_with_hole_orients_correctly() {
        let mut loops = vec![
            Loop::new(square(0.0, 10.0)).unwrap(),
            Loop::new(square(3.0, 7.0)).unwrap(),
        ];
        resolve_hierarchy(&mut loops);
        let shapes = assemble_shapes(&loops);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
        assert!(signed_area(&shapes[0].outer) > 0.0);
        assert!(signed_area(&shapes[0].holes[0]) < 0.0);
    }

    #[test]
    fn dense_fast_path_requires_enough_loops() {
        let mut loops = vec![Loop::new(square(0.0, 200.0)).unwrap()];
        for i in 0..50 {
            let x = 5.0 + (i as Real) * 3.0;
            loops.push(Loop::new(square_at(x, 5.0, 1.0)).unwrap());
        }
        assert!(try_dense_fast_path(&loops, 200.0 * 200.0).is_none());
    }

    fn square_at(x: Real, y: Real, size: Real) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn overlay_collapse_prunes_a_surviving_non_artifact_shape() {
        // Dominant: a 1000x1000 perforated sheet with 200 holes (density
        // 0.0002/unit^2). The candidate has densityRatio~0.417, which clears
        // the per-shape drop condition's densityRatio<0.35 branch (and has
        // >2 holes of its own, so it survives that pass individually) but
        // still satisfies the looser collapse thresholds (areaRatio>=0.10,
        // densityRatio<0.45) -- so the whole output should collapse to the
        // dominant shape alone.
        let dominant = Shape {
            outer: square(0.0, 1000.0),
            holes: vec![Vec::new(); 200],
        };
        let side = 120_000.0_f64.sqrt();
        let half = side / 2.0;
        let candidate = Shape {
            outer: square_at(500.0 - half, 500.0 - half, side),
            holes: vec![Vec::new(); 10],
        };

        let mut diags = Vec::new();
        let result = filter_overlay_artifacts(vec![dominant, candidate], 1_000_000.0, &mut diags);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 200);
        assert!(diags.iter().any(|d| matches!(d, Diagnostic::OverlayShapeDropped)));
    }
}
