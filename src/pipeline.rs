//! Top-level orchestrator: coordinate normalization, the reparse policy
//! (§4.11), and [`reconstruct`], the public entry point that threads every
//! stage together.

use crate::compound::split_if_compound;
use crate::contour::{Contour, ContourCleanerOptions, clean_and_stitch, stitch_open_contours_at_tolerance};
use crate::errors::{Diagnostic, ReconstructError};
use crate::float_types::{
    FALLBACK_STITCH_TOL_MAX, FALLBACK_STITCH_TOL_MIN, FALLBACK_STITCH_TOL_SCALE,
    REPARSE_MAX_CLOSED_AREA_FRACTION, REPARSE_MIN_OPEN_CONTOURS, Real,
};
use crate::geometry::{Aabb, Point, signed_area};
use crate::hierarchy::{Loop, resolve_hierarchy};
use crate::hull::{convex_hull_loop, is_fragmented_sheet, should_consider_hull};
use crate::loop_extractor::{extract_loops, segments_from_open_contours};
use crate::primitive::{Primitive, PrimitiveOptions, normalize_primitives};
use crate::pseudo_hole::normalize_pseudo_holes;
use crate::shape::{Document, Shape, assemble_shapes, filter_overlay_artifacts, try_dense_fast_path};
use either::Either;

/// Every per-stage tunable, bundled so the engine holds no global state and
/// a caller can override any default in one place (§10.3).
#[derive(Debug, Clone, Default)]
pub struct ReconstructOptions {
    pub primitive: PrimitiveOptions,
    pub cleaner: ContourCleanerOptions,
}

/// The largest-area emitted shape's outer ring, or the hull when no shape
/// was emitted but a hull fallback fired (§6).
#[must_use]
fn primary_selection_loop(shapes: &[Shape], hull_outer: Option<&[Point]>) -> Option<Vec<Point>> {
    shapes
        .iter()
        .max_by(|a, b| a.outer_area().total_cmp(&b.outer_area()))
        .map(|s| s.outer.clone())
        .or_else(|| hull_outer.map(<[Point]>::to_vec))
}

/// Translates every point of every shape so the document's bounding box
/// starts at the origin, and returns the resulting (width, height).
fn normalize_coordinates(shapes: &mut [Shape], bbox: Aabb) -> (Real, Real) {
    let (ox, oy) = (bbox.min.x, bbox.min.y);
    for shape in shapes.iter_mut() {
        for p in shape.outer.iter_mut() {
            *p = Point::new(p.x - ox, p.y - oy);
        }
        for hole in shape.holes.iter_mut() {
            for p in hole.iter_mut() {
                *p = Point::new(p.x - ox, p.y - oy);
            }
        }
    }
    (bbox.width(), bbox.height())
}

/// Splits every candidate loop if compound, returning the flattened result
/// and the number of loops that were genuinely exploded into subloops.
fn split_all_compounds(candidates: Vec<Loop>) -> (Vec<Loop>, usize) {
    let mut out = Vec::with_capacity(candidates.len());
    let mut split_count = 0;
    for candidate in candidates {
        let split = split_if_compound(&candidate);
        if split.len() > 1 {
            split_count += split.len();
        }
        out.extend(split);
    }
    (out, split_count)
}

/// Raw LINE/ARC reparse policy (§4.11): re-runs the cleaner/stitcher with
/// cluster filtering disabled when the first pass looks like it discarded a
/// valid LINE/ARC-only border. Returns `Right` with the first-pass contours
/// kept as-is when the policy doesn't fire, `Left` with the raw contours to
/// reparse (cluster-free) when it does -- a small two-armed decision in the
/// same shape the teacher's example pack uses `either::Either` for.
fn reparse_policy(
    contours: Vec<crate::contour::Contour>,
    raw_contours: Vec<crate::contour::Contour>,
    source_bbox_area: Real,
) -> Either<Vec<crate::contour::Contour>, Vec<crate::contour::Contour>> {
    let open_count = contours.iter().filter(|c| !c.closed).count();
    if open_count < REPARSE_MIN_OPEN_CONTOURS {
        return Either::Right(contours);
    }
    let max_closed_area = contours
        .iter()
        .filter(|c| c.closed)
        .map(|c| signed_area(&c.points).abs())
        .fold(0.0, Real::max);
    if max_closed_area < REPARSE_MAX_CLOSED_AREA_FRACTION * source_bbox_area {
        Either::Left(raw_contours)
    } else {
        Either::Right(contours)
    }
}

/// Runs the full reconstruction pipeline: normalizes primitives, cleans and
/// stitches contours, extracts loops, splits compounds, resolves the
/// hierarchy, flattens pseudo-holes, and assembles shapes -- with the
/// dense-perforation fast path, hull fallback, and artifact-overlay filter
/// applied where their gating conditions hold.
pub fn reconstruct(
    primitives: &[Primitive],
    options: &ReconstructOptions,
) -> Result<(Document, Vec<Diagnostic>), ReconstructError> {
    let mut diagnostics = Vec::new();

    let (raw_contours, primitive_diags) = normalize_primitives(primitives, &options.primitive);
    diagnostics.extend(primitive_diags);

    let all_points: Vec<Point> = raw_contours.iter().flat_map(|c| c.points.iter().copied()).collect();
    let Some(source_bbox) = Aabb::from_points(&all_points) else {
        return Err(ReconstructError::EmptyDocument {
            contour_count: 0,
            width: 0.0,
            height: 0.0,
        });
    };
    let source_bbox_area = source_bbox.area();
    if source_bbox_area <= crate::float_types::EPSILON {
        return Err(ReconstructError::EmptyDocument {
            contour_count: raw_contours.len(),
            width: source_bbox.width(),
            height: source_bbox.height(),
        });
    }

    let mut contours = clean_and_stitch(raw_contours.clone(), &options.cleaner, &mut diagnostics);
    if contours.is_empty() {
        return Err(ReconstructError::EmptyDocument {
            contour_count: 0,
            width: source_bbox.width(),
            height: source_bbox.height(),
        });
    }

    let first_pass = contours.clone();
    contours = match reparse_policy(contours, raw_contours, source_bbox_area) {
        Either::Left(raw_for_reparse) => {
            log::debug!("reparse policy fired: retrying cluster-free on raw LINE/ARC contours");
            diagnostics.push(Diagnostic::ReparsedAsRawLineArc);
            let cluster_free = ContourCleanerOptions {
                cluster_gap_max: 0.0,
                ..options.cleaner.clone()
            };
            let mut retry_diags = Vec::new();
            let retried = clean_and_stitch(raw_for_reparse, &cluster_free, &mut retry_diags);
            if retried.is_empty() { first_pass } else { retried }
        }
        Either::Right(contours) => contours,
    };

    if !contours.iter().any(|c| c.closed) {
        diagnostics.push(Diagnostic::NoClosedEntity);
    }

    let closed_candidates: Vec<Loop> = contours
        .iter()
        .filter(|c| c.closed)
        .filter_map(|c| Loop::new(c.points.clone()))
        .collect();
    let open_segments = segments_from_open_contours(&contours);
    let mut extracted_points = extract_loops(&open_segments);
    if extracted_points.is_empty() && !open_segments.is_empty() {
        let min_side = source_bbox.min_side().max(1.0);
        let tol = (min_side * FALLBACK_STITCH_TOL_SCALE).clamp(FALLBACK_STITCH_TOL_MIN, FALLBACK_STITCH_TOL_MAX);
        log::debug!("loop extractor exhausted its epsilon ladder, falling back to open-contour stitch at tol={tol}");
        let open_contours: Vec<Contour> = contours.iter().filter(|c| !c.closed).cloned().collect();
        extracted_points = stitch_open_contours_at_tolerance(open_contours, tol)
            .into_iter()
            .filter(|c| c.closed)
            .map(|c| c.points)
            .collect();
    }
    let extracted_candidates: Vec<Loop> = extracted_points.into_iter().filter_map(Loop::new).collect();

    let (closed_loops, closed_splits) = split_all_compounds(closed_candidates);
    let (extracted_loops, extracted_splits) = split_all_compounds(extracted_candidates);
    if closed_splits + extracted_splits > 0 {
        diagnostics.push(Diagnostic::CompoundLoopSplit {
            subloop_count: closed_splits + extracted_splits,
        });
    }

    let mut loops: Vec<Loop> = closed_loops;
    loops.extend(extracted_loops);

    if let Some((shape, hole_count)) = try_dense_fast_path(&loops, source_bbox_area) {
        log::debug!("dense fast path engaged: {hole_count} hole(s)");
        diagnostics.push(Diagnostic::DenseFastPathTaken { hole_count });
        let mut shapes = vec![shape];
        let (width, height) = normalize_coordinates(&mut shapes, source_bbox);
        return Ok((Document { width, height, shapes }, diagnostics));
    }

    if is_fragmented_sheet(&loops, source_bbox) {
        log::debug!("fragmented sheet detected, injecting hull and keeping only tiny loops");
        let tiny_area = crate::float_types::HULL_FRAGMENT_TINY_AREA_FRACTION * source_bbox_area;
        let mut kept: Vec<Loop> = loops.iter().filter(|l| l.area() <= tiny_area).cloned().collect();
        if let Some(hull) = convex_hull_loop(&all_points) {
            diagnostics.push(Diagnostic::UsedHullFallback);
            kept.push(hull);
        }
        loops = kept;
    } else if should_consider_hull(&loops, source_bbox_area) {
        if let Some(hull) = convex_hull_loop(&all_points) {
            log::debug!("hull fallback engaged: no plausible outer loop found");
            diagnostics.push(Diagnostic::UsedHullFallback);
            loops.push(hull);
        }
    }

    resolve_hierarchy(&mut loops);
    normalize_pseudo_holes(&mut loops, &mut diagnostics);

    let mut shapes = assemble_shapes(&loops);
    if shapes.is_empty() {
        return Err(ReconstructError::NoClosedRegion);
    }
    shapes = filter_overlay_artifacts(shapes, source_bbox_area, &mut diagnostics);

    let (width, height) = normalize_coordinates(&mut shapes, source_bbox);
    Ok((Document { width, height, shapes }, diagnostics))
}

/// Batch fan-out across independent documents (§5): each document still
/// reconstructs single-threaded internally, but unrelated documents run
/// across a `rayon` thread pool sized to the available hardware, grounded
/// on the teacher's own `parallel` feature wiring `rayon` into `geo` and
/// `hashbrown`.
#[cfg(feature = "parallel")]
pub fn reconstruct_batch(
    inputs: &[(Vec<Primitive>, ReconstructOptions)],
) -> Vec<Result<(Document, Vec<Diagnostic>), ReconstructError>> {
    use rayon::prelude::*;
    inputs
        .par_iter()
        .map(|(primitives, options)| reconstruct(primitives, options))
        .collect()
}

/// Convenience accessor mirroring §6's `primarySelectionLoop` output field:
/// the largest emitted shape's outer ring.
#[must_use]
pub fn primary_selection(document: &Document) -> Option<Vec<Point>> {
    primary_selection_loop(&document.shapes, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square_primitive(min: Real, max: Real) -> Vec<Primitive> {
        vec![
            Primitive::Line {
                start: Point::new(min, min),
                end: Point::new(max, min),
            },
            Primitive::Line {
                start: Point::new(max, min),
                end: Point::new(max, max),
            },
            Primitive::Line {
                start: Point::new(max, max),
                end: Point::new(min, max),
            },
            Primitive::Line {
                start: Point::new(min, max),
                end: Point::new(min, min),
            },
        ]
    }

    #[test]
    fn single_square_reconstructs_to_one_shape_no_holes() {
        let primitives = square_primitive(0.0, 10.0);
        let (doc, _diags) = reconstruct(&primitives, &ReconstructOptions::default()).unwrap();
        assert_eq!(doc.shapes.len(), 1);
        assert!(doc.shapes[0].holes.is_empty());
        assert!(signed_area(&doc.shapes[0].outer) > 0.0);
        assert!((doc.width - 10.0).abs() < 1e-6);
        assert!((doc.height - 10.0).abs() < 1e-6);
    }

    #[test]
    fn square_with_circle_hole_reconstructs_to_one_shape_one_hole() {
        let mut primitives = square_primitive(0.0, 10.0);
        primitives.push(Primitive::Circle {
            center: Point::new(5.0, 5.0),
            radius: 2.0,
        });
        let (doc, _diags) = reconstruct(&primitives, &ReconstructOptions::default()).unwrap();
        assert_eq!(doc.shapes.len(), 1);
        assert_eq!(doc.shapes[0].holes.len(), 1);
        assert!(doc.shapes[0].holes[0].len() >= 12);
    }

    #[test]
    fn empty_input_is_an_error() {
        let result = reconstruct(&[], &ReconstructOptions::default());
        assert!(matches!(result, Err(ReconstructError::EmptyDocument { .. })));
    }

    #[test]
    fn open_square_with_corner_gaps_still_closes() {
        // Gaps of 0.01 units, well under the stitcher's joinTol (0.03 for a
        // 10-unit square) so the cleaner/stitcher stage closes the loop
        // itself without needing the looser loop-extractor epsilons.
        let primitives = vec![
            Primitive::Line {
                start: Point::new(0.01, 0.0),
                end: Point::new(9.99, 0.0),
            },
            Primitive::Line {
                start: Point::new(10.0, 0.01),
                end: Point::new(10.0, 9.99),
            },
            Primitive::Line {
                start: Point::new(9.99, 10.0),
                end: Point::new(0.01, 10.0),
            },
            Primitive::Line {
                start: Point::new(0.0, 9.99),
                end: Point::new(0.0, 0.01),
            },
        ];
        let (doc, _diags) = reconstruct(&primitives, &ReconstructOptions::default()).unwrap();
        assert_eq!(doc.shapes.len(), 1);
        assert!(doc.shapes[0].holes.is_empty());
    }

    #[test]
    fn large_corner_gaps_close_via_fallback_stitch() {
        // Literal §8 scenario 6: a 100-unit square with 0.5-unit corner gaps.
        // minSide=100 puts the fallback tolerance at exactly
        // clamp(100*0.005, 0.05, 0.6) = 0.5, matching the gap distance, well
        // past both the cleaner's joinTol (~0.18) and the loop extractor's
        // widest epsilon (5e-2) -- only the fallback stitcher can close this.
        let d = 0.5 / 2.0_f64.sqrt();
        let primitives = vec![
            Primitive::Line {
                start: Point::new(d, 0.0),
                end: Point::new(100.0 - d, 0.0),
            },
            Primitive::Line {
                start: Point::new(100.0, d),
                end: Point::new(100.0, 100.0 - d),
            },
            Primitive::Line {
                start: Point::new(100.0 - d, 100.0),
                end: Point::new(d, 100.0),
            },
            Primitive::Line {
                start: Point::new(0.0, 100.0 - d),
                end: Point::new(0.0, d),
            },
        ];
        let (doc, _diags) = reconstruct(&primitives, &ReconstructOptions::default()).unwrap();
        assert_eq!(doc.shapes.len(), 1);
        assert!(doc.shapes[0].holes.is_empty());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn batch_reconstructs_each_document_independently() {
        let square = vec![
            Primitive::Line { start: Point::new(0.0, 0.0), end: Point::new(10.0, 0.0) },
            Primitive::Line { start: Point::new(10.0, 0.0), end: Point::new(10.0, 10.0) },
            Primitive::Line { start: Point::new(10.0, 10.0), end: Point::new(0.0, 10.0) },
            Primitive::Line { start: Point::new(0.0, 10.0), end: Point::new(0.0, 0.0) },
        ];
        let inputs = vec![
            (square.clone(), ReconstructOptions::default()),
            (Vec::new(), ReconstructOptions::default()),
            (square, ReconstructOptions::default()),
        ];
        let results = reconstruct_batch(&inputs);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().0.shapes.len() == 1);
        assert!(matches!(results[1], Err(ReconstructError::EmptyDocument { .. })));
        assert!(results[2].as_ref().unwrap().0.shapes.len() == 1);
    }
}
