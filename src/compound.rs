//! Compound-loop splitter (stage 5): detects self-retracing / auto-
//! intersecting loops and explodes them into simple subloops, deduplicated
//! by hole center.
//!
//! Reuses the loop extractor (§4.3/`loop_extractor.rs`) on a suspicious
//! loop's own ring segments at the tighter compound-split epsilons -- the
//! same quantized-adjacency graph walk, just re-entered on a single loop's
//! edges instead of the whole document's.

use crate::contour::Segment;
use crate::float_types::{COMPOUND_SPLIT_EPSILONS, Real, SUSPICIOUS_FILL_RATIO, SUSPICIOUS_REPEAT_TOL};
use crate::hierarchy::Loop;
use crate::loop_extractor::extract_loops_with_epsilons;

fn ring_segments(open_pts: &[crate::geometry::Point]) -> Vec<Segment> {
    let n = open_pts.len();
    (0..n)
        .filter_map(|i| Segment::new(open_pts[i], open_pts[(i + 1) % n]))
        .collect()
}

fn has_repeated_nonadjacent_vertex(pts: &[crate::geometry::Point]) -> bool {
    let n = pts.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            if pts[i].distance_to(pts[j]) < SUSPICIOUS_REPEAT_TOL {
                return true;
            }
        }
    }
    false
}

/// A loop is suspicious when it repeats a non-adjacent vertex, or its fill
/// ratio (`|signedArea| / bboxArea`) falls outside the plausible range for a
/// simple polygon.
#[must_use]
pub fn is_suspicious(lp: &Loop) -> bool {
    if has_repeated_nonadjacent_vertex(&lp.open_pts) {
        return true;
    }
    let bbox_area = lp.bbox.area();
    if bbox_area <= crate::float_types::EPSILON {
        return false;
    }
    let ratio = lp.area() / bbox_area;
    ratio < SUSPICIOUS_FILL_RATIO.0 || ratio > SUSPICIOUS_FILL_RATIO.1
}

fn median_min_dim(loops: &[Loop]) -> Real {
    let mut dims: Vec<Real> = loops.iter().map(|l| l.bbox.min_side()).collect();
    dims.sort_by(Real::total_cmp);
    if dims.is_empty() {
        return 0.0;
    }
    dims[dims.len() / 2]
}

/// Deduplicates subloops by quantized interior-sample center, keeping the
/// largest-area representative per cell, sorted by area descending.
fn dedup_by_center(loops: Vec<Loop>) -> Vec<Loop> {
    let quant = (median_min_dim(&loops) * 0.15).clamp(1e-4, 0.5);
    let mut best: hashbrown::HashMap<(i64, i64), Loop> = hashbrown::HashMap::new();
    for lp in loops {
        let key = lp.interior_sample.quantize(quant);
        best.entry(key)
            .and_modify(|existing| {
                if lp.area() > existing.area() {
                    *existing = lp.clone();
                }
            })
            .or_insert(lp);
    }
    let mut out: Vec<Loop> = best.into_values().collect();
    out.sort_by(|a, b| b.area().total_cmp(&a.area()));
    out
}

/// Splits a suspicious loop into its simple constituent subloops. Returns
/// the loop unchanged (as a single-element vector) when it is not
/// suspicious, or when re-extraction finds no genuine split.
#[must_use]
pub fn split_if_compound(lp: &Loop) -> Vec<Loop> {
    if !is_suspicious(lp) {
        return vec![lp.clone()];
    }
    let segments = ring_segments(&lp.open_pts);
    for &eps in &COMPOUND_SPLIT_EPSILONS {
        let raw = extract_loops_with_epsilons(&segments, &[eps]);
        let subloops: Vec<Loop> = raw.into_iter().filter_map(Loop::new).collect();
        if subloops.len() > 1 {
            return dedup_by_center(subloops);
        }
    }
    vec![lp.clone()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn simple_square_is_not_suspicious() {
        let lp = Loop::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .unwrap();
        assert!(!is_suspicious(&lp));
        assert_eq!(split_if_compound(&lp).len(), 1);
    }

    #[test]
    fn self_retracing_square_is_suspicious_and_splits_to_one_loop() {
        // Traces the same square perimeter twice: (0,0)-(10,0)-(10,10)-(0,10)-(0,0)-(10,0)-(10,10)-(0,10)
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let lp = Loop::new(pts).unwrap();
        assert!(is_suspicious(&lp));
        let split = split_if_compound(&lp);
        assert_eq!(split.len(), 1);
        assert!((split[0].area() - 100.0).abs() < 1e-6);
    }
}
