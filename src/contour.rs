//! Contour cleaner and stitcher (stage 2), plus the [`Contour`] and
//! [`Segment`] value types shared by every later stage.
//!
//! Continuity stitching here is grounded on the greedy nearest-endpoint
//! joiner pattern from the `mujou` sand-table pipeline's path joiner
//! (`PathJoinerKind::join_retrace`): that module walks a pool of ordered
//! polylines picking the closest next candidate by endpoint distance. This
//! stitcher generalizes the same "closest unused endpoint" greedy walk to
//! four orientations (start/end of each side) and a join-gap tolerance
//! instead of an unconditional join.

use crate::errors::{Diagnostic, DroppedPrimitive};
use crate::float_types::{MIN_CLOSED_CONTOUR_LENGTH, Real, VERTEX_DEDUP_TOL};
use crate::geometry::{Aabb, Point, polyline_length};

/// An ordered point sequence with a closed/open flag. `closed` implies the
/// first and last points are distinct and the ring edge between them is
/// implicit, never materialized in `points`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Contour {
    #[must_use]
    pub fn new(points: Vec<Point>, closed: bool) -> Self {
        Self { points, closed }
    }

    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Every consecutive pair as a [`Segment`], plus the implicit closing
    /// edge when `closed` is set.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        let mut segs: Vec<Segment> = self
            .points
            .windows(2)
            .filter_map(|pair| Segment::new(pair[0], pair[1]))
            .collect();
        if self.closed
            && let (Some(first), Some(last)) = (self.first(), self.last())
            && let Some(closing) = Segment::new(last, first)
        {
            segs.push(closing);
        }
        segs
    }
}

/// A single edge, guaranteed non-degenerate at construction (`‖a−b‖ > 1e-9`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    #[must_use]
    pub fn new(a: Point, b: Point) -> Option<Self> {
        if a.distance_to(b) > crate::float_types::EPSILON {
            Some(Self { a, b })
        } else {
            None
        }
    }

    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }
}

/// Tunables for the cleaner/stitcher stage.
#[derive(Debug, Clone, Copy)]
pub struct ContourCleanerOptions {
    pub vertex_dedup_tol: Real,
    pub min_closed_length: Real,
    /// Multiplier applied to `minSide` when deriving `joinTol`.
    pub join_tol_scale: Real,
    pub join_tol_min: Real,
    pub join_tol_max: Real,
    pub close_tol_scale: Real,
    pub close_tol_min: Real,
    /// Multiplier applied to `minSide` when deriving the cluster `joinGap`.
    pub cluster_gap_scale: Real,
    pub cluster_gap_min: Real,
    pub cluster_gap_max: Real,
    pub cluster_score_ratio: Real,
    pub cluster_area_ratio: Real,
    pub cluster_overall_area_ratio: Real,
    pub cluster_overall_score_ratio: Real,
}

impl Default for ContourCleanerOptions {
    fn default() -> Self {
        Self {
            vertex_dedup_tol: VERTEX_DEDUP_TOL,
            min_closed_length: MIN_CLOSED_CONTOUR_LENGTH,
            join_tol_scale: 0.0018,
            join_tol_min: 0.03,
            join_tol_max: 0.45,
            close_tol_scale: 1.35,
            close_tol_min: 0.05,
            cluster_gap_scale: 0.05,
            cluster_gap_min: 0.5,
            cluster_gap_max: 20.0,
            cluster_score_ratio: 2.4,
            cluster_area_ratio: 1.8,
            cluster_overall_area_ratio: 1.45,
            cluster_overall_score_ratio: 1.6,
        }
    }
}

fn clamp(v: Real, lo: Real, hi: Real) -> Real {
    v.max(lo).min(hi)
}

/// Drops consecutive duplicate vertices within tolerance and discards
/// contours that collapse below the minimum point count or length.
fn dedup_and_drop_degenerate(
    contours: Vec<Contour>,
    options: &ContourCleanerOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Contour> {
    contours
        .into_iter()
        .filter_map(|contour| {
            let mut pts: Vec<Point> = Vec::with_capacity(contour.points.len());
            for p in contour.points {
                if pts
                    .last()
                    .is_none_or(|&last| last.distance_to(p) > options.vertex_dedup_tol)
                {
                    pts.push(p);
                }
            }
            if contour.closed
                && pts.len() > 1
                && pts[0].distance_to(*pts.last().unwrap()) <= options.vertex_dedup_tol
            {
                pts.pop();
            }
            let min_len = if contour.closed { 3 } else { 2 };
            if pts.len() < min_len {
                diagnostics.push(Diagnostic::Dropped(DroppedPrimitive::DegenerateContour {
                    point_count: pts.len(),
                    length: polyline_length(&pts),
                }));
                return None;
            }
            if contour.closed {
                let length = polyline_length(&pts) + pts.last().unwrap().distance_to(pts[0]);
                if length <= options.min_closed_length {
                    diagnostics.push(Diagnostic::Dropped(DroppedPrimitive::DegenerateContour {
                        point_count: pts.len(),
                        length,
                    }));
                    return None;
                }
            }
            Some(Contour::new(pts, contour.closed))
        })
        .collect()
}

/// The four ways two open polylines can be spliced end-to-end.
#[derive(Clone, Copy)]
enum Join {
    /// `self` end -> `other` start
    EndToStart,
    /// `self` end -> `other` end (other reversed)
    EndToEnd,
}

fn best_join(chain: &Contour, candidate: &Contour, join_tol: Real) -> Option<(usize, Join, Real)> {
    let chain_end = chain.last()?;
    let cand_start = candidate.first()?;
    let cand_end = candidate.last()?;
    let d_start = chain_end.distance_to(cand_start);
    let d_end = chain_end.distance_to(cand_end);
    if d_start <= join_tol && d_start <= d_end {
        Some((0, Join::EndToStart, d_start))
    } else if d_end <= join_tol {
        Some((0, Join::EndToEnd, d_end))
    } else {
        None
    }
}

/// Greedily attaches the nearest-endpoint unused polyline to the growing
/// chain until no candidate is within `joinTol`, then checks whether the
/// chain closes within `closeTol`.
fn stitch_pool(mut pool: Vec<Contour>, join_tol: Real, close_tol: Real) -> (Vec<Contour>, usize) {
    let mut stitched = Vec::new();
    let mut auto_closed = 0;
    while let Some(mut chain) = pool.pop() {
        loop {
            let mut best: Option<(usize, Join, Real)> = None;
            for (idx, candidate) in pool.iter().enumerate() {
                if let Some((_, join, dist)) = best_join(&chain, candidate, join_tol) {
                    if best.is_none_or(|(_, _, best_dist)| dist < best_dist) {
                        best = Some((idx, join, dist));
                    }
                }
                // also consider attaching the candidate's reversed form
                let reversed = Contour::new(
                    candidate.points.iter().rev().copied().collect(),
                    candidate.closed,
                );
                if let Some((_, join, dist)) = best_join(&chain, &reversed, join_tol) {
                    if best.is_none_or(|(_, _, best_dist)| dist < best_dist) {
                        best = Some((idx, join, dist));
                    }
                }
            }
            let Some((idx, join, _)) = best else { break };
            let candidate = pool.remove(idx);
            let mut to_append: Vec<Point> = match join {
                Join::EndToStart => candidate.points,
                Join::EndToEnd => candidate.points.into_iter().rev().collect(),
            };
            // the first point of `to_append` coincides (within joinTol) with
            // the chain's current last point; drop it to avoid a duplicate.
            if !to_append.is_empty() {
                to_append.remove(0);
            }
            chain.points.extend(to_append);
        }
        if let (Some(first), Some(last)) = (chain.first(), chain.last())
            && first.distance_to(last) <= close_tol
            && chain.points.len() >= 3
        {
            let mut pts = chain.points;
            if first.distance_to(*pts.last().unwrap()) <= crate::float_types::VERTEX_DEDUP_TOL {
                pts.pop();
            }
            chain = Contour::new(pts, true);
            auto_closed += 1;
        }
        stitched.push(chain);
    }
    (stitched, auto_closed)
}

/// Fallback stitcher (§4.3): joins open contours directly at a single
/// join/close tolerance, used when loop extraction on their raw segments
/// finds nothing at any quantization epsilon.
#[must_use]
pub fn stitch_open_contours_at_tolerance(contours: Vec<Contour>, tol: Real) -> Vec<Contour> {
    let (stitched, auto_closed) = stitch_pool(contours, tol, tol);
    log::debug!("fallback stitch at tol={tol}: {auto_closed} contour(s) closed");
    stitched
}

/// Union-find over contour bounding boxes within `joinGap`, used by the
/// cluster filter to group geometrically nearby contours.
fn cluster_contours(boxes: &[Aabb], join_gap: Real) -> Vec<Vec<usize>> {
    let n = boxes.len();
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let expanded = Aabb {
                min: Point::new(boxes[i].min.x - join_gap, boxes[i].min.y - join_gap),
                max: Point::new(boxes[i].max.x + join_gap, boxes[i].max.y + join_gap),
            };
            if expanded.overlap_fraction(boxes[j]) > 0.0 || expanded.contains_bbox(boxes[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }
    let mut groups: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(i);
    }
    groups.into_values().collect()
}

fn contour_area(contour: &Contour) -> Real {
    crate::geometry::signed_area(&contour.points).abs()
}

/// Keeps only the dominant cluster of contours by `totalLength · √area`
/// score when the data supports it; otherwise returns every contour.
fn filter_dominant_cluster(
    contours: Vec<Contour>,
    options: &ContourCleanerOptions,
) -> Vec<Contour> {
    if contours.len() < 2 {
        return contours;
    }
    let boxes: Vec<Aabb> = contours
        .iter()
        .filter_map(|c| Aabb::from_points(&c.points))
        .collect();
    if boxes.len() != contours.len() {
        return contours;
    }
    let overall = boxes
        .iter()
        .copied()
        .reduce(Aabb::union)
        .expect("non-empty");
    let min_side = overall.min_side().max(1.0);
    let join_gap = clamp(
        min_side * options.cluster_gap_scale,
        options.cluster_gap_min,
        options.cluster_gap_max,
    );
    let clusters = cluster_contours(&boxes, join_gap);
    if clusters.len() < 2 {
        return contours;
    }
    let mut scored: Vec<(Real, Real, Vec<usize>)> = clusters
        .into_iter()
        .map(|idxs| {
            let total_length: Real = idxs
                .iter()
                .map(|&i| {
                    if contours[i].closed {
                        polyline_length(&contours[i].points)
                            + contours[i].points.last().unwrap().distance_to(contours[i].points[0])
                    } else {
                        polyline_length(&contours[i].points)
                    }
                })
                .sum();
            let area: Real = idxs.iter().map(|&i| contour_area(&contours[i])).sum();
            (total_length * area.sqrt(), area, idxs)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    let (main_score, main_area, main_idxs) = &scored[0];
    let (alt_score, alt_area, _) = &scored[1];
    let overall_area: Real = scored.iter().map(|(_, area, _)| area).sum();

    let dominated = (*main_score > alt_score * options.cluster_score_ratio
        && *main_area > alt_area * options.cluster_area_ratio)
        || (overall_area > main_area * options.cluster_overall_area_ratio
            && *main_score > alt_score * options.cluster_overall_score_ratio);

    if dominated {
        main_idxs.iter().map(|&i| contours[i].clone()).collect()
    } else {
        contours
    }
}

/// Runs the full cleaner/stitcher stage: dedup, drop degenerate contours,
/// stitch near-touching open contours, then suppress non-dominant clusters.
pub fn clean_and_stitch(
    contours: Vec<Contour>,
    options: &ContourCleanerOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Contour> {
    let cleaned = dedup_and_drop_degenerate(contours, options, diagnostics);
    if cleaned.is_empty() {
        return cleaned;
    }
    let boxes: Vec<Aabb> = cleaned
        .iter()
        .filter_map(|c| Aabb::from_points(&c.points))
        .collect();
    let overall = boxes
        .into_iter()
        .reduce(Aabb::union)
        .unwrap_or(Aabb {
            min: Point::new(0.0, 0.0),
            max: Point::new(0.0, 0.0),
        });
    let min_side = overall.min_side().max(1.0);
    let join_tol = clamp(
        min_side * options.join_tol_scale,
        options.join_tol_min,
        options.join_tol_max,
    );
    let close_tol = (join_tol * options.close_tol_scale).max(options.close_tol_min);

    let (closed, open): (Vec<Contour>, Vec<Contour>) =
        cleaned.into_iter().partition(|c| c.closed);
    let stitched = if open.len() >= 2 {
        let (stitched, auto_closed) = stitch_pool(open, join_tol, close_tol);
        if auto_closed > 0 {
            diagnostics.push(Diagnostic::AutoClosedOpenPolylines { count: auto_closed });
        }
        stitched
    } else {
        open
    };

    let mut merged = closed;
    merged.extend(stitched);
    filter_dominant_cluster(merged, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_duplicates_are_dropped() {
        let contour = Contour::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
            ],
            false,
        );
        let mut diags = Vec::new();
        let result = dedup_and_drop_degenerate(vec![contour], &ContourCleanerOptions::default(), &mut diags);
        assert_eq!(result[0].points.len(), 2);
    }

    #[test]
    fn tiny_closed_contour_is_dropped() {
        let contour = Contour::new(
            vec![Point::new(0.0, 0.0), Point::new(0.01, 0.0), Point::new(0.0, 0.01)],
            true,
        );
        let mut diags = Vec::new();
        let result = dedup_and_drop_degenerate(vec![contour], &ContourCleanerOptions::default(), &mut diags);
        assert!(result.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn open_contours_with_small_gap_are_stitched_closed() {
        // square with 0.01-unit gaps, well under default joinTol for this scale
        let sides = vec![
            Contour::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)], false),
            Contour::new(vec![Point::new(10.0, 0.0), Point::new(10.0, 10.0)], false),
            Contour::new(vec![Point::new(10.0, 10.0), Point::new(0.0, 10.0)], false),
            Contour::new(vec![Point::new(0.0, 10.0), Point::new(0.0, 0.0)], false),
        ];
        let mut diags = Vec::new();
        let result = clean_and_stitch(sides, &ContourCleanerOptions::default(), &mut diags);
        assert_eq!(result.len(), 1);
        assert!(result[0].closed);
    }

    #[test]
    fn dominant_cluster_suppresses_a_far_away_stray_mark() {
        let mut square_pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let square = Contour::new(std::mem::take(&mut square_pts), true);
        let stray = Contour::new(
            vec![
                Point::new(1000.0, 1000.0),
                Point::new(1000.1, 1000.0),
                Point::new(1000.0, 1000.1),
            ],
            true,
        );
        let options = ContourCleanerOptions {
            min_closed_length: 0.0,
            ..ContourCleanerOptions::default()
        };
        let mut diags = Vec::new();
        let result = clean_and_stitch(vec![square, stray], &options, &mut diags);
        assert_eq!(result.len(), 1);
    }
}
