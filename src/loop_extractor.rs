//! Loop extractor (stage 4): reconstructs closed loops from a set of open
//! segments via tolerance-progressive graph traversal.
//!
//! Grounded on the design note's own prescription (§9 "Cyclic graph
//! shapes"): adjacency is a quantized-key -> edge-index map with no
//! back-pointers, and traversal state is two parallel arrays (`segments`,
//! `used`) rather than a mutable graph structure.

use crate::contour::{Contour, Segment};
use crate::float_types::{LOOP_EXTRACT_EPSILONS, Real};
use crate::geometry::Point;
use hashbrown::HashMap;

type Key = (i64, i64);

struct Graph<'a> {
    segments: &'a [Segment],
    a_keys: Vec<Key>,
    b_keys: Vec<Key>,
    adjacency: HashMap<Key, Vec<usize>>,
    used: Vec<bool>,
}

impl<'a> Graph<'a> {
    fn build(segments: &'a [Segment], eps: Real) -> Self {
        let mut adjacency: HashMap<Key, Vec<usize>> = HashMap::new();
        let mut a_keys = Vec::with_capacity(segments.len());
        let mut b_keys = Vec::with_capacity(segments.len());
        for (idx, seg) in segments.iter().enumerate() {
            let ak = seg.a.quantize(eps);
            let bk = seg.b.quantize(eps);
            adjacency.entry(ak).or_default().push(idx);
            adjacency.entry(bk).or_default().push(idx);
            a_keys.push(ak);
            b_keys.push(bk);
        }
        Self {
            segments,
            a_keys,
            b_keys,
            adjacency,
            used: vec![false; segments.len()],
        }
    }

    /// The endpoint of `edge` that is *not* at `from_key`, along with its key.
    fn other_end(&self, edge: usize, from_key: Key) -> (Point, Key) {
        if self.a_keys[edge] == from_key {
            (self.segments[edge].b, self.b_keys[edge])
        } else {
            (self.segments[edge].a, self.a_keys[edge])
        }
    }

    /// Picks the next unused edge at `at_key`, preferring one whose far
    /// endpoint is not `prev_key` (avoid immediately backtracking along the
    /// edge just traversed).
    fn choose_next(&self, at_key: Key, prev_key: Key) -> Option<usize> {
        let candidates = self.adjacency.get(&at_key)?;
        let mut fallback = None;
        for &edge in candidates {
            if self.used[edge] {
                continue;
            }
            let (_, far_key) = self.other_end(edge, at_key);
            if far_key != prev_key {
                return Some(edge);
            }
            if fallback.is_none() {
                fallback = Some(edge);
            }
        }
        fallback
    }
}

/// Walks every unused edge once, emitting loops of at least 3 points.
/// Dead-end walks are discarded (their edges stay marked used).
fn extract_loops_at_eps(segments: &[Segment], eps: Real) -> Vec<Vec<Point>> {
    let mut graph = Graph::build(segments, eps);
    let mut loops = Vec::new();

    for start in 0..segments.len() {
        if graph.used[start] {
            continue;
        }
        graph.used[start] = true;
        let start_key = graph.a_keys[start];
        let mut prev_key = start_key;
        let (mut current_point, mut current_key) = graph.other_end(start, start_key);
        let mut path = vec![segments[start].a, current_point];

        let closed = loop {
            if current_key == start_key {
                break true;
            }
            let Some(next_edge) = graph.choose_next(current_key, prev_key) else {
                break false;
            };
            graph.used[next_edge] = true;
            let (next_point, next_key) = graph.other_end(next_edge, current_key);
            prev_key = current_key;
            current_key = next_key;
            current_point = next_point;
            path.push(current_point);
        };

        if closed {
            path.pop(); // drop the duplicate closing point; loops store openPts only
            if path.len() >= 3 {
                loops.push(path);
            }
        }
    }
    loops
}

/// Runs the extractor at progressively looser quantization tolerances,
/// stopping at the first one that yields at least one loop.
#[must_use]
pub fn extract_loops(segments: &[Segment]) -> Vec<Vec<Point>> {
    extract_loops_with_epsilons(segments, &LOOP_EXTRACT_EPSILONS)
}

#[must_use]
pub fn extract_loops_with_epsilons(segments: &[Segment], epsilons: &[Real]) -> Vec<Vec<Point>> {
    for &eps in epsilons {
        let loops = extract_loops_at_eps(segments, eps);
        if !loops.is_empty() {
            log::debug!("loop extractor succeeded at eps={eps}, {} loop(s)", loops.len());
            return loops;
        }
    }
    if !segments.is_empty() {
        log::debug!(
            "loop extractor found no loops across {} segment(s) at any of {} epsilon(s)",
            segments.len(),
            epsilons.len()
        );
    }
    Vec::new()
}

/// Collects all segments from a set of open contours (closed contours are
/// assumed to already be handled as direct loop candidates upstream).
#[must_use]
pub fn segments_from_open_contours(contours: &[Contour]) -> Vec<Segment> {
    contours
        .iter()
        .filter(|c| !c.closed)
        .flat_map(Contour::segments)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: Real, ay: Real, bx: Real, by: Real) -> Segment {
        Segment::new(Point::new(ax, ay), Point::new(bx, by)).unwrap()
    }

    #[test]
    fn four_sides_form_one_square_loop() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 10.0),
            seg(10.0, 10.0, 0.0, 10.0),
            seg(0.0, 10.0, 0.0, 0.0),
        ];
        let loops = extract_loops(&segments);
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }

    #[test]
    fn gapped_square_needs_looser_epsilon() {
        // 0.3-unit gaps at each corner: tight eps finds nothing, eps=1.0
        // quantizes both sides of each gap to the same integer key and closes it.
        let segments = vec![
            seg(0.3, 0.0, 9.7, 0.0),
            seg(10.0, 0.3, 10.0, 9.7),
            seg(9.7, 10.0, 0.3, 10.0),
            seg(0.0, 9.7, 0.0, 0.3),
        ];
        assert!(extract_loops_with_epsilons(&segments, &[1e-4]).is_empty());
        let loops = extract_loops_with_epsilons(&segments, &[1e-4, 1.0]);
        assert_eq!(loops.len(), 1);
    }

    #[test]
    fn disconnected_segments_yield_no_loop() {
        let segments = vec![seg(0.0, 0.0, 1.0, 0.0), seg(5.0, 5.0, 6.0, 5.0)];
        assert!(extract_loops(&segments).is_empty());
    }
}
