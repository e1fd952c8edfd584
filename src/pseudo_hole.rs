//! Pseudo-hole normalizer (stage 7): flattens "holes" that are really just a
//! duplicated border offset of their parent loop rather than a genuine
//! cutout, re-parenting the offset's own children up to the grandparent.
//!
//! Runs as a bounded fixed-point loop over the hierarchy arena, mirroring
//! the iterative re-parenting style of `hierarchy.rs`'s own depth walk:
//! each pass recomputes `depth` via [`crate::hierarchy::recompute_depth`]
//! rather than keeping a separately-maintained tree structure.

use crate::errors::Diagnostic;
use crate::float_types::{PSEUDO_HOLE_BBOX_TOL, PSEUDO_HOLE_MAX_PASSES, Real};
use crate::hierarchy::{Loop, children_map, recompute_depth};

/// Insets of `child`'s bbox inside `parent`'s bbox, in order
/// `(left, right, bottom, top)`. Negative means `child` pokes outside
/// `parent` on that side.
fn insets(parent: &Loop, child: &Loop) -> (Real, Real, Real, Real) {
    let p = parent.bbox;
    let c = child.bbox;
    (
        c.min.x - p.min.x,
        p.max.x - c.max.x,
        c.min.y - p.min.y,
        p.max.y - c.max.y,
    )
}

fn is_border_offset(parent: &Loop, child: &Loop) -> bool {
    let (l, r, b, t) = insets(parent, child);
    let min_inset = l.min(r).min(b).min(t);
    let max_allowed = 4.0_f64.max(parent.bbox.width().min(parent.bbox.height()) * 0.06);
    min_inset >= -PSEUDO_HOLE_BBOX_TOL && min_inset <= max_allowed
}

/// Counts of loop `i`'s subtree size and of its parent's other tiny
/// children, computed once per pass from the current children map.
struct PassContext {
    children: Vec<Vec<usize>>,
    descendant_count: Vec<usize>,
}

impl PassContext {
    fn build(loops: &[Loop]) -> Self {
        let children = children_map(loops);
        let mut descendant_count = vec![0usize; loops.len()];
        // Subtree sizes via post-order: process in reverse topological order
        // using an explicit stack so depth never recurses into the call stack.
        let mut order = Vec::with_capacity(loops.len());
        let roots: Vec<usize> = (0..loops.len()).filter(|&i| loops[i].parent.is_none()).collect();
        let mut stack = roots;
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(children[idx].iter().copied());
        }
        for &idx in order.iter().rev() {
            let subtree: usize = children[idx].iter().map(|&c| 1 + descendant_count[c]).sum();
            descendant_count[idx] = subtree;
        }
        Self {
            children,
            descendant_count,
        }
    }

    fn tiny_siblings(&self, parent_idx: usize, exclude: usize, loops: &[Loop]) -> usize {
        let parent_area = loops[parent_idx].area();
        if parent_area <= crate::float_types::EPSILON {
            return 0;
        }
        self.children[parent_idx]
            .iter()
            .filter(|&&c| c != exclude && loops[c].area() / parent_area < 0.02)
            .count()
    }
}

/// Whether child loop `c` (index `c_idx`, direct odd-depth child of even-depth
/// `p_idx`) should be flattened rather than kept as a real hole.
fn should_skip_as_pseudo_hole(p_idx: usize, c_idx: usize, loops: &[Loop], ctx: &PassContext) -> bool {
    let parent = &loops[p_idx];
    let child = &loops[c_idx];
    let parent_area = parent.area();
    if parent_area <= crate::float_types::EPSILON {
        return false;
    }
    let area_ratio = child.area() / parent_area;
    let tiny_siblings = ctx.tiny_siblings(p_idx, c_idx, loops);

    if area_ratio > 0.70 && tiny_siblings >= 6 {
        return true;
    }

    if is_border_offset(parent, child) {
        let descendants = ctx.descendant_count[c_idx];
        if descendants >= 6 {
            return true;
        }
        if tiny_siblings >= 8 {
            return true;
        }
        if area_ratio > 0.82 && tiny_siblings >= 4 {
            return true;
        }
    }
    false
}

/// Runs the bounded pseudo-hole flattening loop, mutating `loops` in place
/// and appending a [`Diagnostic::PseudoHoleFlattened`] per loop skipped.
/// Stops early once a pass makes no changes.
pub fn normalize_pseudo_holes(loops: &mut [Loop], diagnostics: &mut Vec<Diagnostic>) {
    for pass in 0..PSEUDO_HOLE_MAX_PASSES {
        let ctx = PassContext::build(loops);
        let mut to_skip = Vec::new();
        for (p_idx, l) in loops.iter().enumerate() {
            if l.skipped || l.depth % 2 != 0 {
                continue;
            }
            for &c_idx in &ctx.children[p_idx] {
                if loops[c_idx].skipped || loops[c_idx].depth % 2 == 0 {
                    continue;
                }
                if should_skip_as_pseudo_hole(p_idx, c_idx, loops, &ctx) {
                    to_skip.push((p_idx, c_idx));
                }
            }
        }
        if to_skip.is_empty() {
            log::debug!("pseudo-hole normalizer converged after {pass} pass(es)");
            return;
        }
        log::debug!("pseudo-hole normalizer pass {pass}: flattened {} loop(s)", to_skip.len());
        for (p_idx, c_idx) in to_skip {
            loops[c_idx].skipped = true;
            diagnostics.push(Diagnostic::PseudoHoleFlattened {
                at: loops[c_idx].interior_sample,
            });
            for grandchild in ctx.children[c_idx].clone() {
                loops[grandchild].parent = Some(p_idx);
            }
            loops[c_idx].parent = None;
        }
        recompute_depth(loops);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn rect(minx: Real, miny: Real, maxx: Real, maxy: Real) -> Vec<Point> {
        vec![
            Point::new(minx, miny),
            Point::new(maxx, miny),
            Point::new(maxx, maxy),
            Point::new(minx, maxy),
        ]
    }

    #[test]
    fn duplicated_border_offset_with_many_tiny_children_is_flattened() {
        let outer = Loop::new(rect(0.0, 0.0, 100.0, 100.0)).unwrap();
        // A near-duplicate of the outer border, inset by 1 unit: classic
        // "double outline" artifact rather than a real cutout.
        let offset = Loop::new(rect(1.0, 1.0, 99.0, 99.0)).unwrap();
        let mut loops = vec![outer, offset];
        for i in 0..8 {
            let x = 5.0 + (i as Real) * 10.0;
            loops.push(Loop::new(rect(x, 5.0, x + 1.0, 6.0)).unwrap());
        }
        crate::hierarchy::resolve_hierarchy(&mut loops);
        assert_eq!(loops[1].depth, 1);

        let mut diags = Vec::new();
        normalize_pseudo_holes(&mut loops, &mut diags);

        assert!(loops[1].skipped);
        assert_eq!(diags.len(), 1);
        // the 8 tiny rects now re-parent directly to the outer loop
        for l in &loops[2..] {
            assert_eq!(l.parent, Some(0));
            assert_eq!(l.depth, 1);
        }
    }

    #[test]
    fn genuine_small_hole_is_kept() {
        let outer = Loop::new(rect(0.0, 0.0, 100.0, 100.0)).unwrap();
        let hole = Loop::new(rect(40.0, 40.0, 60.0, 60.0)).unwrap();
        let mut loops = vec![outer, hole];
        crate::hierarchy::resolve_hierarchy(&mut loops);

        let mut diags = Vec::new();
        normalize_pseudo_holes(&mut loops, &mut diags);

        assert!(!loops[1].skipped);
        assert!(diags.is_empty());
    }
}
