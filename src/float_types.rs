//! Scalar type and the tolerance constants referenced throughout the design.
//!
//! Every magic number the pipeline stages lean on is named here instead of
//! inlined, the way the grounding crate centralizes its unit and epsilon
//! constants rather than scattering literals through the algorithms.

/// The engine works exclusively in `f64`; there is no `f32` build, unlike the
/// teacher crate's dual-precision feature split (2D CAD reconstruction has no
/// rendering-path memory pressure that would justify `f32`).
pub type Real = f64;

/// Archimedes' constant (π)
pub const PI: Real = core::f64::consts::PI;

/// General-purpose "close enough to zero" tolerance used for coordinate
/// deduplication and finite-value checks.
pub const EPSILON: Real = 1e-9;

/// Consecutive-vertex dedup tolerance in the contour cleaner.
pub const VERTEX_DEDUP_TOL: Real = 1e-5;

/// Closed contours shorter than this perimeter are dropped as degenerate.
pub const MIN_CLOSED_CONTOUR_LENGTH: Real = 0.10;

/// Endpoint coincidence tolerance used to decide whether a polyline/spline is
/// implicitly closed even when its source flag says otherwise.
pub const IMPLICIT_CLOSURE_TOL: Real = 1e-6;

/// Quantization tolerances tried in order by the loop extractor.
pub const LOOP_EXTRACT_EPSILONS: [Real; 3] = [1e-4, 1e-2, 5e-2];

/// Quantization tolerances tried by the compound-loop splitter.
pub const COMPOUND_SPLIT_EPSILONS: [Real; 2] = [1e-4, 5e-4];

/// Repeated-vertex tolerance used by the suspicious-loop test.
pub const SUSPICIOUS_REPEAT_TOL: Real = 1e-4;

/// Acceptable range of `|signedArea| / bboxArea` for a non-suspicious loop.
pub const SUSPICIOUS_FILL_RATIO: (Real, Real) = (0.42, 1.08);

/// Area-growth slack required for a parent to dominate a child in the
/// hierarchy resolver.
pub const HIERARCHY_AREA_SLACK: Real = 1e-8;

/// Bounding-box tolerance used when matching a pseudo-hole candidate against
/// its parent's extent.
pub const PSEUDO_HOLE_BBOX_TOL: Real = 1e-4;

/// Hard cap on pseudo-hole normalizer passes.
pub const PSEUDO_HOLE_MAX_PASSES: usize = 8;

/// Loop-count threshold that engages the dense-perforation fast path.
pub const DENSE_FAST_PATH_MIN_LOOPS: usize = 220;
pub const DENSE_FAST_PATH_MIN_CHILDREN: usize = 120;
pub const DENSE_FAST_PATH_MIN_DEDUP_HOLES: usize = 90;
pub const DENSE_FAST_PATH_OUTER_AREA_FRACTION: Real = 0.30;
pub const DENSE_FAST_PATH_CHILD_AREA_FRACTION: Real = 0.02;

/// Artifact-overlay filter thresholds.
pub const OVERLAY_DOMINANT_MIN_HOLES: usize = 80;
pub const OVERLAY_DOMINANT_MIN_AREA_FRACTION: Real = 0.35;
pub const OVERLAY_AREA_RATIO_RANGE: (Real, Real) = (0.04, 0.98);
pub const OVERLAY_DENSITY_RATIO_MAX: Real = 0.35;
pub const OVERLAY_AREA_RATIO_FLOOR: Real = 0.16;
pub const OVERLAY_BBOX_OVERLAP_MIN: Real = 0.45;
pub const OVERLAY_COLLAPSE_AREA_RATIO_MIN: Real = 0.10;
pub const OVERLAY_COLLAPSE_DENSITY_RATIO_MAX: Real = 0.45;
pub const OVERLAY_COLLAPSE_MIN_HOLES: usize = 160;

/// Hull fallback gate thresholds.
pub const HULL_NO_LOOP_AREA_FRACTION: Real = 0.05;
pub const HULL_TINY_MAX_LOOP_AREA_FRACTION: Real = 0.01;
pub const HULL_CONTAINER_MIN_OTHERS: usize = 3;
pub const HULL_CONTAINER_AREA_VS_SECOND: Real = 6.0;
pub const HULL_CONTAINER_MIN_AREA_FRACTION: Real = 0.002;
pub const HULL_FRAGMENT_MIN_ROOTS: usize = 3;
pub const HULL_FRAGMENT_MIN_TINY_LOOPS: usize = 6;
pub const HULL_FRAGMENT_TINY_AREA_FRACTION: Real = 0.002;
pub const HULL_FRAGMENT_MAX_LARGEST_ROOT_FRACTION: Real = 0.45;

/// Reparse policy thresholds.
pub const REPARSE_MIN_OPEN_CONTOURS: usize = 2;
pub const REPARSE_MAX_CLOSED_AREA_FRACTION: Real = 0.02;

/// Fallback open-contour stitch tolerance, used when loop extraction on raw
/// segments finds nothing at any epsilon: `clamp(minSide·0.005, 0.05, 0.6)`.
pub const FALLBACK_STITCH_TOL_SCALE: Real = 0.005;
pub const FALLBACK_STITCH_TOL_MIN: Real = 0.05;
pub const FALLBACK_STITCH_TOL_MAX: Real = 0.6;
