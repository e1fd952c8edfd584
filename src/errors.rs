//! Error and diagnostic taxonomy.
//!
//! The engine never fails on bad input geometry; it discards the offending
//! piece and records why. Only two conditions ever reach the caller as an
//! `Err`: [`ReconstructError::EmptyDocument`] and
//! [`ReconstructError::NoClosedRegion`]. Everything else -- a non-finite
//! coordinate, a degenerate contour -- becomes a [`Diagnostic`] collected
//! alongside a successful (possibly empty) output.

use crate::float_types::Real;
use crate::geometry::Point;
use thiserror::Error;

/// Failures that abort reconstruction of a document.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconstructError {
    /// Zero valid contours survived normalization and cleaning, or the
    /// document's bounding box is degenerate (width or height ≤ ε).
    #[error(
        "document has no usable geometry (contours={contour_count}, width={width}, height={height})"
    )]
    EmptyDocument {
        contour_count: usize,
        width: Real,
        height: Real,
    },
    /// Loop extraction produced zero closed loops and the reparse policy
    /// could not recover an open-contour fallback either.
    #[error("no closed region could be formed from the input geometry")]
    NoClosedRegion,
}

/// A locally-dropped degeneracy, recorded rather than propagated.
#[derive(Debug, Clone, PartialEq)]
pub enum DroppedPrimitive {
    /// A primitive discretized to fewer than two valid points.
    InvalidPrimitive { reason: &'static str },
    /// A contour collapsed below the minimum point count or length after
    /// dedup.
    DegenerateContour { point_count: usize, length: Real },
}

/// Non-fatal, output-preserving observations about how a document was
/// reconstructed. Consumers may use these to decide whether to warn a user;
/// the engine never alters its output contract because of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A primitive or contour was dropped before loop extraction.
    Dropped(DroppedPrimitive),
    /// No primitive produced a closed entity; every contour started open.
    NoClosedEntity,
    /// One or more open polylines were auto-closed by the stitcher because
    /// their endpoints were within `closeTol`.
    AutoClosedOpenPolylines { count: usize },
    /// The orchestrator reparsed the document in raw LINE/ARC mode.
    ReparsedAsRawLineArc,
    /// The convex hull fallback supplied the outer boundary.
    UsedHullFallback,
    /// The dense-perforation fast path short-circuited the pipeline.
    DenseFastPathTaken { hole_count: usize },
    /// A candidate loop was suspicious and the compound splitter replaced it
    /// with simple subloops.
    CompoundLoopSplit { subloop_count: usize },
    /// An odd-depth loop was flattened as a pseudo-hole and its children
    /// re-parented to the grandparent.
    PseudoHoleFlattened { at: Point },
    /// The artifact-overlay filter dropped a non-dominant shape near a dense
    /// perforation pattern.
    OverlayShapeDropped,
}
