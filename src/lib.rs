//! A **2D contour reconstruction engine**: turns loose CAD primitives
//! (lines, arcs, circles, bulge-encoded polylines, splines) into clean
//! planar shapes-with-holes suitable for downstream extrusion.
//!
//! # Pipeline
//! 1. [`primitive`] — discretizes typed primitives into [`contour::Contour`] values.
//! 2. [`contour`] — dedups, drops degenerate geometry, stitches near-touching
//!    open contours, suppresses non-dominant clusters.
//! 3. [`loop_extractor`] — reconstructs closed loops from leftover open
//!    segments via tolerance-progressive graph traversal.
//! 4. [`compound`] — detects and splits self-retracing loops.
//! 5. [`hierarchy`] — resolves the parent/depth tree (even=outer, odd=hole).
//! 6. [`pseudo_hole`] — flattens duplicated border-offset "holes".
//! 7. [`hull`] — optional convex-hull fallback when no plausible outline exists.
//! 8. [`shape`] — assembles the final [`shape::Shape`]/[`shape::Document`] output,
//!    with a dense-perforation fast path and an artifact-overlay filter.
//!
//! [`pipeline::reconstruct`] ties every stage together behind a single entry
//! point.
//!
//! # Features
//! #### Default
//! - **hull-fallback**: enables the convex-hull fallback (`chull`)
//! - **cli**: builds the demonstration binary's logging backend (`env_logger`)
//!
//! #### Optional
//! - **parallel**: batch-level multithreading via `rayon` (§5 — independent
//!   documents only; a single document's pipeline is always single-threaded).
//!   See [`pipeline::reconstruct_batch`].
//! - **earcut**: enables `geo`'s `earcutr` triangulation feature, for
//!   downstream consumers that want to triangulate emitted shapes themselves

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod compound;
pub mod contour;
pub mod errors;
pub mod float_types;
pub mod geometry;
pub mod hierarchy;
pub mod hull;
pub mod loop_extractor;
pub mod pipeline;
pub mod primitive;
pub mod pseudo_hole;
pub mod shape;
