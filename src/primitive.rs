//! Primitive normalizer (stage 1): converts typed input primitives into a
//! uniform set of [`Contour`] values with all curvature discretized to line
//! segments.
//!
//! Grounded on the teacher's DXF entity handling in `io/dxf.rs` -- that
//! module pattern-matches `EntityType::{Line, Polyline, Circle}` into
//! `Vertex` lists one variant at a time; this module performs the same
//! per-variant discretization, generalized to the full `Primitive` contract
//! (including bulge-encoded polylines and splines) instead of just the
//! handful of entity kinds `dxf-io` happened to support.

use crate::contour::Contour;
use crate::errors::{Diagnostic, DroppedPrimitive};
use crate::float_types::{IMPLICIT_CLOSURE_TOL, PI, Real};
use crate::geometry::Point;

/// The input contract from the (out-of-scope) DXF tokenizer.
#[derive(Debug, Clone)]
pub enum Primitive {
    Line {
        start: Point,
        end: Point,
    },
    Arc {
        center: Point,
        radius: Real,
        start_deg: Real,
        end_deg: Real,
    },
    Circle {
        center: Point,
        radius: Real,
    },
    Polyline {
        vertices: Vec<(Point, Real)>,
        closed_flag: bool,
    },
    Spline {
        control_points: Vec<Point>,
        fit_points: Vec<Point>,
        closed_flag: bool,
    },
}

/// Tunables for curve discretization. Defaults match the literal constants
/// given for each primitive variant.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveOptions {
    /// Sagitta cap used to derive arc/bulge step angles.
    pub chord_tolerance: Real,
    pub min_arc_steps: u32,
    pub max_arc_steps: u32,
    pub circle_steps: u32,
}

impl Default for PrimitiveOptions {
    fn default() -> Self {
        Self {
            chord_tolerance: 0.35,
            min_arc_steps: 6,
            max_arc_steps: 2048,
            circle_steps: 72,
        }
    }
}

/// Runs the primitive normalizer over an input stream, returning the
/// resulting contours plus any diagnostics for primitives that could not be
/// discretized into at least two valid points.
pub fn normalize_primitives(
    primitives: &[Primitive],
    options: &PrimitiveOptions,
) -> (Vec<Contour>, Vec<Diagnostic>) {
    let mut contours = Vec::with_capacity(primitives.len());
    let mut diagnostics = Vec::new();
    for primitive in primitives {
        match normalize_one(primitive, options) {
            Ok(contour) => contours.push(contour),
            Err(reason) => diagnostics.push(Diagnostic::Dropped(
                DroppedPrimitive::InvalidPrimitive { reason },
            )),
        }
    }
    (contours, diagnostics)
}

fn normalize_one(
    primitive: &Primitive,
    options: &PrimitiveOptions,
) -> Result<Contour, &'static str> {
    let points = match primitive {
        Primitive::Line { start, end } => discretize_line(*start, *end)?,
        Primitive::Arc {
            center,
            radius,
            start_deg,
            end_deg,
        } => discretize_arc(*center, *radius, *start_deg, *end_deg, options)?,
        Primitive::Circle { center, radius } => {
            return discretize_circle(*center, *radius, options);
        }
        Primitive::Polyline {
            vertices,
            closed_flag,
        } => return discretize_polyline(vertices, *closed_flag, options),
        Primitive::Spline {
            control_points,
            fit_points,
            closed_flag,
        } => return discretize_spline(control_points, fit_points, *closed_flag),
    };
    Ok(Contour::new(points, false))
}

fn finite_or_reject(p: Point, reason: &'static str) -> Result<Point, &'static str> {
    if p.is_finite() { Ok(p) } else { Err(reason) }
}

fn discretize_line(start: Point, end: Point) -> Result<Vec<Point>, &'static str> {
    let start = finite_or_reject(start, "non-finite line endpoint")?;
    let end = finite_or_reject(end, "non-finite line endpoint")?;
    Ok(vec![start, end])
}

/// Arc sweep + step-count computation shared by §4.1's Arc rule and the
/// bulge-segment rule in [`discretize_polyline`].
fn arc_step_count(radius: Real, sweep_rad: Real, chord_tolerance: Real, min: u32, max: u32) -> u32 {
    let sagitta = (radius * 0.5).min(chord_tolerance).max(f64::MIN_POSITIVE);
    let ratio = (1.0 - sagitta / radius).clamp(-1.0, 1.0);
    let step_angle = (2.0 * ratio.acos()).max(3.0_f64.to_radians());
    let steps = (sweep_rad.abs() / step_angle).ceil() as u32;
    steps.clamp(min, max)
}

fn discretize_arc(
    center: Point,
    radius: Real,
    start_deg: Real,
    end_deg: Real,
    options: &PrimitiveOptions,
) -> Result<Vec<Point>, &'static str> {
    if !(radius > 0.0) || !center.is_finite() || !start_deg.is_finite() || !end_deg.is_finite() {
        return Err("invalid arc parameters");
    }
    let mut sweep_deg = end_deg - start_deg;
    while sweep_deg <= 0.0 {
        sweep_deg += 360.0;
    }
    let sweep_rad = sweep_deg.to_radians();
    let steps = arc_step_count(
        radius,
        sweep_rad,
        options.chord_tolerance,
        options.min_arc_steps,
        options.max_arc_steps,
    );
    let start_rad = start_deg.to_radians();
    let mut pts = Vec::with_capacity(steps as usize + 1);
    for i in 0..=steps {
        let t = start_rad + sweep_rad * (i as Real / steps as Real);
        pts.push(Point::new(
            center.x + radius * t.cos(),
            center.y + radius * t.sin(),
        ));
    }
    Ok(pts)
}

fn discretize_circle(
    center: Point,
    radius: Real,
    options: &PrimitiveOptions,
) -> Result<Contour, &'static str> {
    if !(radius > 0.0) || !center.is_finite() {
        return Err("invalid circle parameters");
    }
    let steps = options.circle_steps.max(12);
    let mut pts = Vec::with_capacity(steps as usize);
    for i in 0..steps {
        let t = 2.0 * PI * (i as Real) / (steps as Real);
        pts.push(Point::new(
            center.x + radius * t.cos(),
            center.y + radius * t.sin(),
        ));
    }
    Ok(Contour::new(pts, true))
}

/// Converts a bulge-encoded polyline segment into a list of points from `p1`
/// (inclusive) to `p2` (exclusive); the caller appends the final vertex.
fn discretize_bulge_segment(p1: Point, p2: Point, bulge: Real, options: &PrimitiveOptions) -> Vec<Point> {
    if bulge.abs() < 1e-12 {
        return vec![p1];
    }
    let chord = p1.distance_to(p2);
    if chord < f64::MIN_POSITIVE {
        return vec![p1];
    }
    let theta = 4.0 * bulge.atan();
    let half_theta = theta * 0.5;
    let radius = (chord * 0.5 / half_theta.sin()).abs();
    let sign = bulge.signum();
    let mid = p1.midpoint(p2);
    // perpendicular offset from the chord midpoint to the arc center
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let perp_len = (radius * radius - (chord * 0.5) * (chord * 0.5))
        .max(0.0)
        .sqrt();
    let (nx, ny) = (-dy / chord, dx / chord);
    let center = Point::new(mid.x + nx * perp_len * sign, mid.y + ny * perp_len * sign);

    let start_angle = (p1.y - center.y).atan2(p1.x - center.x);
    let steps = (((theta.abs() * radius) / options.chord_tolerance.max(0.05)).ceil() as u32).max(2);
    let mut pts = Vec::with_capacity(steps as usize);
    for i in 0..steps {
        let t = start_angle + theta * (i as Real / steps as Real);
        pts.push(Point::new(
            center.x + radius * t.cos(),
            center.y + radius * t.sin(),
        ));
    }
    pts
}

fn discretize_polyline(
    vertices: &[(Point, Real)],
    closed_flag: bool,
    options: &PrimitiveOptions,
) -> Result<Contour, &'static str> {
    if vertices.len() < 2 {
        return Err("polyline has fewer than two vertices");
    }
    for (p, bulge) in vertices {
        if !p.is_finite() || !bulge.is_finite() {
            return Err("non-finite polyline vertex");
        }
    }
    let mut pts = Vec::with_capacity(vertices.len() * 2);
    let n = vertices.len();
    let segment_count = if closed_flag { n } else { n - 1 };
    for i in 0..segment_count {
        let (p1, bulge) = vertices[i];
        let (p2, _) = vertices[(i + 1) % n];
        pts.extend(discretize_bulge_segment(p1, p2, bulge, options));
    }
    if closed_flag {
        // last segment's points already wrap back toward vertices[0]; no
        // extra closing point needed since Contour::closed implies it.
    } else {
        pts.push(vertices[n - 1].0);
    }
    if pts.len() < 2 {
        return Err("polyline discretized to fewer than two points");
    }
    let closed = closed_flag || pts[0].distance_to(*pts.last().unwrap()) <= IMPLICIT_CLOSURE_TOL;
    Ok(Contour::new(pts, closed))
}

fn discretize_spline(
    control_points: &[Point],
    fit_points: &[Point],
    closed_flag: bool,
) -> Result<Contour, &'static str> {
    let source: &[Point] = if control_points.len() >= 2 {
        control_points
    } else {
        fit_points
    };
    if source.len() < 2 {
        return Err("spline has fewer than two usable points");
    }
    for p in source {
        if !p.is_finite() {
            return Err("non-finite spline point");
        }
    }
    let pts = source.to_vec();
    let closed = closed_flag || pts[0].distance_to(*pts.last().unwrap()) <= IMPLICIT_CLOSURE_TOL;
    Ok(Contour::new(pts, closed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_keeps_endpoints_exact() {
        let c = normalize_one(
            &Primitive::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(10.0, 0.0),
            },
            &PrimitiveOptions::default(),
        )
        .unwrap();
        assert_eq!(c.points.len(), 2);
        assert!(!c.closed);
        assert_eq!(c.points[0], Point::new(0.0, 0.0));
        assert_eq!(c.points[1], Point::new(10.0, 0.0));
    }

    #[test]
    fn circle_is_closed_with_enough_vertices() {
        let c = discretize_circle(Point::new(5.0, 5.0), 2.0, &PrimitiveOptions::default()).unwrap();
        assert!(c.closed);
        assert!(c.points.len() >= 12);
        // tangential chord error bound: every vertex sits exactly on the circle
        for p in &c.points {
            let d = p.distance_to(Point::new(5.0, 5.0));
            assert!((d - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_bulge_is_a_straight_segment() {
        let contour = discretize_polyline(
            &[(Point::new(0.0, 0.0), 0.0), (Point::new(10.0, 0.0), 0.0)],
            false,
            &PrimitiveOptions::default(),
        )
        .unwrap();
        assert_eq!(contour.points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    }

    #[test]
    fn semicircle_bulge_passes_through_expected_peak() {
        // bulge = 1.0 encodes a semicircle (theta = 4*atan(1) = pi)
        let pts = discretize_bulge_segment(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            1.0,
            &PrimitiveOptions::default(),
        );
        assert!(pts.len() >= 2);
        let max_y = pts.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        // radius of a semicircle over a chord of length 10 is 5
        assert!((max_y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polyline_is_rejected() {
        let result = normalize_one(
            &Primitive::Polyline {
                vertices: vec![(Point::new(0.0, 0.0), 0.0)],
                closed_flag: false,
            },
            &PrimitiveOptions::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn spline_prefers_control_points_over_fit_points() {
        let c = discretize_spline(
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
            &[Point::new(9.0, 9.0), Point::new(8.0, 8.0)],
            false,
        )
        .unwrap();
        assert_eq!(c.points[0], Point::new(0.0, 0.0));
    }
}
