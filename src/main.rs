// main.rs
//
// Demonstration harness: builds the primitive lists for a few of the
// documented end-to-end scenarios, runs the pipeline, and logs the
// resulting document summary. Not part of the crate's interface (§6).

use contourweave::geometry::Point;
use contourweave::pipeline::{ReconstructOptions, reconstruct};
use contourweave::primitive::Primitive;

fn square(min: f64, max: f64) -> Vec<Primitive> {
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

fn dense_perforation(outer_side: f64, pitch: f64, hole_radius: f64) -> Vec<Primitive> {
    let mut primitives = square(0.0, outer_side);
    let steps = (outer_side / pitch) as i32;
    for i in 1..steps {
        for j in 1..steps {
            primitives.push(Primitive::Circle {
                center: Point::new(i as f64 * pitch, j as f64 * pitch),
                radius: hole_radius,
            });
        }
    }
    primitives
}

fn run_scenario(name: &str, primitives: &[Primitive]) {
    match reconstruct(primitives, &ReconstructOptions::default()) {
        Ok((document, diagnostics)) => {
            log::info!(
                "{name}: {}x{} document, {} shape(s)",
                document.width,
                document.height,
                document.shapes.len()
            );
            for (i, shape) in document.shapes.iter().enumerate() {
                log::info!(
                    "  shape {i}: outer with {} vertices, {} hole(s)",
                    shape.outer.len(),
                    shape.holes.len()
                );
            }
            for diagnostic in &diagnostics {
                log::debug!("  diagnostic: {diagnostic:?}");
            }
        }
        Err(err) => log::error!("{name}: reconstruction failed: {err}"),
    }
}

fn main() {
    #[cfg(feature = "cli")]
    env_logger::init();

    run_scenario("single square", &square(0.0, 10.0));

    let mut square_with_hole = square(0.0, 10.0);
    square_with_hole.push(Primitive::Circle {
        center: Point::new(5.0, 5.0),
        radius: 2.0,
    });
    run_scenario("square with circle hole", &square_with_hole);

    run_scenario(
        "dense perforation",
        &dense_perforation(200.0, 10.0, 2.0),
    );
}
