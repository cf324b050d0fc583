//! Point generators for rectangles, rounded rectangles and ellipses.
//!
//! All generators return closed outlines: the last point repeats the first.

use lyon::math::{vector, Point, Vector};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::flatten::{flatten_arc, CenterArc};

/// Arc samples per rounded rectangle corner.
pub const CORNER_ARC_STEPS: u32 = 12;

/// Maximum distance between an ellipse and the default polygon
/// approximating it.
const CIRCLE_TOLERANCE: f32 = 0.25;

const MIN_CIRCLE_POINTS: u32 = 8;
const MAX_CIRCLE_POINTS: u32 = 256;

fn corners(position: Point, size: Vector) -> [Point; 4] {
    [
        position,
        position + vector(size.x, 0.0),
        position + size,
        position + vector(0.0, size.y),
    ]
}

/// An axis-aligned rectangle: the four corners, starting at `position` and
/// going towards `+x` first, then the first corner again.
#[must_use]
pub fn rect_points(position: Point, size: Vector) -> Vec<Point> {
    let corners = corners(position, size);
    let mut points = Vec::with_capacity(5);
    points.extend_from_slice(&corners);
    points.push(corners[0]);
    points
}

/// A rectangle with independently rounded corners.
///
/// `rounding` holds the radii for the corners in the order of
/// [`rect_points`]: top-left, top-right, bottom-right, bottom-left (with y
/// pointing down). A zero radius keeps the sharp corner, so all-zero
/// rounding yields exactly [`rect_points`].
///
/// # Panics
///
/// Panics if a radius is negative.
#[must_use]
pub fn rounded_rect_points(position: Point, size: Vector, rounding: [f32; 4]) -> Vec<Point> {
    assert!(
        rounding.iter().all(|&r| r >= 0.0),
        "negative corner radius"
    );

    let [tl, tr, br, bl] = corners(position, size);
    let mut points = Vec::new();

    // (corner, unit offset from corner to arc center, start angle)
    let arcs = [
        (tl, vector(1.0, 1.0), PI),
        (tr, vector(-1.0, 1.0), -FRAC_PI_2),
        (br, vector(-1.0, -1.0), 0.0),
        (bl, vector(1.0, -1.0), FRAC_PI_2),
    ];

    for ((corner, towards_center, start_angle), radius) in arcs.into_iter().zip(rounding) {
        if radius <= 0.0 {
            points.push(corner);
            continue;
        }

        let arc = CenterArc {
            center: corner + towards_center * radius,
            radius: vector(radius, radius),
            start_angle,
            end_angle: start_angle + FRAC_PI_2,
        };
        points.push(arc.start());
        flatten_arc(&arc, CORNER_ARC_STEPS, &mut points);
    }

    points.push(points[0]);
    points
}

/// The default number of points for an ellipse, so that the polygon stays
/// within a quarter unit of the curve.
#[must_use]
pub fn default_circle_points(radius: Vector) -> u32 {
    let r = radius.x.abs().max(radius.y.abs());
    if r <= CIRCLE_TOLERANCE {
        return MIN_CIRCLE_POINTS;
    }
    let segments = (PI / (1.0 - CIRCLE_TOLERANCE / r).acos()).ceil();
    // Clamped below, the cast only needs to survive large radii.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let segments = segments.min(MAX_CIRCLE_POINTS as f32) as u32;
    segments.clamp(MIN_CIRCLE_POINTS, MAX_CIRCLE_POINTS)
}

/// An ellipse sampled at `count` uniformly spaced angles, starting at
/// `start_angle`, plus the first point again.
///
/// # Panics
///
/// Panics if fewer than three points are requested.
#[must_use]
pub fn circle_points(
    center: Point,
    radius: Vector,
    count: Option<u32>,
    start_angle: f32,
) -> Vec<Point> {
    let count = count.unwrap_or_else(|| default_circle_points(radius));
    assert!(count >= 3, "a circle needs at least three points");

    #[expect(clippy::cast_precision_loss)]
    let step = TAU / count as f32;
    let mut points: Vec<Point> = (0..count)
        .map(|i| {
            #[expect(clippy::cast_precision_loss)]
            let angle = start_angle + i as f32 * step;
            center + radius.component_mul(vector(angle.cos(), angle.sin()))
        })
        .collect();
    points.push(points[0]);
    points
}
