//! Curve flattening.
//!
//! Bezier segments are flattened by recursive de Casteljau midpoint
//! subdivision until the control polygon is flat enough or a depth cap is
//! hit, which bounds the output to `2^max_depth` points per segment.
//! Arcs are sampled uniformly in angle.
//!
//! All `flatten_*` functions append points *after* the segment start: the
//! caller is expected to already hold the start point.

use lyon::geom::{CubicBezierSegment, QuadraticBezierSegment};
use lyon::math::{vector, Point, Vector};
use std::f32::consts::TAU;

/// Flatness tolerance for bezier subdivision.
///
/// A segment is emitted as a single line once
/// `(d1 + d2)^2 <= FLATTEN_TOLERANCE * |chord|^2`, where `d1` and `d2` are
/// the cross products of the control points (relative to the end point)
/// with the chord. When the chord is shorter than the tolerance, as in a
/// closed loop, the squared distance of the control points from the start
/// is compared against the tolerance instead.
pub const FLATTEN_TOLERANCE: f32 = 1e-5;

/// Default subdivision depth cap for cubic segments.
pub const CUBIC_MAX_DEPTH: u32 = 8;

/// Default subdivision depth cap for quadratic segments.
pub const QUAD_MAX_DEPTH: u32 = 10;

/// Number of arc samples per full turn used when baking path arcs.
pub const ARC_STEPS_PER_TURN: u32 = 64;

/// An elliptical arc in center form, axis aligned.
///
/// Angles are in radians. `end_angle` may be smaller than `start_angle`, in
/// which case the arc runs in the negative angular direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CenterArc {
    /// Center of the ellipse.
    pub center: Point,
    /// Radii along the x and y axes.
    pub radius: Vector,
    /// Angle of the first point.
    pub start_angle: f32,
    /// Angle of the last point.
    pub end_angle: f32,
}

impl CenterArc {
    /// The point on the ellipse at `angle`.
    #[must_use]
    pub fn point_at(&self, angle: f32) -> Point {
        self.center + self.radius.component_mul(vector(angle.cos(), angle.sin()))
    }

    /// The first point of the arc.
    #[must_use]
    pub fn start(&self) -> Point {
        self.point_at(self.start_angle)
    }

    /// The last point of the arc.
    #[must_use]
    pub fn end(&self) -> Point {
        self.point_at(self.end_angle)
    }

    /// Signed angular span.
    #[must_use]
    pub fn sweep(&self) -> f32 {
        self.end_angle - self.start_angle
    }
}

/// Endpoint-form arc parameters, as used by SVG path arcs without x-axis
/// rotation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ArcParams {
    /// Requested radii. Radii too small to span the endpoints are scaled up.
    pub radius: Vector,
    /// Choose the arc spanning more than 180 degrees.
    pub large_arc: bool,
    /// Sweep in the positive angle direction (clockwise with y pointing
    /// down). This is the SVG `sweep-flag`.
    pub clockwise: bool,
}

/// Flatten a cubic bezier, appending the points after `curve.from`.
pub fn flatten_cubic(curve: &CubicBezierSegment<f32>, max_depth: u32, out: &mut Vec<Point>) {
    subdivide(curve, 0, max_depth, out);
}

/// Flatten a quadratic bezier, appending the points after `curve.from`.
///
/// The curve is raised to the equivalent cubic first.
pub fn flatten_quad(curve: &QuadraticBezierSegment<f32>, max_depth: u32, out: &mut Vec<Point>) {
    subdivide(&raise_quad(curve), 0, max_depth, out);
}

/// Flatten an arc into `steps` points uniformly spaced in angle, the last
/// one being the arc end. The arc start is not emitted.
pub fn flatten_arc(arc: &CenterArc, steps: u32, out: &mut Vec<Point>) {
    let steps = steps.max(1);
    out.reserve(steps as usize);

    // Step counts stay far below f32's exact integer range.
    #[expect(clippy::cast_precision_loss)]
    let steps_f = steps as f32;
    let sweep = arc.sweep();
    for i in 1..=steps {
        #[expect(clippy::cast_precision_loss)]
        let t = i as f32 / steps_f;
        out.push(arc.point_at(arc.start_angle + t * sweep));
    }
}

/// The number of samples used for an arc in a baked path, proportional to
/// its angular span.
#[must_use]
pub fn arc_steps(arc: &CenterArc) -> u32 {
    #[expect(clippy::cast_precision_loss)]
    let per_turn = ARC_STEPS_PER_TURN as f32;
    let steps = (per_turn * arc.sweep().abs() / TAU).ceil();
    // Sweeps never exceed a full turn, so this fits comfortably.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = steps as u32;
    steps.max(1)
}

/// Degree-raise a quadratic bezier to the cubic tracing the same curve.
#[must_use]
pub fn raise_quad(curve: &QuadraticBezierSegment<f32>) -> CubicBezierSegment<f32> {
    const TWO_THIRDS: f32 = 2.0 / 3.0;
    CubicBezierSegment {
        from: curve.from,
        ctrl1: curve.from + (curve.ctrl - curve.from) * TWO_THIRDS,
        ctrl2: curve.to + (curve.ctrl - curve.to) * TWO_THIRDS,
        to: curve.to,
    }
}

fn subdivide(curve: &CubicBezierSegment<f32>, depth: u32, max_depth: u32, out: &mut Vec<Point>) {
    let chord = curve.to - curve.from;
    let chord_len2 = chord.square_length();
    let flat = if chord_len2 <= FLATTEN_TOLERANCE {
        let spread = (curve.ctrl1 - curve.from)
            .square_length()
            .max((curve.ctrl2 - curve.from).square_length());
        spread <= FLATTEN_TOLERANCE
    } else {
        let d1 = (curve.ctrl1 - curve.to).cross(chord).abs();
        let d2 = (curve.ctrl2 - curve.to).cross(chord).abs();
        (d1 + d2) * (d1 + d2) <= FLATTEN_TOLERANCE * chord_len2
    };

    if flat || depth >= max_depth {
        out.push(curve.to);
        return;
    }

    let p12 = curve.from.lerp(curve.ctrl1, 0.5);
    let p23 = curve.ctrl1.lerp(curve.ctrl2, 0.5);
    let p34 = curve.ctrl2.lerp(curve.to, 0.5);
    let p123 = p12.lerp(p23, 0.5);
    let p234 = p23.lerp(p34, 0.5);
    let mid = p123.lerp(p234, 0.5);

    let first = CubicBezierSegment {
        from: curve.from,
        ctrl1: p12,
        ctrl2: p123,
        to: mid,
    };
    let second = CubicBezierSegment {
        from: mid,
        ctrl1: p234,
        ctrl2: p34,
        to: curve.to,
    };
    subdivide(&first, depth + 1, max_depth, out);
    subdivide(&second, depth + 1, max_depth, out);
}

/// Convert an endpoint-form arc from `from` to `to` into center form.
///
/// Follows the SVG implementation notes (F.6.5/F.6.6) with no axis
/// rotation: radii too small to span the endpoints are scaled up uniformly.
/// Returns `None` when the arc degenerates: coincident endpoints or a zero
/// radius. A path treats the latter as a straight line.
#[must_use]
pub fn parse_arc(from: Point, params: &ArcParams, to: Point) -> Option<CenterArc> {
    let mut rx = params.radius.x.abs();
    let mut ry = params.radius.y.abs();
    if rx <= f32::EPSILON || ry <= f32::EPSILON || (to - from).square_length() <= f32::EPSILON {
        return None;
    }

    // Half the chord, in the (unrotated) ellipse frame.
    let h = (from - to) * 0.5;

    let lambda = (h.x * h.x) / (rx * rx) + (h.y * h.y) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * h.y * h.y - ry2 * h.x * h.x;
    let den = rx2 * h.y * h.y + ry2 * h.x * h.x;
    let sign = if params.large_arc == params.clockwise {
        -1.0
    } else {
        1.0
    };
    let coef = sign * (num / den).max(0.0).sqrt();
    let center_offset = vector(coef * rx * h.y / ry, -coef * ry * h.x / rx);
    let center = from.lerp(to, 0.5) + center_offset;

    let u = vector((h.x - center_offset.x) / rx, (h.y - center_offset.y) / ry);
    let v = vector((-h.x - center_offset.x) / rx, (-h.y - center_offset.y) / ry);

    let start_angle = angle_between(vector(1.0, 0.0), u);
    let mut delta = angle_between(u, v);
    if params.clockwise && delta < 0.0 {
        delta += TAU;
    } else if !params.clockwise && delta > 0.0 {
        delta -= TAU;
    }

    Some(CenterArc {
        center,
        radius: vector(rx, ry),
        start_angle,
        end_angle: start_angle + delta,
    })
}

fn angle_between(u: Vector, v: Vector) -> f32 {
    u.cross(v).atan2(u.dot(v))
}
