//! Stroke baking.
//!
//! A polyline becomes a triangle strip: every kept input point emits two
//! vertices, offset to either side along the averaged edge normal scaled to
//! a miter. Joins are always mitered without a limit, so very sharp angles
//! extend far past the corner.

use lyon::math::{vector, Point, Vector};

use crate::types::{BakedGeometry, Color, Fringe};

/// Componentwise tolerance for treating a vector as zero.
pub(crate) const EPSILON: f32 = 1e-5;

/// Stroke parameters.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StrokeOptions {
    /// Full stroke width.
    pub width: f32,
    /// Connect the last point back to the first.
    pub closed: bool,
    /// Antialiasing fringe width, if antialiasing is requested.
    pub fringe: Option<f32>,
}

/// The extrusion of one kept polyline point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Joint {
    /// Index into the input points.
    pub index: usize,
    /// Offset to the left border for a half width of one.
    pub extrusion: Vector,
}

pub(crate) fn nearly_zero(v: Vector) -> bool {
    v.x.abs() <= EPSILON && v.y.abs() <= EPSILON
}

fn left_normal(v: Vector) -> Vector {
    vector(-v.y, v.x)
}

/// Drops a trailing point equal to the first one, which turns the polyline
/// into a closed one.
pub(crate) fn strip_closing_point<'a>(
    points: &'a [Point],
    colors: Option<&'a [Color]>,
    closed: bool,
) -> (&'a [Point], Option<&'a [Color]>, bool) {
    match (points.first(), points.last()) {
        (Some(&first), Some(&last)) if points.len() > 1 && nearly_zero(last - first) => {
            let n = points.len() - 1;
            (&points[..n], colors.map(|c| &c[..n]), true)
        }
        _ => (points, colors, closed),
    }
}

/// Compute the mitered extrusion of every usable point.
///
/// Points whose incoming or outgoing edge has zero length are skipped; the
/// previous neighbor of the following point stays the last kept point.
pub(crate) fn joints(points: &[Point], closed: bool) -> Vec<Joint> {
    let n = points.len();
    let mut joints = Vec::with_capacity(n);
    if n < 2 {
        return joints;
    }

    let mut prev = closed.then(|| points[n - 1]);
    for (index, &p1) in points.iter().enumerate() {
        let next = if index + 1 < n {
            Some(points[index + 1])
        } else if closed {
            Some(points[0])
        } else {
            None
        };

        let (d0, d1) = match (prev, next) {
            (Some(p0), Some(p2)) => (p1 - p0, p2 - p1),
            (Some(p0), None) => (p1 - p0, p1 - p0),
            (None, Some(p2)) => (p2 - p1, p2 - p1),
            // Every earlier point was degenerate.
            (None, None) => continue,
        };

        if nearly_zero(d0) || nearly_zero(d1) {
            log::trace!("skipping degenerate stroke vertex {index} at {p1:?}");
            continue;
        }

        let n0 = left_normal(d0.normalize());
        let n1 = left_normal(d1.normalize());
        let average = (n0 + n1) * 0.5;
        let len2 = average.square_length();
        // Opposite edges cancel out; fall back to the incoming normal.
        let extrusion = if len2 > EPSILON { average / len2 } else { n0 };

        joints.push(Joint { index, extrusion });
        prev = Some(p1);
    }

    joints
}

/// Bake a stroke outline into triangle-strip order.
///
/// Each kept point emits `p + e * h` followed by `p - e * h`, where `h` is
/// half the width (widened by half the fringe when antialiasing). A trailing
/// point equal to the first is dropped and closes the stroke.
///
/// # Panics
///
/// Panics if the width is negative, the fringe is not positive, or the color
/// count does not match the point count.
#[must_use]
pub fn bake_stroke(
    points: &[Point],
    options: &StrokeOptions,
    colors: Option<&[Color]>,
) -> BakedGeometry {
    assert!(options.width >= 0.0, "negative stroke width");
    if let Some(colors) = colors {
        assert_eq!(colors.len(), points.len(), "per-point color count mismatch");
    }

    let mut baked = BakedGeometry::default();
    let (points, colors, closed) = strip_closing_point(points, colors, options.closed);
    if points.len() < 2 {
        return baked;
    }

    let mut half_width = options.width * 0.5;
    let fringe_mult = options.fringe.map(|fringe| {
        assert!(fringe > 0.0, "antialiasing requires a positive fringe");
        half_width += fringe * 0.5;
        (options.width * 0.5 + fringe * 0.5) / fringe
    });

    let joints = joints(points, closed);
    baked.positions.reserve(joints.len() * 2);
    for joint in &joints {
        let p = points[joint.index];
        let offset = joint.extrusion * half_width;
        baked.positions.push(p + offset);
        baked.positions.push(p - offset);

        if let Some(mult) = fringe_mult {
            baked.fringe.push(Fringe { coord: 0.0, mult });
            baked.fringe.push(Fringe { coord: 1.0, mult });
        }
        if let Some(colors) = colors {
            baked.colors.push(colors[joint.index]);
            baked.colors.push(colors[joint.index]);
        }
    }
    baked.closed = closed;
    baked
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon::math::point;

    fn assert_point_near(actual: Point, expected: Point) {
        assert!(
            (actual - expected).length() < 1e-4,
            "expected {expected:?}, got {actual:?}",
        );
    }

    fn square() -> Vec<Point> {
        vec![
            point(0.0, 0.0),
            point(100.0, 0.0),
            point(100.0, 100.0),
            point(0.0, 100.0),
        ]
    }

    #[test]
    fn straight_line_offsets_half_width() {
        let options = StrokeOptions {
            width: 4.0,
            ..StrokeOptions::default()
        };
        let baked = bake_stroke(&[point(0.0, 0.0), point(10.0, 0.0)], &options, None);
        assert_eq!(baked.len(), 4);
        assert!(!baked.has_fringe());
        assert!(!baked.closed);
        assert_point_near(baked.positions[0], point(0.0, 2.0));
        assert_point_near(baked.positions[1], point(0.0, -2.0));
        assert_point_near(baked.positions[2], point(10.0, 2.0));
        assert_point_near(baked.positions[3], point(10.0, -2.0));
    }

    #[test]
    fn closed_square_mitres_corners() {
        let options = StrokeOptions {
            width: 2.0,
            closed: true,
            fringe: None,
        };
        let baked = bake_stroke(&square(), &options, None);
        assert_eq!(baked.len(), 8);
        assert!(baked.closed);
        // Every vertex sits one unit away from both edges of its corner.
        assert_point_near(baked.positions[0], point(1.0, 1.0));
        assert_point_near(baked.positions[1], point(-1.0, -1.0));
        assert_point_near(baked.positions[2], point(99.0, 1.0));
        assert_point_near(baked.positions[3], point(101.0, -1.0));
        assert_point_near(baked.positions[4], point(99.0, 99.0));
        assert_point_near(baked.positions[5], point(101.0, 101.0));
        assert_point_near(baked.positions[6], point(1.0, 99.0));
        assert_point_near(baked.positions[7], point(-1.0, 101.0));
    }

    #[test]
    fn trailing_duplicate_closes_loop() {
        let looped = StrokeOptions {
            width: 3.0,
            closed: true,
            fringe: None,
        };
        let open = StrokeOptions {
            closed: false,
            ..looped
        };
        let mut explicit = square();
        explicit.push(explicit[0]);

        let a = bake_stroke(&square(), &looped, None);
        let b = bake_stroke(&explicit, &open, None);
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_segments_are_skipped() {
        let points = [
            point(0.0, 0.0),
            point(10.0, 0.0),
            point(10.0, 0.0),
            point(20.0, 0.0),
        ];
        let options = StrokeOptions {
            width: 2.0,
            ..StrokeOptions::default()
        };
        let baked = bake_stroke(&points, &options, None);
        assert_eq!(baked.len(), 6);
        assert!(baked.positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_point_near(baked.positions[2], point(10.0, 1.0));
    }

    #[test]
    fn antialiasing_widens_and_adds_fringe() {
        let options = StrokeOptions {
            width: 2.0,
            closed: false,
            fringe: Some(1.0),
        };
        let baked = bake_stroke(&[point(0.0, 0.0), point(0.0, 10.0)], &options, None);
        assert_eq!(baked.fringe.len(), baked.len());
        assert_point_near(baked.positions[0], point(-1.5, 0.0));
        assert_point_near(baked.positions[1], point(1.5, 0.0));
        assert!((baked.fringe[0].mult - 1.5).abs() < 1e-6);
        assert!((baked.fringe[0].coord - 0.0).abs() < f32::EPSILON);
        assert!((baked.fringe[1].coord - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn colors_are_duplicated_per_side() {
        let colors = [Color::WHITE, Color::BLACK];
        let options = StrokeOptions {
            width: 1.0,
            ..StrokeOptions::default()
        };
        let baked = bake_stroke(&[point(0.0, 0.0), point(5.0, 5.0)], &options, Some(&colors));
        assert_eq!(
            baked.colors,
            vec![Color::WHITE, Color::WHITE, Color::BLACK, Color::BLACK],
        );
    }

    #[test]
    fn too_few_points_bake_nothing() {
        let options = StrokeOptions {
            width: 1.0,
            ..StrokeOptions::default()
        };
        assert!(bake_stroke(&[point(1.0, 1.0)], &options, None).is_empty());
        assert!(bake_stroke(&[], &options, None).is_empty());
        let same = [point(2.0, 2.0), point(2.0, 2.0), point(2.0, 2.0)];
        assert!(bake_stroke(&same, &options, None).is_empty());
    }

    #[test]
    #[should_panic(expected = "per-point color count mismatch")]
    fn mismatched_colors_panic() {
        let options = StrokeOptions {
            width: 1.0,
            ..StrokeOptions::default()
        };
        let _ = bake_stroke(
            &[point(0.0, 0.0), point(1.0, 0.0)],
            &options,
            Some(&[Color::WHITE]),
        );
    }

    #[test]
    #[should_panic(expected = "negative stroke width")]
    fn negative_width_panics() {
        let options = StrokeOptions {
            width: -1.0,
            ..StrokeOptions::default()
        };
        let _ = bake_stroke(&[point(0.0, 0.0), point(1.0, 0.0)], &options, None);
    }
}
