//! Baking of SVG-like subpaths into flat point sequences.

use lyon::geom::{CubicBezierSegment, QuadraticBezierSegment};
use lyon::math::Point;

use crate::flatten::{
    arc_steps, flatten_arc, flatten_cubic, flatten_quad, parse_arc, ArcParams, CUBIC_MAX_DEPTH,
    QUAD_MAX_DEPTH,
};

/// A single path segment, starting at the end of the previous one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PathCommand {
    /// Straight line.
    Line {
        /// End point.
        to: Point,
    },
    /// Quadratic bezier.
    Quad {
        /// Control point.
        control: Point,
        /// End point.
        to: Point,
    },
    /// Quadratic bezier whose control point is the reflection of the
    /// previous quadratic control point.
    SmoothQuad {
        /// End point.
        to: Point,
    },
    /// Cubic bezier.
    Cubic {
        /// First control point.
        control1: Point,
        /// Second control point.
        control2: Point,
        /// End point.
        to: Point,
    },
    /// Cubic bezier whose first control point is the reflection of the
    /// previous cubic's second control point.
    SmoothCubic {
        /// Second control point.
        control2: Point,
        /// End point.
        to: Point,
    },
    /// Elliptical arc in endpoint form.
    Arc {
        /// Radii and flags.
        params: ArcParams,
        /// End point.
        to: Point,
    },
}

impl PathCommand {
    /// The end point of the segment.
    #[must_use]
    pub fn to(&self) -> Point {
        match *self {
            Self::Line { to }
            | Self::Quad { to, .. }
            | Self::SmoothQuad { to }
            | Self::Cubic { to, .. }
            | Self::SmoothCubic { to, .. }
            | Self::Arc { to, .. } => to,
        }
    }
}

/// A sequence of connected segments starting at `start`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subpath {
    /// First point of the subpath.
    pub start: Point,
    /// Segments following `start`.
    pub commands: Vec<PathCommand>,
    /// Repeat the start point at the end.
    pub closed: bool,
}

/// Reflect `point` across `pivot`.
#[must_use]
pub fn reflect(pivot: Point, point: Point) -> Point {
    pivot + (pivot - point)
}

/// Flatten a subpath into its ordered point sequence, start point included.
#[must_use]
pub fn bake_subpath(subpath: &Subpath) -> Vec<Point> {
    let mut points = vec![subpath.start];

    let mut current = subpath.start;
    let mut last_quad = current;
    let mut last_cubic = current;

    for command in &subpath.commands {
        match *command {
            PathCommand::Line { to } => {
                points.push(to);
                last_quad = to;
                last_cubic = to;
            }
            PathCommand::Quad { control, to } => {
                let curve = QuadraticBezierSegment {
                    from: current,
                    ctrl: control,
                    to,
                };
                flatten_quad(&curve, QUAD_MAX_DEPTH, &mut points);
                last_quad = control;
                last_cubic = to;
            }
            PathCommand::SmoothQuad { to } => {
                let control = reflect(current, last_quad);
                let curve = QuadraticBezierSegment {
                    from: current,
                    ctrl: control,
                    to,
                };
                flatten_quad(&curve, QUAD_MAX_DEPTH, &mut points);
                last_cubic = to;
            }
            PathCommand::Cubic {
                control1,
                control2,
                to,
            } => {
                let curve = CubicBezierSegment {
                    from: current,
                    ctrl1: control1,
                    ctrl2: control2,
                    to,
                };
                flatten_cubic(&curve, CUBIC_MAX_DEPTH, &mut points);
                last_quad = to;
                last_cubic = control2;
            }
            PathCommand::SmoothCubic { control2, to } => {
                let curve = CubicBezierSegment {
                    from: current,
                    ctrl1: reflect(current, last_cubic),
                    ctrl2: control2,
                    to,
                };
                flatten_cubic(&curve, CUBIC_MAX_DEPTH, &mut points);
                last_quad = to;
                last_cubic = control2;
            }
            PathCommand::Arc { params, to } => {
                match parse_arc(current, &params, to) {
                    Some(arc) => flatten_arc(&arc, arc_steps(&arc), &mut points),
                    None => points.push(to),
                }
                last_quad = to;
                last_cubic = to;
            }
        }
        current = command.to();
    }

    if subpath.closed {
        points.push(subpath.start);
    }

    points
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lyon::math::{point, vector};

    fn assert_point_near(actual: Point, expected: Point) {
        assert!(
            (actual - expected).length() < 1e-3,
            "expected {expected:?}, got {actual:?}",
        );
    }

    #[test]
    fn lines_and_closing() {
        let subpath = Subpath {
            start: point(0.0, 0.0),
            commands: vec![
                PathCommand::Line {
                    to: point(10.0, 0.0),
                },
                PathCommand::Line {
                    to: point(10.0, 10.0),
                },
            ],
            closed: true,
        };
        assert_eq!(
            bake_subpath(&subpath),
            vec![
                point(0.0, 0.0),
                point(10.0, 0.0),
                point(10.0, 10.0),
                point(0.0, 0.0),
            ],
        );
    }

    #[test]
    fn reflection() {
        assert_eq!(reflect(point(1.0, 1.0), point(0.0, 3.0)), point(2.0, -1.0));
    }

    #[test]
    fn smooth_quad_matches_explicit_reflection() {
        let smooth = Subpath {
            start: point(0.0, 0.0),
            commands: vec![
                PathCommand::Quad {
                    control: point(5.0, 10.0),
                    to: point(10.0, 0.0),
                },
                PathCommand::SmoothQuad {
                    to: point(20.0, 0.0),
                },
            ],
            closed: false,
        };
        let explicit = Subpath {
            commands: vec![
                smooth.commands[0],
                PathCommand::Quad {
                    control: point(15.0, -10.0),
                    to: point(20.0, 0.0),
                },
            ],
            ..smooth.clone()
        };
        assert_eq!(bake_subpath(&smooth), bake_subpath(&explicit));
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let smooth = Subpath {
            start: point(0.0, 0.0),
            commands: vec![
                PathCommand::Cubic {
                    control1: point(0.0, 10.0),
                    control2: point(10.0, 10.0),
                    to: point(10.0, 0.0),
                },
                PathCommand::SmoothCubic {
                    control2: point(20.0, 10.0),
                    to: point(20.0, 0.0),
                },
            ],
            closed: false,
        };
        let explicit = Subpath {
            commands: vec![
                smooth.commands[0],
                PathCommand::Cubic {
                    control1: point(10.0, -10.0),
                    control2: point(20.0, 10.0),
                    to: point(20.0, 0.0),
                },
            ],
            ..smooth.clone()
        };
        assert_eq!(bake_subpath(&smooth), bake_subpath(&explicit));
    }

    #[test]
    fn smooth_after_line_uses_current_point() {
        // After a line both controls collapse onto its end, so the smooth
        // quad degenerates into a straight segment.
        let subpath = Subpath {
            start: point(0.0, 0.0),
            commands: vec![
                PathCommand::Line {
                    to: point(10.0, 0.0),
                },
                PathCommand::SmoothQuad {
                    to: point(20.0, 0.0),
                },
            ],
            closed: false,
        };
        assert_eq!(
            bake_subpath(&subpath),
            vec![point(0.0, 0.0), point(10.0, 0.0), point(20.0, 0.0)],
        );
    }

    #[test]
    fn arc_steps_scale_with_sweep() {
        let half_turn = Subpath {
            start: point(0.0, 0.0),
            commands: vec![PathCommand::Arc {
                params: ArcParams {
                    radius: vector(5.0, 5.0),
                    large_arc: false,
                    clockwise: true,
                },
                to: point(10.0, 0.0),
            }],
            closed: false,
        };
        let points = bake_subpath(&half_turn);
        // Start point plus roughly half of the per-turn samples.
        assert!((33..=34).contains(&points.len()), "{}", points.len());
        assert_point_near(*points.last().unwrap(), point(10.0, 0.0));
        for p in &points {
            assert!(((*p - point(5.0, 0.0)).length() - 5.0).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_radius_arc_is_a_line() {
        let subpath = Subpath {
            start: point(0.0, 0.0),
            commands: vec![PathCommand::Arc {
                params: ArcParams::default(),
                to: point(3.0, 4.0),
            }],
            closed: false,
        };
        assert_eq!(bake_subpath(&subpath), vec![point(0.0, 0.0), point(3.0, 4.0)]);
    }
}
