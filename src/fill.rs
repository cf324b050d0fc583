//! Fill baking.
//!
//! Without antialiasing the points are used as a triangle fan as-is. With
//! antialiasing the fill is split into a solid core, inset by half a fringe,
//! and a closed edge strip one fringe wide centered on the true boundary
//! that fades from opaque (inside) to transparent (outside).

use lyon::math::Point;

use crate::stroke::{joints, strip_closing_point};
use crate::types::{BakedGeometry, Color, Fringe};

/// Output of [`bake_fill`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedFill {
    /// Fill geometry in triangle-fan order.
    pub fill: BakedGeometry,
    /// Antialiased edge strip. Empty without antialiasing.
    pub edge: BakedGeometry,
}

/// Twice the signed area of a polygon. Positive when the polygon winds
/// towards the left normals of its edges.
fn signed_area2(points: &[Point]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Bake fill geometry, with an antialiased edge when `fringe` is given.
///
/// # Panics
///
/// Panics if the color count does not match the point count or the fringe
/// is not positive.
#[must_use]
pub fn bake_fill(points: &[Point], fringe: Option<f32>, colors: Option<&[Color]>) -> BakedFill {
    if let Some(colors) = colors {
        assert_eq!(colors.len(), points.len(), "per-point color count mismatch");
    }

    let Some(fringe) = fringe else {
        return BakedFill {
            fill: BakedGeometry {
                positions: points.to_vec(),
                colors: colors.map(<[Color]>::to_vec).unwrap_or_default(),
                ..BakedGeometry::default()
            },
            edge: BakedGeometry::default(),
        };
    };
    assert!(fringe > 0.0, "antialiasing requires a positive fringe");

    let mut baked = BakedFill::default();
    let (points, colors, _) = strip_closing_point(points, colors, true);
    if points.len() < 3 {
        return baked;
    }

    // Left normals point inwards for positively wound polygons.
    let inward = if signed_area2(points) < 0.0 {
        -0.5 * fringe
    } else {
        0.5 * fringe
    };

    let joints = joints(points, true);
    baked.fill.positions.reserve(joints.len());
    baked.edge.positions.reserve(joints.len() * 2);
    for joint in &joints {
        let p = points[joint.index];
        let offset = joint.extrusion * inward;
        let inner = p + offset;

        baked.fill.positions.push(inner);
        baked.edge.positions.push(inner);
        baked.edge.positions.push(p - offset);
        baked.edge.fringe.push(Fringe {
            coord: 0.5,
            mult: 1.0,
        });
        baked.edge.fringe.push(Fringe {
            coord: 0.0,
            mult: 1.0,
        });

        if let Some(colors) = colors {
            let color = colors[joint.index];
            baked.fill.colors.push(color);
            baked.edge.colors.push(color);
            baked.edge.colors.push(color);
        }
    }
    baked.edge.closed = true;
    baked
}
