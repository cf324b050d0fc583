//! Shape objects that keep their parameters next to their polygon.
//!
//! A [`Drawable`] couples a [`PolygonId`] with the parameters its outline is
//! generated from. Changes go through [`Drawable::edit`]: the returned
//! [`Edit`] holds a copy of the parameters, and only
//! [`Edit::commit`] re-bakes the polygon. Dropping an edit discards it.

use std::ops::{Deref, DerefMut};

use lyon::math::{Point, Vector};

use crate::context::{Context, PolygonId};
use crate::device::{Device, DrawRecorder};
use crate::shapes::{circle_points, rect_points, rounded_rect_points};
use crate::types::{DrawMode, DrawType};

/// Parameters a polygon outline is generated from.
pub trait Outline: Clone + PartialEq {
    /// The outline points.
    fn outline(&self) -> Vec<Point>;

    /// How the outline is drawn.
    fn mode(&self) -> &DrawMode;
}

/// An arbitrary point sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeParams {
    /// Outline points.
    pub points: Vec<Point>,
    /// How the outline is drawn.
    pub mode: DrawMode,
}

impl Outline for ShapeParams {
    fn outline(&self) -> Vec<Point> {
        self.points.clone()
    }

    fn mode(&self) -> &DrawMode {
        &self.mode
    }
}

/// An axis-aligned rectangle with optionally rounded corners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RectParams {
    /// Top-left corner.
    pub position: Point,
    /// Width and height.
    pub size: Vector,
    /// Corner radii, see [`rounded_rect_points`].
    pub rounding: [f32; 4],
    /// How the outline is drawn.
    pub mode: DrawMode,
}

impl Outline for RectParams {
    fn outline(&self) -> Vec<Point> {
        if self.rounding.iter().all(|&r| r == 0.0) {
            rect_points(self.position, self.size)
        } else {
            rounded_rect_points(self.position, self.size, self.rounding)
        }
    }

    fn mode(&self) -> &DrawMode {
        &self.mode
    }
}

/// An ellipse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CircleParams {
    /// Center of the ellipse.
    pub center: Point,
    /// Radii along the x and y axes.
    pub radius: Vector,
    /// Number of outline points. `None` picks one from the radius.
    pub points: Option<u32>,
    /// Angle of the first outline point, in radians.
    pub start_angle: f32,
    /// How the outline is drawn.
    pub mode: DrawMode,
}

impl Outline for CircleParams {
    fn outline(&self) -> Vec<Point> {
        circle_points(self.center, self.radius, self.points, self.start_angle)
    }

    fn mode(&self) -> &DrawMode {
        &self.mode
    }
}

/// A polygon generated from a point list.
pub type Shape = Drawable<ShapeParams>;
/// A polygon generated from a rectangle.
pub type RectShape = Drawable<RectParams>;
/// A polygon generated from an ellipse.
pub type CircleShape = Drawable<CircleParams>;

/// A polygon in a [`Context`] together with the parameters that generated
/// it.
#[derive(Debug)]
pub struct Drawable<P> {
    id: PolygonId,
    params: P,
}

impl<P: Outline> Drawable<P> {
    /// Create the polygon and bake it from `params`.
    ///
    /// # Panics
    ///
    /// Panics on the preconditions of
    /// [`Context::update_polygon`].
    pub fn new<D: Device>(ctx: &mut Context<D>, params: P) -> Self {
        let id = ctx.create_polygon();
        ctx.update_polygon(id, &params.outline(), params.mode());
        Self { id, params }
    }

    /// The polygon this shape draws with.
    #[must_use]
    pub fn id(&self) -> PolygonId {
        self.id
    }

    /// The parameters of the last commit.
    #[must_use]
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Start changing the parameters.
    pub fn edit(&mut self) -> Edit<'_, P> {
        Edit {
            params: self.params.clone(),
            drawable: self,
        }
    }

    /// Record the fill draws.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not filled.
    pub fn fill<D, R>(&self, ctx: &Context<D>, recorder: &mut R)
    where
        D: Device,
        R: DrawRecorder<D::Buffer>,
    {
        ctx.record_fill(self.id, recorder);
    }

    /// Record the stroke draw.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not stroked.
    pub fn stroke<D, R>(&self, ctx: &Context<D>, recorder: &mut R)
    where
        D: Device,
        R: DrawRecorder<D::Buffer>,
    {
        ctx.record_stroke(self.id, recorder);
    }

    /// Hide or show parts of the shape without re-baking it.
    pub fn disable<D: Device>(&self, ctx: &mut Context<D>, disable: bool, draw_type: DrawType) -> bool {
        ctx.disable_polygon(self.id, disable, draw_type)
    }

    /// Destroy the polygon.
    pub fn destroy<D: Device>(self, ctx: &mut Context<D>) {
        ctx.destroy_polygon(self.id);
    }
}

/// Pending parameter changes of a [`Drawable`].
///
/// Dereferences to the parameters.
#[must_use = "edits are discarded unless committed"]
pub struct Edit<'a, P> {
    drawable: &'a mut Drawable<P>,
    params: P,
}

impl<P: Outline> Edit<'_, P> {
    /// Apply the changes. Returns `false`, without re-baking, if the
    /// parameters are unchanged.
    ///
    /// # Panics
    ///
    /// Panics on the preconditions of [`Context::update_polygon`].
    pub fn commit<D: Device>(self, ctx: &mut Context<D>) -> bool {
        if self.params == self.drawable.params {
            return false;
        }
        ctx.update_polygon(self.drawable.id, &self.params.outline(), self.params.mode());
        self.drawable.params = self.params;
        true
    }
}

impl<P> Deref for Edit<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.params
    }
}

impl<P> DerefMut for Edit<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.params
    }
}
