//! Polygon tessellation and stroke baking for GPU 2D vector graphics, with
//! indirect-draw buffer management for OpenGL (via [glow]) and [wgpu].
//!
//! The crate turns outlines into GPU-ready triangle geometry:
//!
//! - [`flatten`] approximates bezier curves and elliptical arcs with points.
//! - [`path`] assembles line, curve and arc commands into a point sequence.
//! - [`stroke`] extrudes a point sequence into a triangle strip, optionally
//!   with an antialiasing fringe.
//! - [`fill`] prepares a triangle fan, optionally split into an inset core
//!   and an antialiased edge strip.
//! - [`shapes`] generates rectangle, rounded rectangle and ellipse outlines.
//!
//! A [`Polygon`] caches baked geometry and keeps one device buffer per
//! sub-geometry. Every buffer starts with a [`DrawIndirect`] header, so
//! vertex counts (including hiding a sub-geometry) change without
//! re-recording draws. [`Polygon::update_device`] reports when a re-record
//! is required. A [`Context`] owns the [`Device`] and all polygons,
//! addressed by [`PolygonId`].
//!
//! # Example
//!
//! ```
//! use lyon::math::point;
//! use polybake::device::host::{HostDevice, HostRecorder};
//! use polybake::{Context, ContextSettings, DrawMode};
//!
//! let mut ctx = Context::new(HostDevice::new(), ContextSettings::default());
//! let square = ctx.create_polygon();
//! let points = [
//!     point(0.0, 0.0),
//!     point(100.0, 0.0),
//!     point(100.0, 100.0),
//!     point(0.0, 100.0),
//! ];
//! ctx.update_polygon(square, &points, &DrawMode::fill().with_stroke(2.0).with_loop(true));
//!
//! // Upload, then rebuild command buffers if asked to.
//! if ctx.update_devices().unwrap() {
//!     let mut recorder = HostRecorder::default();
//!     ctx.record_fill(square, &mut recorder);
//!     ctx.record_stroke(square, &mut recorder);
//!     assert_eq!(recorder.draws.len(), 2);
//! }
//! ```
//!
//! # Safety
//!
//! The glow backend issues raw GL calls: creating a
//! [`GlowDevice`](device::glow::GlowDevice) or
//! [`GlowRecorder`](device::glow::GlowRecorder) requires a valid, current
//! OpenGL context.
//!
//! [glow]: https://docs.rs/glow
//! [wgpu]: https://docs.rs/wgpu

pub mod context;
pub mod device;
pub mod drawable;
pub mod fill;
pub mod flatten;
pub mod path;
pub mod polygon;
#[cfg(feature = "glow")]
pub mod shaders;
pub mod shapes;
pub mod stroke;
mod types;

pub use context::{Context, ContextSettings, PolygonId};
pub use device::{Device, DeviceError, DrawRecorder};
pub use drawable::{CircleShape, RectShape, Shape};
pub use polygon::{Polygon, PolygonFlags};
pub use types::{
    BakedGeometry, Color, DrawIndirect, DrawMode, DrawType, Fringe, PerPointColor, Vertex,
};
