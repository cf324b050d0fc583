//! Value types shared by the bakers, the polygon resource and the device
//! backends.
//!
//! Types that end up in GPU memory are `#[repr(C)]` and [`Pod`], so their
//! byte images can be produced with [`bytemuck::cast_slice`].

use bytemuck::{Pod, Zeroable};
use lyon::math::Point;

/// A baked vertex position, ready for the GPU.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    /// `[x, y]`.
    pub position: [f32; 2],
}

impl From<Point> for Vertex {
    fn from(p: Point) -> Self {
        Self {
            position: p.to_array(),
        }
    }
}

/// Per-vertex antialiasing data for fringe geometry.
///
/// The fragment stage computes coverage as
/// `min(1, (1 - |2 * coord - 1|) * mult)`, so `coord` runs across the strip
/// (0 on one border, 1 on the other) and `mult` scales the fade so that it
/// spans exactly one fringe width.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Fringe {
    /// Position across the fringe strip, 0 to 1.
    pub coord: f32,
    /// Coverage scale.
    pub mult: f32,
}

/// A straight-alpha RGBA8 color, packed as it is stored on the GPU.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgba8(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba8(0, 0, 0, 255);

    /// Create a color from 8-bit channels.
    #[must_use]
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from `[0, 1]` float channels, clamping out-of-range
    /// values.
    #[must_use]
    pub fn from_f32(rgba: [f32; 4]) -> Self {
        // Clamped to [0, 255] first, so the cast cannot truncate.
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba8(
            channel(rgba[0]),
            channel(rgba[1]),
            channel(rgba[2]),
            channel(rgba[3]),
        )
    }

    /// The channels as `[0, 1]` floats.
    #[must_use]
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

/// The draw-indirect record at the start of every geometry buffer.
///
/// Matches the layout of `VkDrawIndirectCommand`, `DrawArraysIndirectCommand`
/// and `wgpu::util::DrawIndirectArgs`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DrawIndirect {
    /// Number of vertices drawn.
    pub vertex_count: u32,
    /// Number of instances, always 1.
    pub instance_count: u32,
    /// First vertex drawn.
    pub first_vertex: u32,
    /// First instance drawn.
    pub first_instance: u32,
}

impl DrawIndirect {
    /// Size of the header in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// A single-instance draw of `vertex_count` vertices.
    #[must_use]
    pub fn vertices(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Per-point color override for a [`DrawMode`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerPointColor {
    /// One color per input point.
    pub points: Vec<Color>,
    /// Use the colors for the fill geometry.
    pub fill: bool,
    /// Use the colors for the stroke geometry.
    pub stroke: bool,
}

/// How a point sequence is turned into geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawMode {
    /// Generate fill geometry.
    pub fill: bool,
    /// Stroke width. Zero disables the stroke.
    pub stroke: f32,
    /// Wrap the stroke from the last point back to the first, even when the
    /// point sequence is not literally closed.
    pub closed: bool,
    /// Optional per-point colors.
    pub color: Option<PerPointColor>,
    /// Antialias the fill with an inset core and a fringe edge strip.
    pub aa_fill: bool,
    /// Antialias the stroke with a fringe.
    pub aa_stroke: bool,
    /// Keep the geometry in device-local memory (staged uploads, cheaper
    /// draws) instead of host-visible memory.
    pub device_local: bool,
}

impl DrawMode {
    /// A plain fill.
    #[must_use]
    pub fn fill() -> Self {
        Self {
            fill: true,
            ..Self::default()
        }
    }

    /// A plain open stroke of the given width.
    #[must_use]
    pub fn stroke(width: f32) -> Self {
        Self {
            stroke: width,
            ..Self::default()
        }
    }

    /// Add a stroke of the given width.
    #[must_use]
    pub fn with_stroke(mut self, width: f32) -> Self {
        self.stroke = width;
        self
    }

    /// Set whether the stroke wraps around.
    #[must_use]
    pub fn with_loop(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Antialias both fill and stroke.
    #[must_use]
    pub fn with_antialias(mut self, aa: bool) -> Self {
        self.aa_fill = aa;
        self.aa_stroke = aa;
        self
    }

    /// Use per-point colors for the selected geometry.
    #[must_use]
    pub fn with_colors(mut self, points: Vec<Color>, fill: bool, stroke: bool) -> Self {
        self.color = Some(PerPointColor {
            points,
            fill,
            stroke,
        });
        self
    }

    /// Set the memory residency hint.
    #[must_use]
    pub fn with_device_local(mut self, device_local: bool) -> Self {
        self.device_local = device_local;
        self
    }

    pub(crate) fn fill_colors(&self) -> Option<&[Color]> {
        self.color
            .as_ref()
            .filter(|c| c.fill)
            .map(|c| c.points.as_slice())
    }

    pub(crate) fn stroke_colors(&self) -> Option<&[Color]> {
        self.color
            .as_ref()
            .filter(|c| c.stroke)
            .map(|c| c.points.as_slice())
    }
}

/// Addresses the sub-geometry a visibility toggle applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DrawType {
    /// Only the stroke.
    Stroke,
    /// Only the fill.
    Fill,
    /// Both fill and stroke.
    StrokeFill,
}

impl DrawType {
    pub(crate) fn fill(self) -> bool {
        matches!(self, Self::Fill | Self::StrokeFill)
    }

    pub(crate) fn stroke(self) -> bool {
        matches!(self, Self::Stroke | Self::StrokeFill)
    }
}

/// CPU-side output of a baker.
///
/// `fringe` and `colors` are either empty or parallel to `positions`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedGeometry {
    /// Vertex positions.
    pub positions: Vec<Point>,
    /// Fringe data, one per position.
    pub fringe: Vec<Fringe>,
    /// Colors, one per position.
    pub colors: Vec<Color>,
    /// The strip wraps around: its first vertex pair follows the last one.
    pub closed: bool,
}

impl BakedGeometry {
    /// Number of baked vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing was baked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether per-vertex fringe data is present.
    #[must_use]
    pub fn has_fringe(&self) -> bool {
        !self.fringe.is_empty()
    }

    /// Whether per-vertex colors are present.
    #[must_use]
    pub fn has_color(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Drop all baked data.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.fringe.clear();
        self.colors.clear();
        self.closed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_f32_conversion_clamps() {
        let c = Color::from_f32([1.5, 0.5, -1.0, 1.0]);
        assert_eq!(c, Color::rgba8(255, 128, 0, 255));
        assert_eq!(Color::WHITE.to_f32(), [1.0; 4]);
    }

    #[test]
    fn header_is_sixteen_bytes() {
        assert_eq!(DrawIndirect::SIZE, 16);
        let header = DrawIndirect::vertices(7);
        assert_eq!(bytemuck::bytes_of(&header)[..4], 7u32.to_ne_bytes());
    }

    #[test]
    fn draw_mode_color_selection() {
        let mode = DrawMode::fill().with_colors(vec![Color::BLACK; 3], true, false);
        assert_eq!(mode.fill_colors().map(<[Color]>::len), Some(3));
        assert!(mode.stroke_colors().is_none());
    }
}
