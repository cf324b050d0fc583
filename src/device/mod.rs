//! The boundary between baked geometry and a graphics API.
//!
//! A [`Device`] allocates and writes buffers, a [`DrawRecorder`] turns
//! [`DrawCall`]s into API draw commands. Every geometry buffer follows the
//! same layout (see [`BufferLayout`]): a [`DrawIndirect`] header followed by
//! the vertex streams, so vertex counts can change without re-recording.

use thiserror::Error;

use crate::types::{Color, DrawIndirect, Fringe, Vertex};

pub mod host;

#[cfg(feature = "glow")]
pub mod glow;

#[cfg(feature = "wgpu")]
pub mod wgpu;

/// Errors reported by a [`Device`].
///
/// These are not retried: a failed upload leaves the polygon registered for
/// the next [`update_devices`](crate::Context::update_devices) call.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A buffer could not be allocated.
    #[error("failed to allocate a {size} byte buffer: {reason}")]
    Allocation {
        /// Requested size in bytes.
        size: u64,
        /// Backend description of the failure.
        reason: String,
    },
    /// Data could not be written into a buffer.
    #[error("buffer write failed: {reason}")]
    Write {
        /// Backend description of the failure.
        reason: String,
    },
    /// Any other backend failure, such as shader compilation.
    #[error("graphics backend error: {0}")]
    Backend(String),
}

impl From<String> for DeviceError {
    fn from(reason: String) -> Self {
        Self::Backend(reason)
    }
}

/// Where a buffer lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Device-local memory: uploads go through a staging copy, draws are
    /// cheap.
    DeviceLocal,
    /// Host-visible memory: uploads write through a mapping.
    HostVisible,
}

impl Residency {
    pub(crate) fn from_hint(device_local: bool) -> Self {
        if device_local {
            Self::DeviceLocal
        } else {
            Self::HostVisible
        }
    }
}

/// A buffer allocator and uploader.
pub trait Device {
    /// Buffer handle. Dropping it does not free the allocation; pass it to
    /// [`release`](Self::release) instead.
    type Buffer;

    /// Allocate a buffer of `size` bytes usable as vertex and indirect
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Allocation`] when memory is exhausted.
    fn allocate(&mut self, size: u64, residency: Residency) -> Result<Self::Buffer, DeviceError>;

    /// Write `data` into `buffer` at byte `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Write`] if the range is out of bounds or the
    /// backend rejects the upload.
    fn write(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> Result<(), DeviceError>;

    /// Free a buffer. Command buffers referencing it must have been
    /// re-recorded or retired.
    fn release(&mut self, buffer: Self::Buffer);

    /// Whether the backend can draw triangle fans. Fills are expanded into
    /// triangle lists at upload time otherwise.
    fn supports_triangle_fan(&self) -> bool {
        true
    }
}

/// Primitive topology of an uploaded geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// One triangle per vertex after the second, sharing the first.
    TriangleFan,
    /// Independent triangles, three vertices each.
    TriangleList,
    /// One triangle per vertex after the second, sharing the previous two.
    TriangleStrip,
}

/// Which sub-geometry of a polygon a draw belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Solid fill, or the inset core of an antialiased fill.
    Fill,
    /// The fringe strip around an antialiased fill.
    FillEdge,
    /// The stroke strip.
    Stroke,
}

/// The pipeline variant a draw needs. Backends keep one pipeline (or
/// program configuration) per distinct value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pipeline {
    /// The sub-geometry drawn.
    pub kind: GeometryKind,
    /// Reads per-vertex colors.
    pub color: bool,
    /// Reads per-vertex fringe data.
    pub antialias: bool,
}

/// Size of one position in the buffer.
pub const VERTEX_SIZE: u64 = std::mem::size_of::<Vertex>() as u64;
/// Size of one fringe record in the buffer.
pub const FRINGE_SIZE: u64 = std::mem::size_of::<Fringe>() as u64;
/// Size of one packed color in the buffer.
pub const COLOR_SIZE: u64 = std::mem::size_of::<Color>() as u64;

const fn align4(offset: u64) -> u64 {
    (offset + 3) & !3
}

/// Byte layout of a geometry buffer.
///
/// ```text
/// [DrawIndirect][positions × capacity][fringe × capacity]?[colors × capacity]?
/// ```
///
/// Region offsets depend only on the capacity and on which regions exist,
/// never on the current vertex count, so vertex bindings recorded against a
/// buffer stay valid until it is reallocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferLayout {
    /// Vertices the buffer can hold.
    pub capacity: u32,
    /// Offset of the position stream.
    pub positions: u64,
    /// Offset of the fringe stream, if present.
    pub fringe: Option<u64>,
    /// Offset of the color stream, if present.
    pub colors: Option<u64>,
    /// Total buffer size in bytes.
    pub size: u64,
}

impl BufferLayout {
    /// Lay out a buffer for `capacity` vertices.
    #[must_use]
    pub fn new(capacity: u32, fringe: bool, color: bool) -> Self {
        let capacity_bytes = u64::from(capacity);
        let positions = DrawIndirect::SIZE;
        let mut end = positions + capacity_bytes * VERTEX_SIZE;

        let fringe = fringe.then(|| {
            let offset = align4(end);
            end = offset + capacity_bytes * FRINGE_SIZE;
            offset
        });
        let colors = color.then(|| {
            let offset = align4(end);
            end = offset + capacity_bytes * COLOR_SIZE;
            offset
        });

        Self {
            capacity,
            positions,
            fringe,
            colors,
            size: end,
        }
    }

    /// Whether `count` vertices with the given streams fit without
    /// reallocating.
    #[must_use]
    pub fn fits(&self, count: u32, fringe: bool, color: bool) -> bool {
        count <= self.capacity && self.fringe.is_some() == fringe && self.colors.is_some() == color
    }
}

/// A single indirect draw of one polygon sub-geometry.
///
/// The vertex count is read from the [`DrawIndirect`] header at offset 0 of
/// `buffer`.
#[derive(Debug)]
pub struct DrawCall<'a, B> {
    /// Pipeline variant the draw needs.
    pub pipeline: Pipeline,
    /// Primitive topology of the vertices.
    pub topology: Topology,
    /// Buffer holding header and vertex streams.
    pub buffer: &'a B,
    /// Stream offsets within `buffer`.
    pub layout: BufferLayout,
}

/// Receives the draws of a polygon while a command buffer is recorded.
pub trait DrawRecorder<B> {
    /// Record one indirect draw.
    fn draw(&mut self, call: &DrawCall<'_, B>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_regions_follow_capacity() {
        let layout = BufferLayout::new(10, true, true);
        assert_eq!(layout.positions, 16);
        assert_eq!(layout.fringe, Some(16 + 80));
        assert_eq!(layout.colors, Some(16 + 80 + 80));
        assert_eq!(layout.size, 16 + 80 + 80 + 40);

        let plain = BufferLayout::new(10, false, true);
        assert_eq!(plain.fringe, None);
        assert_eq!(plain.colors, Some(96));
        assert!(plain.fits(10, false, true));
        assert!(!plain.fits(11, false, true));
        assert!(!plain.fits(5, true, true));
    }

    #[test]
    fn regions_are_aligned() {
        for capacity in 0..9 {
            let layout = BufferLayout::new(capacity, true, true);
            assert_eq!(layout.fringe.unwrap_or(0) % 4, 0);
            assert_eq!(layout.colors.unwrap_or(0) % 4, 0);
            assert_eq!(layout.size % 4, 0);
        }
    }

    #[test]
    fn string_errors_become_backend_errors() {
        let err = DeviceError::from("context lost".to_owned());
        assert_eq!(err.to_string(), "graphics backend error: context lost");
    }
}
