//! OpenGL backend through [`glow`].
//!
//! GL has no recorded command buffers: [`GlowRecorder`] issues every draw
//! immediately. The draw-indirect header still lets vertex counts change
//! without touching the vertex attribute setup.

use glow::HasContext;
use std::sync::Arc;

use super::{BufferLayout, Device, DeviceError, DrawCall, DrawRecorder, Residency, Topology};
use crate::shaders::{self, COLOR_LOCATION, FRINGE_LOCATION, POSITION_LOCATION};
use crate::types::Color;

#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const VERTEX_STRIDE: i32 = super::VERTEX_SIZE as i32;
#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const FRINGE_STRIDE: i32 = super::FRINGE_SIZE as i32;
#[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const COLOR_STRIDE: i32 = super::COLOR_SIZE as i32;

/// A GL buffer object together with what it was allocated as.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlowBuffer {
    raw: glow::Buffer,
    size: u64,
    residency: Residency,
}

impl GlowBuffer {
    /// The GL buffer object.
    #[must_use]
    pub fn raw(&self) -> glow::Buffer {
        self.raw
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A [`Device`] allocating GL buffer objects.
pub struct GlowDevice {
    gl: Arc<glow::Context>,
}

impl GlowDevice {
    /// Wrap a GL context.
    ///
    /// # Safety
    ///
    /// The context must stay current on the calling thread for as long as
    /// the device is used.
    #[must_use]
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }

    /// The wrapped context.
    #[must_use]
    pub fn gl(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

fn gl_int(value: u64, what: &str) -> Result<i32, DeviceError> {
    i32::try_from(value).map_err(|_| DeviceError::Backend(format!("{what} {value} exceeds i32::MAX")))
}

impl Device for GlowDevice {
    type Buffer = GlowBuffer;

    fn allocate(&mut self, size: u64, residency: Residency) -> Result<GlowBuffer, DeviceError> {
        let gl_size = i32::try_from(size).map_err(|_| DeviceError::Allocation {
            size,
            reason: "size exceeds i32::MAX".to_owned(),
        })?;
        let usage = match residency {
            Residency::DeviceLocal => glow::STATIC_DRAW,
            Residency::HostVisible => glow::DYNAMIC_DRAW,
        };

        let gl = &self.gl;
        let raw = unsafe { gl.create_buffer() }?;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(raw));
            gl.buffer_data_size(glow::ARRAY_BUFFER, gl_size, usage);
            let error = gl.get_error();
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            if error == glow::OUT_OF_MEMORY {
                gl.delete_buffer(raw);
                return Err(DeviceError::Allocation {
                    size,
                    reason: "GL_OUT_OF_MEMORY".to_owned(),
                });
            }
        }

        Ok(GlowBuffer {
            raw,
            size,
            residency,
        })
    }

    fn write(&mut self, buffer: &GlowBuffer, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        if data.is_empty() {
            return Ok(());
        }
        let len = data.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > buffer.size) {
            return Err(DeviceError::Write {
                reason: format!(
                    "{len} bytes at offset {offset} overflow a {} byte buffer",
                    buffer.size
                ),
            });
        }
        let gl_offset = gl_int(offset, "offset")?;
        let gl_len = gl_int(len, "length")?;

        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.raw));
            let result = match buffer.residency {
                Residency::DeviceLocal => {
                    gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, gl_offset, data);
                    Ok(())
                }
                Residency::HostVisible => {
                    let ptr = gl.map_buffer_range(
                        glow::ARRAY_BUFFER,
                        gl_offset,
                        gl_len,
                        glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_RANGE_BIT,
                    );
                    if ptr.is_null() {
                        Err(DeviceError::Write {
                            reason: "glMapBufferRange returned null".to_owned(),
                        })
                    } else {
                        std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
                        gl.unmap_buffer(glow::ARRAY_BUFFER);
                        Ok(())
                    }
                }
            };
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            result
        }
    }

    fn release(&mut self, buffer: GlowBuffer) {
        unsafe { self.gl.delete_buffer(buffer.raw) };
    }
}

/// Cached uniform locations of the polygon program.
struct PolygonUniforms {
    scale: glow::UniformLocation,
    offset: glow::UniformLocation,
    resolution: glow::UniformLocation,
    color: glow::UniformLocation,
    vertex_color: glow::UniformLocation,
    antialias: glow::UniformLocation,
}

/// Draws polygons with the shaders from [`shaders`].
///
/// Blending and the bound framebuffer are left to the caller; the program
/// outputs premultiplied alpha.
pub struct GlowRecorder {
    gl: Arc<glow::Context>,
    program: glow::Program,
    uniforms: PolygonUniforms,
    vao: glow::VertexArray,
    color: Color,
}

impl GlowRecorder {
    /// Compile the polygon program and create its vertex array.
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid. The caller must call
    /// [`destroy`](Self::destroy) before the context is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation, linking or resource creation fails,
    /// or a uniform is missing from the program.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self, DeviceError> {
        let program = unsafe {
            shaders::compile_program(
                &gl,
                shaders::POLYGON_VERTEX_SRC,
                shaders::POLYGON_FRAGMENT_SRC,
                &shaders::ATTRIBUTES,
            )
        }?;

        let uniform = |name: &str| {
            unsafe { gl.get_uniform_location(program, name) }
                .ok_or_else(|| DeviceError::Backend(format!("{name} missing from polygon shader")))
        };
        let uniforms = PolygonUniforms {
            scale: uniform("u_scale")?,
            offset: uniform("u_offset")?,
            resolution: uniform("u_resolution")?,
            color: uniform("u_color")?,
            vertex_color: uniform("u_vertex_color")?,
            antialias: uniform("u_antialias")?,
        };
        let vao = unsafe { gl.create_vertex_array() }?;

        let recorder = Self {
            gl,
            program,
            uniforms,
            vao,
            color: Color::WHITE,
        };
        unsafe { recorder.set_transform([1.0, 1.0], [0.0, 0.0]) };
        Ok(recorder)
    }

    /// Set the viewport size the coordinates map to.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn set_resolution(&self, [width, height]: [f32; 2]) {
        unsafe {
            self.gl.use_program(Some(self.program));
            self.gl
                .uniform_2_f32(Some(&self.uniforms.resolution), width, height);
        }
    }

    /// Set the transform applied to the baked points:
    /// `offset + scale * position`.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn set_transform(&self, scale: [f32; 2], offset: [f32; 2]) {
        unsafe {
            self.gl.use_program(Some(self.program));
            self.gl
                .uniform_2_f32(Some(&self.uniforms.scale), scale[0], scale[1]);
            self.gl
                .uniform_2_f32(Some(&self.uniforms.offset), offset[0], offset[1]);
        }
    }

    /// Set the color used by draws without per-vertex colors.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Delete the program and vertex array.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn destroy(&mut self) {
        unsafe {
            self.gl.delete_program(self.program);
            self.gl.delete_vertex_array(self.vao);
        }
    }

    /// Point the attribute arrays at the regions of `layout`.
    unsafe fn bind_streams(&self, layout: &BufferLayout, fringe: bool, color: bool) -> Option<()> {
        let gl = &self.gl;
        let positions = i32::try_from(layout.positions).ok()?;
        unsafe {
            gl.enable_vertex_attrib_array(POSITION_LOCATION);
            gl.vertex_attrib_pointer_f32(
                POSITION_LOCATION,
                2,
                glow::FLOAT,
                false,
                VERTEX_STRIDE,
                positions,
            );
        }

        match layout.fringe.filter(|_| fringe) {
            Some(offset) => unsafe {
                gl.enable_vertex_attrib_array(FRINGE_LOCATION);
                gl.vertex_attrib_pointer_f32(
                    FRINGE_LOCATION,
                    2,
                    glow::FLOAT,
                    false,
                    FRINGE_STRIDE,
                    i32::try_from(offset).ok()?,
                );
            },
            None => unsafe { gl.disable_vertex_attrib_array(FRINGE_LOCATION) },
        }

        match layout.colors.filter(|_| color) {
            Some(offset) => unsafe {
                gl.enable_vertex_attrib_array(COLOR_LOCATION);
                gl.vertex_attrib_pointer_f32(
                    COLOR_LOCATION,
                    4,
                    glow::UNSIGNED_BYTE,
                    true,
                    COLOR_STRIDE,
                    i32::try_from(offset).ok()?,
                );
            },
            None => unsafe { gl.disable_vertex_attrib_array(COLOR_LOCATION) },
        }

        Some(())
    }
}

impl DrawRecorder<GlowBuffer> for GlowRecorder {
    fn draw(&mut self, call: &DrawCall<'_, GlowBuffer>) {
        let mode = match call.topology {
            Topology::TriangleFan => glow::TRIANGLE_FAN,
            Topology::TriangleList => glow::TRIANGLES,
            Topology::TriangleStrip => glow::TRIANGLE_STRIP,
        };
        let pipeline = call.pipeline;
        let [r, g, b, a] = self.color.to_f32();

        let gl = &self.gl;
        unsafe {
            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(call.buffer.raw));

            if self
                .bind_streams(&call.layout, pipeline.antialias, pipeline.color)
                .is_none()
            {
                log::error!("buffer layout {:?} exceeds GL offsets", call.layout);
                gl.bind_vertex_array(None);
                return;
            }

            gl.uniform_4_f32(Some(&self.uniforms.color), r, g, b, a);
            gl.uniform_1_i32(
                Some(&self.uniforms.vertex_color),
                i32::from(pipeline.color && call.layout.colors.is_some()),
            );
            gl.uniform_1_i32(
                Some(&self.uniforms.antialias),
                i32::from(pipeline.antialias && call.layout.fringe.is_some()),
            );

            gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, Some(call.buffer.raw));
            gl.draw_arrays_indirect_offset(mode, 0);
            gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, None);
            gl.bind_vertex_array(None);
        }
    }
}
