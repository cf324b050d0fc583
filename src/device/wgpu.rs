//! [`wgpu`] backend.
//!
//! Buffers are written through [`wgpu::Queue::write_buffer`] for both
//! residencies; the hint is kept on the buffer for callers that care. wgpu
//! has no triangle fans, so fills arrive as triangle lists.
//!
//! Render pipelines are built by the caller, one per [`Pipeline`] variant,
//! from [`POLYGON_WGSL`], [`vertex_entry_point`], [`vertex_buffer_layouts`]
//! and [`primitive_topology`], and handed to [`WgpuPipelines`]. Bind group 0
//! must hold a uniform buffer with a [`Globals`] record while recording.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::{
    BufferLayout, Device, DeviceError, DrawCall, DrawRecorder, GeometryKind, Pipeline, Residency,
    COLOR_SIZE, FRINGE_SIZE, VERTEX_SIZE,
};
use crate::types::Color;

/// Shader for every [`Pipeline`] variant. Vertex entry points are listed by
/// [`vertex_entry_point`]; the fragment entry point is [`FRAGMENT_ENTRY_POINT`].
/// Output is premultiplied.
pub const POLYGON_WGSL: &str = r"
struct Globals {
    resolution: vec2<f32>,
    scale: vec2<f32>,
    offset: vec2<f32>,
    _padding: vec2<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0) var<uniform> globals: Globals;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) fringe: vec2<f32>,
    @location(1) color: vec4<f32>,
}

fn project(p: vec2<f32>) -> vec4<f32> {
    let world = globals.offset + globals.scale * p;
    var ndc = world / globals.resolution * 2.0 - 1.0;
    ndc.y = -ndc.y;
    return vec4<f32>(ndc, 0.0, 1.0);
}

@vertex
fn vs_plain(@location(0) position: vec2<f32>) -> VertexOutput {
    return VertexOutput(project(position), vec2<f32>(0.5, 1.0), globals.color);
}

@vertex
fn vs_fringe(@location(0) position: vec2<f32>, @location(1) fringe: vec2<f32>) -> VertexOutput {
    return VertexOutput(project(position), fringe, globals.color);
}

@vertex
fn vs_color(@location(0) position: vec2<f32>, @location(2) color: vec4<f32>) -> VertexOutput {
    return VertexOutput(project(position), vec2<f32>(0.5, 1.0), color);
}

@vertex
fn vs_fringe_color(
    @location(0) position: vec2<f32>,
    @location(1) fringe: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    return VertexOutput(project(position), fringe, color);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let coverage = min(1.0, (1.0 - abs(2.0 * in.fringe.x - 1.0)) * in.fringe.y);
    let alpha = in.color.a * coverage;
    return vec4<f32>(in.color.rgb * alpha, alpha);
}
";

/// Fragment entry point of [`POLYGON_WGSL`].
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// The uniform record bound at group 0, binding 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Globals {
    /// Viewport size in pixels.
    pub resolution: [f32; 2],
    /// Scale applied to baked positions.
    pub scale: [f32; 2],
    /// Translation applied after scaling.
    pub offset: [f32; 2],
    /// Aligns `color` to 16 bytes.
    pub _padding: [f32; 2],
    /// Color for draws without per-vertex colors.
    pub color: [f32; 4],
}

impl Globals {
    /// Identity transform over a viewport.
    #[must_use]
    pub fn new(resolution: [f32; 2], color: Color) -> Self {
        Self {
            resolution,
            scale: [1.0, 1.0],
            offset: [0.0, 0.0],
            _padding: [0.0; 2],
            color: color.to_f32(),
        }
    }
}

static POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x2];
static FRINGE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
static COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Unorm8x4];

/// The vertex entry point of [`POLYGON_WGSL`] matching a pipeline's
/// streams.
#[must_use]
pub fn vertex_entry_point(pipeline: Pipeline) -> &'static str {
    match (pipeline.antialias, pipeline.color) {
        (false, false) => "vs_plain",
        (true, false) => "vs_fringe",
        (false, true) => "vs_color",
        (true, true) => "vs_fringe_color",
    }
}

/// Vertex buffer layouts of a pipeline, one per stream, in slot order:
/// positions, then fringe if antialiased, then colors if colored.
#[must_use]
pub fn vertex_buffer_layouts(pipeline: Pipeline) -> Vec<wgpu::VertexBufferLayout<'static>> {
    let mut layouts = vec![wgpu::VertexBufferLayout {
        array_stride: VERTEX_SIZE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRIBUTES,
    }];
    if pipeline.antialias {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: FRINGE_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &FRINGE_ATTRIBUTES,
        });
    }
    if pipeline.color {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: COLOR_SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &COLOR_ATTRIBUTES,
        });
    }
    layouts
}

/// The primitive topology a pipeline for `kind` must use.
#[must_use]
pub fn primitive_topology(kind: GeometryKind) -> wgpu::PrimitiveTopology {
    match kind {
        GeometryKind::Fill => wgpu::PrimitiveTopology::TriangleList,
        GeometryKind::FillEdge | GeometryKind::Stroke => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// A wgpu buffer together with the residency it was requested with.
#[derive(Clone, Debug)]
pub struct WgpuBuffer {
    raw: wgpu::Buffer,
    residency: Residency,
}

impl WgpuBuffer {
    /// The wgpu buffer.
    #[must_use]
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    /// The residency the buffer was allocated with.
    #[must_use]
    pub fn residency(&self) -> Residency {
        self.residency
    }
}

/// A [`Device`] on a wgpu device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuDevice {
    /// Wrap a device and the queue writes are submitted on.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// The wrapped device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wrapped queue.
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl Device for WgpuDevice {
    type Buffer = WgpuBuffer;

    fn allocate(&mut self, size: u64, residency: Residency) -> Result<WgpuBuffer, DeviceError> {
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(DeviceError::Allocation {
                size,
                reason: format!("exceeds the device limit of {max} bytes"),
            });
        }

        let raw = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Polygon Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(WgpuBuffer { raw, residency })
    }

    fn write(&mut self, buffer: &WgpuBuffer, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let len = data.len() as u64;
        let size = buffer.raw.size();
        if offset.checked_add(len).is_none_or(|end| end > size) {
            return Err(DeviceError::Write {
                reason: format!("{len} bytes at offset {offset} overflow a {size} byte buffer"),
            });
        }
        if !offset.is_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
            || !len.is_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
        {
            return Err(DeviceError::Write {
                reason: format!("{len} bytes at offset {offset} are not 4-byte aligned"),
            });
        }
        self.queue.write_buffer(&buffer.raw, offset, data);
        Ok(())
    }

    fn release(&mut self, buffer: WgpuBuffer) {
        buffer.raw.destroy();
    }

    fn supports_triangle_fan(&self) -> bool {
        false
    }
}

/// Render pipelines keyed by the [`Pipeline`] variant they draw.
#[derive(Default)]
pub struct WgpuPipelines {
    pipelines: HashMap<Pipeline, wgpu::RenderPipeline>,
}

impl WgpuPipelines {
    /// An empty pipeline table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pipeline for a variant, returning the one it replaces.
    pub fn insert(
        &mut self,
        pipeline: Pipeline,
        render_pipeline: wgpu::RenderPipeline,
    ) -> Option<wgpu::RenderPipeline> {
        self.pipelines.insert(pipeline, render_pipeline)
    }

    /// The pipeline registered for a variant.
    #[must_use]
    pub fn get(&self, pipeline: Pipeline) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&pipeline)
    }
}

/// Records polygon draws into a render pass.
pub struct WgpuRecorder<'a, 'pass> {
    pass: &'a mut wgpu::RenderPass<'pass>,
    pipelines: &'a WgpuPipelines,
}

impl<'a, 'pass> WgpuRecorder<'a, 'pass> {
    /// Record into `pass`. The caller binds the [`Globals`] bind group.
    pub fn new(pass: &'a mut wgpu::RenderPass<'pass>, pipelines: &'a WgpuPipelines) -> Self {
        Self { pass, pipelines }
    }
}

fn stream<'b>(
    buffer: &'b wgpu::Buffer,
    offset: u64,
    stride: u64,
    layout: &BufferLayout,
) -> wgpu::BufferSlice<'b> {
    buffer.slice(offset..offset + stride * u64::from(layout.capacity))
}

impl DrawRecorder<WgpuBuffer> for WgpuRecorder<'_, '_> {
    fn draw(&mut self, call: &DrawCall<'_, WgpuBuffer>) {
        let Some(render_pipeline) = self.pipelines.get(call.pipeline) else {
            log::warn!("no render pipeline for {:?}, draw skipped", call.pipeline);
            return;
        };
        let layout = &call.layout;
        if layout.capacity == 0 {
            return;
        }
        let raw = &call.buffer.raw;

        self.pass.set_pipeline(render_pipeline);
        let mut slot = 0;
        self.pass
            .set_vertex_buffer(slot, stream(raw, layout.positions, VERTEX_SIZE, layout));
        if call.pipeline.antialias {
            let Some(offset) = layout.fringe else {
                log::warn!("antialiased draw without fringe stream skipped");
                return;
            };
            slot += 1;
            self.pass
                .set_vertex_buffer(slot, stream(raw, offset, FRINGE_SIZE, layout));
        }
        if call.pipeline.color {
            let Some(offset) = layout.colors else {
                log::warn!("colored draw without color stream skipped");
                return;
            };
            slot += 1;
            self.pass
                .set_vertex_buffer(slot, stream(raw, offset, COLOR_SIZE, layout));
        }
        self.pass.draw_indirect(raw, 0);
    }
}
