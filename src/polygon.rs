//! The polygon device resource.
//!
//! A [`Polygon`] owns up to three baked sub-geometries (fill, antialiased
//! fill edge, stroke) and one device buffer per sub-geometry. Baking happens
//! in [`Polygon::update`], uploading in [`Polygon::update_device`], which
//! also reports whether command buffers drawing the polygon must be
//! re-recorded.

use lyon::math::Point;

use crate::context::ContextSettings;
use crate::device::{
    BufferLayout, Device, DeviceError, DrawCall, DrawRecorder, GeometryKind, Pipeline, Residency,
    Topology,
};
use crate::fill::bake_fill;
use crate::stroke::{bake_stroke, StrokeOptions};
use crate::types::{BakedGeometry, DrawIndirect, DrawMode, DrawType, Vertex};

/// State of a [`Polygon`] after its last [`update`](Polygon::update) and
/// [`disable`](Polygon::disable) calls.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolygonFlags {
    /// Fill geometry was baked.
    pub has_fill: bool,
    /// Stroke geometry was baked.
    pub has_stroke: bool,
    /// The fill reads per-vertex colors.
    pub fill_has_color: bool,
    /// The stroke reads per-vertex colors.
    pub stroke_has_color: bool,
    /// The fill is antialiased.
    pub fill_aa: bool,
    /// The stroke is antialiased.
    pub stroke_aa: bool,
    /// The fill draws zero vertices.
    pub disable_fill: bool,
    /// The stroke draws zero vertices.
    pub disable_stroke: bool,
    /// Buffers live in device-local memory.
    pub device_local: bool,
}

impl PolygonFlags {
    /// The flags that select pipelines or vertex bindings. A change in any
    /// of them invalidates recorded draws.
    fn pipeline_state(self) -> Self {
        Self {
            disable_fill: false,
            disable_stroke: false,
            device_local: false,
            ..self
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pending {
    None,
    /// Only the draw-indirect headers changed.
    Header,
    Geometry,
}

struct GpuGeometry<B> {
    buffer: B,
    layout: BufferLayout,
    residency: Residency,
    topology: Topology,
    count: u32,
}

struct Geometry<B> {
    baked: BakedGeometry,
    gpu: Option<GpuGeometry<B>>,
}

impl<B> Default for Geometry<B> {
    fn default() -> Self {
        Self {
            baked: BakedGeometry::default(),
            gpu: None,
        }
    }
}

impl<B> Geometry<B> {
    /// Upload the baked data, growing the buffer if needed. Returns whether
    /// the buffer was reallocated.
    fn upload<D>(
        &mut self,
        device: &mut D,
        residency: Residency,
        strip: bool,
        hidden: bool,
    ) -> Result<bool, DeviceError>
    where
        D: Device<Buffer = B>,
    {
        if self.baked.is_empty() {
            if let Some(gpu) = &mut self.gpu {
                gpu.count = 0;
                write_header(device, gpu, hidden)?;
            }
            return Ok(false);
        }

        let topology = if strip {
            Topology::TriangleStrip
        } else if device.supports_triangle_fan() {
            Topology::TriangleFan
        } else {
            Topology::TriangleList
        };
        let closed = self.baked.closed;
        let positions: Vec<Vertex> = expand(&self.baked.positions, topology, closed)
            .into_iter()
            .map(Vertex::from)
            .collect();
        let fringe = expand(&self.baked.fringe, topology, closed);
        let colors = expand(&self.baked.colors, topology, closed);

        let count = u32::try_from(positions.len()).map_err(|_| DeviceError::Allocation {
            size: positions.len() as u64,
            reason: "vertex count exceeds u32::MAX".to_owned(),
        })?;
        let has_fringe = !fringe.is_empty();
        let has_color = !colors.is_empty();

        let mut reallocated = false;
        let gpu = match self.gpu.take() {
            Some(gpu)
                if gpu.residency == residency && gpu.layout.fits(count, has_fringe, has_color) =>
            {
                self.gpu.insert(gpu)
            }
            old => {
                let capacity = match &old {
                    Some(old) if count > old.layout.capacity => {
                        count.max(old.layout.capacity.saturating_mul(2))
                    }
                    Some(old) => old.layout.capacity,
                    None => count,
                };
                let layout = BufferLayout::new(capacity, has_fringe, has_color);
                let buffer = match device.allocate(layout.size, residency) {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        self.gpu = old;
                        return Err(err);
                    }
                };
                log::debug!(
                    "allocated {} byte {residency:?} geometry buffer for {capacity} vertices",
                    layout.size,
                );
                if let Some(old) = old {
                    device.release(old.buffer);
                }
                reallocated = true;
                self.gpu.insert(GpuGeometry {
                    buffer,
                    layout,
                    residency,
                    topology,
                    count,
                })
            }
        };
        gpu.count = count;
        gpu.topology = topology;

        write_header(device, gpu, hidden)?;
        device.write(
            &gpu.buffer,
            gpu.layout.positions,
            bytemuck::cast_slice(&positions),
        )?;
        if let Some(offset) = gpu.layout.fringe {
            device.write(&gpu.buffer, offset, bytemuck::cast_slice(&fringe))?;
        }
        if let Some(offset) = gpu.layout.colors {
            device.write(&gpu.buffer, offset, bytemuck::cast_slice(&colors))?;
        }

        Ok(reallocated)
    }

    fn draw<R: DrawRecorder<B>>(&self, recorder: &mut R, pipeline: Pipeline) {
        if let Some(gpu) = &self.gpu {
            recorder.draw(&DrawCall {
                pipeline,
                topology: gpu.topology,
                buffer: &gpu.buffer,
                layout: gpu.layout,
            });
        }
    }

    fn release<D: Device<Buffer = B>>(self, device: &mut D) {
        if let Some(gpu) = self.gpu {
            device.release(gpu.buffer);
        }
    }
}

fn write_header<D: Device>(
    device: &mut D,
    gpu: &GpuGeometry<D::Buffer>,
    hidden: bool,
) -> Result<(), DeviceError> {
    let header = DrawIndirect::vertices(if hidden { 0 } else { gpu.count });
    device.write(&gpu.buffer, 0, bytemuck::bytes_of(&header))
}

/// Rearrange baked vertices into what the topology draws: fans become
/// lists, closed strips repeat their first vertex pair.
fn expand<T: Copy>(items: &[T], topology: Topology, closed: bool) -> Vec<T> {
    match topology {
        Topology::TriangleList => {
            if items.len() < 3 {
                return Vec::new();
            }
            let mut list = Vec::with_capacity((items.len() - 2) * 3);
            for pair in items[1..].windows(2) {
                list.extend_from_slice(&[items[0], pair[0], pair[1]]);
            }
            list
        }
        Topology::TriangleStrip if closed && items.len() >= 2 => {
            let mut strip = Vec::with_capacity(items.len() + 2);
            strip.extend_from_slice(items);
            strip.extend_from_slice(&items[..2]);
            strip
        }
        Topology::TriangleFan | Topology::TriangleStrip => items.to_vec(),
    }
}

/// Baked fill and stroke geometry for one point sequence, plus its device
/// buffers.
pub struct Polygon<B> {
    fill: Geometry<B>,
    fill_edge: Geometry<B>,
    stroke: Geometry<B>,
    flags: PolygonFlags,
    pending: Pending,
    recorded: Option<PolygonFlags>,
    /// A buffer was reallocated by an upload that has not yet been reported
    /// by a successful [`update_device`](Self::update_device).
    realloc_pending: bool,
}

impl<B> Default for Polygon<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Polygon<B> {
    /// An empty polygon that draws nothing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fill: Geometry::default(),
            fill_edge: Geometry::default(),
            stroke: Geometry::default(),
            flags: PolygonFlags::default(),
            pending: Pending::None,
            recorded: None,
            realloc_pending: false,
        }
    }

    /// Current flags.
    #[must_use]
    pub fn flags(&self) -> PolygonFlags {
        self.flags
    }

    /// Baked fill geometry (the inset core when antialiased).
    #[must_use]
    pub fn fill_geometry(&self) -> &BakedGeometry {
        &self.fill.baked
    }

    /// Baked antialiasing strip around the fill.
    #[must_use]
    pub fn fill_edge_geometry(&self) -> &BakedGeometry {
        &self.fill_edge.baked
    }

    /// Baked stroke strip.
    #[must_use]
    pub fn stroke_geometry(&self) -> &BakedGeometry {
        &self.stroke.baked
    }

    /// The device buffer holding a sub-geometry, once uploaded.
    #[must_use]
    pub fn buffer(&self, kind: GeometryKind) -> Option<&B> {
        self.geometry(kind).gpu.as_ref().map(|gpu| &gpu.buffer)
    }

    /// The layout of a sub-geometry's device buffer, once uploaded.
    #[must_use]
    pub fn buffer_layout(&self, kind: GeometryKind) -> Option<BufferLayout> {
        self.geometry(kind).gpu.as_ref().map(|gpu| gpu.layout)
    }

    /// Whether baked data or headers are waiting for
    /// [`update_device`](Self::update_device).
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.pending != Pending::None
    }

    fn geometry(&self, kind: GeometryKind) -> &Geometry<B> {
        match kind {
            GeometryKind::Fill => &self.fill,
            GeometryKind::FillEdge => &self.fill_edge,
            GeometryKind::Stroke => &self.stroke,
        }
    }

    /// Re-bake all geometry from `points`.
    ///
    /// Previously baked data is discarded. Visibility set through
    /// [`disable`](Self::disable) is kept.
    ///
    /// # Panics
    ///
    /// Panics if the stroke width is negative, if per-point colors are used
    /// and their count differs from the point count, or if antialiasing is
    /// requested while `settings` disables it.
    pub fn update(&mut self, points: &[Point], mode: &DrawMode, settings: &ContextSettings) {
        assert!(mode.stroke >= 0.0, "negative stroke width");
        if let Some(color) = mode.color.as_ref().filter(|c| c.fill || c.stroke) {
            assert_eq!(
                color.points.len(),
                points.len(),
                "per-point color count mismatch"
            );
        }
        assert!(
            settings.antialiasing || !(mode.aa_fill || mode.aa_stroke),
            "antialiasing requested but disabled in the context settings"
        );

        self.fill.baked.clear();
        self.fill_edge.baked.clear();
        self.stroke.baked.clear();

        let has_fill = mode.fill;
        let has_stroke = mode.stroke > 0.0;
        let fill_aa = has_fill && mode.aa_fill;
        let stroke_aa = has_stroke && mode.aa_stroke;

        if has_fill {
            let baked = bake_fill(
                points,
                fill_aa.then_some(settings.fringe),
                mode.fill_colors(),
            );
            self.fill.baked = baked.fill;
            self.fill_edge.baked = baked.edge;
        }

        if has_stroke {
            let options = StrokeOptions {
                width: mode.stroke,
                closed: mode.closed,
                fringe: stroke_aa.then_some(settings.fringe),
            };
            self.stroke.baked = bake_stroke(points, &options, mode.stroke_colors());
        }

        self.flags = PolygonFlags {
            has_fill,
            has_stroke,
            fill_has_color: has_fill && mode.fill_colors().is_some(),
            stroke_has_color: has_stroke && mode.stroke_colors().is_some(),
            fill_aa,
            stroke_aa,
            device_local: mode.device_local,
            ..self.flags
        };
        self.pending = Pending::Geometry;
    }

    /// Hide or show a sub-geometry without re-baking or re-recording.
    ///
    /// The hidden geometry keeps its buffer; its draw-indirect vertex count
    /// is zeroed on the next [`update_device`](Self::update_device). Returns
    /// whether anything changed.
    pub fn disable(&mut self, disable: bool, draw_type: DrawType) -> bool {
        let before = self.flags;
        if draw_type.fill() {
            self.flags.disable_fill = disable;
        }
        if draw_type.stroke() {
            self.flags.disable_stroke = disable;
        }

        let changed = before != self.flags;
        if changed && self.pending == Pending::None {
            self.pending = Pending::Header;
        }
        changed
    }

    /// Upload pending changes.
    ///
    /// Returns `true` if command buffers drawing this polygon must be
    /// re-recorded: a buffer was (re)allocated, or a flag that selects the
    /// pipeline or vertex bindings changed since the last call.
    ///
    /// # Errors
    ///
    /// Propagates allocation and write failures from the device. The
    /// polygon stays pending and can be uploaded again.
    pub fn update_device<D>(&mut self, device: &mut D) -> Result<bool, DeviceError>
    where
        D: Device<Buffer = B>,
    {
        let mut rerecord = false;

        let state = self.flags.pipeline_state();
        if self.recorded != Some(state) {
            log::debug!("polygon pipeline state changed to {state:?}");
            rerecord = true;
        }

        let flags = self.flags;
        match self.pending {
            Pending::None => {}
            Pending::Header => {
                let headers = [
                    (&self.fill, flags.disable_fill),
                    (&self.fill_edge, flags.disable_fill),
                    (&self.stroke, flags.disable_stroke),
                ];
                for (geometry, hidden) in headers {
                    if let Some(gpu) = &geometry.gpu {
                        write_header(device, gpu, hidden)?;
                    }
                }
            }
            Pending::Geometry => {
                let residency = Residency::from_hint(flags.device_local);
                // A later part may fail after an earlier one replaced its
                // buffer, so reallocations are remembered across calls.
                if self
                    .fill
                    .upload(device, residency, false, flags.disable_fill)?
                {
                    self.realloc_pending = true;
                }
                if self
                    .fill_edge
                    .upload(device, residency, true, flags.disable_fill)?
                {
                    self.realloc_pending = true;
                }
                if self
                    .stroke
                    .upload(device, residency, true, flags.disable_stroke)?
                {
                    self.realloc_pending = true;
                }
            }
        }

        self.pending = Pending::None;
        self.recorded = Some(state);
        Ok(rerecord | std::mem::take(&mut self.realloc_pending))
    }

    /// Record the fill draws: the fill itself and, when antialiased, its
    /// edge strip.
    ///
    /// # Panics
    ///
    /// Panics if the polygon was last updated without fill.
    pub fn fill<R: DrawRecorder<B>>(&self, recorder: &mut R) {
        assert!(self.flags.has_fill, "fill() on a polygon without fill");
        let color = self.flags.fill_has_color;
        self.fill.draw(
            recorder,
            Pipeline {
                kind: GeometryKind::Fill,
                color,
                antialias: false,
            },
        );
        if self.flags.fill_aa {
            self.fill_edge.draw(
                recorder,
                Pipeline {
                    kind: GeometryKind::FillEdge,
                    color,
                    antialias: true,
                },
            );
        }
    }

    /// Record the stroke draw.
    ///
    /// # Panics
    ///
    /// Panics if the polygon was last updated without stroke.
    pub fn stroke<R: DrawRecorder<B>>(&self, recorder: &mut R) {
        assert!(self.flags.has_stroke, "stroke() on a polygon without stroke");
        self.stroke.draw(
            recorder,
            Pipeline {
                kind: GeometryKind::Stroke,
                color: self.flags.stroke_has_color,
                antialias: self.flags.stroke_aa,
            },
        );
    }

    /// Free all device buffers.
    pub fn release<D: Device<Buffer = B>>(self, device: &mut D) {
        self.fill.release(device);
        self.fill_edge.release(device);
        self.stroke.release(device);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::device::host::{HostBuffer, HostDevice, HostRecorder};
    use crate::types::Color;
    use lyon::math::point;

    fn square() -> Vec<Point> {
        vec![
            point(0.0, 0.0),
            point(100.0, 0.0),
            point(100.0, 100.0),
            point(0.0, 100.0),
        ]
    }

    fn settings() -> ContextSettings {
        ContextSettings::default()
    }

    fn vertex_count(device: &HostDevice, polygon: &Polygon<HostBuffer>, kind: GeometryKind) -> u32 {
        device
            .header(polygon.buffer(kind).unwrap())
            .unwrap()
            .vertex_count
    }

    #[test]
    fn fill_and_stroke_square() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        let mode = DrawMode::fill().with_stroke(2.0).with_loop(true);
        polygon.update(&square(), &mode, &settings());

        let flags = polygon.flags();
        assert!(flags.has_fill && flags.has_stroke);
        assert_eq!(polygon.fill_geometry().positions, square());
        assert_eq!(polygon.stroke_geometry().len(), 8);
        assert!(polygon.fill_edge_geometry().is_empty());

        assert!(polygon.update_device(&mut device).unwrap());
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Fill), 4);
        // The closed strip repeats its first pair on the device.
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Stroke), 10);
        assert!(polygon.buffer(GeometryKind::FillEdge).is_none());

        let mut recorder = HostRecorder::default();
        polygon.fill(&mut recorder);
        polygon.stroke(&mut recorder);
        assert_eq!(recorder.draws.len(), 2);
        assert_eq!(recorder.draws[0].topology, Topology::TriangleFan);
        assert_eq!(recorder.draws[1].topology, Topology::TriangleStrip);
        assert!(!recorder.draws[1].pipeline.antialias);
    }

    #[test]
    fn uploaded_bytes_match_baked_positions() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        polygon.update(&square(), &DrawMode::fill(), &settings());
        polygon.update_device(&mut device).unwrap();

        let buffer = polygon.buffer(GeometryKind::Fill).unwrap();
        let layout = polygon.buffer_layout(GeometryKind::Fill).unwrap();
        let data = device.contents(buffer).unwrap();
        let start = usize::try_from(layout.positions).unwrap();
        let vertices: Vec<Vertex> = square().into_iter().map(Vertex::from).collect();
        assert_eq!(
            &data[start..start + 32],
            bytemuck::cast_slice::<Vertex, u8>(&vertices),
        );
    }

    #[test]
    fn disable_toggles_only_the_header() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        let mode = DrawMode::fill().with_stroke(1.0);
        polygon.update(&square(), &mode, &settings());
        polygon.update_device(&mut device).unwrap();

        let baked = polygon.stroke_geometry().clone();
        let allocations = device.stats().allocations;

        assert!(polygon.disable(true, DrawType::Stroke));
        assert!(polygon.needs_upload());
        assert!(!polygon.update_device(&mut device).unwrap());
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Stroke), 0);
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Fill), 4);
        assert_eq!(polygon.stroke_geometry(), &baked);

        assert!(polygon.disable(false, DrawType::StrokeFill));
        assert!(!polygon.update_device(&mut device).unwrap());
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Stroke), 8);
        assert_eq!(polygon.stroke_geometry(), &baked);
        assert_eq!(device.stats().allocations, allocations);

        assert!(!polygon.disable(false, DrawType::Fill));
    }

    #[test]
    fn update_keeps_disabled_geometry_hidden() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        polygon.disable(true, DrawType::Fill);
        polygon.update(&square(), &DrawMode::fill(), &settings());
        polygon.update_device(&mut device).unwrap();
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Fill), 0);
        assert_eq!(polygon.fill_geometry().len(), 4);
    }

    #[test]
    fn rerecord_only_on_growth_or_pipeline_change() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        let mode = DrawMode::stroke(2.0);
        let line = [point(0.0, 0.0), point(10.0, 0.0), point(20.0, 5.0)];

        polygon.update(&line, &mode, &settings());
        assert!(polygon.update_device(&mut device).unwrap());

        // Same size: rewritten in place.
        let moved = [point(1.0, 0.0), point(11.0, 0.0), point(21.0, 5.0)];
        polygon.update(&moved, &mode, &settings());
        assert!(!polygon.update_device(&mut device).unwrap());

        // Smaller: still fits.
        polygon.update(&moved[..2], &mode, &settings());
        assert!(!polygon.update_device(&mut device).unwrap());

        // Growth beyond capacity reallocates with headroom.
        let longer: Vec<Point> = (0..5).map(|i| point(i as f32 * 10.0, 0.0)).collect();
        polygon.update(&longer, &mode, &settings());
        assert!(polygon.update_device(&mut device).unwrap());
        let layout = polygon.buffer_layout(GeometryKind::Stroke).unwrap();
        assert_eq!(layout.capacity, 12);

        // Antialiasing switches pipelines.
        polygon.update(&longer, &mode.clone().with_antialias(true), &settings());
        assert!(polygon.update_device(&mut device).unwrap());
        assert!(polygon
            .buffer_layout(GeometryKind::Stroke)
            .unwrap()
            .fringe
            .is_some());

        // Nothing pending: nothing to do.
        assert!(!polygon.update_device(&mut device).unwrap());
    }

    #[test]
    fn old_buffers_are_released_on_growth() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        polygon.update(&square()[..3], &DrawMode::fill(), &settings());
        polygon.update_device(&mut device).unwrap();
        polygon.update(&square(), &DrawMode::fill(), &settings());
        assert!(polygon.update_device(&mut device).unwrap());
        assert_eq!(device.live_buffers(), 1);
        assert_eq!(device.stats().releases, 1);

        polygon.release(&mut device);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn residency_follows_hint() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        polygon.update(&square(), &DrawMode::fill(), &settings());
        polygon.update_device(&mut device).unwrap();
        assert_eq!(device.stats().staged_writes, 0);

        let local = DrawMode::fill().with_device_local(true);
        polygon.update(&square(), &local, &settings());
        assert!(polygon.update_device(&mut device).unwrap());
        let buffer = polygon.buffer(GeometryKind::Fill).unwrap();
        assert_eq!(device.residency(buffer), Some(Residency::DeviceLocal));
        assert!(device.stats().staged_writes > 0);
    }

    #[test]
    fn antialiased_fill_draws_core_and_edge() {
        let mut device = HostDevice::new();
        let mut polygon = Polygon::new();
        let colors = vec![Color::WHITE; 4];
        let mode = DrawMode::fill()
            .with_antialias(true)
            .with_colors(colors, true, false);
        polygon.update(&square(), &mode, &settings());
        polygon.update_device(&mut device).unwrap();

        let edge = polygon.buffer_layout(GeometryKind::FillEdge).unwrap();
        assert!(edge.fringe.is_some() && edge.colors.is_some());

        let mut recorder = HostRecorder::default();
        polygon.fill(&mut recorder);
        assert_eq!(recorder.draws.len(), 2);
        assert_eq!(recorder.draws[1].pipeline.kind, GeometryKind::FillEdge);
        assert!(recorder.draws[1].pipeline.color);
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::FillEdge), 10);
    }

    #[test]
    fn fans_expand_without_device_support() {
        let mut device = HostDevice::new().without_triangle_fans();
        let mut polygon = Polygon::new();
        polygon.update(&square(), &DrawMode::fill(), &settings());
        polygon.update_device(&mut device).unwrap();
        assert_eq!(vertex_count(&device, &polygon, GeometryKind::Fill), 6);

        let mut recorder = HostRecorder::default();
        polygon.fill(&mut recorder);
        assert_eq!(recorder.draws[0].topology, Topology::TriangleList);
        // The CPU cache keeps fan order.
        assert_eq!(polygon.fill_geometry().positions, square());
    }

    #[test]
    fn failed_upload_stays_pending() {
        let mut device = HostDevice::new().with_memory_limit(16);
        let mut polygon = Polygon::new();
        polygon.update(&square(), &DrawMode::fill(), &settings());
        assert!(matches!(
            polygon.update_device(&mut device),
            Err(DeviceError::Allocation { .. })
        ));
        assert!(polygon.needs_upload());
    }

    #[test]
    fn reallocation_before_a_failure_is_reported_later() {
        // Fill 40 + stroke 64 bytes, then the grown fill (80) fits and the
        // grown stroke (144) does not.
        let mut device = HostDevice::new().with_memory_limit(200);
        let mut polygon = Polygon::new();
        let mode = DrawMode::fill().with_stroke(1.0);
        let zigzag = |n: usize| -> Vec<Point> {
            (0..n)
                .map(|i| point(i as f32 * 10.0, (i % 2) as f32 * 10.0))
                .collect()
        };

        polygon.update(&zigzag(3), &mode, &settings());
        assert!(polygon.update_device(&mut device).unwrap());

        polygon.update(&zigzag(8), &mode, &settings());
        assert!(matches!(
            polygon.update_device(&mut device),
            Err(DeviceError::Allocation { .. })
        ));
        assert_eq!(device.stats().releases, 1);
        assert_eq!(
            polygon.buffer_layout(GeometryKind::Fill).unwrap().capacity,
            8
        );

        // Fits the current buffers, but the fill buffer already moved.
        polygon.update(&zigzag(3), &mode, &settings());
        assert!(polygon.update_device(&mut device).unwrap());
        assert!(!polygon.update_device(&mut device).unwrap());
    }

    #[test]
    #[should_panic(expected = "negative stroke width")]
    fn update_rejects_negative_stroke_width() {
        let mut polygon: Polygon<HostBuffer> = Polygon::new();
        polygon.update(&square(), &DrawMode::stroke(-1.0), &settings());
    }

    #[test]
    #[should_panic(expected = "antialiasing requested")]
    fn antialiasing_requires_capability() {
        let mut polygon: Polygon<HostBuffer> = Polygon::new();
        let settings = ContextSettings {
            antialiasing: false,
            ..ContextSettings::default()
        };
        polygon.update(&square(), &DrawMode::fill().with_antialias(true), &settings);
    }

    #[test]
    #[should_panic(expected = "fill() on a polygon without fill")]
    fn fill_requires_fill_geometry() {
        let mut polygon: Polygon<HostBuffer> = Polygon::new();
        polygon.update(&square(), &DrawMode::stroke(1.0), &settings());
        polygon.fill(&mut HostRecorder::default());
    }
}
