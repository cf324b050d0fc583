//! The rendering context: owns the device and every polygon created on it.
//!
//! Polygons live in a slot table and are addressed by [`PolygonId`]. A slot
//! index is reused after [`Context::destroy_polygon`], with a new generation,
//! so ids of destroyed polygons never alias a live one.

use lyon::math::Point;

use crate::device::{Device, DeviceError, DrawRecorder};
use crate::polygon::Polygon;
use crate::types::{DrawMode, DrawType};

/// Global settings shared by every polygon of a [`Context`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContextSettings {
    /// Whether antialiased geometry may be requested.
    pub antialiasing: bool,
    /// Width of the antialiasing fringe, in the coordinate space of the
    /// baked points.
    pub fringe: f32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            antialiasing: true,
            fringe: 1.0,
        }
    }
}

/// Handle to a polygon owned by a [`Context`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PolygonId {
    index: u32,
    generation: u32,
}

struct Slot<B> {
    generation: u32,
    polygon: Option<Polygon<B>>,
}

/// Owns a [`Device`] and the polygons uploaded to it.
pub struct Context<D: Device> {
    device: D,
    settings: ContextSettings,
    slots: Vec<Slot<D::Buffer>>,
    free: Vec<u32>,
    /// Polygons with changes waiting for [`update_devices`](Self::update_devices).
    pending: Vec<PolygonId>,
    rerecord: bool,
}

impl<D: Device> Context<D> {
    /// Create a context drawing to `device`.
    ///
    /// # Panics
    ///
    /// Panics if the fringe width is not positive while antialiasing is
    /// enabled.
    #[must_use]
    pub fn new(device: D, settings: ContextSettings) -> Self {
        assert!(
            !settings.antialiasing || settings.fringe > 0.0,
            "antialiasing requires a positive fringe"
        );
        Self {
            device,
            settings,
            slots: Vec::new(),
            free: Vec::new(),
            pending: Vec::new(),
            rerecord: false,
        }
    }

    /// The settings every polygon is baked with.
    #[must_use]
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// The device buffers are allocated on.
    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device, e.g. to submit work between frames.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Number of live polygons.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.slots.iter().filter(|s| s.polygon.is_some()).count()
    }

    /// Create an empty polygon.
    #[must_use]
    pub fn create_polygon(&mut self) -> PolygonId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.polygon = Some(Polygon::new());
            return PolygonId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("polygon slot table exhausted");
        });
        self.slots.push(Slot {
            generation: 0,
            polygon: Some(Polygon::new()),
        });
        PolygonId {
            index,
            generation: 0,
        }
    }

    /// Destroy a polygon and release its buffers.
    ///
    /// Recorded command buffers may still reference the released buffers,
    /// so the next [`update_devices`](Self::update_devices) reports a
    /// rerecord.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live polygon.
    pub fn destroy_polygon(&mut self, id: PolygonId) {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            panic!("destroy of stale polygon id {id:?}");
        };
        let Some(polygon) = slot.polygon.take() else {
            panic!("destroy of stale polygon id {id:?}");
        };
        slot.generation = slot.generation.wrapping_add(1);

        polygon.release(&mut self.device);
        self.free.push(id.index);
        self.pending.retain(|pending| *pending != id);
        self.rerecord = true;
        log::debug!("destroyed polygon {id:?}, rerecord required");
    }

    /// The polygon behind `id`, or `None` if it was destroyed.
    #[must_use]
    pub fn polygon(&self, id: PolygonId) -> Option<&Polygon<D::Buffer>> {
        let polygon = self
            .slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.polygon.as_ref());
        if polygon.is_none() {
            log::warn!("lookup of stale polygon id {id:?}");
        }
        polygon
    }

    fn polygon_mut(&mut self, id: PolygonId) -> &mut Polygon<D::Buffer> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.polygon.as_mut())
            .unwrap_or_else(|| panic!("stale polygon id {id:?}"))
    }

    fn register(&mut self, id: PolygonId) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
    }

    /// Re-bake a polygon from `points` and queue its upload.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale, or on the preconditions of
    /// [`Polygon::update`].
    pub fn update_polygon(&mut self, id: PolygonId, points: &[Point], mode: &DrawMode) {
        let settings = self.settings;
        self.polygon_mut(id).update(points, mode, &settings);
        self.register(id);
    }

    /// Hide or show parts of a polygon. Returns whether anything changed.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn disable_polygon(&mut self, id: PolygonId, disable: bool, draw_type: DrawType) -> bool {
        let changed = self.polygon_mut(id).disable(disable, draw_type);
        if changed {
            self.register(id);
        }
        changed
    }

    /// Upload every polygon changed since the last call.
    ///
    /// Returns `true` if recorded command buffers must be rebuilt.
    ///
    /// # Errors
    ///
    /// Stops at the first device failure. Polygons not yet uploaded stay
    /// queued, and rerecord causes seen so far are reported by the next
    /// successful call.
    pub fn update_devices(&mut self) -> Result<bool, DeviceError> {
        let pending = std::mem::take(&mut self.pending);
        for (i, &id) in pending.iter().enumerate() {
            let Some(polygon) = self
                .slots
                .get_mut(id.index as usize)
                .filter(|slot| slot.generation == id.generation)
                .and_then(|slot| slot.polygon.as_mut())
            else {
                continue;
            };

            match polygon.update_device(&mut self.device) {
                Ok(rerecord) => self.rerecord |= rerecord,
                Err(err) => {
                    self.pending.extend_from_slice(&pending[i..]);
                    return Err(err);
                }
            }
        }

        let rerecord = std::mem::take(&mut self.rerecord);
        if rerecord {
            log::debug!("{} polygon uploads require a rerecord", pending.len());
        }
        Ok(rerecord)
    }

    /// Record the fill draws of a polygon.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or the polygon has no fill.
    pub fn record_fill<R: DrawRecorder<D::Buffer>>(&self, id: PolygonId, recorder: &mut R) {
        self.polygon(id)
            .unwrap_or_else(|| panic!("stale polygon id {id:?}"))
            .fill(recorder);
    }

    /// Record the stroke draw of a polygon.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or the polygon has no stroke.
    pub fn record_stroke<R: DrawRecorder<D::Buffer>>(&self, id: PolygonId, recorder: &mut R) {
        self.polygon(id)
            .unwrap_or_else(|| panic!("stale polygon id {id:?}"))
            .stroke(recorder);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::device::host::{HostDevice, HostRecorder};
    use lyon::math::point;

    fn triangle() -> Vec<Point> {
        vec![point(0.0, 0.0), point(10.0, 0.0), point(0.0, 10.0)]
    }

    fn context() -> Context<HostDevice> {
        Context::new(HostDevice::new(), ContextSettings::default())
    }

    #[test]
    fn updates_are_batched_per_polygon() {
        let mut ctx = context();
        let a = ctx.create_polygon();
        let b = ctx.create_polygon();
        ctx.update_polygon(a, &triangle(), &DrawMode::fill());
        ctx.update_polygon(a, &triangle(), &DrawMode::fill());
        ctx.update_polygon(b, &triangle(), &DrawMode::stroke(1.0));

        assert!(ctx.update_devices().unwrap());
        assert_eq!(ctx.device().stats().allocations, 2);
        assert!(!ctx.update_devices().unwrap());

        let mut recorder = HostRecorder::default();
        ctx.record_fill(a, &mut recorder);
        ctx.record_stroke(b, &mut recorder);
        assert_eq!(recorder.draws.len(), 2);
    }

    #[test]
    fn toggling_visibility_does_not_rerecord() {
        let mut ctx = context();
        let id = ctx.create_polygon();
        ctx.update_polygon(id, &triangle(), &DrawMode::fill());
        assert!(ctx.update_devices().unwrap());

        assert!(ctx.disable_polygon(id, true, DrawType::Fill));
        assert!(!ctx.disable_polygon(id, true, DrawType::Fill));
        assert!(!ctx.update_devices().unwrap());

        let polygon = ctx.polygon(id).unwrap();
        let buffer = polygon.buffer(crate::device::GeometryKind::Fill).unwrap();
        assert_eq!(ctx.device().header(buffer).unwrap().vertex_count, 0);
    }

    #[test]
    fn destroy_releases_and_invalidates() {
        let mut ctx = context();
        let id = ctx.create_polygon();
        ctx.update_polygon(id, &triangle(), &DrawMode::fill().with_stroke(1.0));
        ctx.update_devices().unwrap();
        assert_eq!(ctx.device().live_buffers(), 2);

        ctx.destroy_polygon(id);
        assert_eq!(ctx.device().live_buffers(), 0);
        assert!(ctx.polygon(id).is_none());
        assert!(ctx.update_devices().unwrap());

        let reused = ctx.create_polygon();
        assert_ne!(reused, id);
        assert!(ctx.polygon(reused).is_some());
        assert_eq!(ctx.polygon_count(), 1);
    }

    #[test]
    fn destroy_drops_pending_upload() {
        let mut ctx = context();
        let id = ctx.create_polygon();
        ctx.update_polygon(id, &triangle(), &DrawMode::fill());
        ctx.destroy_polygon(id);
        assert!(ctx.update_devices().unwrap());
        assert_eq!(ctx.device().stats().allocations, 0);
    }

    #[test]
    fn failed_upload_is_retried() {
        let device = HostDevice::new().with_memory_limit(48);
        let mut ctx = Context::new(device, ContextSettings::default());
        let a = ctx.create_polygon();
        let b = ctx.create_polygon();
        ctx.update_polygon(a, &triangle(), &DrawMode::fill());
        ctx.update_polygon(b, &triangle(), &DrawMode::fill());

        // The first fill takes 40 bytes, the second does not fit.
        assert!(ctx.update_devices().is_err());
        ctx.destroy_polygon(a);
        assert!(ctx.update_devices().unwrap());
        assert!(ctx.polygon(b).unwrap().buffer(crate::device::GeometryKind::Fill).is_some());
    }

    #[test]
    #[should_panic(expected = "stale polygon id")]
    fn stale_ids_panic_on_update() {
        let mut ctx = context();
        let id = ctx.create_polygon();
        ctx.destroy_polygon(id);
        ctx.update_polygon(id, &triangle(), &DrawMode::fill());
    }

    #[test]
    #[should_panic(expected = "positive fringe")]
    fn antialiasing_needs_a_fringe() {
        let settings = ContextSettings {
            antialiasing: true,
            fringe: 0.0,
        };
        let _ = Context::new(HostDevice::new(), settings);
    }
}
