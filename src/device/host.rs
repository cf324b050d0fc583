//! A [`Device`] backed by plain CPU memory.
//!
//! Useful for headless baking, for inspecting exactly what would be
//! uploaded, and as the device double in tests.

use std::collections::HashMap;

use super::{
    BufferLayout, Device, DeviceError, DrawCall, DrawRecorder, Pipeline, Residency, Topology,
};
use crate::types::DrawIndirect;

/// Handle to a [`HostDevice`] allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostBuffer(u64);

struct Allocation {
    data: Vec<u8>,
    residency: Residency,
}

/// Counters describing the traffic a [`HostDevice`] has seen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Buffers allocated.
    pub allocations: u32,
    /// Buffers released.
    pub releases: u32,
    /// Writes into host-visible buffers.
    pub mapped_writes: u32,
    /// Writes into device-local buffers.
    pub staged_writes: u32,
    /// Total bytes written.
    pub bytes_written: u64,
}

/// CPU-memory device.
pub struct HostDevice {
    buffers: HashMap<u64, Allocation>,
    next_id: u64,
    triangle_fans: bool,
    memory_limit: Option<u64>,
    stats: HostStats,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    /// A device that supports triangle fans and has no memory limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_id: 0,
            triangle_fans: true,
            memory_limit: None,
            stats: HostStats::default(),
        }
    }

    /// Emulate a backend without triangle fans.
    #[must_use]
    pub fn without_triangle_fans(mut self) -> Self {
        self.triangle_fans = false;
        self
    }

    /// Fail allocations once `limit` bytes are live.
    #[must_use]
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = Some(limit);
        self
    }

    /// Traffic counters so far.
    #[must_use]
    pub fn stats(&self) -> HostStats {
        self.stats
    }

    /// Number of allocations not yet released.
    #[must_use]
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes held by live allocations.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.buffers.values().map(|a| a.data.len() as u64).sum()
    }

    /// The full contents of a buffer.
    #[must_use]
    pub fn contents(&self, buffer: &HostBuffer) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|a| a.data.as_slice())
    }

    /// The residency a buffer was allocated with.
    #[must_use]
    pub fn residency(&self, buffer: &HostBuffer) -> Option<Residency> {
        self.buffers.get(&buffer.0).map(|a| a.residency)
    }

    /// The draw-indirect header at the start of a buffer.
    #[must_use]
    pub fn header(&self, buffer: &HostBuffer) -> Option<DrawIndirect> {
        let data = self.contents(buffer)?;
        let bytes = data.get(..std::mem::size_of::<DrawIndirect>())?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

impl Device for HostDevice {
    type Buffer = HostBuffer;

    fn allocate(&mut self, size: u64, residency: Residency) -> Result<HostBuffer, DeviceError> {
        if let Some(limit) = self.memory_limit {
            if self.live_bytes() + size > limit {
                return Err(DeviceError::Allocation {
                    size,
                    reason: format!("host memory limit of {limit} bytes exceeded"),
                });
            }
        }
        let len = usize::try_from(size).map_err(|_| DeviceError::Allocation {
            size,
            reason: "size exceeds the address space".to_owned(),
        })?;

        let id = self.next_id;
        self.next_id += 1;
        self.buffers.insert(
            id,
            Allocation {
                data: vec![0; len],
                residency,
            },
        );
        self.stats.allocations += 1;
        Ok(HostBuffer(id))
    }

    fn write(&mut self, buffer: &HostBuffer, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let allocation = self.buffers.get_mut(&buffer.0).ok_or_else(|| DeviceError::Write {
            reason: format!("unknown buffer {}", buffer.0),
        })?;
        let size = allocation.data.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let target = start
            .checked_add(data.len())
            .and_then(|end| allocation.data.get_mut(start..end))
            .ok_or_else(|| DeviceError::Write {
                reason: format!(
                    "{} bytes at offset {offset} overflow a {size} byte buffer",
                    data.len(),
                ),
            })?;
        target.copy_from_slice(data);

        match allocation.residency {
            Residency::HostVisible => self.stats.mapped_writes += 1,
            Residency::DeviceLocal => self.stats.staged_writes += 1,
        }
        self.stats.bytes_written += data.len() as u64;
        Ok(())
    }

    fn release(&mut self, buffer: HostBuffer) {
        if self.buffers.remove(&buffer.0).is_some() {
            self.stats.releases += 1;
        }
    }

    fn supports_triangle_fan(&self) -> bool {
        self.triangle_fans
    }
}

/// A draw captured by [`HostRecorder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordedDraw {
    /// Pipeline variant of the draw.
    pub pipeline: Pipeline,
    /// Topology of the draw.
    pub topology: Topology,
    /// Buffer holding header and vertex streams.
    pub buffer: HostBuffer,
    /// Stream offsets within `buffer`.
    pub layout: BufferLayout,
}

/// Records draws instead of executing them.
#[derive(Clone, Debug, Default)]
pub struct HostRecorder {
    /// Draws in recording order.
    pub draws: Vec<RecordedDraw>,
}

impl DrawRecorder<HostBuffer> for HostRecorder {
    fn draw(&mut self, call: &DrawCall<'_, HostBuffer>) {
        self.draws.push(RecordedDraw {
            pipeline: call.pipeline,
            topology: call.topology,
            buffer: *call.buffer,
            layout: call.layout,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_bounds_checked() {
        let mut device = HostDevice::new();
        let buffer = device.allocate(8, Residency::HostVisible).unwrap();
        device.write(&buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.contents(&buffer).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            device.write(&buffer, 6, &[0; 4]),
            Err(DeviceError::Write { .. })
        ));
        assert_eq!(device.stats().mapped_writes, 1);
    }

    #[test]
    fn residency_selects_upload_path() {
        let mut device = HostDevice::new();
        let local = device.allocate(4, Residency::DeviceLocal).unwrap();
        device.write(&local, 0, &[9; 4]).unwrap();
        assert_eq!(device.stats().staged_writes, 1);
        assert_eq!(device.stats().mapped_writes, 0);
        assert_eq!(device.residency(&local), Some(Residency::DeviceLocal));
    }

    #[test]
    fn memory_limit_fails_allocation() {
        let mut device = HostDevice::new().with_memory_limit(64);
        let first = device.allocate(48, Residency::HostVisible).unwrap();
        assert!(matches!(
            device.allocate(32, Residency::HostVisible),
            Err(DeviceError::Allocation { size: 32, .. })
        ));
        device.release(first);
        assert!(device.allocate(32, Residency::HostVisible).is_ok());
        assert_eq!(device.stats().releases, 1);
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn header_reads_back() {
        let mut device = HostDevice::new();
        let buffer = device.allocate(32, Residency::HostVisible).unwrap();
        let header = DrawIndirect::vertices(12);
        device.write(&buffer, 0, bytemuck::bytes_of(&header)).unwrap();
        assert_eq!(device.header(&buffer), Some(header));
    }
}
