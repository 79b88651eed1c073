use crate::device::{BufferTarget, BufferUsage, GlDevice};
use crate::error::{Error, Result};

use super::StreamCursor;

/// Allocation parameters for a [`MappableBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Binding the buffer is drawn from.
    pub target: BufferTarget,

    /// Usage hint passed along whenever storage is allocated.
    pub usage: BufferUsage,

    /// How many times larger than the requested window to make a new block.
    ///
    /// Larger factors mean fewer reallocations at the cost of memory.
    pub block_size_factor: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            target: BufferTarget::Array,
            usage: BufferUsage::StreamDraw,
            block_size_factor: 10,
        }
    }
}

/// Device buffer written in successive, non-overlapping windows.
///
/// Each frame a painter maps a window, fills it, seals it and draws from
/// [`sealed_offset`](Self::sealed_offset). When a window no longer fits the
/// current block, fresh storage is allocated and the old storage is orphaned,
/// so draws still in flight keep reading their data.
///
/// Every [`map_bytes`](Self::map_bytes) must be followed by
/// [`seal`](Self::seal) before the next map.
#[derive(Debug)]
pub struct MappableBuffer<D: GlDevice> {
    config: BufferConfig,
    buffer: Option<D::Buffer>,
    cursor: StreamCursor,
}

impl<D: GlDevice> MappableBuffer<D> {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            buffer: None,
            cursor: StreamCursor::new(config.block_size_factor),
        }
    }

    #[inline]
    pub fn config(&self) -> BufferConfig {
        self.config
    }

    /// Device handle; `None` until the first map.
    #[inline]
    pub fn buffer(&self) -> Option<D::Buffer> {
        self.buffer
    }

    /// Offset of the most recently sealed window, for use as a draw offset.
    ///
    /// `None` until the first [`seal`](Self::seal).
    #[inline]
    pub fn sealed_offset(&self) -> Option<u64> {
        self.cursor.sealed_offset()
    }

    /// Byte size of the storage currently allocated on the device.
    #[inline]
    pub fn block_size(&self) -> u64 {
        self.cursor.block_size()
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.cursor.is_open()
    }

    /// Maps a window of at least `num_bytes` for writing.
    ///
    /// The window is rounded up to a multiple of 64 bytes, so the returned
    /// slice may be longer than requested.
    pub fn map_bytes<'d>(&mut self, device: &'d mut D, num_bytes: u64) -> Result<&'d mut [u8]> {
        let placement = self.cursor.open(num_bytes)?;

        let buffer = *self.buffer.get_or_insert_with(|| device.create_buffer());

        if let Some(block_size) = placement.reallocate {
            log::debug!(
                "streaming buffer {buffer:?}: allocating {block_size} bytes for a {}-byte window",
                placement.size
            );
            device.buffer_storage(buffer, self.config.target, block_size, self.config.usage);
        }

        Ok(device.map_buffer_range(buffer, placement.offset, placement.size))
    }

    /// Maps a window of at least `num_floats` `f32` values.
    pub fn map_floats<'d>(&mut self, device: &'d mut D, num_floats: u64) -> Result<&'d mut [f32]> {
        let num_bytes = num_floats
            .checked_mul(size_of::<f32>() as u64)
            .ok_or(Error::WindowTooLarge(u64::MAX))?;
        let bytes = self.map_bytes(device, num_bytes)?;
        bytemuck::try_cast_slice_mut(bytes).map_err(Error::Cast)
    }

    /// Unmaps the open window, making it readable by later draws.
    pub fn seal(&mut self, device: &mut D) -> Result<()> {
        if !self.cursor.is_open() {
            return Err(Error::NotMapped);
        }
        if let Some(buffer) = self.buffer {
            device.unmap_buffer(buffer);
        }
        self.cursor.seal()?;
        Ok(())
    }

    /// Deletes the device buffer. The next map starts from scratch.
    pub fn dispose(&mut self, device: &mut D) {
        if let Some(buffer) = self.buffer.take() {
            if self.cursor.is_open() {
                device.unmap_buffer(buffer);
            }
            device.delete_buffer(buffer);
        }
        self.cursor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceCall, RecordingDevice};

    fn buffer(factor: u64) -> MappableBuffer<RecordingDevice> {
        MappableBuffer::new(BufferConfig { block_size_factor: factor, ..Default::default() })
    }

    #[test]
    fn seal_reports_offset_assigned_at_map() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);

        buf.map_bytes(&mut dev, 10).unwrap();
        buf.seal(&mut dev).unwrap();
        assert_eq!(buf.sealed_offset(), Some(0));

        buf.map_bytes(&mut dev, 10).unwrap();
        buf.seal(&mut dev).unwrap();
        assert_eq!(buf.sealed_offset(), Some(64));
    }

    #[test]
    fn second_map_before_seal_fails() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);
        buf.map_bytes(&mut dev, 10).unwrap();
        assert!(matches!(buf.map_bytes(&mut dev, 10), Err(Error::ConcurrentMap)));
    }

    #[test]
    fn seal_without_map_fails() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);
        assert!(matches!(buf.seal(&mut dev), Err(Error::NotMapped)));
        assert_eq!(buf.sealed_offset(), None);
        assert_eq!(buf.buffer(), None);
    }

    #[test]
    fn mapped_window_is_rounded_to_64() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);
        let window = buf.map_bytes(&mut dev, 65).unwrap();
        assert_eq!(window.len(), 128);
    }

    #[test]
    fn growth_orphans_and_restarts_at_zero() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(2);

        buf.map_bytes(&mut dev, 64).unwrap();
        buf.seal(&mut dev).unwrap();
        assert_eq!(buf.block_size(), 128);

        buf.map_bytes(&mut dev, 500).unwrap();
        buf.seal(&mut dev).unwrap();

        assert!(buf.block_size() >= 2 * 512);
        assert_eq!(buf.sealed_offset(), Some(0));

        let storage: Vec<u64> = dev
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::BufferStorage { size, .. } => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(storage, vec![128, 1024]);
    }

    #[test]
    fn written_bytes_reach_the_device() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);

        let floats = buf.map_floats(&mut dev, 3).unwrap();
        floats[..3].copy_from_slice(&[1.0, 2.0, 3.0]);
        buf.seal(&mut dev).unwrap();

        let handle = buf.buffer().unwrap();
        let bytes = dev.buffer_contents(handle, 0, 12);
        let back: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(back, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn map_floats_length_covers_rounded_window() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);
        assert_eq!(buf.map_floats(&mut dev, 5).unwrap().len(), 16);
    }

    #[test]
    fn oversized_map_fails_without_touching_the_device() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(10);
        assert!(matches!(buf.map_floats(&mut dev, u64::MAX / 2), Err(Error::WindowTooLarge(_))));
        assert!(matches!(buf.map_bytes(&mut dev, u64::MAX / 2), Err(Error::WindowTooLarge(_))));
        assert!(!buf.is_mapped());
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn dispose_deletes_buffer_once() {
        let mut dev = RecordingDevice::new();
        let mut buf = buffer(4);
        buf.map_bytes(&mut dev, 8).unwrap();
        buf.seal(&mut dev).unwrap();

        buf.dispose(&mut dev);
        buf.dispose(&mut dev);

        let deletes = dev
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::DeleteBuffer(_)))
            .count();
        assert_eq!(deletes, 1);
        assert_eq!(buf.buffer(), None);
    }
}
