//! Test doubles: a device that records every call and a painter that
//! records what it was asked to draw.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::axis::Axis2D;
use crate::coords::{Bounds, Rect};
use crate::device::{
    Attachment, BufferTarget, BufferUsage, FramebufferStatus, GlDevice, RenderbufferFormat,
};
use crate::error::Result;
use crate::painter::{GlimpseContext, LookAndFeel, Painter};

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(u32),
    BufferStorage { buffer: u32, target: BufferTarget, size: u64, usage: BufferUsage },
    MapBufferRange { buffer: u32, offset: u64, size: u64 },
    UnmapBuffer(u32),
    DeleteBuffer(u32),
    CreateTexture { texture: u32, width: u32, height: u32 },
    GenerateMipmaps(u32),
    DeleteTexture(u32),
    CreateRenderbuffer { renderbuffer: u32, format: RenderbufferFormat, width: u32, height: u32 },
    DeleteRenderbuffer(u32),
    CreateFramebuffer(u32),
    AttachTexture { framebuffer: u32, attachment: Attachment, texture: u32 },
    AttachRenderbuffer { framebuffer: u32, attachment: Attachment, renderbuffer: u32 },
    BindFramebuffer(Option<u32>),
    DeleteFramebuffer(u32),
    Clear { framebuffer: Option<u32>, bounds: Bounds },
    DrawTexture { framebuffer: Option<u32>, texture: u32, dest: Rect, viewport: Bounds },
    Flush,
}

/// In-memory [`GlDevice`] that logs calls in order.
///
/// Buffer storage is real memory so tests can read back what was written.
#[derive(Debug)]
pub struct RecordingDevice {
    next_handle: u32,
    calls: Vec<DeviceCall>,
    buffers: HashMap<u32, Vec<u64>>,
    bound: Option<u32>,
    pub max_texture_size: u32,
    /// Status reported for every framebuffer; `None` means "complete".
    pub forced_status: Option<FramebufferStatus>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            calls: Vec::new(),
            buffers: HashMap::new(),
            bound: None,
            max_texture_size: 4096,
            forced_status: None,
        }
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Currently bound framebuffer (`None` = default target).
    pub fn bound(&self) -> Option<u32> {
        self.bound
    }

    /// Copies `len` bytes of buffer storage starting at `offset`.
    pub fn buffer_contents(&self, buffer: u32, offset: u64, len: u64) -> Vec<u8> {
        let words = self.buffers.get(&buffer).map(Vec::as_slice).unwrap_or(&[]);
        let bytes: &[u8] = bytemuck::cast_slice(words);
        bytes[offset as usize..(offset + len) as usize].to_vec()
    }

    fn handle(&mut self) -> u32 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GlDevice for RecordingDevice {
    type Buffer = u32;
    type Texture = u32;
    type Renderbuffer = u32;
    type Framebuffer = u32;

    fn create_buffer(&mut self) -> u32 {
        let buffer = self.handle();
        self.buffers.insert(buffer, Vec::new());
        self.calls.push(DeviceCall::CreateBuffer(buffer));
        buffer
    }

    fn buffer_storage(&mut self, buffer: u32, target: BufferTarget, size: u64, usage: BufferUsage) {
        self.buffers.insert(buffer, vec![0; size.div_ceil(8) as usize]);
        self.calls.push(DeviceCall::BufferStorage { buffer, target, size, usage });
    }

    fn map_buffer_range(&mut self, buffer: u32, offset: u64, size: u64) -> &mut [u8] {
        self.calls.push(DeviceCall::MapBufferRange { buffer, offset, size });
        let words = self.buffers.entry(buffer).or_default();
        let needed = (offset + size).div_ceil(8) as usize;
        if words.len() < needed {
            words.resize(needed, 0);
        }
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(words.as_mut_slice());
        &mut bytes[offset as usize..(offset + size) as usize]
    }

    fn unmap_buffer(&mut self, buffer: u32) {
        self.calls.push(DeviceCall::UnmapBuffer(buffer));
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.buffers.remove(&buffer);
        self.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn create_texture(&mut self, width: u32, height: u32) -> u32 {
        let texture = self.handle();
        self.calls.push(DeviceCall::CreateTexture { texture, width, height });
        texture
    }

    fn generate_mipmaps(&mut self, texture: u32) {
        self.calls.push(DeviceCall::GenerateMipmaps(texture));
    }

    fn delete_texture(&mut self, texture: u32) {
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }

    fn create_renderbuffer(&mut self, format: RenderbufferFormat, width: u32, height: u32) -> u32 {
        let renderbuffer = self.handle();
        self.calls.push(DeviceCall::CreateRenderbuffer { renderbuffer, format, width, height });
        renderbuffer
    }

    fn delete_renderbuffer(&mut self, renderbuffer: u32) {
        self.calls.push(DeviceCall::DeleteRenderbuffer(renderbuffer));
    }

    fn create_framebuffer(&mut self) -> u32 {
        let framebuffer = self.handle();
        self.calls.push(DeviceCall::CreateFramebuffer(framebuffer));
        framebuffer
    }

    fn attach_texture(&mut self, framebuffer: u32, attachment: Attachment, texture: u32) {
        self.calls.push(DeviceCall::AttachTexture { framebuffer, attachment, texture });
    }

    fn attach_renderbuffer(&mut self, framebuffer: u32, attachment: Attachment, renderbuffer: u32) {
        self.calls.push(DeviceCall::AttachRenderbuffer { framebuffer, attachment, renderbuffer });
    }

    fn framebuffer_status(&self, _framebuffer: u32) -> FramebufferStatus {
        self.forced_status.unwrap_or(FramebufferStatus::Complete)
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<u32>) {
        self.bound = framebuffer;
        self.calls.push(DeviceCall::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
        self.calls.push(DeviceCall::DeleteFramebuffer(framebuffer));
    }

    fn clear(&mut self, bounds: Bounds, _color: [f32; 4]) {
        self.calls.push(DeviceCall::Clear { framebuffer: self.bound, bounds });
    }

    fn draw_texture(&mut self, texture: u32, dest: Rect, viewport: Bounds) {
        self.calls.push(DeviceCall::DrawTexture { framebuffer: self.bound, texture, dest, viewport });
    }

    fn flush(&mut self) {
        self.calls.push(DeviceCall::Flush);
    }
}

/// What a [`RecordingPainter`] saw in one `paint` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintCall {
    pub painter: &'static str,
    pub framebuffer: Option<u32>,
    pub bounds: Bounds,
    pub x: (f64, f64),
    pub y: (f64, f64),
}

/// Shared log written by recording painters, in call order.
#[derive(Debug, Clone, Default)]
pub struct PaintLog {
    inner: Arc<Mutex<PaintLogInner>>,
}

#[derive(Debug, Default)]
struct PaintLogInner {
    paints: Vec<PaintCall>,
    disposed: Vec<&'static str>,
    styled: Vec<(&'static str, LookAndFeel)>,
}

impl PaintLog {
    pub fn paints(&self) -> Vec<PaintCall> {
        self.inner.lock().paints.clone()
    }

    pub fn disposed(&self) -> Vec<&'static str> {
        self.inner.lock().disposed.clone()
    }

    pub fn styled(&self) -> Vec<(&'static str, LookAndFeel)> {
        self.inner.lock().styled.clone()
    }
}

/// Painter that only records its calls.
#[derive(Debug)]
pub struct RecordingPainter {
    name: &'static str,
    log: PaintLog,
    disposed: bool,
}

impl RecordingPainter {
    pub fn new(name: &'static str, log: PaintLog) -> Self {
        Self { name, log, disposed: false }
    }
}

impl Painter<RecordingDevice> for RecordingPainter {
    fn paint(
        &mut self,
        ctx: &mut GlimpseContext<'_, RecordingDevice>,
        bounds: Bounds,
        axis: &Axis2D,
    ) -> Result<()> {
        self.log.inner.lock().paints.push(PaintCall {
            painter: self.name,
            framebuffer: ctx.device.bound(),
            bounds,
            x: (axis.x.min(), axis.x.max()),
            y: (axis.y.min(), axis.y.max()),
        });
        Ok(())
    }

    fn dispose(&mut self, _ctx: &mut GlimpseContext<'_, RecordingDevice>) {
        self.disposed = true;
        self.log.inner.lock().disposed.push(self.name);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn set_look_and_feel(&mut self, laf: &LookAndFeel) {
        self.log.inner.lock().styled.push((self.name, laf.clone()));
    }
}
