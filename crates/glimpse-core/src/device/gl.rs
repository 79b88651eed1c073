use std::fmt;
use std::hash::Hash;

use crate::coords::{Bounds, Rect};

/// What a buffer is bound as when it is drawn from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attributes.
    Array,
    /// Index data.
    ElementArray,
    /// Shader uniforms.
    Uniform,
}

/// Expected update frequency, passed through when storage is allocated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    /// Rewritten every frame, drawn a few times.
    StreamDraw,
    /// Rewritten occasionally, drawn many times.
    DynamicDraw,
    /// Written once.
    StaticDraw,
}

/// Storage format of a renderbuffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderbufferFormat {
    Depth,
    Stencil,
    DepthStencil,
}

/// Framebuffer attachment point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Attachment {
    Color0,
    Depth,
    Stencil,
    DepthStencil,
}

/// Result of a framebuffer completeness check.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramebufferStatus {
    Complete,
    /// An attachment is present but unusable (e.g. mismatched dimensions).
    IncompleteAttachment,
    /// No color attachment.
    MissingAttachment,
    /// The combination of attachments is not supported by the device.
    Unsupported,
}

impl FramebufferStatus {
    #[inline]
    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FramebufferStatus::Complete => "complete",
            FramebufferStatus::IncompleteAttachment => "incomplete attachment",
            FramebufferStatus::MissingAttachment => "missing attachment",
            FramebufferStatus::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Device primitives consumed by the core.
///
/// The shape follows classic GL object management: handles are created,
/// given storage, attached and deleted explicitly. Handles are opaque
/// backend values; deleting a handle twice or using a deleted handle is a
/// caller bug the backend may ignore.
///
/// All calls happen on the render thread with the owning context current.
pub trait GlDevice {
    type Buffer: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Texture: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Renderbuffer: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Framebuffer: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    // ── buffers ───────────────────────────────────────────────────────────

    /// Creates a buffer handle without storage.
    fn create_buffer(&mut self) -> Self::Buffer;

    /// Allocates `size` bytes of fresh storage for `buffer`.
    ///
    /// Previous storage is orphaned: the device keeps it alive until work
    /// already submitted against it completes, then reclaims it.
    fn buffer_storage(
        &mut self,
        buffer: Self::Buffer,
        target: BufferTarget,
        size: u64,
        usage: BufferUsage,
    );

    /// Opens `[offset, offset + size)` of `buffer` for writing.
    ///
    /// The returned slice is write-only from the device's point of view: its
    /// previous contents are unspecified. The range must lie within the
    /// storage allocated by the last [`buffer_storage`](Self::buffer_storage).
    fn map_buffer_range(&mut self, buffer: Self::Buffer, offset: u64, size: u64) -> &mut [u8];

    /// Closes the mapped range; its contents become visible to later draws.
    fn unmap_buffer(&mut self, buffer: Self::Buffer);

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    // ── textures ──────────────────────────────────────────────────────────

    /// Largest supported texture width/height in pixels.
    fn max_texture_size(&self) -> u32;

    /// Creates an RGBA color texture with linear filtering, edge clamping and
    /// storage for `width` x `height` texels.
    fn create_texture(&mut self, width: u32, height: u32) -> Self::Texture;

    /// Regenerates the mip chain of `texture` from level 0.
    fn generate_mipmaps(&mut self, texture: Self::Texture);

    fn delete_texture(&mut self, texture: Self::Texture);

    // ── renderbuffers ─────────────────────────────────────────────────────

    fn create_renderbuffer(
        &mut self,
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    ) -> Self::Renderbuffer;

    fn delete_renderbuffer(&mut self, renderbuffer: Self::Renderbuffer);

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Self::Framebuffer;

    fn attach_texture(
        &mut self,
        framebuffer: Self::Framebuffer,
        attachment: Attachment,
        texture: Self::Texture,
    );

    fn attach_renderbuffer(
        &mut self,
        framebuffer: Self::Framebuffer,
        attachment: Attachment,
        renderbuffer: Self::Renderbuffer,
    );

    fn framebuffer_status(&self, framebuffer: Self::Framebuffer) -> FramebufferStatus;

    /// Makes `framebuffer` the draw target; `None` restores the default target.
    fn bind_framebuffer(&mut self, framebuffer: Option<Self::Framebuffer>);

    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);

    // ── drawing ───────────────────────────────────────────────────────────

    /// Clears `bounds` of the bound target to `color` (straight RGBA).
    fn clear(&mut self, bounds: Bounds, color: [f32; 4]);

    /// Draws the whole of `texture` stretched over `dest`, clipped to
    /// `viewport`, on the bound target.
    fn draw_texture(&mut self, texture: Self::Texture, dest: Rect, viewport: Bounds);

    /// Pushes recorded work to the device.
    fn flush(&mut self);
}
