use slotmap::SlotMap;

use glimpse_core::coords::{Bounds, Rect};
use glimpse_core::device::{
    Attachment, BufferTarget, BufferUsage, FramebufferStatus, GlDevice, RenderbufferFormat,
};

use crate::quad::{begin_load_pass, QuadCompositor};
use crate::target::{scissor_rect, DefaultTarget, RenderTargetRef};

slotmap::new_key_type! {
    pub struct BufferKey;
    pub struct TextureKey;
    pub struct RenderbufferKey;
    pub struct FramebufferKey;
}

// ── object tables ─────────────────────────────────────────────────────────

struct BufferSlot {
    buffer: Option<wgpu::Buffer>,
    size: u64,
    /// CPU copy of the mapped window, uploaded on unmap.
    staging: Vec<u64>,
    mapped: Option<(u64, u64)>,
}

struct TextureSlot {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct RenderbufferSlot {
    format: RenderbufferFormat,
    texture_format: wgpu::TextureFormat,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

#[derive(Default)]
struct FramebufferSlot {
    color: Option<TextureKey>,
    depth: Option<RenderbufferKey>,
    stencil: Option<RenderbufferKey>,
}

#[derive(Default)]
struct Objects {
    buffers: SlotMap<BufferKey, BufferSlot>,
    textures: SlotMap<TextureKey, TextureSlot>,
    renderbuffers: SlotMap<RenderbufferKey, RenderbufferSlot>,
    framebuffers: SlotMap<FramebufferKey, FramebufferSlot>,
}

impl Objects {
    /// Views of `bound`, or of the default target when nothing is bound.
    fn target<'a>(
        &'a self,
        bound: Option<FramebufferKey>,
        default: Option<&'a DefaultTarget>,
    ) -> Option<RenderTargetRef<'a>> {
        let Some(key) = bound else {
            return default.map(|t| RenderTargetRef {
                color: &t.view,
                depth: None,
                width: t.width,
                height: t.height,
                format: t.format,
            });
        };

        let fb = self.framebuffers.get(key)?;
        let color = self.textures.get(fb.color?)?;
        let depth = fb
            .depth
            .or(fb.stencil)
            .and_then(|rb| self.renderbuffers.get(rb))
            .map(|rb| (&rb.view, rb.texture_format));

        Some(RenderTargetRef {
            color: &color.view,
            depth,
            width: color.width,
            height: color.height,
            format: color.texture.format(),
        })
    }

    fn renderbuffer_info(&self, key: Option<RenderbufferKey>) -> Option<AttachedRenderbuffer> {
        let key = key?;
        Some(match self.renderbuffers.get(key) {
            Some(rb) => AttachedRenderbuffer {
                key,
                format: Some(rb.format),
                size: (rb.width, rb.height),
            },
            None => AttachedRenderbuffer { key, format: None, size: (0, 0) },
        })
    }
}

// ── completeness ──────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone)]
struct AttachedRenderbuffer {
    key: RenderbufferKey,
    /// `None` if the renderbuffer was deleted while attached.
    format: Option<RenderbufferFormat>,
    size: (u32, u32),
}

/// Completeness of a framebuffer from what is attached to it.
///
/// wgpu passes take a single depth/stencil view, so separate depth and
/// stencil renderbuffers are reported as unsupported.
fn attachment_status(
    color: Option<(u32, u32)>,
    depth: Option<AttachedRenderbuffer>,
    stencil: Option<AttachedRenderbuffer>,
) -> FramebufferStatus {
    let Some(color_size) = color else {
        return FramebufferStatus::MissingAttachment;
    };

    if let (Some(d), Some(s)) = (depth, stencil) {
        if d.key != s.key {
            return FramebufferStatus::Unsupported;
        }
    }

    let depth_ok = depth.is_none_or(|d| {
        matches!(d.format, Some(RenderbufferFormat::Depth | RenderbufferFormat::DepthStencil))
            && d.size == color_size
    });
    let stencil_ok = stencil.is_none_or(|s| {
        matches!(s.format, Some(RenderbufferFormat::Stencil | RenderbufferFormat::DepthStencil))
            && s.size == color_size
    });

    if depth_ok && stencil_ok {
        FramebufferStatus::Complete
    } else {
        FramebufferStatus::IncompleteAttachment
    }
}

fn buffer_usages(target: BufferTarget) -> wgpu::BufferUsages {
    let binding = match target {
        BufferTarget::Array => wgpu::BufferUsages::VERTEX,
        BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        BufferTarget::Uniform => wgpu::BufferUsages::UNIFORM,
    };
    binding | wgpu::BufferUsages::COPY_DST
}

fn renderbuffer_texture_format(format: RenderbufferFormat) -> wgpu::TextureFormat {
    match format {
        RenderbufferFormat::Depth => wgpu::TextureFormat::Depth32Float,
        RenderbufferFormat::Stencil => wgpu::TextureFormat::Stencil8,
        RenderbufferFormat::DepthStencil => wgpu::TextureFormat::Depth24PlusStencil8,
    }
}

fn clear_color(color: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: color[0] as f64,
        g: color[1] as f64,
        b: color[2] as f64,
        a: color[3] as f64,
    }
}

// ── device ────────────────────────────────────────────────────────────────

/// Buffers a render pass body may bind.
pub struct PassResources<'a> {
    buffers: &'a SlotMap<BufferKey, BufferSlot>,
}

impl PassResources<'_> {
    /// Current storage of `key`; `None` before its first allocation.
    pub fn buffer(&self, key: BufferKey) -> Option<&wgpu::Buffer> {
        self.buffers.get(key)?.buffer.as_ref()
    }
}

/// [`GlDevice`] on top of a wgpu device and queue.
///
/// GL-style handles are slotmap keys into tables of wgpu objects. Work is
/// recorded into one command encoder and submitted on [`flush`](GlDevice::flush).
/// Mapped buffer windows live in CPU staging memory and are uploaded through
/// the queue when unmapped.
///
/// Drawing with no framebuffer bound targets the [`DefaultTarget`] set by the
/// host; without one, draws are dropped with a warning.
pub struct WgpuDevice {
    gpu: wgpu::Device,
    queue: wgpu::Queue,
    offscreen_format: wgpu::TextureFormat,

    objects: Objects,
    bound: Option<FramebufferKey>,
    default_target: Option<DefaultTarget>,

    encoder: Option<wgpu::CommandEncoder>,
    quads: QuadCompositor,

    /// Stand-in window for maps of unknown buffers.
    scratch: Vec<u64>,
}

impl WgpuDevice {
    pub fn new(gpu: wgpu::Device, queue: wgpu::Queue, offscreen_format: wgpu::TextureFormat) -> Self {
        Self {
            gpu,
            queue,
            offscreen_format,
            objects: Objects::default(),
            bound: None,
            default_target: None,
            encoder: None,
            quads: QuadCompositor::new(),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn gpu(&self) -> &wgpu::Device {
        &self.gpu
    }

    /// Replaces the target used while no framebuffer is bound.
    pub fn set_default_target(&mut self, target: DefaultTarget) {
        log::debug!("default target set to {}x{} {:?}", target.width, target.height, target.format);
        self.default_target = Some(target);
    }

    /// Size of the bound target.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.objects
            .target(self.bound, self.default_target.as_ref())
            .map(|t| (t.width, t.height))
    }

    /// Color format of the bound target.
    pub fn target_format(&self) -> Option<wgpu::TextureFormat> {
        self.objects
            .target(self.bound, self.default_target.as_ref())
            .map(|t| t.format)
    }

    /// Records a color-only render pass on the bound target.
    ///
    /// With `scissor` set, drawing is clipped to it (bottom-left origin).
    /// Returns `None` without running `body` when there is no target or the
    /// scissor misses it.
    pub fn with_pass<R>(
        &mut self,
        label: &str,
        scissor: Option<Bounds>,
        body: impl FnOnce(&mut wgpu::RenderPass<'_>, &PassResources<'_>) -> R,
    ) -> Option<R> {
        let Self { gpu, objects, bound, default_target, encoder, .. } = self;

        let Some(target) = objects.target(*bound, default_target.as_ref()) else {
            log::warn!("render pass '{label}' dropped: no render target");
            return None;
        };

        let scissor = match scissor {
            Some(b) => Some(scissor_rect(b, target.width, target.height)?),
            None => None,
        };

        let encoder = encoder.get_or_insert_with(|| {
            gpu.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glimpse encoder"),
            })
        });

        let mut rpass = begin_load_pass(encoder, &target, label);
        if let Some((x, y, w, h)) = scissor {
            rpass.set_scissor_rect(x, y, w, h);
        }

        let resources = PassResources { buffers: &objects.buffers };
        Some(body(&mut rpass, &resources))
    }
}

impl GlDevice for WgpuDevice {
    type Buffer = BufferKey;
    type Texture = TextureKey;
    type Renderbuffer = RenderbufferKey;
    type Framebuffer = FramebufferKey;

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> BufferKey {
        self.objects.buffers.insert(BufferSlot {
            buffer: None,
            size: 0,
            staging: Vec::new(),
            mapped: None,
        })
    }

    fn buffer_storage(&mut self, buffer: BufferKey, target: BufferTarget, size: u64, usage: BufferUsage) {
        let Some(slot) = self.objects.buffers.get_mut(buffer) else {
            log::warn!("buffer_storage on unknown buffer {buffer:?}");
            return;
        };

        log::trace!("buffer {buffer:?}: {size} bytes as {target:?} ({usage:?})");

        // Dropping the old wgpu buffer orphans it; recorded passes keep it alive.
        slot.buffer = Some(self.gpu.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glimpse stream buffer"),
            size,
            usage: buffer_usages(target),
            mapped_at_creation: false,
        }));
        slot.size = size;
        slot.mapped = None;
    }

    fn map_buffer_range(&mut self, buffer: BufferKey, offset: u64, size: u64) -> &mut [u8] {
        let words = size.div_ceil(8) as usize;

        let staging = match self.objects.buffers.get_mut(buffer) {
            Some(slot) => {
                if offset + size > slot.size {
                    log::warn!(
                        "buffer {buffer:?}: mapped range {offset}+{size} exceeds storage of {} bytes",
                        slot.size
                    );
                }
                slot.mapped = Some((offset, size));
                &mut slot.staging
            }
            None => {
                log::warn!("map of unknown buffer {buffer:?}");
                &mut self.scratch
            }
        };

        staging.clear();
        staging.resize(words, 0);
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(staging.as_mut_slice());
        &mut bytes[..size as usize]
    }

    fn unmap_buffer(&mut self, buffer: BufferKey) {
        let Some(slot) = self.objects.buffers.get_mut(buffer) else {
            return;
        };
        let (Some((offset, size)), Some(wgpu_buffer)) = (slot.mapped.take(), slot.buffer.as_ref()) else {
            return;
        };
        if offset + size > slot.size {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(slot.staging.as_slice());
        self.queue.write_buffer(wgpu_buffer, offset, &bytes[..size as usize]);
    }

    fn delete_buffer(&mut self, buffer: BufferKey) {
        self.objects.buffers.remove(buffer);
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn max_texture_size(&self) -> u32 {
        self.gpu.limits().max_texture_dimension_2d
    }

    fn create_texture(&mut self, width: u32, height: u32) -> TextureKey {
        let max = self.max_texture_size();
        if width > max || height > max {
            log::warn!("texture {width}x{height} clamped to device maximum {max}");
        }
        let width = width.clamp(1, max);
        let height = height.clamp(1, max);

        let texture = self.gpu.create_texture(&wgpu::TextureDescriptor {
            label: Some("glimpse offscreen color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.objects.textures.insert(TextureSlot {
            texture,
            view,
            width,
            height,
        })
    }

    fn generate_mipmaps(&mut self, texture: TextureKey) {
        // Offscreen textures carry a single level; linear sampling covers
        // the minified case.
        log::trace!("generate_mipmaps({texture:?}): single-level texture");
    }

    fn delete_texture(&mut self, texture: TextureKey) {
        self.objects.textures.remove(texture);
    }

    // ── renderbuffers ─────────────────────────────────────────────────────

    fn create_renderbuffer(&mut self, format: RenderbufferFormat, width: u32, height: u32) -> RenderbufferKey {
        let max = self.max_texture_size();
        let width = width.clamp(1, max);
        let height = height.clamp(1, max);
        let texture_format = renderbuffer_texture_format(format);

        let texture = self.gpu.create_texture(&wgpu::TextureDescriptor {
            label: Some("glimpse renderbuffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.objects.renderbuffers.insert(RenderbufferSlot {
            format,
            texture_format,
            _texture: texture,
            view,
            width,
            height,
        })
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferKey) {
        self.objects.renderbuffers.remove(renderbuffer);
    }

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> FramebufferKey {
        self.objects.framebuffers.insert(FramebufferSlot::default())
    }

    fn attach_texture(&mut self, framebuffer: FramebufferKey, attachment: Attachment, texture: TextureKey) {
        let Some(fb) = self.objects.framebuffers.get_mut(framebuffer) else {
            log::warn!("attach to unknown framebuffer {framebuffer:?}");
            return;
        };
        match attachment {
            Attachment::Color0 => fb.color = Some(texture),
            other => log::warn!("color texture cannot be attached as {other:?}"),
        }
    }

    fn attach_renderbuffer(
        &mut self,
        framebuffer: FramebufferKey,
        attachment: Attachment,
        renderbuffer: RenderbufferKey,
    ) {
        let Some(fb) = self.objects.framebuffers.get_mut(framebuffer) else {
            log::warn!("attach to unknown framebuffer {framebuffer:?}");
            return;
        };
        match attachment {
            Attachment::Depth => fb.depth = Some(renderbuffer),
            Attachment::Stencil => fb.stencil = Some(renderbuffer),
            Attachment::DepthStencil => {
                fb.depth = Some(renderbuffer);
                fb.stencil = Some(renderbuffer);
            }
            Attachment::Color0 => log::warn!("renderbuffers cannot be color attachments"),
        }
    }

    fn framebuffer_status(&self, framebuffer: FramebufferKey) -> FramebufferStatus {
        let Some(fb) = self.objects.framebuffers.get(framebuffer) else {
            return FramebufferStatus::MissingAttachment;
        };

        let color = fb
            .color
            .and_then(|key| self.objects.textures.get(key))
            .map(|t| (t.width, t.height));

        attachment_status(
            color,
            self.objects.renderbuffer_info(fb.depth),
            self.objects.renderbuffer_info(fb.stencil),
        )
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferKey>) {
        if let Some(key) = framebuffer {
            if !self.objects.framebuffers.contains_key(key) {
                log::warn!("binding unknown framebuffer {key:?}");
            }
        }
        self.bound = framebuffer;
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferKey) {
        self.objects.framebuffers.remove(framebuffer);
        if self.bound == Some(framebuffer) {
            self.bound = None;
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    fn clear(&mut self, bounds: Bounds, color: [f32; 4]) {
        let Self { gpu, queue, objects, bound, default_target, encoder, quads, .. } = self;

        let Some(target) = objects.target(*bound, default_target.as_ref()) else {
            log::warn!("clear dropped: no render target");
            return;
        };

        let encoder = encoder.get_or_insert_with(|| {
            gpu.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glimpse encoder"),
            })
        });

        if !target.covers(bounds) {
            if let Err(err) = quads.fill(gpu, queue, encoder, &target, bounds, color) {
                log::error!("partial clear failed: {err}");
            }
            return;
        }

        let depth_stencil_attachment = target.depth.map(|(view, format)| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: format.has_depth_aspect().then_some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: format.has_stencil_aspect().then_some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0),
                store: wgpu::StoreOp::Store,
            }),
        });

        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("glimpse clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(color)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn draw_texture(&mut self, texture: TextureKey, dest: Rect, viewport: Bounds) {
        let Self { gpu, queue, objects, bound, default_target, encoder, quads, .. } = self;

        let sampling_bound = bound
            .and_then(|fb| objects.framebuffers.get(fb))
            .is_some_and(|fb| fb.color == Some(texture));
        if sampling_bound {
            log::warn!("draw_texture skipped: {texture:?} is the bound color target");
            return;
        }

        let Some(source) = objects.textures.get(texture) else {
            log::warn!("draw of unknown texture {texture:?}");
            return;
        };
        let Some(target) = objects.target(*bound, default_target.as_ref()) else {
            log::warn!("draw_texture dropped: no render target");
            return;
        };

        let encoder = encoder.get_or_insert_with(|| {
            gpu.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glimpse encoder"),
            })
        });

        if let Err(err) = quads.blit(gpu, queue, encoder, &target, &source.view, dest, viewport) {
            log::error!("texture draw failed: {err}");
        }
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }
}
