use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use glimpse_core::buffer::StreamCursor;
use glimpse_core::coords::{Bounds, Rect};
use glimpse_core::Result;

use crate::target::{scissor_rect, to_clip, RenderTargetRef};

/// Quads per vertex block; blocks are replaced when full.
const QUADS_PER_BLOCK: u64 = 256;

// ── vertex ────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pos: [f32; 2],
    uv: [f32; 2],
    color: [f32; 4],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2, // clip-space position
        1 => Float32x2, // uv
        2 => Float32x4  // color / tint
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Triangle strip covering `rect` on a `width` x `height` target.
///
/// Texture row 0 is the top of the image, so `v` runs opposite to pixel y.
pub(crate) fn quad_vertices(rect: Rect, width: u32, height: u32, color: [f32; 4]) -> [QuadVertex; 4] {
    let r = rect.normalized();
    let lo = to_clip(r.origin, width, height);
    let hi = to_clip(r.max(), width, height);
    let v = |pos: [f32; 2], uv: [f32; 2]| QuadVertex { pos, uv, color };

    [
        v([lo[0], lo[1]], [0.0, 1.0]),
        v([hi[0], lo[1]], [1.0, 1.0]),
        v([lo[0], hi[1]], [0.0, 0.0]),
        v([hi[0], hi[1]], [1.0, 0.0]),
    ]
}

// ── blend ─────────────────────────────────────────────────────────────────

pub(crate) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── compositor ────────────────────────────────────────────────────────────

struct QuadPipelines {
    /// Premultiplied texture over the target.
    textured: wgpu::RenderPipeline,
    /// Replaces the covered pixels; used for partial clears.
    solid: wgpu::RenderPipeline,
}

/// Draws textures and solid rectangles onto the bound target.
///
/// Vertices are streamed into a shared buffer at non-overlapping offsets, so
/// any number of quads may be recorded before a submit.
pub struct QuadCompositor {
    pipelines: HashMap<wgpu::TextureFormat, QuadPipelines>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    vertex_buffer: Option<wgpu::Buffer>,
    cursor: StreamCursor,
}

impl Default for QuadCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadCompositor {
    pub fn new() -> Self {
        Self {
            pipelines: HashMap::new(),
            bind_group_layout: None,
            sampler: None,
            vertex_buffer: None,
            cursor: StreamCursor::new(QUADS_PER_BLOCK),
        }
    }

    /// Draws `source` stretched over `dest`, clipped to `clip`.
    pub(crate) fn blit(
        &mut self,
        gpu: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTargetRef<'_>,
        source: &wgpu::TextureView,
        dest: Rect,
        clip: Bounds,
    ) -> Result<()> {
        let Some(scissor) = scissor_rect(clip, target.width, target.height) else {
            return Ok(());
        };

        self.ensure_pipelines(gpu, target.format);
        self.ensure_sampler(gpu);

        let quad = quad_vertices(dest, target.width, target.height, [1.0; 4]);
        let (offset, len) = self.upload(gpu, queue, &quad)?;

        let (Some(pipelines), Some(bgl), Some(sampler), Some(vbo)) = (
            self.pipelines.get(&target.format),
            self.bind_group_layout.as_ref(),
            self.sampler.as_ref(),
            self.vertex_buffer.as_ref(),
        ) else {
            return Ok(());
        };

        let bind_group = gpu.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("glimpse quad bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let mut rpass = begin_load_pass(encoder, target, "glimpse blit pass");
        rpass.set_scissor_rect(scissor.0, scissor.1, scissor.2, scissor.3);
        rpass.set_pipeline(&pipelines.textured);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(offset..offset + len));
        rpass.draw(0..4, 0..1);

        Ok(())
    }

    /// Overwrites `bounds` with `color`.
    pub(crate) fn fill(
        &mut self,
        gpu: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTargetRef<'_>,
        bounds: Bounds,
        color: [f32; 4],
    ) -> Result<()> {
        let Some(scissor) = scissor_rect(bounds, target.width, target.height) else {
            return Ok(());
        };

        self.ensure_pipelines(gpu, target.format);

        let rect = Rect::new(bounds.x as f32, bounds.y as f32, bounds.width as f32, bounds.height as f32);
        let quad = quad_vertices(rect, target.width, target.height, color);
        let (offset, len) = self.upload(gpu, queue, &quad)?;

        let (Some(pipelines), Some(vbo)) =
            (self.pipelines.get(&target.format), self.vertex_buffer.as_ref())
        else {
            return Ok(());
        };

        let mut rpass = begin_load_pass(encoder, target, "glimpse fill pass");
        rpass.set_scissor_rect(scissor.0, scissor.1, scissor.2, scissor.3);
        rpass.set_pipeline(&pipelines.solid);
        rpass.set_vertex_buffer(0, vbo.slice(offset..offset + len));
        rpass.draw(0..4, 0..1);

        Ok(())
    }

    /// Writes `quad` into the next free slot of the vertex buffer.
    fn upload(&mut self, gpu: &wgpu::Device, queue: &wgpu::Queue, quad: &[QuadVertex; 4]) -> Result<(u64, u64)> {
        let bytes: &[u8] = bytemuck::cast_slice(quad);
        let placement = self.cursor.open(bytes.len() as u64)?;

        if let Some(block_size) = placement.reallocate {
            log::debug!("quad compositor: allocating {block_size}-byte vertex block");
            self.vertex_buffer = Some(gpu.create_buffer(&wgpu::BufferDescriptor {
                label: Some("glimpse quad vbo"),
                size: block_size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        if let Some(vbo) = self.vertex_buffer.as_ref() {
            queue.write_buffer(vbo, placement.offset, bytes);
        }

        let offset = self.cursor.seal()?;
        Ok((offset, bytes.len() as u64))
    }

    fn ensure_sampler(&mut self, gpu: &wgpu::Device) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(gpu.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glimpse quad sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    fn ensure_pipelines(&mut self, gpu: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }

        let shader = gpu.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glimpse quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });

        let bgl = self.bind_group_layout.get_or_insert_with(|| {
            gpu.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("glimpse quad bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
        });

        let textured_layout = gpu.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glimpse quad textured layout"),
            bind_group_layouts: &[&*bgl],
            immediate_size: 0,
        });
        let solid_layout = gpu.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glimpse quad solid layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let build = |layout: &wgpu::PipelineLayout, entry: &str, blend: Option<wgpu::BlendState>| {
            gpu.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("glimpse quad pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[QuadVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let pipelines = QuadPipelines {
            textured: build(&textured_layout, "fs_textured", Some(premul_alpha_blend())),
            solid: build(&solid_layout, "fs_solid", None),
        };

        log::debug!("quad compositor: pipelines built for {format:?}");
        self.pipelines.insert(format, pipelines);
    }
}

/// Color-only pass that keeps the target's contents.
pub(crate) fn begin_load_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    target: &RenderTargetRef<'_>,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target.color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_target_quad_spans_clip_space() {
        let q = quad_vertices(Rect::new(0.0, 0.0, 64.0, 32.0), 64, 32, [1.0; 4]);
        assert_eq!(q[0].pos, [-1.0, -1.0]);
        assert_eq!(q[3].pos, [1.0, 1.0]);
    }

    #[test]
    fn bottom_edge_samples_last_texture_row() {
        let q = quad_vertices(Rect::new(0.0, 0.0, 10.0, 10.0), 10, 10, [1.0; 4]);
        // Bottom-left vertex.
        assert_eq!(q[0].uv, [0.0, 1.0]);
        // Top-right vertex.
        assert_eq!(q[3].uv, [1.0, 0.0]);
    }

    #[test]
    fn reversed_rect_is_normalized() {
        let q = quad_vertices(Rect::new(10.0, 10.0, -10.0, -10.0), 10, 10, [1.0; 4]);
        assert_eq!(q[0].pos, [-1.0, -1.0]);
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(size_of::<QuadVertex>(), 32);
        assert_eq!(size_of::<[QuadVertex; 4]>() as u64 % glimpse_core::buffer::MAP_ALIGNMENT, 0);
    }
}
