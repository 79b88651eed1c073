use std::collections::HashMap;

use glimpse_core::axis::Axis2D;
use glimpse_core::buffer::{BufferConfig, MappableBuffer};
use glimpse_core::coords::Bounds;
use glimpse_core::painter::{GlimpseContext, LookAndFeel, Painter};
use glimpse_core::wrapped::FlatProjection;
use glimpse_core::Result;

use crate::device::WgpuDevice;
use crate::target::to_clip;

/// Floats per vertex: clip-space xy followed by straight RGBA.
const VERTEX_FLOATS: usize = 6;

/// Polyline through data-space points, streamed every frame.
///
/// Points are projected through the axis handed to [`Painter::paint`], so the
/// same painter draws correctly into any tile or viewport. Drawing is clipped
/// to the painted bounds.
pub struct LineStripPainter {
    points: Vec<[f64; 2]>,
    color: [f32; 4],
    vertices: MappableBuffer<WgpuDevice>,
    pipelines: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    disposed: bool,
}

impl LineStripPainter {
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut painter = Self {
            points: Vec::new(),
            color: LookAndFeel::default().line_color,
            vertices: MappableBuffer::new(BufferConfig::default()),
            pipelines: HashMap::new(),
            disposed: false,
        };
        painter.set_points(points);
        painter
    }

    /// Replaces the polyline. Non-finite points are dropped.
    pub fn set_points(&mut self, points: impl IntoIterator<Item = (f64, f64)>) {
        self.points.clear();
        self.points.extend(
            points
                .into_iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(x, y)| [x, y]),
        );
    }

    #[inline]
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    #[inline]
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn set_color(&mut self, color: [f32; 4]) {
        self.color = color;
    }

    fn ensure_pipeline(&mut self, gpu: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipelines.contains_key(&format) {
            return;
        }

        let shader = gpu.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glimpse line shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line.wgsl").into()),
        });

        let layout = gpu.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glimpse line pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let attrs = wgpu::vertex_attr_array![
            0 => Float32x2, // clip-space position
            1 => Float32x4  // color
        ];

        let pipeline = gpu.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glimpse line pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (VERTEX_FLOATS * size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attrs,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineStrip,
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
        });

        self.pipelines.insert(format, pipeline);
    }
}

/// Writes one vertex per point into `out`.
fn fill_vertices(
    out: &mut [f32],
    points: &[[f64; 2]],
    projection: &FlatProjection,
    target: (u32, u32),
    color: [f32; 4],
) {
    for (vertex, p) in out.chunks_exact_mut(VERTEX_FLOATS).zip(points) {
        let clip = to_clip(projection.point(p[0], p[1]), target.0, target.1);
        vertex[..2].copy_from_slice(&clip);
        vertex[2..].copy_from_slice(&color);
    }
}

impl Painter<WgpuDevice> for LineStripPainter {
    fn paint(&mut self, ctx: &mut GlimpseContext<'_, WgpuDevice>, bounds: Bounds, axis: &Axis2D) -> Result<()> {
        let n = self.points.len();
        if self.disposed || n < 2 || bounds.is_empty() {
            return Ok(());
        }

        let (Some(target), Some(format)) = (ctx.device.target_size(), ctx.device.target_format()) else {
            return Ok(());
        };
        self.ensure_pipeline(ctx.device.gpu(), format);

        let projection = FlatProjection::new(axis, bounds);
        let floats = self.vertices.map_floats(ctx.device, (n * VERTEX_FLOATS) as u64)?;
        fill_vertices(&mut floats[..n * VERTEX_FLOATS], &self.points, &projection, target, self.color);
        self.vertices.seal(ctx.device)?;

        let (Some(key), Some(offset), Some(pipeline)) = (
            self.vertices.buffer(),
            self.vertices.sealed_offset(),
            self.pipelines.get(&format),
        ) else {
            return Ok(());
        };
        let len = (n * VERTEX_FLOATS * size_of::<f32>()) as u64;

        ctx.device.with_pass("glimpse line strip", Some(bounds), |rpass, resources| {
            let Some(buffer) = resources.buffer(key) else {
                return;
            };
            rpass.set_pipeline(pipeline);
            rpass.set_vertex_buffer(0, buffer.slice(offset..offset + len));
            rpass.draw(0..n as u32, 0..1);
        });

        Ok(())
    }

    fn dispose(&mut self, ctx: &mut GlimpseContext<'_, WgpuDevice>) {
        self.vertices.dispose(ctx.device);
        self.pipelines.clear();
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn set_look_and_feel(&mut self, laf: &LookAndFeel) {
        self.color = laf.line_color;
    }
}
