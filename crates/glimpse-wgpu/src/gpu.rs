use anyhow::{Context, Result};

use crate::device::WgpuDevice;
use crate::target::DefaultTarget;

/// Initialization parameters for a headless GPU.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends wgpu may pick from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Use a software adapter even if a hardware one exists.
    pub force_fallback_adapter: bool,

    /// Required wgpu features. Empty keeps the widest adapter coverage.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Format of offscreen color textures.
    pub offscreen_format: wgpu::TextureFormat,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            offscreen_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Adapter, device and queue without a window surface.
///
/// Hosts that render into their own surface create a [`WgpuDevice`] from
/// their device and queue directly; this type covers tools and tests.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    offscreen_format: wgpu::TextureFormat,
}

impl HeadlessGpu {
    /// Acquires an adapter and device.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("glimpse device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            adapter,
            device,
            queue,
            offscreen_format: init.offscreen_format,
        })
    }

    /// [`new`](Self::new), driven to completion on the calling thread.
    pub fn blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Creates a texture usable as the default target of a headless device.
    pub fn create_screen(&self, width: u32, height: u32) -> (wgpu::Texture, DefaultTarget) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glimpse headless screen"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let target = DefaultTarget {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            width: width.max(1),
            height: height.max(1),
            format: self.offscreen_format,
        };

        (texture, target)
    }

    /// Hands the device and queue to a [`WgpuDevice`].
    pub fn into_device(self) -> WgpuDevice {
        WgpuDevice::new(self.device, self.queue, self.offscreen_format)
    }
}
