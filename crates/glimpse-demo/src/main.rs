//! Renders a sine wave on a wrapped X axis into a headless target while
//! zooming out, logging which tiling path each frame took.

mod timer;

use std::f64::consts::TAU;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;

use glimpse_core::axis::{Axis1D, Axis2D, WrapRange};
use glimpse_core::coords::Bounds;
use glimpse_core::device::{GlContext, GlDevice, TrackedContext};
use glimpse_core::logging::{init_logging, LoggingConfig};
use glimpse_core::painter::{DisposableGroup, GlimpseContext, LookAndFeel, Painter};
use glimpse_core::wrapped::{WrappedConfig, WrappedPainter};
use glimpse_wgpu::{GpuInit, HeadlessGpu, LineStripPainter, WgpuDevice};

use timer::FrameTimer;

#[derive(Parser)]
#[command(author, version, about = "Headless zoom sweep over a wrapped sine wave")]
struct Arguments {
    /// Target width in pixels.
    #[arg(long, default_value_t = 1080)]
    width: u32,
    /// Target height in pixels.
    #[arg(long, default_value_t = 360)]
    height: u32,
    /// Period of the wrapped X axis.
    #[arg(long, default_value_t = 360.0)]
    period: f64,
    /// Center of the visible X range.
    #[arg(long, default_value_t = 180.0)]
    center: f64,
    /// Visible X span of the first frame.
    #[arg(long, default_value_t = 90.0)]
    span: f64,
    /// Visible span multiplier applied each frame.
    #[arg(long, default_value_t = 1.6)]
    zoom: f64,
    /// Number of frames to render.
    #[arg(long, default_value_t = 12)]
    frames: u32,
    /// Sample count of the plotted wave.
    #[arg(long, default_value_t = 512)]
    samples: usize,
    /// Use a software adapter.
    #[arg(long)]
    fallback: bool,
    /// `env_logger` filter.
    #[arg(long, default_value = "info")]
    log: String,
}

fn sine_period(period: f64, samples: usize) -> impl Iterator<Item = (f64, f64)> {
    let samples = samples.max(2);
    (0..samples).map(move |i| {
        let x = period * i as f64 / (samples - 1) as f64;
        (x, (TAU * x / period).sin())
    })
}

fn main() -> Result<()> {
    let arguments = Arguments::parse();
    init_logging(LoggingConfig::with_filter(arguments.log.clone()));

    let wrap = WrapRange::new(0.0, arguments.period)
        .with_context(|| format!("invalid wrap period {}", arguments.period))?;

    let gpu = HeadlessGpu::blocking(GpuInit {
        force_fallback_adapter: arguments.fallback,
        ..Default::default()
    })?;
    let adapter = gpu.adapter_info();
    log::info!("using adapter {} ({:?})", adapter.name, adapter.backend);

    let (_screen, target) = gpu.create_screen(arguments.width, arguments.height);
    let mut device = gpu.into_device();
    device.set_default_target(target);
    let bounds = Bounds::sized(arguments.width.max(1), arguments.height.max(1));

    let onscreen = TrackedContext::new();
    onscreen.make_current().context("failed to make the onscreen context current")?;

    let laf = LookAndFeel {
        line_color: [0.1, 0.3, 0.8, 1.0],
        ..Default::default()
    };

    let mut wave = LineStripPainter::new(sine_period(wrap.span(), arguments.samples));
    wave.set_look_and_feel(&laf);

    let wrapped: Arc<Mutex<WrappedPainter<WgpuDevice>>> =
        Arc::new(Mutex::new(WrappedPainter::new(WrappedConfig::default())));
    wrapped.lock().add_painter(Arc::new(Mutex::new(wave)));

    let group: DisposableGroup<WgpuDevice> = DisposableGroup::new();
    group.add(wrapped.clone());

    let mut timer = FrameTimer::new();
    let mut span = arguments.span;

    for frame in 0..arguments.frames {
        let x = Axis1D::wrapped(arguments.center - span / 2.0, arguments.center + span / 2.0, wrap)
            .with_size(bounds.width);
        let y = Axis1D::new(-1.2, 1.2).with_size(bounds.height);
        let axis = Axis2D::new(x, y);

        let mut ctx = GlimpseContext::new(&mut device, &onscreen);
        ctx.device.clear(bounds, laf.background);
        wrapped
            .lock()
            .paint(&mut ctx, bounds, &axis)
            .with_context(|| format!("frame {frame} failed"))?;
        ctx.device.flush();

        let dt = timer.tick();
        if let Some(stats) = wrapped.lock().last_frame() {
            log::info!(
                "frame {frame:>3}: span {span:>10.1} path {:?} x {} tiles {}/{}/{} in {:.2} ms",
                stats.path,
                stats.x.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                stats.tiles_visited,
                stats.tiles_redrawn,
                stats.tiles_projected,
                dt.as_secs_f64() * 1e3,
            );
        }

        span *= arguments.zoom;
    }

    log::info!(
        "{} frames, average {:.2} ms, slowest {:.2} ms",
        timer.frames(),
        timer.average().as_secs_f64() * 1e3,
        timer.slowest().as_secs_f64() * 1e3,
    );

    let mut ctx = GlimpseContext::new(&mut device, &onscreen);
    group.dispose(&mut ctx);
    ctx.device.flush();

    onscreen.release().context("failed to release the onscreen context")?;
    Ok(())
}
