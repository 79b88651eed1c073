use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::axis::Axis2D;
use crate::coords::Bounds;
use crate::device::{with_offscreen, GlContext, GlDevice};
use crate::error::{Error, Result};
use crate::fbo::{FboConfig, SimpleFrameBuffer};
use crate::painter::{GlimpseContext, LookAndFeel, Painter, PainterList, SharedPainter};

use super::{canonical_pieces, tiles, FlatProjection, TileBounds, TileStrategy};

/// Configuration for [`WrappedPainter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrappedConfig {
    /// Attachments of the offscreen target.
    pub fbo: FboConfig,
    /// Straight RGBA each offscreen tile is cleared to before painting.
    pub clear_color: [f32; 4],
}

impl Default for WrappedConfig {
    fn default() -> Self {
        Self {
            fbo: FboConfig::default(),
            clear_color: [0.0; 4],
        }
    }
}

/// Which path a frame took through [`WrappedPainter::paint`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PaintPath {
    Hidden,
    /// No wrapped axis: sub-painters drew straight into the viewport.
    Direct,
    /// Axes not laid out yet, or nothing to draw into.
    Skipped,
    Tiled,
}

/// What the last frame did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameStats {
    pub path: PaintPath,
    pub x: Option<TileStrategy>,
    pub y: Option<TileStrategy>,
    /// Tile pairs iterated.
    pub tiles_visited: usize,
    /// Tile pairs rendered into the offscreen target.
    pub tiles_redrawn: usize,
    /// Tile pairs drawn onto the viewport.
    pub tiles_projected: usize,
}

impl FrameStats {
    fn untiled(path: PaintPath) -> Self {
        Self {
            path,
            x: None,
            y: None,
            tiles_visited: 0,
            tiles_redrawn: 0,
            tiles_projected: 0,
        }
    }
}

/// Composite painter for axes whose data repeats periodically.
///
/// With no wrapped axis the sub-painters draw directly. Otherwise each axis
/// is cut into tiles ([`tiles`]); every (X, Y) tile pair is rendered into an
/// offscreen target, with the tile split at period seams so sub-painters
/// only see one period, and the texture is then drawn at the tile's place on
/// the viewport. A tile pair that does not need a redraw reuses the texture
/// of the previous one; the first pair of a frame is always rendered.
pub struct WrappedPainter<D: GlDevice> {
    config: WrappedConfig,
    painters: PainterList<D>,
    visible: AtomicBool,
    offscreen: Option<SimpleFrameBuffer<D>>,
    last_frame: Option<FrameStats>,
    disposed: bool,
}

impl<D: GlDevice> WrappedPainter<D> {
    pub fn new(config: WrappedConfig) -> Self {
        Self {
            config,
            painters: PainterList::new(),
            visible: AtomicBool::new(true),
            offscreen: None,
            last_frame: None,
            disposed: false,
        }
    }

    #[inline]
    pub fn config(&self) -> WrappedConfig {
        self.config
    }

    // ── sub-painters ──────────────────────────────────────────────────────

    /// Appends a sub-painter; it draws after those already added.
    pub fn add_painter(&self, painter: SharedPainter<D>) {
        self.painters.add(painter);
    }

    pub fn remove_painter(&self, painter: &SharedPainter<D>) -> bool {
        self.painters.remove(painter)
    }

    pub fn remove_all(&self) {
        self.painters.clear();
    }

    /// Current sub-painters in draw order.
    pub fn painters(&self) -> Arc<Vec<SharedPainter<D>>> {
        self.painters.snapshot()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    // ── diagnostics ───────────────────────────────────────────────────────

    /// Statistics of the last [`paint`](Painter::paint) call.
    pub fn last_frame(&self) -> Option<FrameStats> {
        self.last_frame
    }

    /// The offscreen target, once a wrapped frame has been painted.
    pub fn offscreen(&self) -> Option<&SimpleFrameBuffer<D>> {
        self.offscreen.as_ref()
    }
}

impl<D: GlDevice> Default for WrappedPainter<D> {
    fn default() -> Self {
        Self::new(WrappedConfig::default())
    }
}

impl<D: GlDevice> Painter<D> for WrappedPainter<D> {
    fn paint(&mut self, ctx: &mut GlimpseContext<'_, D>, bounds: Bounds, axis: &Axis2D) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        if !self.is_visible() {
            self.last_frame = Some(FrameStats::untiled(PaintPath::Hidden));
            return Ok(());
        }

        let painters = self.painters.snapshot();

        if !axis.is_wrapped() {
            for painter in painters.iter() {
                painter.lock().paint(ctx, bounds, axis)?;
            }
            self.last_frame = Some(FrameStats::untiled(PaintPath::Direct));
            return Ok(());
        }

        let drawable = |span: f64| span.is_finite() && span > 0.0;
        if !axis.is_initialized() || bounds.is_empty() || !drawable(axis.x.span()) || !drawable(axis.y.span()) {
            log::trace!("wrapped paint skipped: axes not laid out, unbounded or empty bounds {bounds:?}");
            self.last_frame = Some(FrameStats::untiled(PaintPath::Skipped));
            return Ok(());
        }

        if self.offscreen.is_none() {
            let context = ctx.gl.create_shared()?;
            log::debug!("wrapped painter: offscreen context {} created", context.id());
            self.offscreen = Some(SimpleFrameBuffer::new(context, bounds.width, bounds.height, self.config.fbo));
        }
        let Some(offscreen) = self.offscreen.as_ref() else {
            return Ok(());
        };

        let x_tiles = tiles(&axis.x, bounds.width);
        let projection = FlatProjection::new(axis, bounds);

        let mut stats = FrameStats {
            path: PaintPath::Tiled,
            x: Some(x_tiles.strategy()),
            y: Some(TileStrategy::for_axis(&axis.y)),
            tiles_visited: 0,
            tiles_redrawn: 0,
            tiles_projected: 0,
        };

        let mut first = true;
        for x_tile in x_tiles {
            for y_tile in tiles(&axis.y, bounds.height) {
                stats.tiles_visited += 1;

                if first || x_tile.redraw || y_tile.redraw {
                    log::trace!(
                        "rendering tile x [{}, {}] y [{}, {}] at {}x{}",
                        x_tile.start,
                        x_tile.end,
                        y_tile.start,
                        y_tile.end,
                        x_tile.texture_size,
                        y_tile.texture_size
                    );
                    render_tile(ctx, offscreen, &painters, axis, &x_tile, &y_tile, self.config.clear_color)?;
                    stats.tiles_redrawn += 1;
                }
                first = false;

                let (Some(dest), Some(texture)) =
                    (projection.project_visible(&x_tile, &y_tile), offscreen.texture())
                else {
                    continue;
                };
                ctx.device.draw_texture(texture, dest, bounds);
                stats.tiles_projected += 1;
            }
        }

        log::trace!("wrapped frame: {stats:?}");
        self.last_frame = Some(stats);
        Ok(())
    }

    fn dispose(&mut self, ctx: &mut GlimpseContext<'_, D>) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for painter in self.painters.snapshot().iter() {
            let mut painter = painter.lock();
            if !painter.is_disposed() {
                painter.dispose(ctx);
            }
        }

        if let Some(offscreen) = self.offscreen.take() {
            offscreen.dispose(ctx.device);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn set_look_and_feel(&mut self, laf: &LookAndFeel) {
        for painter in self.painters.snapshot().iter() {
            painter.lock().set_look_and_feel(laf);
        }
    }
}

/// Renders one tile pair into `offscreen` with its own context current.
fn render_tile<D: GlDevice>(
    ctx: &mut GlimpseContext<'_, D>,
    offscreen: &SimpleFrameBuffer<D>,
    painters: &[SharedPainter<D>],
    axis: &Axis2D,
    x_tile: &TileBounds,
    y_tile: &TileBounds,
    clear_color: [f32; 4],
) -> Result<()> {
    offscreen.resize(x_tile.texture_size, y_tile.texture_size);

    let onscreen: &dyn GlContext = ctx.gl;
    let offscreen_gl = offscreen.context();
    let device = &mut *ctx.device;

    with_offscreen(onscreen, offscreen_gl, || {
        offscreen.with_bound(device, |device, target| {
            device.clear(target, clear_color);

            let xs = canonical_pieces(&axis.x, x_tile, target.width);
            let ys = canonical_pieces(&axis.y, y_tile, target.height);
            let mut tile_ctx = GlimpseContext::new(device, offscreen_gl);

            for painter in painters {
                let mut painter = painter.lock();
                for px in &xs {
                    for py in &ys {
                        let piece_bounds = Bounds::new(px.pixel_start, py.pixel_start, px.pixels(), py.pixels());
                        let piece_axis = Axis2D::new(px.axis(&axis.x), py.axis(&axis.y));
                        painter.paint(&mut tile_ctx, piece_bounds, &piece_axis)?;
                    }
                }
            }
            Ok(())
        })
    })
}
