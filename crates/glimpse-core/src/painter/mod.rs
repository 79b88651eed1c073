//! Painter composition model.
//!
//! A painter draws into the bounds it is given, using an axis to map data to
//! pixels. Painters are shared as [`SharedPainter`] handles so a host can keep
//! configuring them while a composite painter (e.g. the wrapped renderer)
//! draws them every frame.

mod group;
mod list;
mod look;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::axis::Axis2D;
use crate::coords::Bounds;
use crate::device::{GlContext, GlDevice};
use crate::error::Result;

pub use group::DisposableGroup;
pub use list::PainterList;
pub use look::LookAndFeel;

/// Per-call rendering context: the device and the context currently driving it.
pub struct GlimpseContext<'a, D: GlDevice> {
    pub device: &'a mut D,
    pub gl: &'a dyn GlContext,
}

impl<'a, D: GlDevice> GlimpseContext<'a, D> {
    #[inline]
    pub fn new(device: &'a mut D, gl: &'a dyn GlContext) -> Self {
        Self { device, gl }
    }
}

/// Something that renders into a region of the bound target.
///
/// Composite painters implement this too, so painters nest.
pub trait Painter<D: GlDevice>: Send {
    /// Draws into `bounds` of the bound target, mapping data through `axis`.
    fn paint(&mut self, ctx: &mut GlimpseContext<'_, D>, bounds: Bounds, axis: &Axis2D) -> Result<()>;

    /// Releases device resources. Called at most once by well-behaved owners.
    fn dispose(&mut self, ctx: &mut GlimpseContext<'_, D>);

    fn is_disposed(&self) -> bool;

    /// Applies shared style values.
    fn set_look_and_feel(&mut self, laf: &LookAndFeel) {
        let _ = laf;
    }
}

/// Painter handle shared between the host and composite painters.
pub type SharedPainter<D> = Arc<Mutex<dyn Painter<D>>>;

/// Wraps a painter into a [`SharedPainter`].
pub fn shared<D, P>(painter: P) -> SharedPainter<D>
where
    D: GlDevice,
    P: Painter<D> + 'static,
{
    Arc::new(Mutex::new(painter))
}

/// Identity comparison for shared painters.
#[inline]
pub(crate) fn same_painter<D: GlDevice>(a: &SharedPainter<D>, b: &SharedPainter<D>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
