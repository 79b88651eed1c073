//! Plot axes.
//!
//! An [`Axis1D`] is the read-only query surface the renderer consumes: the
//! visible data range, its size on screen and, for periodic data, the wrap
//! range. [`Axis2D`] pairs an X and a Y axis.

mod axis1d;

pub use axis1d::{Axis1D, WrapRange};

/// X and Y axes of a 2D plot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Axis2D {
    pub x: Axis1D,
    pub y: Axis1D,
}

impl Axis2D {
    #[inline]
    pub const fn new(x: Axis1D, y: Axis1D) -> Self {
        Self { x, y }
    }

    /// True if either axis repeats periodically.
    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.x.is_wrapped() || self.y.is_wrapped()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.x.is_initialized() && self.y.is_initialized()
    }
}
