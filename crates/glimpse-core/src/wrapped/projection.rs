use crate::axis::Axis2D;
use crate::coords::{Bounds, Rect, Vec2};

use super::TileBounds;

/// Linear map from data space to viewport pixels.
///
/// Pixel coordinates follow the target convention: origin at the bottom-left
/// of the bound target, y growing upwards.
#[derive(Debug, Clone, Copy)]
pub struct FlatProjection {
    x: (f64, f64),
    y: (f64, f64),
    viewport: Bounds,
}

impl FlatProjection {
    pub fn new(axis: &Axis2D, viewport: Bounds) -> Self {
        Self {
            x: (axis.x.min(), axis.x.max()),
            y: (axis.y.min(), axis.y.max()),
            viewport,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Bounds {
        self.viewport
    }

    fn map(range: (f64, f64), origin: u32, size: u32, v: f64) -> f32 {
        let (min, max) = range;
        let t = if max > min { (v - min) / (max - min) } else { 0.0 };
        (origin as f64 + t * size as f64) as f32
    }

    /// Pixel position of a data point.
    pub fn point(&self, x: f64, y: f64) -> Vec2 {
        let vp = self.viewport;
        Vec2::new(
            Self::map(self.x, vp.x, vp.width, x),
            Self::map(self.y, vp.y, vp.height, y),
        )
    }

    /// Pixel rectangle covered by the data rectangle `x` x `y`.
    ///
    /// Tiles routinely extend past the viewport; the result is not clipped.
    pub fn project(&self, x: &TileBounds, y: &TileBounds) -> Rect {
        Rect::from_corners(self.point(x.start, y.start), self.point(x.end, y.end))
    }

    /// [`project`](Self::project), or `None` when nothing of the tile is on screen.
    pub fn project_visible(&self, x: &TileBounds, y: &TileBounds) -> Option<Rect> {
        let rect = self.project(x, y);
        if !rect.is_finite() {
            return None;
        }
        rect.intersect(Rect::from(self.viewport)).map(|_| rect)
    }
}
