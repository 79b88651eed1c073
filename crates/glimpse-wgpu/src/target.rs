use glimpse_core::coords::{Bounds, Vec2};

/// The target drawn to while no framebuffer is bound.
///
/// Usually a surface texture view supplied by the host each frame.
#[derive(Debug, Clone)]
pub struct DefaultTarget {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Resolved views of whatever is currently bound.
pub(crate) struct RenderTargetRef<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: Option<(&'a wgpu::TextureView, wgpu::TextureFormat)>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTargetRef<'_> {
    #[inline]
    pub fn covers(&self, bounds: Bounds) -> bool {
        bounds.x == 0 && bounds.y == 0 && bounds.width >= self.width && bounds.height >= self.height
    }
}

/// Converts a pixel position (bottom-left origin) to clip space.
#[inline]
pub fn to_clip(p: Vec2, width: u32, height: u32) -> [f32; 2] {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    [p.x / w * 2.0 - 1.0, p.y / h * 2.0 - 1.0]
}

/// wgpu scissor arguments `(x, y, w, h)` for `bounds`, clamped to the
/// target.
///
/// `bounds` uses a bottom-left origin while wgpu scissors use top-left.
/// Returns `None` when nothing of `bounds` lies on the target.
pub fn scissor_rect(bounds: Bounds, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = bounds.x.min(width);
    let x1 = bounds.x.saturating_add(bounds.width).min(width);
    let y0 = bounds.y.min(height);
    let y1 = bounds.y.saturating_add(bounds.height).min(height);

    if x1 <= x0 || y1 <= y0 {
        None
    } else {
        Some((x0, height - y1, x1 - x0, y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_clip_corners() {
        assert_eq!(to_clip(Vec2::new(0.0, 0.0), 200, 100), [-1.0, -1.0]);
        assert_eq!(to_clip(Vec2::new(200.0, 100.0), 200, 100), [1.0, 1.0]);
        assert_eq!(to_clip(Vec2::new(100.0, 25.0), 200, 100), [0.0, -0.5]);
    }

    #[test]
    fn scissor_flips_to_top_left_origin() {
        // 10 px tall strip at the bottom of a 100 px target.
        assert_eq!(scissor_rect(Bounds::new(5, 0, 20, 10), 100, 100), Some((5, 90, 20, 10)));
    }

    #[test]
    fn scissor_is_clamped_to_target() {
        assert_eq!(scissor_rect(Bounds::new(90, 90, 50, 50), 100, 100), Some((90, 0, 10, 10)));
        assert_eq!(scissor_rect(Bounds::new(100, 0, 5, 5), 100, 100), None);
    }
}
