/// The period of a wrapped axis: data repeats every `max - min` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapRange {
    pub min: f64,
    pub max: f64,
}

impl WrapRange {
    /// Builds a wrap range; returns `None` unless `max > min` and both are finite.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && max > min).then_some(Self { min, max })
    }

    #[inline]
    pub fn span(self) -> f64 {
        self.max - self.min
    }
}

/// One plot axis.
///
/// The axis counts as initialized once it has been given a pixel size, i.e.
/// once layout has placed it on screen. Until then the renderer treats it as
/// "nothing to draw".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis1D {
    min: f64,
    max: f64,
    size_pixels: u32,
    initialized: bool,
    wrap: Option<WrapRange>,
}

impl Default for Axis1D {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            size_pixels: 0,
            initialized: false,
            wrap: None,
        }
    }
}

impl Axis1D {
    /// Plain (non-wrapping) axis showing `[min, max]`.
    pub fn new(min: f64, max: f64) -> Self {
        let mut axis = Self::default();
        axis.set_range(min, max);
        axis
    }

    /// Axis whose data repeats with period `wrap.span()`.
    pub fn wrapped(min: f64, max: f64, wrap: WrapRange) -> Self {
        Self::new(min, max).with_wrap(Some(wrap))
    }

    /// Sets the on-screen size and marks the axis initialized.
    pub fn with_size(mut self, size_pixels: u32) -> Self {
        self.set_size_pixels(size_pixels);
        self
    }

    pub fn with_wrap(mut self, wrap: Option<WrapRange>) -> Self {
        self.wrap = wrap;
        self
    }

    /// Sets the visible range. Reversed input is swapped so `min <= max` holds.
    pub fn set_range(&mut self, min: f64, max: f64) {
        if min <= max {
            self.min = min;
            self.max = max;
        } else {
            self.min = max;
            self.max = min;
        }
    }

    pub fn set_size_pixels(&mut self, size_pixels: u32) {
        self.size_pixels = size_pixels;
        self.initialized = true;
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Visible data span, `max - min`.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn size_pixels(&self) -> u32 {
        self.size_pixels
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn wrap(&self) -> Option<WrapRange> {
        self.wrap
    }

    #[inline]
    pub fn is_wrapped(&self) -> bool {
        self.wrap.is_some()
    }

    /// Period of the data, if the axis wraps.
    #[inline]
    pub fn wrap_span(&self) -> Option<f64> {
        self.wrap.map(WrapRange::span)
    }

    /// Offset of `value` within one period, in `[0, wrap_span)`.
    ///
    /// Always 0 for a plain axis.
    pub fn wrapped_mod(&self, value: f64) -> f64 {
        let Some(wrap) = self.wrap else { return 0.0 };
        let span = wrap.span();
        let m = (value - wrap.min).rem_euclid(span);
        // rem_euclid can round up to exactly `span` for tiny negative inputs.
        if m >= span { 0.0 } else { m }
    }

    /// Maps a data value to a pixel offset from the axis origin.
    pub fn value_to_screen_pixel(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            return 0.0;
        }
        (value - self.min) / span * self.size_pixels as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn degrees() -> WrapRange {
        WrapRange::new(0.0, 360.0).unwrap()
    }

    // ── range ─────────────────────────────────────────────────────────────

    #[test]
    fn reversed_range_is_swapped() {
        let axis = Axis1D::new(10.0, -5.0);
        assert_eq!(axis.min(), -5.0);
        assert_eq!(axis.max(), 10.0);
    }

    #[test]
    fn initialized_only_after_sizing() {
        let axis = Axis1D::new(0.0, 1.0);
        assert!(!axis.is_initialized());
        assert!(axis.with_size(100).is_initialized());
    }

    #[test]
    fn wrap_range_rejects_empty_period() {
        assert!(WrapRange::new(5.0, 5.0).is_none());
        assert!(WrapRange::new(5.0, f64::INFINITY).is_none());
    }

    // ── wrapped_mod ───────────────────────────────────────────────────────

    #[test]
    fn wrapped_mod_of_negative_value() {
        let axis = Axis1D::wrapped(-10.0, 370.0, degrees());
        assert_eq!(axis.wrapped_mod(-10.0), 350.0);
        assert_eq!(axis.wrapped_mod(-370.0), 350.0);
    }

    #[test]
    fn wrapped_mod_on_period_boundary_is_zero() {
        let axis = Axis1D::wrapped(0.0, 10.0, degrees());
        assert_eq!(axis.wrapped_mod(720.0), 0.0);
        assert_eq!(axis.wrapped_mod(-360.0), 0.0);
    }

    #[test]
    fn wrapped_mod_respects_wrap_origin() {
        let axis = Axis1D::wrapped(0.0, 10.0, WrapRange::new(-180.0, 180.0).unwrap());
        assert_eq!(axis.wrapped_mod(-180.0), 0.0);
        assert_eq!(axis.wrapped_mod(190.0), 10.0);
    }

    #[test]
    fn wrapped_mod_never_returns_the_span() {
        let axis = Axis1D::wrapped(0.0, 10.0, degrees());
        let m = axis.wrapped_mod(-1e-14);
        assert!((0.0..360.0).contains(&m));
    }

    #[test]
    fn plain_axis_has_no_wrap() {
        let axis = Axis1D::new(0.0, 10.0);
        assert_eq!(axis.wrap_span(), None);
        assert_eq!(axis.wrapped_mod(42.0), 0.0);
    }

    // ── value_to_screen_pixel ─────────────────────────────────────────────

    #[test]
    fn value_to_screen_pixel_is_linear() {
        let axis = Axis1D::new(-10.0, 10.0).with_size(200);
        assert_eq!(axis.value_to_screen_pixel(-10.0), 0.0);
        assert_eq!(axis.value_to_screen_pixel(0.0), 100.0);
        assert_eq!(axis.value_to_screen_pixel(20.0), 300.0);
    }

    #[test]
    fn value_to_screen_pixel_degenerate_span() {
        let axis = Axis1D::new(3.0, 3.0).with_size(200);
        assert_eq!(axis.value_to_screen_pixel(3.0), 0.0);
    }
}
