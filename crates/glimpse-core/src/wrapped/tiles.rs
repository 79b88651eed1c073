use std::fmt;

use crate::axis::Axis1D;

/// One tile of an axis: a data range and the texture size to render it at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub start: f64,
    pub end: f64,
    /// Texture extent along this axis, in pixels (at least 1).
    pub texture_size: u32,
    /// Whether the offscreen content must be re-rendered for this tile.
    pub redraw: bool,
}

impl TileBounds {
    #[inline]
    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// How an axis is cut into tiles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TileStrategy {
    /// Plain axis: one tile covering the visible range.
    Unwrapped,
    /// Wrapped, visible span below two periods: split at the first seam.
    ZoomedIn,
    /// Wrapped, visible span of two periods or more: one period repeated.
    ZoomedOut,
}

impl TileStrategy {
    pub fn for_axis(axis: &Axis1D) -> Self {
        match axis.wrap_span() {
            None => TileStrategy::Unwrapped,
            Some(w) if axis.span() < 2.0 * w => TileStrategy::ZoomedIn,
            Some(_) => TileStrategy::ZoomedOut,
        }
    }
}

impl fmt::Display for TileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileStrategy::Unwrapped => "unwrapped",
            TileStrategy::ZoomedIn => "zoomed-in",
            TileStrategy::ZoomedOut => "zoomed-out",
        };
        f.write_str(s)
    }
}

// ── iterators ─────────────────────────────────────────────────────────────

/// Single tile `[min, max]` at full size, never forcing a redraw.
#[derive(Debug, Clone)]
pub struct UnwrappedTiles {
    tile: Option<TileBounds>,
}

impl UnwrappedTiles {
    pub fn new(axis: &Axis1D, bounds_size: u32) -> Self {
        Self {
            tile: Some(TileBounds {
                start: axis.min(),
                end: axis.max(),
                texture_size: bounds_size.max(1),
                redraw: false,
            }),
        }
    }
}

impl Iterator for UnwrappedTiles {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        self.tile.take()
    }
}

/// The visible range, split in two at the first seam if it crosses one.
///
/// Every tile needs a redraw. When split, each tile's texture size is its
/// share of `bounds_size`, rounded up.
#[derive(Debug, Clone)]
pub struct ZoomedInTiles {
    tiles: std::vec::IntoIter<TileBounds>,
}

impl ZoomedInTiles {
    pub fn new(axis: &Axis1D, bounds_size: u32) -> Self {
        let bounds_size = bounds_size.max(1);
        let (min, max) = (axis.min(), axis.max());
        let total = max - min;
        let w = axis.wrap_span().unwrap_or(f64::INFINITY);
        let distance_to_seam = w - axis.wrapped_mod(min);

        let tiles = if total <= distance_to_seam {
            vec![TileBounds { start: min, end: max, texture_size: bounds_size, redraw: true }]
        } else {
            let seam = min + distance_to_seam;
            let size = |span: f64| ((span / total * bounds_size as f64).ceil() as u32).max(1);
            vec![
                TileBounds { start: min, end: seam, texture_size: size(seam - min), redraw: true },
                TileBounds { start: seam, end: max, texture_size: size(max - seam), redraw: true },
            ]
        };

        Self { tiles: tiles.into_iter() }
    }
}

impl Iterator for ZoomedInTiles {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        self.tiles.next()
    }
}

/// Whole periods `[current, current + W]` laid across the visible range.
///
/// Starts at `min` when it sits on a period boundary, else one period
/// earlier, and stops once `current` reaches `max`. No tile asks for a
/// redraw; the caller renders the first one and reuses it.
#[derive(Debug, Clone)]
pub struct ZoomedOutTiles {
    current: f64,
    max: f64,
    period: f64,
    texture_size: u32,
}

impl ZoomedOutTiles {
    pub fn new(axis: &Axis1D, bounds_size: u32) -> Self {
        let (min, max) = (axis.min(), axis.max());
        let period = axis.wrap_span().unwrap_or(0.0);

        let current = if axis.wrapped_mod(min) == 0.0 { min } else { min - period };

        Self {
            current,
            max,
            period,
            texture_size: bounds_size.max(1),
        }
    }
}

impl Iterator for ZoomedOutTiles {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        // A non-advancing step would never terminate.
        if !(self.period > 0.0) || !self.current.is_finite() || !self.max.is_finite() || self.current >= self.max {
            return None;
        }

        let start = self.current;
        let end = start + self.period;
        if end <= start {
            return None;
        }
        self.current = end;

        Some(TileBounds {
            start,
            end,
            texture_size: self.texture_size,
            redraw: false,
        })
    }
}

/// Tile sequence for one axis.
#[derive(Debug, Clone)]
pub enum AxisTiles {
    Unwrapped(UnwrappedTiles),
    ZoomedIn(ZoomedInTiles),
    ZoomedOut(ZoomedOutTiles),
}

impl AxisTiles {
    pub fn strategy(&self) -> TileStrategy {
        match self {
            AxisTiles::Unwrapped(_) => TileStrategy::Unwrapped,
            AxisTiles::ZoomedIn(_) => TileStrategy::ZoomedIn,
            AxisTiles::ZoomedOut(_) => TileStrategy::ZoomedOut,
        }
    }
}

impl Iterator for AxisTiles {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        match self {
            AxisTiles::Unwrapped(it) => it.next(),
            AxisTiles::ZoomedIn(it) => it.next(),
            AxisTiles::ZoomedOut(it) => it.next(),
        }
    }
}

/// Picks the tiling for `axis` drawn `bounds_size` pixels long.
pub fn tiles(axis: &Axis1D, bounds_size: u32) -> AxisTiles {
    match TileStrategy::for_axis(axis) {
        TileStrategy::Unwrapped => AxisTiles::Unwrapped(UnwrappedTiles::new(axis, bounds_size)),
        TileStrategy::ZoomedIn => AxisTiles::ZoomedIn(ZoomedInTiles::new(axis, bounds_size)),
        TileStrategy::ZoomedOut => AxisTiles::ZoomedOut(ZoomedOutTiles::new(axis, bounds_size)),
    }
}

// ── canonical pieces ──────────────────────────────────────────────────────

/// Part of a tile inside a single period, moved into the wrap range.
///
/// `pixel_start..pixel_end` is where the piece lands inside the tile
/// texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalPiece {
    pub start: f64,
    pub end: f64,
    pub pixel_start: u32,
    pub pixel_end: u32,
}

impl CanonicalPiece {
    #[inline]
    pub fn pixels(&self) -> u32 {
        self.pixel_end - self.pixel_start
    }

    /// Axis a painter should draw this piece with.
    pub fn axis(&self, outer: &Axis1D) -> Axis1D {
        Axis1D::new(self.start, self.end)
            .with_wrap(outer.wrap())
            .with_size(self.pixels())
    }
}

/// Splits `tile` at every seam it crosses.
///
/// Pixel spans are contiguous and cover `0..texture_size`; pieces too thin
/// to own a pixel are dropped. A plain axis yields the tile unchanged.
pub fn canonical_pieces(axis: &Axis1D, tile: &TileBounds, texture_size: u32) -> Vec<CanonicalPiece> {
    let span = tile.span();
    let Some((wrap, period)) = axis.wrap().zip(axis.wrap_span()) else {
        return vec![CanonicalPiece {
            start: tile.start,
            end: tile.end,
            pixel_start: 0,
            pixel_end: texture_size,
        }];
    };
    if !(span > 0.0) || texture_size == 0 {
        return Vec::new();
    }

    let to_pixel = |v: f64| {
        let px = ((v - tile.start) / span * texture_size as f64).round();
        (px.max(0.0) as u32).min(texture_size)
    };

    let mut pieces = Vec::new();
    let mut v = tile.start;
    let mut pixel = 0;

    while v < tile.end {
        let mut offset = axis.wrapped_mod(v);
        // Offsets within rounding of the next seam belong to it.
        if period - offset <= period * 1e-9 {
            offset = 0.0;
        }

        let seg_end = tile.end.min(v + (period - offset));
        if seg_end <= v {
            break;
        }

        let pixel_end = if seg_end >= tile.end { texture_size } else { to_pixel(seg_end) };
        if pixel_end > pixel {
            let start = wrap.min + offset;
            pieces.push(CanonicalPiece {
                start,
                end: start + (seg_end - v),
                pixel_start: pixel,
                pixel_end,
            });
            pixel = pixel_end;
        }

        v = seg_end;
    }

    // A dropped trailing sliver leaves its pixels to the last piece.
    if let Some(last) = pieces.last_mut() {
        last.pixel_end = texture_size;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::WrapRange;

    fn degrees(min: f64, max: f64) -> Axis1D {
        Axis1D::wrapped(min, max, WrapRange::new(0.0, 360.0).unwrap())
    }

    fn ranges(it: impl Iterator<Item = TileBounds>) -> Vec<(f64, f64)> {
        it.map(|t| (t.start, t.end)).collect()
    }

    // ── strategy ──────────────────────────────────────────────────────────

    #[test]
    fn plain_axis_is_one_stable_tile() {
        let axis = Axis1D::new(-5.0, 12.0);
        let tiles: Vec<_> = tiles(&axis, 300).collect();
        assert_eq!(
            tiles,
            vec![TileBounds { start: -5.0, end: 12.0, texture_size: 300, redraw: false }]
        );
    }

    #[test]
    fn exactly_two_periods_is_zoomed_out() {
        assert_eq!(tiles(&degrees(0.0, 720.0), 100).strategy(), TileStrategy::ZoomedOut);
        assert_eq!(tiles(&degrees(0.0, 719.9), 100).strategy(), TileStrategy::ZoomedIn);
    }

    // ── zoomed-in ─────────────────────────────────────────────────────────

    #[test]
    fn zoomed_in_without_seam_is_one_tile() {
        let tiles: Vec<_> = tiles(&degrees(10.0, 200.0), 640).collect();
        assert_eq!(
            tiles,
            vec![TileBounds { start: 10.0, end: 200.0, texture_size: 640, redraw: true }]
        );
    }

    #[test]
    fn zoomed_in_ending_on_seam_is_one_tile() {
        let tiles: Vec<_> = tiles(&degrees(300.0, 360.0), 640).collect();
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn zoomed_in_split_at_seam() {
        let tiles: Vec<_> = tiles(&degrees(350.0, 370.0), 800).collect();
        assert_eq!(ranges(tiles.iter().copied()), vec![(350.0, 360.0), (360.0, 370.0)]);
        assert!(tiles.iter().all(|t| t.redraw));
        assert_eq!(tiles[0].end, tiles[1].start);
    }

    #[test]
    fn zoomed_in_texture_split_rounds_up() {
        let tiles: Vec<_> = ZoomedInTiles::new(&degrees(350.0, 380.0), 101).collect();
        assert_eq!(tiles.len(), 2);
        // 10/30 and 20/30 of 101 px.
        assert_eq!(tiles[0].texture_size, 34);
        assert_eq!(tiles[1].texture_size, 68);
        assert!(tiles[0].texture_size + tiles[1].texture_size >= 101);
    }

    #[test]
    fn zoomed_in_split_from_negative_min() {
        let tiles: Vec<_> = tiles(&degrees(-30.0, 100.0), 130).collect();
        assert_eq!(ranges(tiles.into_iter()), vec![(-30.0, 0.0), (0.0, 100.0)]);
    }

    // ── zoomed-out ────────────────────────────────────────────────────────

    #[test]
    fn zoomed_out_unaligned_min_starts_one_period_early() {
        let tiles: Vec<_> = ZoomedOutTiles::new(&degrees(-10.0, 370.0), 800).collect();
        assert_eq!(
            ranges(tiles.iter().copied()),
            vec![(-370.0, -10.0), (-10.0, 350.0), (350.0, 710.0)]
        );
        assert!(tiles.iter().all(|t| !t.redraw && t.texture_size == 800));
    }

    #[test]
    fn zoomed_out_aligned_min_starts_at_min() {
        let tiles: Vec<_> = tiles(&degrees(-360.0, 720.0), 500).collect();
        assert_eq!(
            ranges(tiles.into_iter()),
            vec![(-360.0, 0.0), (0.0, 360.0), (360.0, 720.0)]
        );
    }

    #[test]
    fn zoomed_out_tiles_are_contiguous_periods() {
        let tiles: Vec<_> = tiles(&degrees(17.0, 1500.0), 500).collect();
        for pair in tiles.windows(2) {
            assert_eq!(pair[1].start, pair[0].end);
            assert_eq!(pair[0].end, pair[0].start + 360.0);
        }
        let last = tiles.last().unwrap();
        assert!(last.start < 1500.0 && last.end >= 1500.0);
    }

    #[test]
    fn zoomed_out_stops_on_unbounded_max() {
        let axis = degrees(0.0, f64::INFINITY);
        assert_eq!(tiles(&axis, 800).strategy(), TileStrategy::ZoomedOut);
        assert_eq!(tiles(&axis, 800).take(16).count(), 0);
        assert_eq!(tiles(&degrees(f64::NEG_INFINITY, 10.0), 800).take(16).count(), 0);
    }

    // ── canonical pieces ──────────────────────────────────────────────────

    #[test]
    fn tile_inside_one_period_is_one_piece() {
        let axis = degrees(400.0, 450.0);
        let tile = TileBounds { start: 400.0, end: 450.0, texture_size: 50, redraw: true };
        let pieces = canonical_pieces(&axis, &tile, 50);
        assert_eq!(
            pieces,
            vec![CanonicalPiece { start: 40.0, end: 90.0, pixel_start: 0, pixel_end: 50 }]
        );
    }

    #[test]
    fn full_period_tile_splits_at_seam() {
        let axis = degrees(-10.0, 1000.0);
        let tile = TileBounds { start: -10.0, end: 350.0, texture_size: 360, redraw: false };
        let pieces = canonical_pieces(&axis, &tile, 360);
        assert_eq!(
            pieces,
            vec![
                CanonicalPiece { start: 350.0, end: 360.0, pixel_start: 0, pixel_end: 10 },
                CanonicalPiece { start: 0.0, end: 350.0, pixel_start: 10, pixel_end: 360 },
            ]
        );
    }

    #[test]
    fn pieces_cover_texture_without_gaps() {
        let axis = degrees(5.0, 1400.0);
        let tile = TileBounds { start: 5.0, end: 1100.0, texture_size: 997, redraw: true };
        let pieces = canonical_pieces(&axis, &tile, 997);

        assert_eq!(pieces.first().unwrap().pixel_start, 0);
        assert_eq!(pieces.last().unwrap().pixel_end, 997);
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].pixel_end, pair[1].pixel_start);
        }
        for p in &pieces {
            assert!(p.start >= 0.0 && p.end <= 360.0 && p.end > p.start);
        }
    }

    #[test]
    fn plain_axis_piece_is_the_tile() {
        let axis = Axis1D::new(3.0, 9.0);
        let tile = TileBounds { start: 3.0, end: 9.0, texture_size: 12, redraw: false };
        let pieces = canonical_pieces(&axis, &tile, 12);
        assert_eq!(
            pieces,
            vec![CanonicalPiece { start: 3.0, end: 9.0, pixel_start: 0, pixel_end: 12 }]
        );
    }

    #[test]
    fn piece_axis_keeps_wrap_and_pixel_size() {
        let axis = degrees(0.0, 720.0);
        let piece = CanonicalPiece { start: 10.0, end: 20.0, pixel_start: 4, pixel_end: 9 };
        let a = piece.axis(&axis);
        assert_eq!((a.min(), a.max(), a.size_pixels()), (10.0, 20.0, 5));
        assert_eq!(a.wrap_span(), Some(360.0));
        assert!(a.is_initialized());
    }
}
