//! Rendering of periodically wrapping data.
//!
//! - [`tiles`] cuts each axis into tiles according to zoom level.
//! - [`canonical_pieces`] maps a tile back into the wrap range so painters
//!   only ever see data inside one period.
//! - [`FlatProjection`] places a rendered tile on the viewport.
//! - [`WrappedPainter`] drives all of the above through an offscreen target.

mod painter;
mod projection;
mod tiles;

pub use painter::{FrameStats, PaintPath, WrappedConfig, WrappedPainter};
pub use projection::FlatProjection;
pub use tiles::{
    canonical_pieces, tiles, AxisTiles, CanonicalPiece, TileBounds, TileStrategy, UnwrappedTiles,
    ZoomedInTiles, ZoomedOutTiles,
};
