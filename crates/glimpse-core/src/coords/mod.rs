//! Pixel-space geometry shared by the compositor and backends.
//!
//! Convention (GL style):
//! - device pixels
//! - origin bottom-left
//! - +X right, +Y up
//!
//! Backends with a top-left framebuffer origin flip Y when they convert to
//! their own viewport or NDC space.

mod bounds;
mod rect;

pub use bounds::Bounds;
pub use rect::{Rect, Vec2};
