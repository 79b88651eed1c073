//! Offscreen render targets.

mod simple;

pub use simple::{FboConfig, FboListener, ListenerId, SimpleFrameBuffer};
