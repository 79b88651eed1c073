//! Glimpse rendering core.
//!
//! This crate owns the backend-independent pieces of wrapped-axis plotting:
//! axes, tiling of periodic data space, streaming buffers, offscreen render
//! targets, context switching and the painter composition model. GPU access
//! goes through the [`device::GlDevice`] trait so the algorithms can run on
//! any backend (see `glimpse-wgpu`) or against a recording device in tests.

pub mod axis;
pub mod buffer;
pub mod coords;
pub mod device;
pub mod error;
pub mod fbo;
pub mod logging;
pub mod painter;
pub mod wrapped;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use error::{Error, Result};
