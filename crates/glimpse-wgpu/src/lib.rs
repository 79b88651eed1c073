//! wgpu backend for the Glimpse rendering core.
//!
//! [`WgpuDevice`] implements [`glimpse_core::device::GlDevice`] over a wgpu
//! device and queue, so wrapped painters, offscreen framebuffers and
//! streaming buffers run unchanged on any wgpu backend. [`LineStripPainter`]
//! is a minimal data painter built on top of it.

mod device;
mod gpu;
mod lines;
mod quad;
mod target;

#[cfg(test)]
mod wgsl_tests;

pub use device::{BufferKey, FramebufferKey, PassResources, RenderbufferKey, TextureKey, WgpuDevice};
pub use gpu::{GpuInit, HeadlessGpu};
pub use lines::LineStripPainter;
pub use quad::QuadCompositor;
pub use target::{scissor_rect, to_clip, DefaultTarget};
