//! GPU device abstraction.
//!
//! This module is responsible for:
//! - the [`GlDevice`] trait: buffer, texture, renderbuffer and framebuffer
//!   primitives the core algorithms consume
//! - the [`GlContext`] trait and scoped context switching
//!
//! Backends implement `GlDevice`; the core never talks to a graphics API
//! directly.

mod context;
mod gl;

pub use context::{
    claim, current, relinquish, with_current, with_offscreen, ContextError, ContextId,
    ContextScope, GlContext, TrackedContext,
};
pub use gl::{
    Attachment, BufferTarget, BufferUsage, FramebufferStatus, GlDevice, RenderbufferFormat,
};
