use thiserror::Error;

use crate::device::ContextError;

/// Errors raised by the rendering core.
///
/// Contract violations (`ConcurrentMap`, `NotMapped`, `WindowTooLarge`,
/// `Disposed`) indicate caller misuse and are reported immediately. Device
/// capability shortfalls never show up here; they are logged and rendering
/// continues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer is already mapped; it must be sealed before being mapped again")]
    ConcurrentMap,

    #[error("buffer is not currently mapped")]
    NotMapped,

    #[error("a {0}-byte window does not fit in a device buffer")]
    WindowTooLarge(u64),

    #[error("offscreen target has been disposed")]
    Disposed,

    #[error("mapped range cannot be viewed as the requested type: {0}")]
    Cast(bytemuck::PodCastError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// Failure reported by a host-supplied painter or listener.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
