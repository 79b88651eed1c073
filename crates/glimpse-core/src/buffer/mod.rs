//! Streaming device buffers.
//!
//! [`MappableBuffer`] hands out non-overlapping write windows inside a
//! growable device buffer, orphaning the storage when it runs out of room.
//! [`StreamCursor`] is the bookkeeping half of that, usable on its own by
//! backends that upload through a queue instead of mapping.

mod cursor;
mod mappable;

pub use cursor::{MAP_ALIGNMENT, Placement, StreamCursor};
pub use mappable::{BufferConfig, MappableBuffer};
