//! Binary codec: append-only writer with relocations, bounded reader, and the
//! zero-copy open-addressing map view used by the schema file.
//!
//! Records are written in their in-memory little-endian layout, padded to
//! their natural alignment relative to the start of the buffer. Readers mirror
//! the padding and never fail: reads past the end yield zeroed values.

pub mod hash_view;
pub mod reader;
pub mod writer;

pub use hash_view::{build_buckets, Bucket, EntryLayout, HashView, MapHeader, RelocatedArray};
pub use reader::{Reader, Span};
pub use writer::SerializationBuffer;

#[cfg(target_endian = "big")]
compile_error!("the schema wire format is little-endian; big-endian targets are not supported");
