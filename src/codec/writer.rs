//! Append-only serialization buffer with deferred relocations.

use std::fmt;
use std::mem::align_of;

use bytemuck::Pod;

use super::hash_view::{Bucket, EntryLayout, RelocatedArray};

type Relocation<'a> = Box<dyn FnOnce(&mut SerializationBuffer<'a>) + 'a>;

/// Growable output buffer.
///
/// `write_relocation` reserves a 4-byte forward reference whose payload is
/// emitted later by a callback. Pending relocations are resolved LIFO by
/// [`finalize`](Self::finalize): the most recently queued one first, and any
/// relocation queued from inside a callback before the older pending ones.
pub struct SerializationBuffer<'a> {
    bytes: Vec<u8>,
    pending: Vec<(usize, Relocation<'a>)>,
}

impl<'a> SerializationBuffer<'a> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of relocations not yet resolved.
    pub fn pending_relocations(&self) -> usize {
        self.pending.len()
    }

    /// Zero-pad the buffer so its length is a multiple of `align`.
    pub fn pad_to(&mut self, align: usize) {
        let rem = self.bytes.len() % align;
        if rem != 0 {
            let padded = self.bytes.len() + (align - rem);
            self.bytes.resize(padded, 0);
        }
    }

    /// Append one record at its natural alignment.
    pub fn write<T: Pod>(&mut self, value: &T) {
        self.pad_to(align_of::<T>());
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
    }

    /// Append `values` as a contiguous array, without a count.
    pub fn write_fixed<T: Pod>(&mut self, values: &[T]) {
        self.pad_to(align_of::<T>());
        self.bytes.extend_from_slice(bytemuck::cast_slice(values));
    }

    /// Append a `u32` element count followed by the array.
    pub fn write_variable<T: Pod>(&mut self, values: &[T]) {
        self.write(&len_u32(values.len()));
        self.write_fixed(values);
    }

    /// Reserve a 4-byte offset slot and defer `payload` until [`finalize`](Self::finalize).
    ///
    /// When the relocation is resolved the slot receives the buffer length at
    /// that moment, then `payload` runs and appends the referenced data.
    pub fn write_relocation<F>(&mut self, payload: F)
    where
        F: FnOnce(&mut SerializationBuffer<'a>) + 'a,
    {
        self.pad_to(align_of::<u32>());
        let at = self.bytes.len();
        self.bytes.extend_from_slice(&[0; 4]);
        self.pending.push((at, Box::new(payload)));
    }

    /// Write `(count, relocated offset)` for `values`, whose elements land at the
    /// relocation target.
    pub fn write_relocated_array<T: Pod>(&mut self, values: &'a [T]) {
        self.write(&len_u32(values.len()));
        self.write_relocation(move |buf| buf.write_fixed(values));
    }

    /// Write the dense value array of a sparse map.
    ///
    /// Each record is `key: u32` followed by `V` at [`EntryLayout::of::<V>`] offsets.
    pub fn write_map_values<V: Pod>(&mut self, entries: &[(u32, V)]) {
        let layout = EntryLayout::of::<V>();
        self.pad_to(layout.align);
        for (key, value) in entries {
            self.write(key);
            self.write(value);
            self.pad_to(layout.align);
        }
    }

    /// Write the dense value array of a map whose payloads are relocated arrays.
    pub fn write_relocated_map_values<T: Pod>(&mut self, entries: &'a [(u32, Vec<T>)]) {
        let layout = EntryLayout::of::<RelocatedArray>();
        self.pad_to(layout.align);
        for (key, values) in entries {
            self.write(key);
            self.write_relocated_array(values.as_slice());
        }
    }

    /// Write a bucket array produced by [`build_buckets`](super::build_buckets).
    pub fn write_map_buckets(&mut self, buckets: &[Bucket]) {
        self.write_fixed(buckets);
    }

    /// Resolve every pending relocation and return the finished bytes.
    pub fn finalize(mut self) -> Vec<u8> {
        while let Some((at, payload)) = self.pending.pop() {
            let target = len_u32(self.bytes.len());
            self.bytes[at..at + 4].copy_from_slice(&target.to_le_bytes());
            payload(&mut self);
        }
        self.bytes
    }
}

impl Default for SerializationBuffer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SerializationBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationBuffer")
            .field("len", &self.bytes.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Lengths on the wire are `u32`; larger inputs are a schema authoring bug.
fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ===========================================================================
// Tests
// ===========================================================================
