//! Bounded reader over a serialized byte slice.
//!
//! Every read is total: running past the end yields zeroed records and empty
//! spans instead of errors, so truncated schema files degrade to defaults.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A read-only array of `T` records borrowed from serialized bytes.
///
/// Elements are decoded with unaligned reads, so a span may point anywhere in
/// a `Vec<u8>` regardless of the allocation's alignment.
pub struct Span<'a, T> {
    bytes: &'a [u8],
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> Span<'a, T> {
    /// An empty span.
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Wrap `bytes`; trailing bytes that do not form a whole record are ignored.
    pub fn new(bytes: &'a [u8]) -> Self {
        let size = size_of::<T>();
        let whole = if size == 0 { 0 } else { bytes.len() / size * size };
        Self {
            bytes: &bytes[..whole],
            _marker: PhantomData,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        match size_of::<T>() {
            0 => 0,
            size => self.bytes.len() / size,
        }
    }

    /// Whether the span holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<T> {
        let size = size_of::<T>();
        let start = index.checked_mul(size)?;
        let end = start.checked_add(size)?;
        if size == 0 || end > self.bytes.len() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&self.bytes[start..end]))
    }

    /// Iterate records in order.
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let bytes = self.bytes;
        let size = size_of::<T>().max(1);
        bytes
            .chunks_exact(size)
            .map(|chunk| bytemuck::pod_read_unaligned(chunk))
    }

    /// Copy the records out.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// The raw bytes backing the span.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<T> Clone for Span<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Span<'_, T> {}

impl<T: Pod> fmt::Debug for Span<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Cursor over serialized bytes that mirrors [`SerializationBuffer`](super::SerializationBuffer) padding.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    truncated: bool,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::at(bytes, 0)
    }

    /// Start reading at `pos`, clamped to the end of `bytes`.
    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos: pos.min(bytes.len()),
            truncated: false,
        }
    }

    /// Current absolute position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Whether the cursor reached the end.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Whether any read so far came up short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// The whole underlying buffer, independent of the cursor.
    pub fn buffer(&self) -> &'a [u8] {
        self.bytes
    }

    /// Skip padding so the cursor is a multiple of `align`.
    pub fn align_to(&mut self, align: usize) {
        let rem = self.pos % align;
        if rem != 0 {
            self.pos = (self.pos + (align - rem)).min(self.bytes.len());
        }
    }

    /// Read one record; zeroed when fewer than `size_of::<T>()` bytes remain.
    pub fn read<T: Pod>(&mut self) -> T {
        self.align_to(align_of::<T>());
        let size = size_of::<T>();
        if self.remaining() < size {
            self.pos = self.bytes.len();
            self.truncated = true;
            return T::zeroed();
        }
        let value = bytemuck::pod_read_unaligned(&self.bytes[self.pos..self.pos + size]);
        self.pos += size;
        value
    }

    /// Read up to `count` records, clamped to what remains.
    pub fn read_fixed<T: Pod>(&mut self, count: usize) -> Span<'a, T> {
        self.align_to(align_of::<T>());
        let size = size_of::<T>();
        if size == 0 {
            return Span::empty();
        }
        let available = self.remaining() / size;
        if count > available {
            self.truncated = true;
        }
        let taken = count.min(available) * size;
        let span = Span::new(&self.bytes[self.pos..self.pos + taken]);
        self.pos += taken;
        span
    }

    /// Read a `u32` count, then that many records.
    pub fn read_variable<T: Pod>(&mut self) -> Span<'a, T> {
        let count = self.read::<u32>() as usize;
        self.read_fixed(count)
    }

    /// Take `len` raw bytes (clamped).
    pub fn read_bytes(&mut self, len: usize) -> &'a [u8] {
        let taken = len.min(self.remaining());
        self.truncated |= taken < len;
        let slice = &self.bytes[self.pos..self.pos + taken];
        self.pos += taken;
        slice
    }

    /// Follow a relocated offset; returns an exhausted reader when the
    /// offset is zero (never a valid target) or out of range.
    pub fn read_relocation(&mut self) -> Reader<'a> {
        let offset = self.read::<u32>() as usize;
        if offset == 0 {
            return Reader::at(self.bytes, self.bytes.len());
        }
        Reader::at(self.bytes, offset)
    }

    /// Bytes at an absolute `offset`, clamped to the buffer.
    pub fn bytes_at(&self, offset: usize, len: usize) -> &'a [u8] {
        let start = offset.min(self.bytes.len());
        let end = start.saturating_add(len).min(self.bytes.len());
        &self.bytes[start..end]
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("len", &self.bytes.len())
            .field("pos", &self.pos)
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
