//! Zero-copy view over a serialized Robin-Hood hash map.
//!
//! A sparse map on the wire is a header pair `[bucket_count][value_count]`,
//! followed somewhere later in the stream by the dense value array
//! (`(key, payload)` records in insertion order) and then the bucket array.
//!
//! Each bucket is `{dist_and_fingerprint, value_index}`. The low 8 bits of
//! `dist_and_fingerprint` hold the fingerprint (low byte of the key hash), the
//! upper 24 bits hold the probe distance plus one, so an empty bucket is 0.
//! The home bucket is the top `log2(bucket_count)` bits of the hash. Lookups
//! walk forward from the home bucket and stop as soon as the probe's own
//! `dist_and_fingerprint` exceeds the bucket's (Robin-Hood invariant).
//! [`build_buckets`] places entries with the same algorithm, so the bucket
//! bytes written by a schema compiler are exactly what [`HashView::find`] expects.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::{Pod, Zeroable};

use super::reader::{Reader, Span};

/// Increment applied to `dist_and_fingerprint` per probe step.
pub const DIST_INC: u32 = 1 << 8;
const FINGERPRINT_MASK: u64 = 0xFF;
const MIN_BUCKETS: usize = 4;

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Per-map header, written ahead of the payload block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MapHeader {
    pub bucket_count: u32,
    pub value_count: u32,
}

/// One open-addressing bucket.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Bucket {
    pub dist_and_fingerprint: u32,
    pub value_index: u32,
}

/// `(count, offset)` pair pointing at a relocated array elsewhere in the buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RelocatedArray {
    pub count: u32,
    pub offset: u32,
}

impl RelocatedArray {
    /// Resolve against the whole serialized buffer.
    pub fn resolve<'a, T: Pod>(self, buffer: &'a [u8]) -> Span<'a, T> {
        if self.offset == 0 {
            return Span::empty();
        }
        Reader::at(buffer, self.offset as usize).read_fixed(self.count as usize)
    }

    /// Resolve as raw bytes.
    pub fn bytes(self, buffer: &[u8]) -> &[u8] {
        self.resolve::<u8>(buffer).as_bytes()
    }
}

/// Byte layout of one `(key: u32, value: V)` record in the dense value array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryLayout {
    /// Offset of the value within the record.
    pub value_offset: usize,
    /// Distance between consecutive records.
    pub stride: usize,
    /// Alignment of the first record.
    pub align: usize,
}

impl EntryLayout {
    /// Layout for payload type `V`.
    pub const fn of<V: Pod>() -> Self {
        let align = if align_of::<V>() > 4 { align_of::<V>() } else { 4 };
        let value_offset = round_up(4, align_of::<V>());
        let stride = round_up(value_offset + size_of::<V>(), align);
        Self {
            value_offset,
            stride,
            align,
        }
    }
}

const fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// 64-bit multiply-fold mix of a `u32` key.
pub fn hash_key(key: u32) -> u64 {
    let product = u128::from(key).wrapping_add(0x2d35_8dcc_aa6c_78a5) * 0x8bb8_4b93_962e_acc9;
    ((product >> 64) as u64) ^ (product as u64)
}

fn dist_and_fingerprint_from_hash(hash: u64) -> u32 {
    DIST_INC | (hash & FINGERPRINT_MASK) as u32
}

fn home_bucket(hash: u64, bucket_count: usize) -> usize {
    let shifts = 64 - bucket_count.trailing_zeros();
    hash.checked_shr(shifts).unwrap_or(0) as usize
}

/// Number of buckets a map with `value_count` entries is written with.
pub fn bucket_count_for(value_count: usize) -> usize {
    if value_count == 0 {
        return 0;
    }
    // max load factor 0.8
    let needed = (value_count * 5).div_ceil(4);
    needed.next_power_of_two().max(MIN_BUCKETS)
}

/// Build the bucket array for `keys`, in dense-array order.
///
/// Keys must be unique; a repeated key keeps its first position.
pub fn build_buckets(keys: impl IntoIterator<Item = u32>) -> Vec<Bucket> {
    let keys: Vec<u32> = keys.into_iter().collect();
    let count = bucket_count_for(keys.len());
    let mut buckets = vec![Bucket::default(); count];
    let mask = count.wrapping_sub(1);

    'insert: for (value_index, &key) in keys.iter().enumerate() {
        let hash = hash_key(key);
        let mut daf = dist_and_fingerprint_from_hash(hash);
        let mut idx = home_bucket(hash, count);

        while daf <= buckets[idx].dist_and_fingerprint {
            let existing = buckets[idx];
            if existing.dist_and_fingerprint == daf && keys[existing.value_index as usize] == key {
                continue 'insert;
            }
            daf += DIST_INC;
            idx = (idx + 1) & mask;
        }

        let mut carried = Bucket {
            dist_and_fingerprint: daf,
            value_index: value_index as u32,
        };
        while buckets[idx].dist_and_fingerprint != 0 {
            std::mem::swap(&mut carried, &mut buckets[idx]);
            carried.dist_and_fingerprint += DIST_INC;
            idx = (idx + 1) & mask;
        }
        buckets[idx] = carried;
    }
    buckets
}

// ---------------------------------------------------------------------------
// HashView
// ---------------------------------------------------------------------------

/// Read-only map view decoded lazily from serialized bytes.
pub struct HashView<'a, V> {
    values: &'a [u8],
    value_count: usize,
    buckets: Span<'a, Bucket>,
    layout: EntryLayout,
    _marker: PhantomData<V>,
}

impl<'a, V: Pod> HashView<'a, V> {
    /// A view with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self {
            values: &[],
            value_count: 0,
            buckets: Span::empty(),
            layout: EntryLayout::of::<V>(),
            _marker: PhantomData,
        }
    }

    /// Consume the value array and bucket array described by `header`.
    ///
    /// A malformed header (non power-of-two bucket count, truncated arrays)
    /// yields an empty view.
    pub fn read(reader: &mut Reader<'a>, header: MapHeader) -> Self {
        let layout = EntryLayout::of::<V>();
        let value_count = header.value_count as usize;
        let bucket_count = header.bucket_count as usize;

        reader.align_to(layout.align);
        let values = reader.read_bytes(value_count.saturating_mul(layout.stride));
        let buckets = reader.read_fixed::<Bucket>(bucket_count);

        let intact = values.len() == value_count.saturating_mul(layout.stride)
            && buckets.len() == bucket_count
            && (bucket_count == 0 || bucket_count.is_power_of_two());
        if !intact {
            log::warn!(
                "discarding truncated sparse map ({value_count} values, {bucket_count} buckets)"
            );
            return Self::empty();
        }
        Self {
            values,
            value_count,
            buckets,
            layout,
            _marker: PhantomData,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.value_count
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.value_count == 0
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The `index`-th record of the dense value array.
    pub fn entry(&self, index: usize) -> Option<(u32, V)> {
        if index >= self.value_count {
            return None;
        }
        let start = index * self.layout.stride;
        let record = &self.values[start..start + self.layout.stride];
        let key = bytemuck::pod_read_unaligned::<u32>(&record[..4]);
        let value_start = self.layout.value_offset;
        let value = bytemuck::pod_read_unaligned::<V>(&record[value_start..value_start + size_of::<V>()]);
        Some((key, value))
    }

    /// Look up `key`.
    pub fn find(&self, key: u32) -> Option<V> {
        let count = self.buckets.len();
        if count == 0 {
            return None;
        }
        let mask = count - 1;
        let hash = hash_key(key);
        let mut daf = dist_and_fingerprint_from_hash(hash);
        let mut idx = home_bucket(hash, count);

        for _ in 0..count {
            let bucket = self.buckets.get(idx)?;
            if bucket.dist_and_fingerprint == daf {
                if let Some((stored, value)) = self.entry(bucket.value_index as usize) {
                    if stored == key {
                        return Some(value);
                    }
                }
            } else if daf > bucket.dist_and_fingerprint {
                return None;
            }
            daf += DIST_INC;
            idx = (idx + 1) & mask;
        }
        None
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: u32) -> bool {
        self.find(key).is_some()
    }

    /// Look up `key`, falling back to the zero value.
    pub fn get_or_zero(&self, key: u32) -> V {
        self.find(key).unwrap_or_else(V::zeroed)
    }

    /// Iterate entries in dense-array order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, V)> + '_ {
        (0..self.value_count).filter_map(move |i| self.entry(i))
    }
}

impl<V> Clone for HashView<'_, V> {
    fn clone(&self) -> Self {
        Self {
            values: self.values,
            value_count: self.value_count,
            buckets: self.buckets,
            layout: self.layout,
            _marker: PhantomData,
        }
    }
}

impl<V: Pod> fmt::Debug for HashView<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashView")
            .field("values", &self.value_count)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::SerializationBuffer;

    fn serialize<V: Pod>(entries: &[(u32, V)]) -> Vec<u8> {
        let buckets = build_buckets(entries.iter().map(|(k, _)| *k));
        let mut buf = SerializationBuffer::new();
        buf.write(&MapHeader {
            bucket_count: buckets.len() as u32,
            value_count: entries.len() as u32,
        });
        buf.write_map_values(entries);
        buf.write_map_buckets(&buckets);
        buf.finalize()
    }

    fn view<V: Pod>(bytes: &[u8]) -> HashView<'_, V> {
        let mut reader = Reader::new(bytes);
        let header = reader.read::<MapHeader>();
        HashView::read(&mut reader, header)
    }

    #[test]
    fn entry_layout_matches_sequential_writes() {
        assert_eq!(
            EntryLayout::of::<u8>(),
            EntryLayout { value_offset: 4, stride: 8, align: 4 }
        );
        assert_eq!(
            EntryLayout::of::<u64>(),
            EntryLayout { value_offset: 8, stride: 16, align: 8 }
        );
        assert_eq!(
            EntryLayout::of::<[u16; 3]>(),
            EntryLayout { value_offset: 4, stride: 12, align: 4 }
        );
    }

    #[test]
    fn finds_present_keys_and_misses_absent() {
        let bytes = serialize(&[(3u32, 300u32), (7, 700)]);
        let map = view::<u32>(&bytes);
        assert_eq!(map.find(3), Some(300));
        assert_eq!(map.find(7), Some(700));
        assert_eq!(map.find(5), None);
        assert_eq!(map.get_or_zero(5), 0);
    }

    #[test]
    fn many_keys_with_collisions() {
        let entries: Vec<(u32, u64)> = (0..500u32).map(|k| (k * 7 + 1, u64::from(k) * 3)).collect();
        let bytes = serialize(&entries);
        let map = view::<u64>(&bytes);
        assert_eq!(map.len(), 500);
        for (key, value) in &entries {
            assert_eq!(map.find(*key), Some(*value), "key {key}");
        }
        for absent in (0..500u32).map(|k| k * 7 + 2) {
            assert!(!map.contains_key(absent));
        }
    }

    #[test]
    fn bucket_probe_distances_respect_robin_hood_order() {
        let keys: Vec<u32> = (0..64).collect();
        let buckets = build_buckets(keys.iter().copied());
        let occupied = buckets.iter().filter(|b| b.dist_and_fingerprint != 0).count();
        assert_eq!(occupied, keys.len());
        // Every occupied bucket's distance is consistent with its home slot.
        let count = buckets.len();
        for (idx, bucket) in buckets.iter().enumerate() {
            if bucket.dist_and_fingerprint == 0 {
                continue;
            }
            let key = keys[bucket.value_index as usize];
            let home = home_bucket(hash_key(key), count);
            let dist = (bucket.dist_and_fingerprint >> 8) as usize - 1;
            assert_eq!((home + dist) % count, idx);
        }
    }

    #[test]
    fn duplicate_keys_keep_first_position() {
        let buckets = build_buckets([9, 9, 4]);
        let occupied: Vec<u32> = buckets
            .iter()
            .filter(|b| b.dist_and_fingerprint != 0)
            .map(|b| b.value_index)
            .collect();
        assert_eq!(occupied.len(), 2);
        assert!(occupied.contains(&0));
        assert!(occupied.contains(&2));
    }

    #[test]
    fn empty_map_has_no_buckets() {
        assert_eq!(bucket_count_for(0), 0);
        let bytes = serialize::<u32>(&[]);
        let map = view::<u32>(&bytes);
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), 0);
        assert_eq!(map.find(0), None);
    }

    #[test]
    fn bucket_counts_are_powers_of_two_under_load() {
        assert_eq!(bucket_count_for(1), 4);
        assert_eq!(bucket_count_for(4), 8);
        assert_eq!(bucket_count_for(8), 16);
        assert_eq!(bucket_count_for(100), 128);
    }

    #[test]
    fn truncated_map_degrades_to_empty() {
        let bytes = serialize(&[(1u32, 10u32), (2, 20), (3, 30)]);
        let map = view::<u32>(&bytes[..bytes.len() - 4]);
        assert!(map.is_empty());
        assert_eq!(map.find(1), None);
    }

    #[test]
    fn iter_follows_dense_order() {
        let bytes = serialize(&[(5u32, 1u16), (2, 2), (9, 3)]);
        let map = view::<u16>(&bytes);
        let collected: Vec<(u32, u16)> = map.iter().collect();
        assert_eq!(collected, vec![(5, 1), (2, 2), (9, 3)]);
    }

    #[test]
    fn relocated_array_payloads() {
        let entries = vec![(4u32, vec![1u32, 2, 3]), (8, vec![9])];
        let buckets = build_buckets(entries.iter().map(|(k, _)| *k));
        let mut buf = SerializationBuffer::new();
        buf.write(&MapHeader {
            bucket_count: buckets.len() as u32,
            value_count: entries.len() as u32,
        });
        buf.write_relocated_map_values(&entries);
        buf.write_map_buckets(&buckets);
        let bytes = buf.finalize();

        let mut reader = Reader::new(&bytes);
        let header = reader.read::<MapHeader>();
        let map: HashView<'_, RelocatedArray> = HashView::read(&mut reader, header);
        let four = map.find(4).unwrap();
        assert_eq!(four.resolve::<u32>(&bytes).to_vec(), vec![1, 2, 3]);
        assert_eq!(map.find(8).unwrap().resolve::<u32>(&bytes).to_vec(), vec![9]);
        assert!(map.find(6).is_none());
    }
}
