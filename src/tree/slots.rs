//! Per-instance variable slots.
//!
//! A type's slot table names cells by `slot_id` and places each at a word
//! offset in the node's [`LocalStorage`]. Cell payloads come from the closed
//! [`DataType`] set, so construction and destruction are plain Rust values.

use super::allocator::AllocError;
use super::node::NodeId;
use crate::codec::Span;
use crate::schema::{SlotDefinition, TypeId};

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

/// Payload type of a variable slot; the schema stores [`DataType::id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Eight uninterpreted bytes.
    Raw,
    Int,
    Float,
    Bool,
    Text,
    NodeList,
    NodeRef,
    Bytes,
}

impl DataType {
    pub const ALL: [DataType; 8] = [
        DataType::Raw,
        DataType::Int,
        DataType::Float,
        DataType::Bool,
        DataType::Text,
        DataType::NodeList,
        DataType::NodeRef,
        DataType::Bytes,
    ];

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Storage footprint in 8-byte words.
    pub fn words(self) -> u16 {
        match self {
            DataType::Text | DataType::NodeList | DataType::Bytes => 3,
            _ => 1,
        }
    }

    /// The constructed (default) value.
    pub fn construct(self) -> SlotValue {
        match self {
            DataType::Raw => SlotValue::Raw(0),
            DataType::Int => SlotValue::Int(0),
            DataType::Float => SlotValue::Float(0.0),
            DataType::Bool => SlotValue::Bool(false),
            DataType::Text => SlotValue::Text(String::new()),
            DataType::NodeList => SlotValue::NodeList(Vec::new()),
            DataType::NodeRef => SlotValue::NodeRef(None),
            DataType::Bytes => SlotValue::Bytes(Vec::new()),
        }
    }

    /// A value initialized from an inline 8-byte default.
    ///
    /// Heap-backed types have no inline form and fall back to [`construct`](Self::construct).
    pub fn from_bits(self, bits: u64) -> SlotValue {
        match self {
            DataType::Raw => SlotValue::Raw(bits),
            DataType::Int => SlotValue::Int(bits as i64),
            DataType::Float => SlotValue::Float(f64::from_bits(bits)),
            DataType::Bool => SlotValue::Bool(bits != 0),
            other => other.construct(),
        }
    }
}

// ---------------------------------------------------------------------------
// SlotValue
// ---------------------------------------------------------------------------

/// One storage cell. Cells covered by a multi-word slot stay `Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SlotValue {
    #[default]
    Empty,
    Raw(u64),
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    NodeList(Vec<NodeId>),
    NodeRef(Option<NodeId>),
    Bytes(Vec<u8>),
}

/// Typed access to a [`SlotValue`] payload.
pub trait SlotPayload {
    fn from_slot(value: &SlotValue) -> Option<&Self>;
    fn from_slot_mut(value: &mut SlotValue) -> Option<&mut Self>;
}

macro_rules! slot_payload {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl SlotPayload for $ty {
                fn from_slot(value: &SlotValue) -> Option<&Self> {
                    match value {
                        SlotValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_slot_mut(value: &mut SlotValue) -> Option<&mut Self> {
                    match value {
                        SlotValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

slot_payload! {
    Raw => u64,
    Int => i64,
    Float => f64,
    Bool => bool,
    Text => String,
    NodeList => Vec<NodeId>,
    NodeRef => Option<NodeId>,
    Bytes => Vec<u8>,
}

// ---------------------------------------------------------------------------
// LocalStorage
// ---------------------------------------------------------------------------

/// Variable storage of one node: exactly `variable_words` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStorage {
    cells: Vec<SlotValue>,
}

impl LocalStorage {
    /// Storage of `words` empty cells.
    pub fn with_words(words: usize) -> Self {
        Self {
            cells: vec![SlotValue::Empty; words],
        }
    }

    /// Build storage for `type_id` and run every slot initializer.
    pub fn construct(
        type_id: TypeId,
        slots: Span<'_, SlotDefinition>,
        words: usize,
    ) -> Result<Self, AllocError> {
        let mut storage = Self::with_words(words);
        storage.initialize(type_id, slots)?;
        Ok(storage)
    }

    /// Destruct every cell, then re-run the slot initializers in place.
    pub fn reconstruct(
        &mut self,
        type_id: TypeId,
        slots: Span<'_, SlotDefinition>,
        words: usize,
    ) -> Result<(), AllocError> {
        self.cells.clear();
        self.cells.resize(words, SlotValue::Empty);
        self.initialize(type_id, slots)
    }

    fn initialize(
        &mut self,
        type_id: TypeId,
        slots: Span<'_, SlotDefinition>,
    ) -> Result<(), AllocError> {
        let mut claimed = vec![false; self.cells.len()];
        for slot in slots.iter() {
            let data_type =
                DataType::from_id(slot.data_type).ok_or(AllocError::UnknownDataType {
                    type_id,
                    slot_id: slot.slot_id,
                    data_type: slot.data_type,
                })?;
            let start = usize::from(slot.offset);
            let end = start + usize::from(data_type.words());
            let overlaps = claimed.get(start..end).is_none_or(|span| span.iter().any(|c| *c));
            if overlaps {
                return Err(AllocError::InvalidSlotLayout {
                    type_id,
                    slot_id: slot.slot_id,
                });
            }
            claimed[start..end].fill(true);
            self.cells[start] = if slot.has_inline_default() {
                data_type.from_bits(slot.inline_default)
            } else {
                data_type.construct()
            };
        }
        Ok(())
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at word `offset`.
    pub fn cell(&self, offset: usize) -> Option<&SlotValue> {
        self.cells.get(offset)
    }

    pub fn cell_mut(&mut self, offset: usize) -> Option<&mut SlotValue> {
        self.cells.get_mut(offset)
    }
}

/// Word offset of `slot_id` in a slot table, if the type declares it.
pub fn slot_offset(slots: Span<'_, SlotDefinition>, slot_id: u32) -> Option<usize> {
    slots
        .iter()
        .find(|slot| slot.slot_id == slot_id)
        .map(|slot| usize::from(slot.offset))
}
