//! Editable project format: a flat linearization of [`SchemaDefinition`].
//!
//! No relocations and no hash tables: counts, the flat per-type arrays, then
//! explicit `(type id, value)` pair lists for every sparse property. Unlike
//! the runtime format, reading is strict and reports malformed input.

use std::path::Path;

use bytemuck::Pod;
use thiserror::Error;

use super::definition::{SchemaDefinition, TypeDefinition};
use super::records::{
    BackgroundDefinition, ColumnProperties, GridProperties, ImageInformation,
    InteractableDefinition, PageUiDefinitions, Point16, Rect16, SlotDefinition,
    TextInformation, WindowChild,
};
use super::registry::CallbackKind;
use crate::codec::{Reader, SerializationBuffer};
use crate::platform::FileSystem;

/// Leading bytes of a project file.
pub const PROJECT_MAGIC: [u8; 4] = *b"SUIP";
/// Current project format version.
pub const PROJECT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to read a schema or project file.
#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a project file (bad magic)")]
    BadMagic,

    #[error("unsupported project version {0}")]
    UnsupportedVersion(u32),

    #[error("project file is truncated")]
    Truncated,

    #[error("entry for type {key} but the project declares {type_count} types")]
    KeyOutOfRange { key: u32, type_count: usize },

    #[error("callback name for type {type_id} is not valid UTF-8")]
    InvalidName { type_id: u32 },
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn write_pairs<V: Pod>(buf: &mut SerializationBuffer<'_>, pairs: &[(u32, V)]) {
    buf.write(&(pairs.len() as u32));
    for (key, value) in pairs {
        buf.write(key);
        buf.write(value);
    }
}

fn write_lists<T: Pod>(buf: &mut SerializationBuffer<'_>, lists: &[(u32, &[T])]) {
    buf.write(&(lists.len() as u32));
    for (key, values) in lists {
        buf.write(key);
        buf.write_variable(values);
    }
}

fn column<T>(schema: &SchemaDefinition, f: impl Fn(&TypeDefinition) -> T) -> Vec<T> {
    schema.types.iter().map(f).collect()
}

fn pairs<V>(schema: &SchemaDefinition, f: impl Fn(&TypeDefinition) -> Option<V>) -> Vec<(u32, V)> {
    schema
        .types
        .iter()
        .enumerate()
        .filter_map(|(i, t)| f(t).map(|v| (i as u32, v)))
        .collect()
}

fn lists<'a, T>(
    schema: &'a SchemaDefinition,
    f: impl Fn(&'a TypeDefinition) -> &'a [T],
) -> Vec<(u32, &'a [T])> {
    schema
        .types
        .iter()
        .enumerate()
        .map(|(i, t)| (i as u32, f(t)))
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

/// Serialize `schema` to the project format.
pub fn write_project(schema: &SchemaDefinition) -> Vec<u8> {
    let mut buf = SerializationBuffer::new();
    buf.write_fixed(&PROJECT_MAGIC);
    buf.write(&PROJECT_VERSION);
    buf.write(&(schema.types.len() as u32));
    buf.write(&schema.sound_count);
    buf.write(&schema.brush_count);
    buf.write(&schema.icon_count);
    buf.write(&schema.image_count);

    buf.write_fixed(&column(schema, |t| t.icon_position));
    buf.write_fixed(&column(schema, |t| t.default_position));
    buf.write_fixed(&column(schema, |t| t.interactable));
    buf.write_fixed(&column(schema, |t| t.icon));
    buf.write_fixed(&column(schema, |t| t.class_id));
    buf.write_fixed(&column(schema, |t| t.behavior_flags));
    buf.write_fixed(&column(schema, |t| t.brushes.foreground));
    buf.write_fixed(&column(schema, |t| t.brushes.background));
    buf.write_fixed(&column(schema, |t| t.brushes.highlight));
    buf.write_fixed(&column(schema, |t| t.brushes.info));
    buf.write_fixed(&column(schema, |t| t.variable_words));
    buf.write_fixed(&column(schema, |t| t.background));

    write_lists(&mut buf, &lists(schema, |t| t.fixed_children.as_slice()));
    write_lists(&mut buf, &lists(schema, |t| t.window_children.as_slice()));
    write_lists(&mut buf, &lists(schema, |t| t.slots.as_slice()));

    write_pairs(&mut buf, &pairs(schema, |t| t.divider_index));
    write_pairs(&mut buf, &pairs(schema, |t| t.horizontal_orientation.map(u8::from)));
    write_pairs(&mut buf, &pairs(schema, |t| t.column_properties));
    write_pairs(&mut buf, &pairs(schema, |t| t.page_ui));
    write_pairs(&mut buf, &pairs(schema, |t| t.text_information));
    write_pairs(&mut buf, &pairs(schema, |t| t.interaction_sound));
    write_pairs(&mut buf, &pairs(schema, |t| t.image_information));
    write_pairs(&mut buf, &pairs(schema, |t| t.child_data_type));
    write_pairs(&mut buf, &pairs(schema, |t| t.grid_properties));

    for kind in CallbackKind::ALL {
        let names = lists(schema, |t| {
            t.callbacks[kind.index()].as_deref().map_or(&[][..], str::as_bytes)
        });
        write_lists(&mut buf, &names);
    }

    buf.finalize()
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

struct ProjectReader<'a> {
    reader: Reader<'a>,
    type_count: usize,
}

impl<'a> ProjectReader<'a> {
    fn check(&self) -> Result<(), SchemaFileError> {
        if self.reader.is_truncated() {
            return Err(SchemaFileError::Truncated);
        }
        Ok(())
    }

    fn flat<T: Pod>(&mut self) -> Result<Vec<T>, SchemaFileError> {
        let values = self.reader.read_fixed::<T>(self.type_count).to_vec();
        self.check()?;
        Ok(values)
    }

    fn key(&mut self) -> Result<usize, SchemaFileError> {
        let key = self.reader.read::<u32>();
        self.check()?;
        if key as usize >= self.type_count {
            return Err(SchemaFileError::KeyOutOfRange {
                key,
                type_count: self.type_count,
            });
        }
        Ok(key as usize)
    }

    fn count(&mut self) -> Result<usize, SchemaFileError> {
        let count = self.reader.read::<u32>() as usize;
        self.check()?;
        Ok(count)
    }

    fn pairs<V: Pod>(
        &mut self,
        types: &mut [TypeDefinition],
        mut apply: impl FnMut(&mut TypeDefinition, V),
    ) -> Result<(), SchemaFileError> {
        for _ in 0..self.count()? {
            let key = self.key()?;
            let value = self.reader.read::<V>();
            self.check()?;
            apply(&mut types[key], value);
        }
        Ok(())
    }

    fn lists<T: Pod>(
        &mut self,
        types: &mut [TypeDefinition],
        mut apply: impl FnMut(&mut TypeDefinition, u32, Vec<T>) -> Result<(), SchemaFileError>,
    ) -> Result<(), SchemaFileError> {
        for _ in 0..self.count()? {
            let key = self.key()?;
            let values = self.reader.read_variable::<T>().to_vec();
            self.check()?;
            apply(&mut types[key], key as u32, values)?;
        }
        Ok(())
    }
}

/// Parse a project file back into a [`SchemaDefinition`].
pub fn read_project(bytes: &[u8]) -> Result<SchemaDefinition, SchemaFileError> {
    let mut reader = Reader::new(bytes);
    let magic = reader.read::<[u8; 4]>();
    if reader.is_truncated() {
        return Err(SchemaFileError::Truncated);
    }
    if magic != PROJECT_MAGIC {
        return Err(SchemaFileError::BadMagic);
    }
    let version = reader.read::<u32>();
    if version != PROJECT_VERSION {
        return Err(SchemaFileError::UnsupportedVersion(version));
    }

    let type_count = reader.read::<u32>() as usize;
    let mut schema = SchemaDefinition {
        sound_count: reader.read(),
        brush_count: reader.read(),
        icon_count: reader.read(),
        image_count: reader.read(),
        types: Vec::new(),
    };
    let mut p = ProjectReader { reader, type_count };
    p.check()?;

    let icon_position = p.flat::<Point16>()?;
    let default_position = p.flat::<Rect16>()?;
    let interactable = p.flat::<InteractableDefinition>()?;
    let icon = p.flat::<u16>()?;
    let class_id = p.flat::<u16>()?;
    let behavior_flags = p.flat::<u32>()?;
    let foreground = p.flat::<u16>()?;
    let background_brush = p.flat::<u16>()?;
    let highlight = p.flat::<u16>()?;
    let info = p.flat::<u16>()?;
    let variable_words = p.flat::<u16>()?;
    let background = p.flat::<BackgroundDefinition>()?;

    let mut types: Vec<TypeDefinition> = (0..type_count)
        .map(|i| {
            let mut t = TypeDefinition {
                icon_position: icon_position[i],
                default_position: default_position[i],
                interactable: interactable[i],
                icon: icon[i],
                class_id: class_id[i],
                behavior_flags: behavior_flags[i],
                variable_words: variable_words[i],
                background: background[i],
                ..TypeDefinition::default()
            };
            t.brushes.foreground = foreground[i];
            t.brushes.background = background_brush[i];
            t.brushes.highlight = highlight[i];
            t.brushes.info = info[i];
            t
        })
        .collect();

    p.lists::<u32>(&mut types, |t, _, v| {
        t.fixed_children = v;
        Ok(())
    })?;
    p.lists::<WindowChild>(&mut types, |t, _, v| {
        t.window_children = v;
        Ok(())
    })?;
    p.lists::<SlotDefinition>(&mut types, |t, _, v| {
        t.slots = v;
        Ok(())
    })?;

    p.pairs::<i32>(&mut types, |t, v| t.divider_index = Some(v))?;
    p.pairs::<u8>(&mut types, |t, v| t.horizontal_orientation = Some(v != 0))?;
    p.pairs::<ColumnProperties>(&mut types, |t, v| t.column_properties = Some(v))?;
    p.pairs::<PageUiDefinitions>(&mut types, |t, v| t.page_ui = Some(v))?;
    p.pairs::<TextInformation>(&mut types, |t, v| t.text_information = Some(v))?;
    p.pairs::<u16>(&mut types, |t, v| t.interaction_sound = Some(v))?;
    p.pairs::<ImageInformation>(&mut types, |t, v| t.image_information = Some(v))?;
    p.pairs::<u16>(&mut types, |t, v| t.child_data_type = Some(v))?;
    p.pairs::<GridProperties>(&mut types, |t, v| t.grid_properties = Some(v))?;

    for kind in CallbackKind::ALL {
        p.lists::<u8>(&mut types, |t, type_id, v| {
            let name = String::from_utf8(v).map_err(|_| SchemaFileError::InvalidName { type_id })?;
            t.callbacks[kind.index()] = Some(name);
            Ok(())
        })?;
    }

    schema.types = types;
    Ok(schema)
}

/// Read and parse a project file through the file abstraction.
pub fn load_project(fs: &dyn FileSystem, path: &Path) -> Result<SchemaDefinition, SchemaFileError> {
    let bytes = fs.read(path)?;
    read_project(&bytes)
}

// ===========================================================================
// Tests
// ===========================================================================
