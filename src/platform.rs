//! Boundary traits to the host platform.
//!
//! The runtime draws through a [`RenderBackend`], pulls static strings from a
//! [`TextProvider`] and reads files through a [`FileSystem`]. It implements
//! none of them except [`NativeFileSystem`], the plain `std::fs` adapter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::geometry::{Offset, Region};
use crate::schema::{InteractableOrientation, TextInformation};

// ---------------------------------------------------------------------------
// RenderBackend
// ---------------------------------------------------------------------------

/// Drawing primitives, in workspace layout units.
///
/// Unit conversion defaults to the identity, which suits cell-based backends.
pub trait RenderBackend {
    /// Layout units to screen pixels.
    fn to_screen(&self, units: i32) -> i32 {
        units
    }

    /// Screen pixels to layout units.
    fn to_units(&self, pixels: i32) -> i32 {
        pixels
    }

    fn draw_rect(&mut self, region: Region, brush: u16);

    fn draw_icon(&mut self, at: Offset, icon: u16, brush: u16);

    fn draw_image(&mut self, region: Region, image: u16, stretch: bool);

    fn draw_line(&mut self, from: Offset, to: Offset, brush: u16);

    /// Marker telling the user which button (`0..12`) addresses a group.
    fn draw_interactable(&mut self, at: Offset, button: usize, orientation: InteractableOrientation);

    fn draw_text(&mut self, region: Region, text: &str, info: &TextInformation, brush: u16);
}

// ---------------------------------------------------------------------------
// TextProvider
// ---------------------------------------------------------------------------

/// Static strings addressed by the schema's text keys.
pub trait TextProvider {
    fn text(&self, key: u32) -> Option<String>;
}

/// Provider with no strings at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoText;

impl TextProvider for NoText {
    fn text(&self, _key: u32) -> Option<String> {
        None
    }
}

impl<F> TextProvider for F
where
    F: Fn(u32) -> Option<String>,
{
    fn text(&self, key: u32) -> Option<String> {
        self(key)
    }
}

// ---------------------------------------------------------------------------
// FileSystem
// ---------------------------------------------------------------------------

/// File reads and directory enumeration.
pub trait FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Entries of a directory, sorted by path.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`FileSystem`] over the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }
}
