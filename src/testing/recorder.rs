//! A [`RenderBackend`] that records every draw call.

use crate::geometry::{Offset, Region};
use crate::platform::RenderBackend;
use crate::schema::{InteractableOrientation, TextInformation};

/// One recorded primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Rect { region: Region, brush: u16 },
    Icon { at: Offset, icon: u16, brush: u16 },
    Image { region: Region, image: u16, stretch: bool },
    Line { from: Offset, to: Offset, brush: u16 },
    Interactable { at: Offset, button: usize, orientation: InteractableOrientation },
    Text { region: Region, text: String, text_key: u32, brush: u16 },
}

/// Backend that keeps draw calls in order for later inspection.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<DrawCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the backend empty.
    pub fn take(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Text of every [`DrawCall::Text`], in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Buttons of every drawn marker, in draw order.
    pub fn markers(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Interactable { button, .. } => Some(*button),
                _ => None,
            })
            .collect()
    }
}

impl RenderBackend for RecordingBackend {
    fn draw_rect(&mut self, region: Region, brush: u16) {
        self.calls.push(DrawCall::Rect { region, brush });
    }

    fn draw_icon(&mut self, at: Offset, icon: u16, brush: u16) {
        self.calls.push(DrawCall::Icon { at, icon, brush });
    }

    fn draw_image(&mut self, region: Region, image: u16, stretch: bool) {
        self.calls.push(DrawCall::Image { region, image, stretch });
    }

    fn draw_line(&mut self, from: Offset, to: Offset, brush: u16) {
        self.calls.push(DrawCall::Line { from, to, brush });
    }

    fn draw_interactable(&mut self, at: Offset, button: usize, orientation: InteractableOrientation) {
        self.calls.push(DrawCall::Interactable { at, button, orientation });
    }

    fn draw_text(&mut self, region: Region, text: &str, info: &TextInformation, brush: u16) {
        self.calls.push(DrawCall::Text {
            region,
            text: text.to_owned(),
            text_key: info.text_key,
            brush,
        });
    }
}
