//! Pilot: programmatic interaction with a headless [`Ui`].
//!
//! The `Pilot` owns a [`Ui`] built over a schema, simulates key presses and
//! mouse input through the same entry point a host loop would use, and
//! renders into a [`RecordingBackend`] for inspection.

use crate::event::{InputEvent, Key, KeyEvent, Modifiers, MouseAction, MouseBtn, MouseEvent, UiEvent};
use crate::schema::{SchemaStore, TypeId};
use crate::tree::{AllocError, NodeId};
use crate::ui::{Ui, UiConfig};

use super::recorder::{DrawCall, RecordingBackend};

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

/// A headless UI driver for testing.
///
/// # Examples
///
/// ```ignore
/// use schemata::testing::Pilot;
///
/// let mut pilot = Pilot::new(schema, ROOT_TYPE)?;
/// pilot.button(0);
/// assert!(!pilot.events().is_empty());
/// ```
pub struct Pilot {
    ui: Ui,
}

impl Pilot {
    /// Build a UI over `schema` with `root` as its root type.
    pub fn new(schema: SchemaStore, root: TypeId) -> Result<Self, AllocError> {
        Self::with_config(schema, root, UiConfig::default())
    }

    pub fn with_config(schema: SchemaStore, root: TypeId, config: UiConfig) -> Result<Self, AllocError> {
        let mut ui = Ui::with_config(schema, config);
        ui.create_root(root)?;
        Ok(Self { ui })
    }

    /// Wrap an already configured UI.
    pub fn from_ui(ui: Ui) -> Self {
        Self { ui }
    }

    // ── Input simulation ─────────────────────────────────────────────

    /// Simulate a key press with no modifiers.
    pub fn press(&mut self, key: Key) -> bool {
        self.ui.handle_input(InputEvent::Key(KeyEvent::plain(key)))
    }

    pub fn press_with(&mut self, key: Key, modifiers: Modifiers) -> bool {
        self.ui.handle_input(InputEvent::Key(KeyEvent::new(key, modifiers)))
    }

    /// Press group button `index` through its default function key.
    pub fn button(&mut self, index: u8) -> bool {
        self.press(Key::F(index + 1))
    }

    pub fn escape(&mut self) -> bool {
        self.press(Key::Escape)
    }

    pub fn click(&mut self, x: i32, y: i32) -> bool {
        self.mouse(MouseAction::Down(MouseBtn::Left), x, y)
    }

    pub fn right_click(&mut self, x: i32, y: i32) -> bool {
        self.mouse(MouseAction::Down(MouseBtn::Right), x, y)
    }

    pub fn move_mouse(&mut self, x: i32, y: i32) -> bool {
        self.mouse(MouseAction::Moved, x, y)
    }

    pub fn scroll_down(&mut self, x: i32, y: i32) -> bool {
        self.mouse(MouseAction::ScrollDown, x, y)
    }

    pub fn scroll_up(&mut self, x: i32, y: i32) -> bool {
        self.mouse(MouseAction::ScrollUp, x, y)
    }

    fn mouse(&mut self, kind: MouseAction, x: i32, y: i32) -> bool {
        self.ui.handle_input(InputEvent::Mouse(MouseEvent::new(kind, x, y)))
    }

    pub fn resize(&mut self, width: i32, height: i32) -> bool {
        self.ui.handle_input(InputEvent::Resize { width, height })
    }

    /// Run every node's update hook once.
    pub fn tick(&mut self) {
        self.ui.update();
    }

    // ── Query ────────────────────────────────────────────────────────

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut Ui {
        &mut self.ui
    }

    pub fn root(&self) -> Option<NodeId> {
        self.ui.root()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.ui.focused()
    }

    /// Drain the UI's queued events.
    pub fn events(&mut self) -> Vec<UiEvent> {
        self.ui.drain_events()
    }

    /// Render the current frame and return its draw calls.
    pub fn render(&self) -> Vec<DrawCall> {
        let mut backend = RecordingBackend::new();
        self.ui.render(&mut backend);
        backend.take()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
