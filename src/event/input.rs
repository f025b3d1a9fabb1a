//! Input event types, decoupled from crossterm.
//!
//! Hosts feed [`InputEvent`]s to [`Ui::handle_input`](crate::ui::Ui::handle_input).
//! Crossterm events convert through [`try_from_crossterm`]; pointer positions
//! are taken as layout units, one per terminal cell.

use std::ops::{BitAnd, BitOr};

use super::binding::NavigationCommand;
use crate::geometry::Offset;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Modifier key bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const ALT: Modifiers = Modifiers(4);

    /// Check whether `self` contains all the bits in `other`.
    pub fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitAnd for Modifiers {
    type Output = Modifiers;
    fn bitand(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// KeyEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: Key, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// Key without modifiers.
    pub fn plain(code: Key) -> Self {
        Self::new(code, Modifiers::NONE)
    }
}

// ---------------------------------------------------------------------------
// MouseBtn / MouseAction / MouseEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    /// Primary button: activation.
    Left,
    /// Secondary button: info.
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Down(MouseBtn),
    Up(MouseBtn),
    Drag(MouseBtn),
    Moved,
    ScrollUp,
    ScrollDown,
}

/// A pointer event at a workspace position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseAction,
    pub position: Offset,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    pub fn new(kind: MouseAction, x: i32, y: i32) -> Self {
        Self {
            kind,
            position: Offset::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn is_scroll(&self) -> bool {
        matches!(self.kind, MouseAction::ScrollUp | MouseAction::ScrollDown)
    }
}

// ---------------------------------------------------------------------------
// InputEvent
// ---------------------------------------------------------------------------

/// Top-level input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// The workspace changed size.
    Resize { width: i32, height: i32 },
    /// A navigation command from a non-keyboard source (controller buttons).
    Command(NavigationCommand),
}

// ---------------------------------------------------------------------------
// crossterm conversion
// ---------------------------------------------------------------------------

fn convert_modifiers(m: crossterm::event::KeyModifiers) -> Modifiers {
    let mut out = Modifiers::NONE;
    if m.contains(crossterm::event::KeyModifiers::SHIFT) {
        out = out | Modifiers::SHIFT;
    }
    if m.contains(crossterm::event::KeyModifiers::CONTROL) {
        out = out | Modifiers::CTRL;
    }
    if m.contains(crossterm::event::KeyModifiers::ALT) {
        out = out | Modifiers::ALT;
    }
    out
}

fn convert_key_code(code: crossterm::event::KeyCode) -> Option<Key> {
    use crossterm::event::KeyCode;
    Some(match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    })
}

fn convert_mouse_button(b: crossterm::event::MouseButton) -> MouseBtn {
    match b {
        crossterm::event::MouseButton::Left => MouseBtn::Left,
        crossterm::event::MouseButton::Right => MouseBtn::Right,
        crossterm::event::MouseButton::Middle => MouseBtn::Middle,
    }
}

/// Convert a crossterm key event; `None` for keys the runtime has no use for
/// and for key releases.
pub fn key_from_crossterm(ct: crossterm::event::KeyEvent) -> Option<KeyEvent> {
    if ct.kind == crossterm::event::KeyEventKind::Release {
        return None;
    }
    Some(KeyEvent::new(convert_key_code(ct.code)?, convert_modifiers(ct.modifiers)))
}

/// Convert a crossterm event; `None` for events the runtime ignores
/// (terminal focus, paste, horizontal scroll, unmapped keys).
pub fn try_from_crossterm(event: crossterm::event::Event) -> Option<InputEvent> {
    use crossterm::event::{Event, MouseEventKind};
    match event {
        Event::Key(ke) => key_from_crossterm(ke).map(InputEvent::Key),
        Event::Mouse(me) => {
            let kind = match me.kind {
                MouseEventKind::Down(b) => MouseAction::Down(convert_mouse_button(b)),
                MouseEventKind::Up(b) => MouseAction::Up(convert_mouse_button(b)),
                MouseEventKind::Drag(b) => MouseAction::Drag(convert_mouse_button(b)),
                MouseEventKind::Moved => MouseAction::Moved,
                MouseEventKind::ScrollUp => MouseAction::ScrollUp,
                MouseEventKind::ScrollDown => MouseAction::ScrollDown,
                _ => return None,
            };
            Some(InputEvent::Mouse(MouseEvent {
                kind,
                position: Offset::new(i32::from(me.column), i32::from(me.row)),
                modifiers: convert_modifiers(me.modifiers),
            }))
        }
        Event::Resize(w, h) => Some(InputEvent::Resize {
            width: i32::from(w),
            height: i32::from(h),
        }),
        _ => None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    // ── Modifiers ────────────────────────────────────────────────────

    #[test]
    fn modifiers_combine() {
        let mods = Modifiers::CTRL | Modifiers::ALT;
        assert!(mods.contains(Modifiers::CTRL));
        assert!(!mods.contains(Modifiers::SHIFT));
        assert_eq!(mods & Modifiers::ALT, Modifiers::ALT);
        assert!(Modifiers::NONE.is_empty());
    }

    // ── Keys ─────────────────────────────────────────────────────────

    #[test]
    fn function_keys_convert() {
        let ct = crossterm::event::KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(key_from_crossterm(ct), Some(KeyEvent::plain(Key::F(5))));
    }

    #[test]
    fn modifiers_carry_over() {
        let ct = crossterm::event::KeyEvent::new(
            KeyCode::Char('a'),
            KeyModifiers::SHIFT | KeyModifiers::CONTROL,
        );
        let key = key_from_crossterm(ct).unwrap();
        assert!(key.modifiers.contains(Modifiers::SHIFT | Modifiers::CTRL));
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        let ct = crossterm::event::KeyEvent::new(KeyCode::Insert, KeyModifiers::NONE);
        assert_eq!(key_from_crossterm(ct), None);
    }

    #[test]
    fn key_release_is_dropped() {
        let ct = crossterm::event::KeyEvent::new_with_kind(
            KeyCode::Esc,
            KeyModifiers::NONE,
            crossterm::event::KeyEventKind::Release,
        );
        assert_eq!(key_from_crossterm(ct), None);
    }

    // ── Events ───────────────────────────────────────────────────────

    #[test]
    fn mouse_down_converts_position() {
        let ct = crossterm::event::Event::Mouse(crossterm::event::MouseEvent {
            kind: crossterm::event::MouseEventKind::Down(crossterm::event::MouseButton::Right),
            column: 12,
            row: 3,
            modifiers: KeyModifiers::NONE,
        });
        let Some(InputEvent::Mouse(me)) = try_from_crossterm(ct) else {
            panic!("expected mouse event");
        };
        assert_eq!(me.kind, MouseAction::Down(MouseBtn::Right));
        assert_eq!(me.position, Offset::new(12, 3));
    }

    #[test]
    fn resize_and_ignored_events() {
        assert_eq!(
            try_from_crossterm(crossterm::event::Event::Resize(80, 24)),
            Some(InputEvent::Resize { width: 80, height: 24 })
        );
        assert_eq!(try_from_crossterm(crossterm::event::Event::FocusGained), None);
    }
}
