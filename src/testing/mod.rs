//! Headless testing helpers: a recording backend and the [`Pilot`] driver.
//!
//! Use the [`Pilot`] to drive a [`Ui`](crate::ui::Ui) without a host loop and
//! a [`RecordingBackend`] to capture what a frame draws.

pub mod pilot;
pub mod recorder;

pub use pilot::Pilot;
pub use recorder::{DrawCall, RecordingBackend};
