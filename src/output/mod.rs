//! Output side of the bridge
//!
//! The injectors are the collaborators that reach the OS or the virtual pad driver.
//! Each sink wraps one injector and owns the set of outputs it currently holds,
//! which makes press/release idempotent and lets [`OutputSink::release_all`]
//! return everything to neutral at any time.
//!
//! ```text
//! ModeRouter ──► KeyboardSink ──► KeyInjector
//!            ──► MouseSink    ──► MouseInjector
//!            ──► VirtualPadSink ──► VirtualGamepadDriver (one update() per tick)
//! ```

pub mod gamepad;
pub mod keyboard;
pub mod keys;
pub mod log_injector;
pub mod mouse;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;

pub use gamepad::{PadState, StickAxis, StickSide, VirtualPadSink, SELF_TEST_PAUSE};
pub use keyboard::KeyboardSink;
pub use keys::{KeyId, PadButton};
pub use mouse::MouseSink;

use thiserror::Error;

/// Failure of a single injection call. Transient: the next tick retries.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Injection failed: {0}")]
    InjectionError(String),
}

/// Emits OS level key events
pub trait KeyInjector: Send {
    fn press(&mut self, key: KeyId) -> Result<(), SinkError>;
    fn release(&mut self, key: KeyId) -> Result<(), SinkError>;
}

/// Emits OS level relative mouse motion
pub trait MouseInjector: Send {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), SinkError>;
}

/// Virtual gamepad transport. Setters stage state, `update` submits it.
pub trait VirtualGamepadDriver: Send {
    fn set_left_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError>;
    fn set_right_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError>;
    fn set_left_trigger(&mut self, value: u8) -> Result<(), SinkError>;
    fn set_right_trigger(&mut self, value: u8) -> Result<(), SinkError>;
    fn press_button(&mut self, button: PadButton) -> Result<(), SinkError>;
    fn release_button(&mut self, button: PadButton) -> Result<(), SinkError>;
    fn update(&mut self) -> Result<(), SinkError>;
}

/// "Is the game window in the foreground" oracle
pub trait FocusOracle: Send {
    fn is_target_focused(&self) -> bool;
}

/// Oracle for setups without window detection
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysFocused;

impl FocusOracle for AlwaysFocused {
    fn is_target_focused(&self) -> bool {
        true
    }
}

/// Capability shared by every sink
pub trait OutputSink {
    fn name(&self) -> &'static str;

    /// Returns every held output to neutral before returning.
    ///
    /// The active set is empty afterwards even if some injection calls failed;
    /// the first failure is reported.
    fn release_all(&mut self) -> Result<(), SinkError>;

    /// True when nothing is held
    fn is_idle(&self) -> bool;
}

/// Keeps the first error of a sequence of calls that must all be attempted
pub(crate) fn keep_first(first: &mut Option<SinkError>, result: Result<(), SinkError>) {
    if let Err(e) = result {
        if first.is_none() {
            *first = Some(e);
        }
    }
}
