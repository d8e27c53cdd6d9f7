//! In-memory injectors that record every call into a shared [`OutputLog`].
//!
//! Used by the test-suite to observe exactly what reached the collaborators.
//! Compiled for unit tests and with the `test-util` feature.

use crate::mapping::router::SinkSet;
use crate::output::{
    FocusOracle, KeyId, KeyInjector, MouseInjector, PadButton, SinkError, VirtualGamepadDriver,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCall {
    KeyPress(KeyId),
    KeyRelease(KeyId),
    MouseMove(i32, i32),
    PadLeftStick(i16, i16),
    PadRightStick(i16, i16),
    PadLeftTrigger(u8),
    PadRightTrigger(u8),
    PadPress(PadButton),
    PadRelease(PadButton),
    PadUpdate,
}

/// Shared call log plus a switch that makes every injector fail
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    calls: Arc<Mutex<Vec<OutputCall>>>,
    failing: Arc<AtomicBool>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutputCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: OutputCall) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::InjectionError(format!("{:?} rejected", call)));
        }
        self.lock().push(call);
        Ok(())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys held at the OS level after replaying the log
    pub fn held_keys(&self) -> BTreeSet<KeyId> {
        let mut held = BTreeSet::new();
        for call in self.lock().iter() {
            match call {
                OutputCall::KeyPress(key) => {
                    held.insert(*key);
                }
                OutputCall::KeyRelease(key) => {
                    held.remove(key);
                }
                _ => {}
            }
        }
        held
    }

    /// Pad buttons held after replaying the log
    pub fn held_pad_buttons(&self) -> BTreeSet<PadButton> {
        let mut held = BTreeSet::new();
        for call in self.lock().iter() {
            match call {
                OutputCall::PadPress(button) => {
                    held.insert(*button);
                }
                OutputCall::PadRelease(button) => {
                    held.remove(button);
                }
                _ => {}
            }
        }
        held
    }

    pub fn key_injector(&self) -> RecordingKeys {
        RecordingKeys { log: self.clone() }
    }

    pub fn mouse_injector(&self) -> RecordingMouse {
        RecordingMouse { log: self.clone() }
    }

    pub fn pad_driver(&self) -> RecordingPad {
        RecordingPad { log: self.clone() }
    }

    /// Keyboard, mouse and optionally a pad, all recording into this log
    pub fn sinks(&self, with_pad: bool) -> SinkSet {
        let pad: Option<Box<dyn VirtualGamepadDriver>> = if with_pad {
            Some(Box::new(self.pad_driver()))
        } else {
            None
        };
        SinkSet::new(
            Box::new(self.key_injector()),
            Box::new(self.mouse_injector()),
            pad,
        )
    }
}

#[derive(Debug, Clone)]
pub struct RecordingKeys {
    log: OutputLog,
}

impl KeyInjector for RecordingKeys {
    fn press(&mut self, key: KeyId) -> Result<(), SinkError> {
        self.log.record(OutputCall::KeyPress(key))
    }

    fn release(&mut self, key: KeyId) -> Result<(), SinkError> {
        self.log.record(OutputCall::KeyRelease(key))
    }
}

#[derive(Debug, Clone)]
pub struct RecordingMouse {
    log: OutputLog,
}

impl MouseInjector for RecordingMouse {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        self.log.record(OutputCall::MouseMove(dx, dy))
    }
}

#[derive(Debug, Clone)]
pub struct RecordingPad {
    log: OutputLog,
}

impl VirtualGamepadDriver for RecordingPad {
    fn set_left_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadLeftStick(x, y))
    }

    fn set_right_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadRightStick(x, y))
    }

    fn set_left_trigger(&mut self, value: u8) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadLeftTrigger(value))
    }

    fn set_right_trigger(&mut self, value: u8) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadRightTrigger(value))
    }

    fn press_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadPress(button))
    }

    fn release_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadRelease(button))
    }

    fn update(&mut self) -> Result<(), SinkError> {
        self.log.record(OutputCall::PadUpdate)
    }
}

/// Focus oracle that can be flipped from another thread
#[derive(Debug, Clone)]
pub struct SharedFocus {
    focused: Arc<AtomicBool>,
}

impl SharedFocus {
    pub fn new(focused: bool) -> Self {
        Self {
            focused: Arc::new(AtomicBool::new(focused)),
        }
    }

    pub fn set(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }
}

impl FocusOracle for SharedFocus {
    fn is_target_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }
}
