//! Dry-run injectors that only log what would be injected.
//!
//! The binary uses them when no platform injector is wired in, which makes the
//! whole pipeline observable from the log output.

use crate::output::{KeyId, KeyInjector, MouseInjector, PadButton, SinkError, VirtualGamepadDriver};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogKeyInjector;

impl KeyInjector for LogKeyInjector {
    fn press(&mut self, key: KeyId) -> Result<(), SinkError> {
        info!("[dry-run] key down: {}", key);
        Ok(())
    }

    fn release(&mut self, key: KeyId) -> Result<(), SinkError> {
        info!("[dry-run] key up: {}", key);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LogMouseInjector;

impl MouseInjector for LogMouseInjector {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        info!("[dry-run] mouse move: ({}, {})", dx, dy);
        Ok(())
    }
}

/// Stages the report like a real driver and logs it on `update`
#[derive(Debug, Default)]
pub struct LogPadDriver {
    left: (i16, i16),
    right: (i16, i16),
    triggers: (u8, u8),
}

impl VirtualGamepadDriver for LogPadDriver {
    fn set_left_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError> {
        self.left = (x, y);
        Ok(())
    }

    fn set_right_stick(&mut self, x: i16, y: i16) -> Result<(), SinkError> {
        self.right = (x, y);
        Ok(())
    }

    fn set_left_trigger(&mut self, value: u8) -> Result<(), SinkError> {
        self.triggers.0 = value;
        Ok(())
    }

    fn set_right_trigger(&mut self, value: u8) -> Result<(), SinkError> {
        self.triggers.1 = value;
        Ok(())
    }

    fn press_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        info!("[dry-run] pad button down: {}", button);
        Ok(())
    }

    fn release_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        info!("[dry-run] pad button up: {}", button);
        Ok(())
    }

    fn update(&mut self) -> Result<(), SinkError> {
        info!(
            "[dry-run] pad report: left {:?}, right {:?}, triggers {:?}",
            self.left, self.right, self.triggers
        );
        Ok(())
    }
}
