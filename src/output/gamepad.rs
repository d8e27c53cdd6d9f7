use crate::mapping::conditioning::{clamp_unit, to_stick_axis, to_trigger};
use crate::output::{keep_first, OutputSink, PadButton, SinkError, VirtualGamepadDriver};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hold time of each deflection in [`VirtualPadSink::self_test`]
pub const SELF_TEST_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl StickAxis {
    pub fn x_of(side: StickSide) -> StickAxis {
        match side {
            StickSide::Left => StickAxis::LeftX,
            StickSide::Right => StickAxis::RightX,
        }
    }
}

/// Analog state of the virtual pad, sticks in [-1, 1] and triggers in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PadState {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    pub left_trigger: f32,
    pub right_trigger: f32,
}

impl PadState {
    pub const NEUTRAL: PadState = PadState {
        left_x: 0.0,
        left_y: 0.0,
        right_x: 0.0,
        right_y: 0.0,
        left_trigger: 0.0,
        right_trigger: 0.0,
    };
}

/// Virtual gamepad sink.
///
/// Axis and trigger changes are staged and submitted together by [`flush`], so the
/// receiving side sees one consistent report per tick.
///
/// [`flush`]: VirtualPadSink::flush
pub struct VirtualPadSink {
    driver: Box<dyn VirtualGamepadDriver>,
    pending: PadState,
    submitted: PadState,
    pressed: BTreeSet<PadButton>,
    dirty: bool,
}

impl VirtualPadSink {
    pub fn new(driver: Box<dyn VirtualGamepadDriver>) -> Self {
        Self {
            driver,
            pending: PadState::NEUTRAL,
            submitted: PadState::NEUTRAL,
            pressed: BTreeSet::new(),
            dirty: false,
        }
    }

    pub fn set_axis(&mut self, axis: StickAxis, value: f32) {
        let value = clamp_unit(value);
        let slot = match axis {
            StickAxis::LeftX => &mut self.pending.left_x,
            StickAxis::LeftY => &mut self.pending.left_y,
            StickAxis::RightX => &mut self.pending.right_x,
            StickAxis::RightY => &mut self.pending.right_y,
        };
        if *slot != value {
            *slot = value;
            self.dirty = true;
        }
    }

    pub fn set_triggers(&mut self, left: f32, right: f32) {
        let left = left.clamp(0.0, 1.0);
        let right = right.clamp(0.0, 1.0);
        if self.pending.left_trigger != left || self.pending.right_trigger != right {
            self.pending.left_trigger = left;
            self.pending.right_trigger = right;
            self.dirty = true;
        }
    }

    pub fn press(&mut self, button: PadButton) -> Result<bool, SinkError> {
        if self.pressed.contains(&button) {
            return Ok(false);
        }
        self.driver.press_button(button)?;
        debug!("Virtual button pressed: {}", button);
        self.pressed.insert(button);
        self.dirty = true;
        Ok(true)
    }

    pub fn release(&mut self, button: PadButton) -> Result<bool, SinkError> {
        if !self.pressed.contains(&button) {
            return Ok(false);
        }
        self.driver.release_button(button)?;
        debug!("Virtual button released: {}", button);
        self.pressed.remove(&button);
        self.dirty = true;
        Ok(true)
    }

    /// Submits staged state with a single `update()`. Returns whether anything was sent.
    pub fn flush(&mut self) -> Result<bool, SinkError> {
        if !self.dirty {
            return Ok(false);
        }
        let state = self.pending;
        self.submit(&state)?;
        self.submitted = state;
        self.dirty = false;
        Ok(true)
    }

    fn submit(&mut self, state: &PadState) -> Result<(), SinkError> {
        self.driver
            .set_left_stick(to_stick_axis(state.left_x), to_stick_axis(state.left_y))?;
        self.driver
            .set_right_stick(to_stick_axis(state.right_x), to_stick_axis(state.right_y))?;
        self.driver.set_left_trigger(to_trigger(state.left_trigger))?;
        self.driver.set_right_trigger(to_trigger(state.right_trigger))?;
        self.driver.update()
    }

    pub fn is_pressed(&self, button: PadButton) -> bool {
        self.pressed.contains(&button)
    }

    pub fn pressed_buttons(&self) -> Vec<PadButton> {
        self.pressed.iter().copied().collect()
    }

    pub fn submitted(&self) -> PadState {
        self.submitted
    }

    /// Sweeps the left stick half right, half left and back to center
    pub fn self_test(&mut self, pause: Duration) -> Result<(), SinkError> {
        info!("Testing virtual controller");
        for x in [0.5, -0.5, 0.0] {
            self.set_axis(StickAxis::LeftX, x);
            self.set_axis(StickAxis::LeftY, 0.0);
            self.flush()?;
            if x != 0.0 {
                std::thread::sleep(pause);
            }
        }
        info!("Virtual controller test completed");
        Ok(())
    }
}

impl OutputSink for VirtualPadSink {
    fn name(&self) -> &'static str {
        "virtual pad"
    }

    fn release_all(&mut self) -> Result<(), SinkError> {
        if self.is_idle() && !self.dirty {
            return Ok(());
        }
        info!(
            "Resetting virtual pad ({} buttons held)",
            self.pressed.len()
        );

        let mut first_error = None;
        for button in std::mem::take(&mut self.pressed) {
            let result = self.driver.release_button(button);
            if let Err(e) = &result {
                warn!("Failed to release virtual button {}: {}", button, e);
            }
            keep_first(&mut first_error, result);
        }

        self.pending = PadState::NEUTRAL;
        let result = self.submit(&PadState::NEUTRAL);
        if let Err(e) = &result {
            warn!("Failed to reset virtual pad axes: {}", e);
        }
        keep_first(&mut first_error, result);

        self.submitted = PadState::NEUTRAL;
        self.dirty = false;
        first_error.map_or(Ok(()), Err)
    }

    fn is_idle(&self) -> bool {
        self.pressed.is_empty()
            && self.pending == PadState::NEUTRAL
            && self.submitted == PadState::NEUTRAL
    }
}
