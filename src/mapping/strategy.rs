//! One routing strategy per output mode.
//!
//! Every strategy consumes the same two inputs each tick (steering and the
//! normalized pedals) and decides which sink gets them. Adding a mode means
//! adding a variant to [`OutputMode`] and one [`ModeStrategy`] implementation.

use crate::config::{PedalAxisTarget, WheelConfig};
use crate::mapping::conditioning::{apply_deadzone, clamp_unit, scale, smooth};
use crate::mapping::oscillator::{OscillatingKeyEmulator, OscillatorSettings};
use crate::mapping::router::SinkSet;
use crate::output::{KeyId, PadButton, SinkError, StickAxis};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::time::Instant;
use tracing::debug;

/// Normalized pedal above which a pedal key is held
pub const PEDAL_PRESS_THRESHOLD: f32 = 0.1;

/// Fixed low-pass factor of mouse steering
pub const MOUSE_SMOOTHING: f32 = 0.3;

/// Smoothed mouse steering at or below this magnitude issues no motion
pub const MOUSE_MOTION_THRESHOLD: f32 = 0.1;

/// Mouse counts per unit of smoothed steering
pub const MOUSE_COUNTS_PER_UNIT: f32 = 10.0;

/// Below this deadzoned steering the mouse filter decays toward center
pub const MOUSE_RETURN_BELOW: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Oscillating steering keys plus pedal keys
    #[serde(rename = "keyboard")]
    Keyboard,

    /// Relative mouse steering plus pedal keys
    #[default]
    #[serde(rename = "mouse")]
    MouseSteering,

    /// Everything on a virtual pad
    #[serde(rename = "virtual_gamepad", alias = "virtual_xbox")]
    VirtualGamepad,

    /// Mouse steering with keyboard pedals, kept as its own mode for the UI
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl OutputMode {
    pub fn needs_virtual_pad(&self) -> bool {
        matches!(self, OutputMode::VirtualGamepad)
    }

    pub fn create_strategy(&self) -> Box<dyn ModeStrategy> {
        match self {
            OutputMode::Keyboard => Box::new(KeyboardStrategy::new()),
            OutputMode::MouseSteering => Box::new(MouseSteeringStrategy::new(OutputMode::MouseSteering)),
            OutputMode::VirtualGamepad => Box::new(VirtualGamepadStrategy),
            OutputMode::Hybrid => Box::new(MouseSteeringStrategy::new(OutputMode::Hybrid)),
        }
    }
}

impl Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Keyboard => write!(f, "Keyboard"),
            OutputMode::MouseSteering => write!(f, "Mouse Steering"),
            OutputMode::VirtualGamepad => write!(f, "Virtual Gamepad"),
            OutputMode::Hybrid => write!(f, "Hybrid"),
        }
    }
}

/// Pedal positions in [0, 1], 1 = fully pressed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PedalValues {
    pub throttle: f32,
    pub brake: f32,
}

/// Where a digital binding ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    Key(KeyId),
    Pad(PadButton),
}

pub trait ModeStrategy: Send + Debug {
    fn mode(&self) -> OutputMode;

    /// Routes one raw steering sample. Returns the conditioned value for display.
    fn consume_steering(
        &mut self,
        steering: f32,
        config: &WheelConfig,
        sinks: &mut SinkSet,
        now: Instant,
    ) -> Result<f32, SinkError>;

    fn consume_pedals(
        &mut self,
        pedals: PedalValues,
        config: &WheelConfig,
        sinks: &mut SinkSet,
    ) -> Result<(), SinkError>;

    /// Resolves a button or hat binding. `None` when the name is not usable.
    fn resolve_binding(&self, action: &str) -> Option<BindingTarget> {
        action.parse::<KeyId>().ok().map(BindingTarget::Key)
    }

    /// Forgets internal filter and phase state
    fn reset(&mut self) {}
}

/// Threshold presses on the configured pedal keys, shared by the key based modes
pub fn press_pedal_keys(
    pedals: PedalValues,
    config: &WheelConfig,
    sinks: &mut SinkSet,
) -> Result<(), SinkError> {
    sinks
        .keyboard
        .set(config.throttle_key, pedals.throttle > PEDAL_PRESS_THRESHOLD)?;
    sinks
        .keyboard
        .set(config.brake_key, pedals.brake > PEDAL_PRESS_THRESHOLD)?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct KeyboardStrategy {
    oscillator: OscillatingKeyEmulator,
}

impl KeyboardStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModeStrategy for KeyboardStrategy {
    fn mode(&self) -> OutputMode {
        OutputMode::Keyboard
    }

    fn consume_steering(
        &mut self,
        steering: f32,
        config: &WheelConfig,
        sinks: &mut SinkSet,
        now: Instant,
    ) -> Result<f32, SinkError> {
        let conditioned = scale(
            apply_deadzone(steering, config.steering_deadzone),
            config.steering_sensitivity,
        );
        let settings = OscillatorSettings {
            oscillate: config.keyboard_steering_lfo,
            base_frequency: config.keyboard_steering_frequency,
            left_key: config.steer_left_key,
            right_key: config.steer_right_key,
        };
        self.oscillator
            .drive(conditioned, now, &settings, &mut sinks.keyboard)?;
        Ok(conditioned)
    }

    fn consume_pedals(
        &mut self,
        pedals: PedalValues,
        config: &WheelConfig,
        sinks: &mut SinkSet,
    ) -> Result<(), SinkError> {
        press_pedal_keys(pedals, config, sinks)
    }

    fn reset(&mut self) {
        self.oscillator.reset();
    }
}

/// Mouse steering; also serves Hybrid, which differs only in name
#[derive(Debug)]
pub struct MouseSteeringStrategy {
    mode: OutputMode,
    smoothed: f32,
}

impl MouseSteeringStrategy {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode, smoothed: 0.0 }
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }
}

impl ModeStrategy for MouseSteeringStrategy {
    fn mode(&self) -> OutputMode {
        self.mode
    }

    fn consume_steering(
        &mut self,
        steering: f32,
        config: &WheelConfig,
        sinks: &mut SinkSet,
        _now: Instant,
    ) -> Result<f32, SinkError> {
        let deadzoned = apply_deadzone(steering, config.steering_deadzone);
        let directed = if config.invert_mouse_steering {
            -deadzoned
        } else {
            deadzoned
        };
        let target = scale(directed, config.mouse_sensitivity);
        self.smoothed = smooth(self.smoothed, target, MOUSE_SMOOTHING);

        if self.smoothed.abs() > MOUSE_MOTION_THRESHOLD {
            let dx = (self.smoothed * MOUSE_COUNTS_PER_UNIT) as i32;
            sinks.mouse.move_by(dx, 0)?;
        } else if config.mouse_return_center && deadzoned.abs() < MOUSE_RETURN_BELOW {
            self.smoothed *= config.mouse_return_speed;
        }
        Ok(directed)
    }

    fn consume_pedals(
        &mut self,
        pedals: PedalValues,
        config: &WheelConfig,
        sinks: &mut SinkSet,
    ) -> Result<(), SinkError> {
        press_pedal_keys(pedals, config, sinks)
    }

    fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

#[derive(Debug, Default)]
pub struct VirtualGamepadStrategy;

impl ModeStrategy for VirtualGamepadStrategy {
    fn mode(&self) -> OutputMode {
        OutputMode::VirtualGamepad
    }

    fn consume_steering(
        &mut self,
        steering: f32,
        config: &WheelConfig,
        sinks: &mut SinkSet,
        _now: Instant,
    ) -> Result<f32, SinkError> {
        let conditioned = clamp_unit(scale(
            apply_deadzone(steering, config.steering_deadzone),
            config.controller_steering_range,
        ));
        match sinks.pad.as_mut() {
            Some(pad) => pad.set_axis(StickAxis::x_of(config.controller_stick_mode), conditioned),
            None => debug!("No virtual pad attached, steering dropped"),
        }
        Ok(conditioned)
    }

    fn consume_pedals(
        &mut self,
        pedals: PedalValues,
        config: &WheelConfig,
        sinks: &mut SinkSet,
    ) -> Result<(), SinkError> {
        let Some(pad) = sinks.pad.as_mut() else {
            return Ok(());
        };
        match config.controller_throttle_axis {
            PedalAxisTarget::Triggers => pad.set_triggers(pedals.brake, pedals.throttle),
            PedalAxisTarget::LeftX => pad.set_axis(StickAxis::LeftX, pedals.throttle),
            PedalAxisTarget::LeftY => pad.set_axis(StickAxis::LeftY, pedals.throttle),
            PedalAxisTarget::RightX => pad.set_axis(StickAxis::RightX, pedals.brake),
            PedalAxisTarget::RightY => pad.set_axis(StickAxis::RightY, pedals.brake),
        }
        Ok(())
    }

    fn resolve_binding(&self, action: &str) -> Option<BindingTarget> {
        PadButton::from_binding(action)
            .map(BindingTarget::Pad)
            .or_else(|| action.parse::<KeyId>().ok().map(BindingTarget::Key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::recording::{OutputCall, OutputLog};
    use crate::output::{OutputSink, PadState};

    fn sinks(with_pad: bool) -> (SinkSet, OutputLog) {
        let log = OutputLog::new();
        (log.sinks(with_pad), log)
    }

    #[test]
    fn mode_names_round_trip_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            mode: OutputMode,
        }
        let parsed: Holder = toml::from_str("mode = \"virtual_xbox\"").unwrap();
        assert_eq!(parsed.mode, OutputMode::VirtualGamepad);
        let written = toml::to_string(&Holder { mode: OutputMode::MouseSteering }).unwrap();
        assert_eq!(written.trim(), "mode = \"mouse\"");
    }

    #[test]
    fn fully_pressed_pedal_holds_throttle_key() {
        let (mut sinks, _log) = sinks(false);
        let config = WheelConfig::default();
        let mut strategy = KeyboardStrategy::new();
        let pedals = PedalValues { throttle: 1.0, brake: 0.0 };
        strategy.consume_pedals(pedals, &config, &mut sinks).unwrap();
        assert!(sinks.keyboard.is_pressed(KeyId::Char('w')));
        assert!(!sinks.keyboard.is_pressed(KeyId::Char('s')));

        let released = PedalValues { throttle: 0.1, brake: 0.0 };
        strategy.consume_pedals(released, &config, &mut sinks).unwrap();
        assert!(sinks.keyboard.is_idle());
    }

    #[test]
    fn keyboard_steering_taps_the_right_key() {
        let (mut sinks, _log) = sinks(false);
        let config = WheelConfig::default();
        let mut strategy = KeyboardStrategy::new();
        let conditioned = strategy
            .consume_steering(0.5, &config, &mut sinks, Instant::now())
            .unwrap();
        assert!((conditioned - 0.4737).abs() < 1e-3);
        assert!(sinks.keyboard.is_pressed(KeyId::Char('d')));
    }

    #[test]
    fn mouse_motion_below_threshold_issues_no_call() {
        let (mut sinks, log) = sinks(false);
        let config = WheelConfig::default();
        let mut strategy = MouseSteeringStrategy::new(OutputMode::MouseSteering);

        // 0.06 deadzoned to ~0.0105, times 3 and smoothed by 0.3: far below 0.1
        strategy
            .consume_steering(0.06, &config, &mut sinks, Instant::now())
            .unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn mouse_steering_moves_by_truncated_counts() {
        let (mut sinks, log) = sinks(false);
        let config = WheelConfig::default();
        let mut strategy = MouseSteeringStrategy::new(OutputMode::MouseSteering);
        strategy
            .consume_steering(1.0, &config, &mut sinks, Instant::now())
            .unwrap();
        // smooth(0, 3.0, 0.3) = 0.9 -> 9 counts
        assert_eq!(log.calls(), vec![OutputCall::MouseMove(9, 0)]);
    }

    #[test]
    fn inverted_mouse_steering_moves_left() {
        let (mut sinks, log) = sinks(false);
        let config = WheelConfig {
            invert_mouse_steering: true,
            ..WheelConfig::default()
        };
        let mut strategy = MouseSteeringStrategy::new(OutputMode::Hybrid);
        strategy
            .consume_steering(1.0, &config, &mut sinks, Instant::now())
            .unwrap();
        assert_eq!(log.calls(), vec![OutputCall::MouseMove(-9, 0)]);
        assert_eq!(strategy.mode(), OutputMode::Hybrid);
    }

    #[test]
    fn mouse_filter_returns_to_center() {
        let (mut sinks, _log) = sinks(false);
        let config = WheelConfig::default();
        let mut strategy = MouseSteeringStrategy::new(OutputMode::MouseSteering);
        let now = Instant::now();
        strategy.consume_steering(1.0, &config, &mut sinks, now).unwrap();
        for _ in 0..200 {
            strategy.consume_steering(0.0, &config, &mut sinks, now).unwrap();
        }
        assert!(strategy.smoothed().abs() < 0.01);
    }

    #[test]
    fn virtual_pad_routes_steering_and_triggers() {
        let (mut sinks, log) = sinks(true);
        let config = WheelConfig {
            controller_throttle_axis: PedalAxisTarget::Triggers,
            ..WheelConfig::default()
        };
        let mut strategy = VirtualGamepadStrategy;
        strategy
            .consume_steering(-1.0, &config, &mut sinks, Instant::now())
            .unwrap();
        strategy
            .consume_pedals(PedalValues { throttle: 1.0, brake: 0.0 }, &config, &mut sinks)
            .unwrap();

        let pad = sinks.pad.as_mut().unwrap();
        pad.flush().unwrap();
        let expected = PadState {
            left_x: -1.0,
            right_trigger: 1.0,
            ..PadState::NEUTRAL
        };
        assert_eq!(pad.submitted(), expected);
        assert!(log.calls().contains(&OutputCall::PadRightTrigger(255)));
        assert!(log.calls().contains(&OutputCall::PadLeftTrigger(0)));
    }

    // Steering and pedals through the pad strategy, then one flush
    fn pad_frame(
        config: &WheelConfig,
        steering: f32,
        pedals: PedalValues,
        sinks: &mut SinkSet,
    ) {
        let mut strategy = VirtualGamepadStrategy;
        strategy
            .consume_steering(steering, config, sinks, Instant::now())
            .unwrap();
        strategy.consume_pedals(pedals, config, sinks).unwrap();
        sinks.pad.as_mut().unwrap().flush().unwrap();
    }

    #[test]
    fn default_pad_puts_throttle_on_left_stick_y() {
        let (mut sinks, log) = sinks(true);
        let config = WheelConfig::default();
        assert_eq!(config.controller_throttle_axis, PedalAxisTarget::LeftY);

        pad_frame(&config, 0.5, PedalValues { throttle: 1.0, brake: 1.0 }, &mut sinks);
        assert!(log.calls().contains(&OutputCall::PadLeftStick(15521, 32767)));
        assert!(log.calls().contains(&OutputCall::PadRightStick(0, 0)));
        assert!(log.calls().contains(&OutputCall::PadLeftTrigger(0)));
        assert!(log.calls().contains(&OutputCall::PadRightTrigger(0)));
    }

    #[test]
    fn released_throttle_returns_stick_axis_to_zero() {
        let (mut sinks, log) = sinks(true);
        let config = WheelConfig::default();

        pad_frame(&config, 0.5, PedalValues { throttle: 1.0, brake: 0.0 }, &mut sinks);
        pad_frame(&config, 0.5, PedalValues { throttle: 0.0, brake: 0.0 }, &mut sinks);

        let left: Vec<_> = log
            .calls()
            .into_iter()
            .filter(|c| matches!(c, OutputCall::PadLeftStick(_, _)))
            .collect();
        assert_eq!(
            left,
            vec![
                OutputCall::PadLeftStick(15521, 32767),
                OutputCall::PadLeftStick(15521, 0),
            ]
        );
    }

    #[test]
    fn right_stick_targets_carry_the_brake() {
        for (target, expected) in [
            (PedalAxisTarget::RightX, OutputCall::PadRightStick(32767, 0)),
            (PedalAxisTarget::RightY, OutputCall::PadRightStick(0, 32767)),
        ] {
            let (mut sinks, log) = sinks(true);
            let config = WheelConfig {
                controller_throttle_axis: target,
                ..WheelConfig::default()
            };
            pad_frame(&config, 0.0, PedalValues { throttle: 0.5, brake: 1.0 }, &mut sinks);
            assert!(log.calls().contains(&expected), "{:?}: {:?}", target, log.calls());
            assert!(log.calls().contains(&OutputCall::PadLeftStick(0, 0)));
        }
    }

    #[test]
    fn throttle_on_left_x_with_steering_on_the_right_stick() {
        let (mut sinks, log) = sinks(true);
        let config = WheelConfig {
            controller_throttle_axis: PedalAxisTarget::LeftX,
            controller_stick_mode: crate::output::StickSide::Right,
            ..WheelConfig::default()
        };
        pad_frame(&config, 0.5, PedalValues { throttle: 1.0, brake: 0.0 }, &mut sinks);
        assert!(log.calls().contains(&OutputCall::PadLeftStick(32767, 0)));
        assert!(log.calls().contains(&OutputCall::PadRightStick(15521, 0)));
    }

    #[test]
    fn steering_range_is_clamped_for_the_pad() {
        let (mut sinks, _log) = sinks(true);
        let config = WheelConfig {
            controller_steering_range: 3.0,
            controller_stick_mode: crate::output::StickSide::Right,
            ..WheelConfig::default()
        };
        let conditioned = VirtualGamepadStrategy
            .consume_steering(0.8, &config, &mut sinks, Instant::now())
            .unwrap();
        assert_eq!(conditioned, 1.0);
    }

    #[test]
    fn pad_names_resolve_to_pad_only_in_pad_mode() {
        assert_eq!(
            VirtualGamepadStrategy.resolve_binding("lb"),
            Some(BindingTarget::Pad(PadButton::LeftShoulder))
        );
        assert_eq!(
            VirtualGamepadStrategy.resolve_binding("space"),
            Some(BindingTarget::Key(KeyId::Space))
        );
        assert_eq!(
            KeyboardStrategy::new().resolve_binding("a"),
            Some(BindingTarget::Key(KeyId::Char('a')))
        );
        assert_eq!(KeyboardStrategy::new().resolve_binding("hyper"), None);
    }
}
