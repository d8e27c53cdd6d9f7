//! Per tick routing of wheel input into the sinks.
//!
//! The router owns every sink and the active [`ModeStrategy`]. It is driven
//! once per tick by the scheduler with the frame, the edges the tracker found
//! and the focus state sampled for that tick.

use crate::config::WheelConfig;
use crate::controller::{Edge, EdgeEvent, InputId, RawDeviceFrame};
use crate::mapping::conditioning::{apply_deadzone, normalize_pedal};
use crate::mapping::strategy::{BindingTarget, ModeStrategy, OutputMode, PedalValues};
use crate::output::{
    keep_first, KeyInjector, KeyboardSink, MouseInjector, MouseSink, OutputSink, SinkError,
    VirtualGamepadDriver, VirtualPadSink,
};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Every sink the engine can drive. The pad is optional: not every setup has a driver.
pub struct SinkSet {
    pub keyboard: KeyboardSink,
    pub mouse: MouseSink,
    pub pad: Option<VirtualPadSink>,
}

impl SinkSet {
    pub fn new(
        keys: Box<dyn KeyInjector>,
        mouse: Box<dyn MouseInjector>,
        pad: Option<Box<dyn VirtualGamepadDriver>>,
    ) -> Self {
        Self {
            keyboard: KeyboardSink::new(keys),
            mouse: MouseSink::new(mouse),
            pad: pad.map(VirtualPadSink::new),
        }
    }

    pub fn has_pad(&self) -> bool {
        self.pad.is_some()
    }

    /// Releases every sink, even if an earlier one fails. Reports the first failure.
    pub fn release_all(&mut self) -> Result<(), SinkError> {
        let mut first_error = None;
        release_sink(&mut first_error, &mut self.keyboard);
        release_sink(&mut first_error, &mut self.mouse);
        if let Some(pad) = self.pad.as_mut() {
            release_sink(&mut first_error, pad);
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_idle(&self) -> bool {
        self.keyboard.is_idle()
            && self.mouse.is_idle()
            && self.pad.as_ref().map_or(true, |pad| pad.is_idle())
    }
}

// Outputs still held when the sinks go away (engine thread unwinding) are released here
impl Drop for SinkSet {
    fn drop(&mut self) {
        if self.is_idle() {
            return;
        }
        warn!("Sinks dropped while holding outputs, releasing");
        if let Err(e) = self.release_all() {
            error!("Failed to release outputs on drop: {}", e);
        }
    }
}

fn release_sink(first_error: &mut Option<SinkError>, sink: &mut dyn OutputSink) {
    let result = sink.release_all();
    if let Err(e) = &result {
        warn!("Failed to release {} outputs: {}", sink.name(), e);
    }
    keep_first(first_error, result);
}

/// Normalized pedals of a frame, with brake and clutch swapped if configured
pub fn pedal_values(frame: &RawDeviceFrame, config: &WheelConfig) -> PedalValues {
    let brake_raw = if config.swap_brake_clutch {
        frame.clutch
    } else {
        frame.brake
    };
    PedalValues {
        throttle: normalize_pedal(frame.throttle),
        brake: normalize_pedal(brake_raw),
    }
}

/// Mode actually run for a requested mode. The virtual pad needs a driver.
pub fn effective_mode(requested: OutputMode, has_pad: bool) -> OutputMode {
    if requested.needs_virtual_pad() && !has_pad {
        OutputMode::MouseSteering
    } else {
        requested
    }
}

pub struct ModeRouter {
    sinks: SinkSet,
    strategy: Box<dyn ModeStrategy>,
    requested: OutputMode,
    was_focused: bool,
}

impl ModeRouter {
    pub fn new(sinks: SinkSet, requested: OutputMode) -> Self {
        let mode = effective_mode(requested, sinks.has_pad());
        if mode != requested {
            warn!(
                "{} requested but no virtual pad driver is available, using {}",
                requested, mode
            );
        }
        info!("Output mode: {}", mode);
        Self {
            sinks,
            strategy: mode.create_strategy(),
            requested,
            was_focused: false,
        }
    }

    /// Mode currently driving the sinks
    pub fn mode(&self) -> OutputMode {
        self.strategy.mode()
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    /// Routes one tick.
    ///
    /// Nothing reaches a sink unless `focused` is true. Every stage is attempted
    /// even if an earlier one fails; the first failure is returned. Returns the
    /// conditioned steering value of this tick.
    pub fn route(
        &mut self,
        frame: &RawDeviceFrame,
        edges: &[EdgeEvent],
        config: &WheelConfig,
        focused: bool,
        now: Instant,
    ) -> Result<f32, SinkError> {
        if !focused {
            if self.was_focused {
                info!("Target window lost focus, routing paused");
                self.was_focused = false;
            }
            return Ok(apply_deadzone(frame.steering, config.steering_deadzone));
        }

        if !self.was_focused {
            info!("Target window focused, routing resumed");
            self.was_focused = true;
            self.release_all()?;
        }

        self.apply_mode(config.control_mode)?;

        let mut first_error = None;
        let conditioned = match self
            .strategy
            .consume_steering(frame.steering, config, &mut self.sinks, now)
        {
            Ok(value) => value,
            Err(e) => {
                keep_first(&mut first_error, Err(e));
                0.0
            }
        };

        let pedals = pedal_values(frame, config);
        keep_first(
            &mut first_error,
            self.strategy.consume_pedals(pedals, config, &mut self.sinks),
        );

        for event in edges {
            keep_first(&mut first_error, self.route_edge(event, config));
        }

        if let Some(pad) = self.sinks.pad.as_mut() {
            keep_first(&mut first_error, pad.flush().map(drop));
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(conditioned),
        }
    }

    /// Switches strategy if the requested mode changed. Everything held by the
    /// old mode is released before the new one takes over.
    fn apply_mode(&mut self, requested: OutputMode) -> Result<(), SinkError> {
        let mode = effective_mode(requested, self.sinks.has_pad());
        if requested != self.requested && mode != requested {
            warn!(
                "{} requested but no virtual pad driver is available, using {}",
                requested, mode
            );
        }
        self.requested = requested;

        if mode == self.strategy.mode() {
            return Ok(());
        }

        info!("Switching output mode: {} -> {}", self.strategy.mode(), mode);
        self.release_all()?;
        self.strategy = mode.create_strategy();
        Ok(())
    }

    fn route_edge(&mut self, event: &EdgeEvent, config: &WheelConfig) -> Result<(), SinkError> {
        let action = match event.input {
            InputId::Button(button) => config.button_action(button),
            InputId::Hat(_, direction) => config.hat_action(direction),
        };
        let Some(action) = action else {
            return Ok(());
        };
        let Some(target) = self.strategy.resolve_binding(action) else {
            warn!("Unknown binding {:?} for {:?}, skipped", action, event.input);
            return Ok(());
        };
        debug!("{:?} {:?} -> {:?}", event.input, event.edge, target);

        match (target, event.edge) {
            (BindingTarget::Key(key), Edge::Pressed) => self.sinks.keyboard.press(key).map(drop),
            (BindingTarget::Key(key), Edge::Released) => {
                self.sinks.keyboard.release(key).map(drop)
            }
            (BindingTarget::Pad(button), edge) => match self.sinks.pad.as_mut() {
                Some(pad) if edge == Edge::Pressed => pad.press(button).map(drop),
                Some(pad) => pad.release(button).map(drop),
                None => Ok(()),
            },
        }
    }

    /// Returns every sink to neutral and forgets the strategy's internal state
    pub fn release_all(&mut self) -> Result<(), SinkError> {
        self.strategy.reset();
        self.sinks.release_all()
    }
}
