//! Proportional steering from two digital keys.
//!
//! Holding a steering key snaps the game to full lock, so the emulator taps the
//! key instead: it alternates between a `high` phase (key held) and a `low` phase
//! (both keys up). The toggle frequency grows linearly with deflection, from
//! 0.5x the base frequency near center to 2x at full lock.

use crate::output::{KeyId, KeyboardSink, SinkError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Below this magnitude the oscillator idles. Tighter than the steering deadzone.
pub const INNER_THRESHOLD: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSettings {
    /// Tap instead of holding
    pub oscillate: bool,
    /// Hz at which the phase toggles for a deflection of 1/3
    pub base_frequency: f32,
    pub left_key: KeyId,
    pub right_key: KeyId,
}

/// Toggle frequency for a given deflection magnitude
pub fn tap_frequency(base_frequency: f32, intensity: f32) -> f32 {
    base_frequency * (0.5 + intensity.abs() * 1.5)
}

/// Time between two toggles. Non-positive frequencies never toggle again.
pub fn tap_period(base_frequency: f32, intensity: f32) -> Duration {
    Duration::try_from_secs_f32(1.0 / tap_frequency(base_frequency, intensity))
        .unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone)]
pub struct OscillatingKeyEmulator {
    phase: Phase,
    last_toggle: Option<Instant>,
}

impl Default for OscillatingKeyEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl OscillatingKeyEmulator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Low,
            last_toggle: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Low;
        self.last_toggle = None;
    }

    /// Drives the steering keys for one tick.
    ///
    /// `steering` is already conditioned (deadzone and sensitivity applied).
    /// The opposite key is always released before a key is pressed, so both keys
    /// are never held together.
    pub fn drive(
        &mut self,
        steering: f32,
        now: Instant,
        settings: &OscillatorSettings,
        keys: &mut KeyboardSink,
    ) -> Result<(), SinkError> {
        if steering.is_nan() || steering.abs() < INNER_THRESHOLD {
            if self.phase == Phase::High {
                debug!("Steering centered, oscillator idle");
            }
            self.reset();
            keys.release(settings.left_key)?;
            keys.release(settings.right_key)?;
            return Ok(());
        }

        let (key, opposite) = if steering > 0.0 {
            (settings.right_key, settings.left_key)
        } else {
            (settings.left_key, settings.right_key)
        };

        if !settings.oscillate {
            keys.release(opposite)?;
            keys.press(key)?;
            return Ok(());
        }

        let period = tap_period(settings.base_frequency, steering);
        let due = match self.last_toggle {
            Some(last) => now.saturating_duration_since(last) >= period,
            None => true,
        };
        if !due {
            return Ok(());
        }

        self.last_toggle = Some(now);
        self.phase = match self.phase {
            Phase::High => Phase::Low,
            Phase::Low => Phase::High,
        };

        match self.phase {
            Phase::High => {
                keys.release(opposite)?;
                keys.press(key)?;
            }
            Phase::Low => {
                keys.release(settings.left_key)?;
                keys.release(settings.right_key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::recording::OutputLog;

    const LEFT: KeyId = KeyId::Char('a');
    const RIGHT: KeyId = KeyId::Char('d');

    fn settings(oscillate: bool) -> OscillatorSettings {
        OscillatorSettings {
            oscillate,
            base_frequency: 10.0,
            left_key: LEFT,
            right_key: RIGHT,
        }
    }

    fn keyboard() -> (KeyboardSink, OutputLog) {
        let log = OutputLog::new();
        (KeyboardSink::new(Box::new(log.key_injector())), log)
    }

    #[test]
    fn frequency_scenario() {
        let f = tap_frequency(10.0, 0.9);
        assert!((f - 18.5).abs() < 1e-4);
        let period = tap_period(10.0, 0.9);
        assert_eq!(period.as_millis(), 54);
    }

    #[test]
    fn frequency_spans_half_to_double() {
        assert!((tap_frequency(10.0, 0.0) - 5.0).abs() < 1e-6);
        assert!((tap_frequency(10.0, -1.0) - 20.0).abs() < 1e-6);
    }

    #[test]
    fn zero_frequency_does_not_panic() {
        assert_eq!(tap_period(0.0, 0.5), Duration::MAX);
    }

    #[test]
    fn taps_alternate_with_period() {
        let (mut keys, _log) = keyboard();
        let mut osc = OscillatingKeyEmulator::new();
        let s = settings(true);
        let start = Instant::now();

        osc.drive(0.9, start, &s, &mut keys).unwrap();
        assert_eq!(osc.phase(), Phase::High);
        assert!(keys.is_pressed(RIGHT));

        // Within the 54ms period nothing changes
        osc.drive(0.9, start + Duration::from_millis(30), &s, &mut keys).unwrap();
        assert!(keys.is_pressed(RIGHT));

        osc.drive(0.9, start + Duration::from_millis(55), &s, &mut keys).unwrap();
        assert_eq!(osc.phase(), Phase::Low);
        assert!(!keys.is_pressed(RIGHT));
        assert!(!keys.is_pressed(LEFT));

        osc.drive(0.9, start + Duration::from_millis(110), &s, &mut keys).unwrap();
        assert_eq!(osc.phase(), Phase::High);
        assert!(keys.is_pressed(RIGHT));
    }

    #[test]
    fn direction_change_releases_opposite_first() {
        let (mut keys, log) = keyboard();
        let mut osc = OscillatingKeyEmulator::new();
        let s = settings(false);
        let now = Instant::now();

        osc.drive(0.5, now, &s, &mut keys).unwrap();
        osc.drive(-0.5, now, &s, &mut keys).unwrap();
        assert!(keys.is_pressed(LEFT));
        assert!(!keys.is_pressed(RIGHT));

        use crate::output::recording::OutputCall;
        assert_eq!(
            log.calls(),
            vec![
                OutputCall::KeyPress(RIGHT),
                OutputCall::KeyRelease(RIGHT),
                OutputCall::KeyPress(LEFT),
            ]
        );
    }

    #[test]
    fn centering_resets_to_low_and_releases() {
        let (mut keys, _log) = keyboard();
        let mut osc = OscillatingKeyEmulator::new();
        let s = settings(true);
        let now = Instant::now();

        osc.drive(-0.4, now, &s, &mut keys).unwrap();
        assert!(keys.is_pressed(LEFT));

        osc.drive(0.01, now + Duration::from_millis(1), &s, &mut keys).unwrap();
        assert_eq!(osc.phase(), Phase::Low);
        assert!(!keys.is_pressed(LEFT));
        assert!(!keys.is_pressed(RIGHT));

        // Leaving the threshold again presses immediately
        osc.drive(-0.4, now + Duration::from_millis(2), &s, &mut keys).unwrap();
        assert!(keys.is_pressed(LEFT));
    }

    #[test]
    fn steady_mode_holds_without_gaps() {
        let (mut keys, log) = keyboard();
        let mut osc = OscillatingKeyEmulator::new();
        let s = settings(false);
        let start = Instant::now();
        for ms in 0..20 {
            osc.drive(0.3, start + Duration::from_millis(ms * 16), &s, &mut keys).unwrap();
        }
        assert!(keys.is_pressed(RIGHT));
        assert_eq!(log.len(), 1);
    }
}
