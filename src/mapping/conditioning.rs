//! Signal conditioning for analog wheel axes.
//!
//! Everything here is pure. Smoothing takes its previous output as an argument
//! so the caller owns the filter memory.

/// Largest magnitude of a virtual stick axis
pub const STICK_AXIS_MAX: f32 = 32767.0;

/// Largest value of a virtual trigger
pub const TRIGGER_MAX: f32 = 255.0;

/// Zeroes values inside the deadzone and rescales the rest so the output still
/// spans [-1, 1].
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        (value - sign * deadzone) / (1.0 - deadzone)
    }
}

/// Multiplies by the sensitivity. Not clamped.
pub fn scale(value: f32, sensitivity: f32) -> f32 {
    value * sensitivity
}

/// One step of an exponential low-pass filter. `factor` = 1 disables smoothing.
pub fn smooth(previous: f32, target: f32, factor: f32) -> f32 {
    previous + (target - previous) * factor
}

/// Maps a raw pedal axis (-1 = fully pressed, 1 = released) to [0, 1] where
/// 1 is fully pressed.
pub fn normalize_pedal(raw: f32) -> f32 {
    ((1.0 - raw) / 2.0).clamp(0.0, 1.0)
}

pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// [-1, 1] to the virtual stick range, clamping first
pub fn to_stick_axis(value: f32) -> i16 {
    (clamp_unit(value) * STICK_AXIS_MAX) as i16
}

/// [0, 1] to the virtual trigger range, clamping first
pub fn to_trigger(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * TRIGGER_MAX) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn deadzone_scenario() {
        let conditioned = scale(apply_deadzone(0.5, 0.05), 1.0);
        assert!(close(conditioned, 0.45 / 0.95));
        assert!(close(conditioned, 0.4737));
    }

    #[test]
    fn deadzone_edges() {
        assert_eq!(apply_deadzone(0.049, 0.05), 0.0);
        assert_eq!(apply_deadzone(-0.049, 0.05), 0.0);
        assert_eq!(apply_deadzone(0.05, 0.05), 0.0);
        assert!(close(apply_deadzone(1.0, 0.05), 1.0));
        assert!(close(apply_deadzone(-1.0, 0.05), -1.0));
        assert_eq!(apply_deadzone(0.3, 0.0), 0.3);
    }

    #[test]
    fn scale_is_not_clamped() {
        assert_eq!(scale(0.8, 2.0), 1.6);
    }

    #[test]
    fn smoothing_converges_and_factor_one_passes_through() {
        assert_eq!(smooth(0.0, 1.0, 1.0), 1.0);
        assert!(close(smooth(0.0, 1.0, 0.3), 0.3));

        let mut value = 0.0;
        for _ in 0..60 {
            value = smooth(value, 2.0, 0.3);
        }
        assert!(close(value, 2.0));
    }

    #[test]
    fn pedal_normalization_follows_device_convention() {
        assert_eq!(normalize_pedal(-1.0), 1.0);
        assert_eq!(normalize_pedal(1.0), 0.0);
        assert_eq!(normalize_pedal(0.0), 0.5);
        assert_eq!(normalize_pedal(-1.5), 1.0);
    }

    #[test]
    fn virtual_ranges() {
        assert_eq!(to_stick_axis(1.0), 32767);
        assert_eq!(to_stick_axis(-1.0), -32767);
        assert_eq!(to_stick_axis(-7.0), -32767);
        assert_eq!(to_stick_axis(0.0), 0);
        assert_eq!(to_trigger(1.0), 255);
        assert_eq!(to_trigger(0.0), 0);
        assert_eq!(to_trigger(-0.2), 0);
        assert_eq!(to_trigger(1.2), 255);
    }
}
