use serde::{Deserialize, Serialize};

/// Pedal value reported for an axis the device does not have (released).
pub const PEDAL_RELEASED_RAW: f32 = 1.0;

// Hat direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HatDirection {
    Up,
    Down,
    Left,
    Right,
}

impl HatDirection {
    pub const ALL: [HatDirection; 4] = [
        HatDirection::Up,
        HatDirection::Down,
        HatDirection::Left,
        HatDirection::Right,
    ];
}

/// Hat position in the usual joystick convention: `x` is -1 (left), 0 or 1 (right),
/// `y` is -1 (down), 0 or 1 (up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HatPosition {
    pub x: i8,
    pub y: i8,
}

impl HatPosition {
    pub const CENTERED: HatPosition = HatPosition { x: 0, y: 0 };

    pub fn new(x: i8, y: i8) -> Self {
        Self {
            x: x.signum(),
            y: y.signum(),
        }
    }

    pub fn is_pressed(&self, direction: HatDirection) -> bool {
        match direction {
            HatDirection::Up => self.y == 1,
            HatDirection::Down => self.y == -1,
            HatDirection::Left => self.x == -1,
            HatDirection::Right => self.x == 1,
        }
    }
}

/// One sample of the wheel, produced once per tick by a [`DeviceSource`].
///
/// Axes are in the canonical [-1, 1] range. Pedals follow the device convention
/// where -1 is fully pressed and 1 is released.
///
/// [`DeviceSource`]: crate::controller::DeviceSource
#[derive(Debug, Clone, PartialEq)]
pub struct RawDeviceFrame {
    pub steering: f32,
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    /// Pressed state indexed by button id
    pub buttons: Vec<bool>,
    /// Hat positions indexed by hat id
    pub hats: Vec<HatPosition>,
}

impl Default for RawDeviceFrame {
    fn default() -> Self {
        Self {
            steering: 0.0,
            throttle: PEDAL_RELEASED_RAW,
            brake: PEDAL_RELEASED_RAW,
            clutch: PEDAL_RELEASED_RAW,
            buttons: Vec::new(),
            hats: Vec::new(),
        }
    }
}

impl RawDeviceFrame {
    pub fn is_button_pressed(&self, button: u32) -> bool {
        self.buttons.get(button as usize).copied().unwrap_or(false)
    }

    pub fn pressed_buttons(&self) -> Vec<u32> {
        self.buttons
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .map(|(idx, _)| idx as u32)
            .collect()
    }

    // Builder helpers, mostly used by scripted devices
    pub fn with_steering(mut self, steering: f32) -> Self {
        self.steering = steering;
        self
    }

    pub fn with_pedals(mut self, throttle: f32, brake: f32, clutch: f32) -> Self {
        self.throttle = throttle;
        self.brake = brake;
        self.clutch = clutch;
        self
    }

    pub fn with_button(mut self, button: u32, pressed: bool) -> Self {
        let idx = button as usize;
        if self.buttons.len() <= idx {
            self.buttons.resize(idx + 1, false);
        }
        self.buttons[idx] = pressed;
        self
    }

    pub fn with_hat(mut self, hat: u32, position: HatPosition) -> Self {
        let idx = hat as usize;
        if self.hats.len() <= idx {
            self.hats.resize(idx + 1, HatPosition::CENTERED);
        }
        self.hats[idx] = position;
        self
    }
}
