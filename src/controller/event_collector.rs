use crate::controller::device::{select_device, DeviceError, DeviceInfo, DeviceSource};
use crate::controller::frame::{HatPosition, RawDeviceFrame, PEDAL_RELEASED_RAW};
use gilrs::{Axis, Button, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tracing::{debug, error, info, warn};

// Axis index order: steering, throttle, brake, clutch
const WHEEL_AXES: [Axis; 4] = [Axis::LeftStickX, Axis::LeftStickY, Axis::LeftZ, Axis::RightZ];

// Named buttons, used to find raw codes gilrs knows about before any event arrived
const NAMED_BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::RightTrigger,
    Button::LeftTrigger,
    Button::RightTrigger2,
    Button::LeftTrigger2,
    Button::Select,
    Button::Start,
    Button::RightThumb,
    Button::LeftThumb,
    Button::Mode,
    Button::C,
    Button::Z,
];

const HAT_BUTTONS: [Button; 4] = [
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Raw button codes in binding index order.
///
/// Codes known at discovery are sorted by raw value, so the indices follow the
/// device's own button numbering. Codes first seen later are appended and never
/// move an existing index. D-pad codes are reported as a hat, not as buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonIndex {
    codes: Vec<u32>,
    hat_codes: Vec<u32>,
}

impl ButtonIndex {
    pub fn new(codes: impl IntoIterator<Item = u32>, hat_codes: Vec<u32>) -> Self {
        let mut codes: Vec<u32> = codes
            .into_iter()
            .filter(|code| !hat_codes.contains(code))
            .collect();
        codes.sort_unstable();
        codes.dedup();
        Self { codes, hat_codes }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Binding index of a raw code, registering unseen codes. `None` for D-pad codes.
    pub fn index_of(&mut self, code: u32) -> Option<usize> {
        if self.hat_codes.contains(&code) {
            return None;
        }
        if let Some(idx) = self.codes.iter().position(|known| *known == code) {
            return Some(idx);
        }
        debug!("New wheel button code {} registered as button {}", code, self.codes.len());
        self.codes.push(code);
        Some(self.codes.len() - 1)
    }

    /// Pressed state per index from `(raw code, pressed)` pairs
    pub fn pressed_states(&mut self, states: impl IntoIterator<Item = (u32, bool)>) -> Vec<bool> {
        let mut buttons = vec![false; self.codes.len()];
        for (code, pressed) in states {
            let Some(idx) = self.index_of(code) else {
                continue;
            };
            if idx >= buttons.len() {
                buttons.resize(idx + 1, false);
            }
            buttons[idx] = pressed;
        }
        buttons
    }
}

// Every raw button code gilrs exposes for the gamepad
fn button_index(gamepad: &Gamepad<'_>) -> ButtonIndex {
    let hat_codes = HAT_BUTTONS
        .iter()
        .filter_map(|button| gamepad.button_code(*button))
        .map(|code| code.into_u32())
        .collect();
    let named = NAMED_BUTTONS
        .iter()
        .filter_map(|button| gamepad.button_code(*button))
        .map(|code| code.into_u32());
    let raw = gamepad.state().buttons().map(|(code, _)| code.into_u32());
    ButtonIndex::new(named.chain(raw), hat_codes)
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

/// Reads a racing wheel through gilrs
#[machine]
#[derive(Debug)]
pub struct WheelCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    // Selected wheel
    active_gamepad: Option<GamepadId>,

    info: DeviceInfo,

    // Raw button code to binding index
    buttons: ButtonIndex,

    // Vendor/model tokens used for discovery
    name_tokens: Vec<String>,
}

// Implementation for Initializing state
impl WheelCollector<Initializing> {
    pub fn create(name_tokens: Vec<String>) -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            DeviceInfo {
                id: 0,
                name: String::new(),
                axis_count: 0,
                button_count: 0,
                hat_count: 0,
            },
            ButtonIndex::default(),
            name_tokens,
        ))
    }

    /// Finds the wheel among the connected gamepads and transitions to Collecting
    pub fn initialize(mut self) -> Result<WheelCollector<Collecting>, DeviceError> {
        let candidates: Vec<(GamepadId, DeviceInfo, ButtonIndex)> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| {
                let axis_count = WHEEL_AXES
                    .iter()
                    .filter(|axis| gamepad.axis_code(**axis).is_some())
                    .count();
                let buttons = button_index(&gamepad);
                let hat_count = if HAT_BUTTONS
                    .iter()
                    .any(|button| gamepad.button_code(*button).is_some())
                {
                    1
                } else {
                    0
                };
                let info = DeviceInfo {
                    id: usize::from(id),
                    name: gamepad.name().to_string(),
                    axis_count,
                    button_count: buttons.len(),
                    hat_count,
                };
                (id, info, buttons)
            })
            .collect();

        info!("Found {} gamepads", candidates.len());
        for (idx, (_, info, _)) in candidates.iter().enumerate() {
            info!("  [{}] ID: {}, Name: {}", idx, info.id, info.name);
        }

        let infos: Vec<DeviceInfo> = candidates
            .iter()
            .map(|(_, info, _)| info.clone())
            .collect();
        let selected = match select_device(&infos, &self.name_tokens) {
            Some(info) => info.clone(),
            None => {
                warn!("No wheel matches {:?}", self.name_tokens);
                return Err(DeviceError::NoMatchingDevice(format!(
                    "{:?}",
                    self.name_tokens
                )));
            }
        };

        if let Some((id, _, buttons)) = candidates
            .into_iter()
            .find(|(_, info, _)| info.id == selected.id)
        {
            self.active_gamepad = Some(id);
            self.buttons = buttons;
        }
        self.info = selected;

        info!("Wheel collector initialized, transitioning to Collecting state");
        Ok(self.transition())
    }
}

// Implementation for Collecting state
impl WheelCollector<Collecting> {
    // Drain pending gilrs events so that the cached gamepad state is current
    fn pump_events(&mut self) {
        while let Some(event) = self.gilrs.next_event() {
            if Some(event.id) != self.active_gamepad {
                continue;
            }
            match event.event {
                EventType::Disconnected => warn!("Wheel disconnected event detected"),
                EventType::Connected => info!("Wheel connected event detected"),
                _ => {}
            }
        }
    }
}

impl DeviceSource for WheelCollector<Collecting> {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn poll(&mut self) -> Result<RawDeviceFrame, DeviceError> {
        self.pump_events();

        let id = self
            .active_gamepad
            .ok_or_else(|| DeviceError::PollError("no wheel selected".to_string()))?;
        let gamepad = self
            .gilrs
            .connected_gamepad(id)
            .ok_or_else(|| DeviceError::Disconnected(self.info.name.clone()))?;

        let axis = |axis: Axis, fallback: f32| {
            gamepad
                .axis_data(axis)
                .map(|data| data.value())
                .unwrap_or(fallback)
        };

        let buttons = self.buttons.pressed_states(
            gamepad
                .state()
                .buttons()
                .map(|(code, data)| (code.into_u32(), data.is_pressed())),
        );

        let mut hats = Vec::with_capacity(self.info.hat_count);
        if self.info.hat_count > 0 {
            let x = i8::from(gamepad.is_pressed(Button::DPadRight))
                - i8::from(gamepad.is_pressed(Button::DPadLeft));
            let y = i8::from(gamepad.is_pressed(Button::DPadUp))
                - i8::from(gamepad.is_pressed(Button::DPadDown));
            hats.push(HatPosition::new(x, y));
        }

        let frame = RawDeviceFrame {
            steering: axis(WHEEL_AXES[0], 0.0),
            throttle: axis(WHEEL_AXES[1], PEDAL_RELEASED_RAW),
            brake: axis(WHEEL_AXES[2], PEDAL_RELEASED_RAW),
            clutch: axis(WHEEL_AXES[3], PEDAL_RELEASED_RAW),
            buttons,
            hats,
        };
        debug!("Polled wheel frame: {:?}", frame);
        Ok(frame)
    }
}

/// Opens the first connected wheel whose name matches one of the tokens
pub fn open_wheel(name_tokens: Vec<String>) -> Result<Box<dyn DeviceSource>, DeviceError> {
    let collector = WheelCollector::create(name_tokens)?.initialize()?;
    Ok(Box::new(collector))
}
