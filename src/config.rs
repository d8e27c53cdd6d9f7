//! # Configuration
//!
//! `WheelConfig` is the single record of every tunable the engine reads. The
//! engine takes one snapshot per tick, so a config swap never lands mid tick.
//!
//! The file lives in `<config dir>/wheelbridge/config.toml`. Missing keys fall
//! back to their defaults and a broken file never blocks startup: it is logged
//! and the defaults are used instead.

use crate::controller::HatDirection;
use crate::mapping::OutputMode;
use crate::output::{KeyId, StickSide};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "wheelbridge";
const CONFIG_FILE: &str = "config.toml";

/// Where the pedals go on the virtual pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedalAxisTarget {
    /// Throttle on the right trigger, brake on the left
    Triggers,
    /// Throttle on the left stick X axis
    LeftX,
    /// Throttle on the left stick Y axis
    LeftY,
    /// Brake on the right stick X axis
    RightX,
    /// Brake on the right stick Y axis
    RightY,
}

/// Wheel button index to a key name or, in virtual pad mode, a pad button name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub button: u32,
    pub action: String,
}

/// Hat direction binding, applied to every hat of the wheel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatBinding {
    pub direction: HatDirection,
    pub action: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WheelConfig {
    pub control_mode: OutputMode,

    // Steering
    pub steering_sensitivity: f32,
    pub steering_deadzone: f32,
    pub mouse_sensitivity: f32,

    // Keyboard
    pub throttle_key: KeyId,
    pub brake_key: KeyId,
    pub steer_left_key: KeyId,
    pub steer_right_key: KeyId,
    pub keyboard_steering_lfo: bool,
    /// Hz
    pub keyboard_steering_frequency: f32,

    pub swap_brake_clutch: bool,

    // Mouse
    pub invert_mouse_steering: bool,
    pub mouse_return_center: bool,
    pub mouse_return_speed: f32,

    // Virtual pad
    pub controller_steering_range: f32,
    pub controller_stick_mode: StickSide,
    pub controller_throttle_axis: PedalAxisTarget,

    // Device and loop
    pub device_name_tokens: Vec<String>,
    pub tick_interval_ms: u64,
    pub fault_backoff_ms: u64,

    #[serde(rename = "buttons")]
    pub button_bindings: Vec<ButtonBinding>,
    #[serde(rename = "hat")]
    pub hat_bindings: Vec<HatBinding>,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            control_mode: OutputMode::MouseSteering,
            steering_sensitivity: 1.0,
            steering_deadzone: 0.05,
            mouse_sensitivity: 3.0,
            throttle_key: KeyId::Char('w'),
            brake_key: KeyId::Char('s'),
            steer_left_key: KeyId::Char('a'),
            steer_right_key: KeyId::Char('d'),
            keyboard_steering_lfo: true,
            keyboard_steering_frequency: 10.0,
            swap_brake_clutch: false,
            invert_mouse_steering: false,
            mouse_return_center: true,
            mouse_return_speed: 0.95,
            controller_steering_range: 1.0,
            controller_stick_mode: StickSide::Left,
            controller_throttle_axis: PedalAxisTarget::LeftY,
            device_name_tokens: vec!["g29".to_string(), "logitech".to_string()],
            tick_interval_ms: 16,
            fault_backoff_ms: 100,
            button_bindings: default_button_bindings(),
            hat_bindings: default_hat_bindings(),
        }
    }
}

impl WheelConfig {
    /// First binding for `button`, if any
    pub fn button_action(&self, button: u32) -> Option<&str> {
        self.button_bindings
            .iter()
            .find(|binding| binding.button == button)
            .map(|binding| binding.action.as_str())
    }

    pub fn hat_action(&self, direction: HatDirection) -> Option<&str> {
        self.hat_bindings
            .iter()
            .find(|binding| binding.direction == direction)
            .map(|binding| binding.action.as_str())
    }
}

/// G29 layout: X/square/circle/triangle, paddles, shifter buttons, plus and minus
fn default_button_bindings() -> Vec<ButtonBinding> {
    [
        (0, "space"),
        (1, "space"),
        (2, "c"),
        (3, "r"),
        (4, "e"),
        (5, "q"),
        (6, "r"),
        (7, "f"),
        (8, "tab"),
        (9, "esc"),
        (10, "ctrl"),
        (11, "shift"),
        (23, "f"),
        (24, "esc"),
    ]
    .into_iter()
    .map(|(button, action)| ButtonBinding {
        button,
        action: action.to_string(),
    })
    .collect()
}

fn default_hat_bindings() -> Vec<HatBinding> {
    [
        (HatDirection::Up, "1"),
        (HatDirection::Down, "2"),
        (HatDirection::Left, "3"),
        (HatDirection::Right, "4"),
    ]
    .into_iter()
    .map(|(direction, action)| HatBinding {
        direction,
        action: action.to_string(),
    })
    .collect()
}

/// Loads and saves [`WheelConfig`] as TOML
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/wheelbridge/config.toml`
    pub fn at_default_location() -> Self {
        Self::new(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<WheelConfig> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", self.path.display(), e))?;

        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", self.path.display(), e))
    }

    /// Loads the file, writing the defaults first if it does not exist yet.
    ///
    /// A file that cannot be read or parsed yields the defaults.
    pub async fn load_or_default(&self) -> WheelConfig {
        let exists = tokio::fs::try_exists(&self.path).await.unwrap_or(false);
        if !exists {
            info!(
                "No config at {}, writing defaults",
                self.path.display()
            );
            let config = WheelConfig::default();
            if let Err(e) = self.save(&config).await {
                warn!("Could not write default config: {}", e);
            }
            return config;
        }

        match self.load().await {
            Ok(config) => {
                debug!("Loaded config from {}", self.path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                WheelConfig::default()
            }
        }
    }

    pub async fn save(&self, config: &WheelConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", self.path.display(), e))?;

        info!("Config saved to {}", self.path.display());
        Ok(())
    }
}

fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| {
        warn!("Could not determine config directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}
