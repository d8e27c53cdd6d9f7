use crate::controller::frame::RawDeviceFrame;
use tracing::{debug, info};

// Device errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to initialize input backend: {0}")]
    InitializationError(String),

    #[error("No wheel matching {0} connected")]
    NoMatchingDevice(String),

    #[error("Wheel disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to poll wheel: {0}")]
    PollError(String),
}

/// Identification and capabilities of a connected input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: usize,
    pub name: String,
    pub axis_count: usize,
    pub button_count: usize,
    pub hat_count: usize,
}

/// Collaborator that reads the wheel and produces one frame per tick.
pub trait DeviceSource {
    fn info(&self) -> &DeviceInfo;

    fn poll(&mut self) -> Result<RawDeviceFrame, DeviceError>;

    fn axis_count(&self) -> usize {
        self.info().axis_count
    }

    fn button_count(&self) -> usize {
        self.info().button_count
    }

    fn hat_count(&self) -> usize {
        self.info().hat_count
    }
}

/// Creates the device on the engine thread so that backends which are not `Send`
/// never cross threads.
pub type DeviceFactory =
    Box<dyn FnOnce() -> Result<Box<dyn DeviceSource>, DeviceError> + Send + 'static>;

/// Case-insensitive substring match of a device name against vendor/model tokens
pub fn matches_tokens(name: &str, tokens: &[String]) -> bool {
    let name = name.to_lowercase();
    tokens
        .iter()
        .filter(|token| !token.is_empty())
        .any(|token| name.contains(&token.to_lowercase()))
}

/// Picks the first candidate whose name matches one of the tokens
pub fn select_device<'a>(candidates: &'a [DeviceInfo], tokens: &[String]) -> Option<&'a DeviceInfo> {
    for candidate in candidates {
        if matches_tokens(&candidate.name, tokens) {
            info!(
                "Found wheel: {} (axes: {}, buttons: {}, hats: {})",
                candidate.name, candidate.axis_count, candidate.button_count, candidate.hat_count
            );
            return Some(candidate);
        }
        debug!("Skipping device that matches no token: {}", candidate.name);
    }
    None
}
