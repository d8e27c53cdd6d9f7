//! Wheel input side of the bridge
//!
//! 1. [`device`] - The [`DeviceSource`] collaborator and wheel discovery
//! 2. [`event_collector`] - gilrs backed wheel reader
//! 3. [`frame`] - One raw sample per tick
//! 4. [`edge_tracker`] - Press/release detection on buttons and hat directions
//!
//! ```text
//! Wheel ──► DeviceSource::poll ──► RawDeviceFrame ──► EdgeTracker ──► EdgeEvent
//! ```

pub mod device;
pub mod edge_tracker;
pub mod event_collector;
pub mod frame;

pub use device::{DeviceError, DeviceFactory, DeviceInfo, DeviceSource};
pub use edge_tracker::{Edge, EdgeEvent, EdgeTracker, InputId};
pub use frame::{HatDirection, HatPosition, RawDeviceFrame};
