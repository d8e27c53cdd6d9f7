//! Racing wheel to keyboard, mouse and virtual gamepad bridge.
//!
//! ```text
//! controller ──► mapping ──► output
//!      ▲            ▲
//!      └── engine ──┘  (tick loop, lifecycle, snapshots)
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod mapping;
pub mod output;

pub use config::{ConfigStore, WheelConfig};
pub use engine::{EngineError, EngineHandle, EngineIo, TickSnapshot};
pub use mapping::OutputMode;
