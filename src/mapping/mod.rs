//! Translation of wheel input into keyboard, mouse and virtual pad output.
//!
//! - [`conditioning`] - deadzone, scaling, smoothing, pedal normalization
//! - [`oscillator`] - proportional steering from two digital keys
//! - [`strategy`] - one [`ModeStrategy`] per [`OutputMode`]
//! - [`router`] - owns the sinks and applies the active strategy each tick

pub mod conditioning;
pub mod oscillator;
pub mod router;
pub mod strategy;

pub use oscillator::{OscillatingKeyEmulator, OscillatorSettings};
pub use router::{ModeRouter, SinkSet};
pub use strategy::{BindingTarget, ModeStrategy, OutputMode, PedalValues};
