//! The running bridge: a fixed rate loop on its own thread and the handle that owns it.
//!
//! ```text
//! EngineHandle ──start──► engine thread: TickScheduler<Running>
//!      │  ▲                     │
//!      │  └── watch<TickSnapshot>
//!      └───── watch<Arc<WheelConfig>> ──► read once per tick
//! ```

pub mod error;
pub mod handle;
pub mod scheduler;
pub mod telemetry;

pub use error::EngineError;
pub use handle::{EngineHandle, EngineIo};
pub use scheduler::{SchedulerState, TickScheduler};
pub use telemetry::{TickSnapshot, TickStats};
