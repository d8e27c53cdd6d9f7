use crate::controller::DeviceError;
use crate::output::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable wheel at start. The only fatal error.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(DeviceError),

    #[error("Device fault: {0}")]
    DeviceFault(#[from] DeviceError),

    #[error("Output fault: {0}")]
    OutputFault(#[from] SinkError),

    #[error("Thread error: {0}")]
    ThreadError(String),
}
