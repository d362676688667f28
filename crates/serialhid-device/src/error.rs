use serialhid_frame::FrameError;

/// Errors that can occur while configuring a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// ADC resolution must be a positive multiple of 8, at most 64.
    #[error("invalid resolution: {0} bits (expected a positive multiple of 8, at most 64)")]
    InvalidResolution(i32),

    /// The device's framing could not be built.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
