use std::fmt;
use std::io;

use serialhid_channel::{ChannelError, FaultKind};
use serialhid_device::DeviceError;
use serialhid_frame::FrameError;
use serialhid_monitor::MonitorError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const CHANNEL_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

fn fault_code(kind: FaultKind) -> i32 {
    match kind {
        FaultKind::PermissionDenied | FaultKind::ReadOnlyFilesystem => PERMISSION_DENIED,
        FaultKind::NotATerminal | FaultKind::InvalidPort | FaultKind::IsADirectory => USAGE,
        FaultKind::NoAvailablePorts => FAILURE,
        FaultKind::TooManyOpenFiles | FaultKind::FileTableOverflow => INTERNAL,
        _ => CHANNEL_ERROR,
    }
}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    let code = match &err {
        ChannelError::UnsupportedBaud(_) => USAGE,
        ChannelError::Closed => FAILURE,
        other => other.fault().map_or(CHANNEL_ERROR, fault_code),
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Channel(err) => channel_error(context, err),
        FrameError::FrameTooLong { .. } | FrameError::ValueTooWide { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::UnsupportedEncode { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::InvalidResolution(_) => CliError::new(USAGE, format!("{context}: {err}")),
        DeviceError::Frame(err) => frame_error(context, err),
    }
}

pub fn monitor_error(context: &str, err: MonitorError) -> CliError {
    match err {
        MonitorError::Channel(err) => channel_error(context, err),
        MonitorError::Frame(err) => frame_error(context, err),
        MonitorError::Device(err) => device_error(context, err),
        MonitorError::ChannelLost { .. } => {
            CliError::new(CHANNEL_ERROR, format!("{context}: {err}"))
        }
        MonitorError::ThreadSpawn(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
