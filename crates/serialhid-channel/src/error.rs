use std::path::PathBuf;

use crate::fault::FaultKind;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to open the device at the specified path.
    #[error("failed to open {path}: {kind}")]
    Open { path: PathBuf, kind: FaultKind },

    /// Failed to apply terminal attributes to an open device.
    #[error("failed to configure channel: {0}")]
    Configure(FaultKind),

    /// A channel operation failed; `op` names it (`read`, `write`, `seek`, `modem`, `scan`).
    #[error("channel {op} failed: {kind}")]
    Fault { op: &'static str, kind: FaultKind },

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// The channel has been closed.
    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    /// The semantic fault behind this error, if there is one.
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            ChannelError::Open { kind, .. }
            | ChannelError::Configure(kind)
            | ChannelError::Fault { kind, .. } => Some(*kind),
            ChannelError::UnsupportedBaud(_) | ChannelError::Closed => None,
        }
    }

    /// True for steady-state conditions that only mean "no data yet".
    pub fn is_transient(&self) -> bool {
        self.fault().is_some_and(FaultKind::is_transient)
    }

    /// True when the device looks gone (unplugged, hung up, descriptor invalidated).
    pub fn is_channel_loss(&self) -> bool {
        self.fault().is_some_and(FaultKind::is_channel_loss)
    }

    /// True when the channel can never be used again.
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }

    pub(crate) fn from_io(op: &'static str, err: &std::io::Error) -> Self {
        ChannelError::Fault {
            op,
            kind: FaultKind::from_io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
