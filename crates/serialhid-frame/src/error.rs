use serialhid_channel::ChannelError;

/// Errors that can occur while framing, encoding or decoding reports.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Too many bytes arrived without the frame terminator.
    #[error("frame too long ({len} bytes without terminator, max {max})")]
    FrameTooLong { len: usize, max: usize },

    /// The device is read-only and cannot encode reports.
    #[error("{device} does not support encoding reports")]
    UnsupportedEncode { device: &'static str },

    /// A report descriptor with a zero field, or one that disagrees with its framing.
    #[error("invalid report descriptor: {0}")]
    InvalidDescriptor(&'static str),

    /// The report would not fit in the 64-bit accumulator.
    #[error("report too wide ({bits} bits, max 64)")]
    ReportTooWide { bits: usize },

    /// A value handed to the encoder has bits beyond the report width.
    #[error("value {value:#x} does not fit in a {bits}-bit report")]
    ValueTooWide { value: u64, bits: usize },

    /// The channel accepted zero bytes while a frame was being written.
    #[error("channel accepted no bytes ({written} of {expected} written)")]
    WriteZero { written: usize, expected: usize },

    /// The underlying channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl FrameError {
    /// True when the device behind the channel looks gone.
    pub fn is_channel_loss(&self) -> bool {
        matches!(self, FrameError::Channel(err) if err.is_channel_loss())
    }

    /// True when the channel has been closed and can never be used again.
    pub fn is_closed(&self) -> bool {
        matches!(self, FrameError::Channel(err) if err.is_closed())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
