use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Line speed of a terminal device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
    ];

    /// The rate in bits per second.
    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1_200,
            BaudRate::B2400 => 2_400,
            BaudRate::B4800 => 4_800,
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
            BaudRate::B230400 => 230_400,
        }
    }

    /// Look up the rate matching `bps` exactly.
    pub fn from_bits_per_second(bps: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.bits_per_second() == bps)
    }

    #[cfg(unix)]
    pub(crate) fn speed(self) -> libc::speed_t {
        match self {
            BaudRate::B1200 => libc::B1200,
            BaudRate::B2400 => libc::B2400,
            BaudRate::B4800 => libc::B4800,
            BaudRate::B9600 => libc::B9600,
            BaudRate::B19200 => libc::B19200,
            BaudRate::B38400 => libc::B38400,
            BaudRate::B57600 => libc::B57600,
            BaudRate::B115200 => libc::B115200,
            BaudRate::B230400 => libc::B230400,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = ChannelError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bits_per_second(bps).ok_or(ChannelError::UnsupportedBaud(bps))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.bits_per_second()
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

/// How `read` behaves when the input queue is empty.
///
/// Maps onto the termios `VTIME`/`VMIN` pair. Timeouts are in tenths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReadMode {
    /// Return immediately with whatever is queued, possibly nothing.
    Polling,
    /// Block until at least one byte arrives.
    BlockingOneByte,
    /// Block up to `deciseconds` for the first byte.
    Timeout { deciseconds: u8 },
    /// Block for `min_bytes`, giving up `deciseconds` after the last byte seen.
    InterByteTimeout { deciseconds: u8, min_bytes: u8 },
}

impl ReadMode {
    /// The `(VTIME, VMIN)` pair for this mode.
    pub fn vtime_vmin(self) -> (u8, u8) {
        match self {
            ReadMode::Polling => (0, 0),
            ReadMode::BlockingOneByte => (0, 1),
            ReadMode::Timeout { deciseconds } => (deciseconds, 0),
            ReadMode::InterByteTimeout {
                deciseconds,
                min_bytes,
            } => (deciseconds, min_bytes),
        }
    }

    /// True when an empty read returns without waiting.
    pub fn is_non_blocking(self) -> bool {
        self.vtime_vmin() == (0, 0)
    }
}

/// Configuration applied to a terminal device after it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Line speed for both directions. Default: 9600.
    pub baud: BaudRate,
    /// Read policy. Default: [`ReadMode::Polling`].
    pub read_mode: ReadMode,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            baud: BaudRate::B9600,
            read_mode: ReadMode::Polling,
        }
    }
}
