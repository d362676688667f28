//! Report framing for serial peripherals.
//!
//! Turns a byte stream read from a [`Channel`](serialhid_channel::Channel)
//! into raw report frames, and raw frames back into bytes. Two strategies:
//! - [`TerminatedFraming`]: text frames ending in a terminator sequence
//! - [`ClockedFraming`]: fixed-length binary frames assembled one register
//!   per clock tick into a `u64`
//!
//! Device-specific interpretation of a raw frame lives behind [`Decoder`].

pub mod clocked;
pub mod descriptor;
pub mod error;
pub mod strategy;
pub mod terminated;

pub use clocked::{ClockedFraming, MAX_REPORT_BITS};
pub use descriptor::{DecodeWarning, Decoded, Decoder, ReportDescriptor};
pub use error::{FrameError, Result};
pub use strategy::FrameStrategy;
pub use terminated::{TerminatedFraming, MAX_UNTERMINATED_FRAME};
