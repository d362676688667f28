//! Serial human interface devices: typed reports over terminal devices.
//!
//! serialhid reads structured reports from character-oriented peripherals
//! (joysticks, ADCs, GPIO banks, mice on a serial line) and writes reports
//! back, hiding byte-level framing and channel faults from the caller.
//!
//! # Crate Structure
//!
//! - [`channel`]: byte channel contract, termios terminal devices, fault interpretation
//! - [`frame`]: report descriptors, the decoder contract, terminator and clocked framing
//! - [`device`]: joystick, analog, GPIO and mouse registries
//! - [`monitor`]: the read/write monitor loop (behind `monitor` feature)

/// Re-export channel types.
pub mod channel {
    pub use serialhid_channel::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialhid_frame::*;
}

/// Re-export device types.
pub mod device {
    pub use serialhid_device::*;
}

/// Re-export monitor types (requires `monitor` feature).
#[cfg(feature = "monitor")]
pub mod monitor {
    pub use serialhid_monitor::*;
}
