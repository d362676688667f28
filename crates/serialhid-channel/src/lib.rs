//! Byte channel abstraction for serial peripherals.
//!
//! This is the lowest layer of serialhid. It provides:
//! - the [`Channel`] contract every framing strategy reads from and writes to
//! - [`TtyChannel`], a POSIX terminal device configured through termios
//! - [`StreamChannel`], an adapter over any `Read + Write` stream
//! - the fault interpreter, mapping raw return codes onto [`FaultKind`]
//! - port discovery and modem control lines for terminal devices
//!
//! Everything else builds on top of [`Channel`].

pub mod config;
pub mod error;
pub mod fault;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod modem;
#[cfg(unix)]
pub mod ports;
#[cfg(unix)]
pub mod tty;

pub use config::{BaudRate, ChannelConfig, ReadMode};
pub use error::{ChannelError, Result};
pub use fault::{FaultKind, INVALID_PORT, NO_AVAILABLE_PORTS, OPERATION_FAILED};
pub use stream::StreamChannel;
pub use traits::Channel;

#[cfg(unix)]
pub use modem::ModemBits;
#[cfg(unix)]
pub use ports::{list_ports, list_ports_in, PortInfo, PortKind};
#[cfg(unix)]
pub use tty::TtyChannel;
