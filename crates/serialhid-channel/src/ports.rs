//! Serial port discovery.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{ChannelError, Result};
use crate::fault::FaultKind;

/// Directory scanned by [`list_ports`].
pub const DEVICE_DIR: &str = "/dev";

/// Which driver family a port name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// `ttyUSB*`: USB-to-serial bridges (FTDI, CH340, CP210x).
    Usb,
    /// `ttyACM*`: USB CDC-ACM devices such as most microcontroller boards.
    Acm,
    /// `ttyS*`: on-board UARTs.
    Platform,
}

impl PortKind {
    const PREFIXES: [(&'static str, PortKind); 3] = [
        ("ttyUSB", PortKind::Usb),
        ("ttyACM", PortKind::Acm),
        ("ttyS", PortKind::Platform),
    ];

    /// Classify a device file name, returning the kind and its unit number.
    pub fn classify(name: &str) -> Option<(PortKind, u32)> {
        Self::PREFIXES.iter().find_map(|(prefix, kind)| {
            let unit = name.strip_prefix(prefix)?.parse().ok()?;
            Some((*kind, unit))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            PortKind::Usb => "usb",
            PortKind::Acm => "acm",
            PortKind::Platform => "platform",
        }
    }
}

/// One candidate serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub path: PathBuf,
    pub kind: PortKind,
    pub unit: u32,
}

/// Every serial port under [`DEVICE_DIR`].
///
/// Fails with [`FaultKind::NoAvailablePorts`] when nothing matches.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = list_ports_in(DEVICE_DIR)?;
    if ports.is_empty() {
        return Err(ChannelError::Fault {
            op: "scan",
            kind: FaultKind::NoAvailablePorts,
        });
    }
    Ok(ports)
}

/// Every entry in `dir` named like a serial port, USB bridges first and
/// then by unit number.
pub fn list_ports_in(dir: impl AsRef<Path>) -> Result<Vec<PortInfo>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|err| ChannelError::from_io("scan", &err))?;

    let mut ports: Vec<PortInfo> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|ty| !ty.is_dir()))
        .filter_map(|entry| {
            let name = entry.file_name();
            let (kind, unit) = PortKind::classify(name.to_str()?)?;
            Some(PortInfo {
                path: entry.path(),
                kind,
                unit,
            })
        })
        .collect();
    ports.sort_by_key(|port| (port.kind, port.unit));

    debug!(dir = ?dir, count = ports.len(), "scanned for serial ports");
    Ok(ports)
}
