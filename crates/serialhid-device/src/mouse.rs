use serde::Serialize;
use serialhid_frame::{
    ClockedFraming, DecodeWarning, Decoded, Decoder, FrameError, ReportDescriptor,
};

use crate::device::HidDevice;

const DEFAULT_VENDOR: &str = "Mouse-Serial-HID";

/// Bytes in one mouse report.
const REPORT_BYTES: usize = 4;

/// The three standard buttons, bits 0-2 of byte 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Relative pointer movement since the previous report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Pointer {
    pub x: i8,
    pub y: i8,
}

/// A standard 4-byte mouse report.
///
/// ```text
/// byte 0: bits 0-2 buttons, bits 4-7 device-specific nibble
/// byte 1: pointer X
/// byte 2: pointer Y
/// byte 3: device-specific
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MouseReport {
    pub buttons: MouseButtons,
    pub pointer: Pointer,
    /// High nibble of byte 0 and all of byte 3.
    pub device_specific: [u8; 2],
}

impl MouseReport {
    fn from_bytes([status, x, y, extra]: [u8; REPORT_BYTES]) -> Self {
        Self {
            buttons: MouseButtons {
                left: status & 0b001 != 0,
                right: status & 0b010 != 0,
                middle: status & 0b100 != 0,
            },
            pointer: Pointer {
                x: x as i8,
                y: y as i8,
            },
            device_specific: [status >> 4, extra],
        }
    }
}

/// A serial mouse. Read-only.
#[derive(Debug, Clone)]
pub struct MouseDevice {
    vendor: String,
}

impl MouseDevice {
    pub fn new() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn descriptor() -> serialhid_frame::Result<ReportDescriptor> {
        ReportDescriptor::new(REPORT_BYTES, 1)
    }
}

impl Default for MouseDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MouseDevice {
    type Raw = u64;
    type Report = MouseReport;

    fn decode(&self, raw: &u64) -> Decoded<MouseReport> {
        match u32::try_from(*raw) {
            Ok(value) => Decoded::clean(MouseReport::from_bytes(value.to_le_bytes())),
            Err(_) => Decoded::degraded(
                MouseReport::default(),
                DecodeWarning::new(Self::NAME, format!("raw value {raw:#x} is wider than 32 bits")),
            ),
        }
    }

    fn encode(&self, _report: &MouseReport) -> serialhid_frame::Result<u64> {
        Err(FrameError::UnsupportedEncode { device: Self::NAME })
    }
}

impl HidDevice for MouseDevice {
    type Framing = ClockedFraming;

    const NAME: &'static str = "mouse";

    fn framing(&self) -> serialhid_frame::Result<ClockedFraming> {
        ClockedFraming::new(Self::descriptor()?)
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }
}
