use serde::Serialize;
use serialhid_frame::{ClockedFraming, DecodeWarning, Decoded, Decoder, ReportDescriptor};

use crate::device::HidDevice;

/// Pins on one GPIO module.
pub const GPIO_PINS: usize = 8;

const DEFAULT_VENDOR: &str = "GPIO-Module-Serial-HID";

/// Levels of the eight pins; pin `i` is bit `i` of the wire byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GpioReport {
    pub pins: [bool; GPIO_PINS],
}

impl GpioReport {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            pins: std::array::from_fn(|pin| bits & (1 << pin) != 0),
        }
    }

    pub fn bits(&self) -> u8 {
        self.pins
            .iter()
            .enumerate()
            .filter(|(_, high)| **high)
            .fold(0u8, |bits, (pin, _)| bits | (1 << pin))
    }

    /// Level of `pin`; out-of-range pins read low.
    pub fn pin(&self, pin: usize) -> bool {
        self.pins.get(pin).copied().unwrap_or(false)
    }
}

/// An 8-pin digital I/O module. Reads and writes one byte per report.
#[derive(Debug, Clone)]
pub struct GpioDevice {
    vendor: String,
}

impl GpioDevice {
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
        ReportDescriptor::new(1, 1)
    }
}

impl Default for GpioDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for GpioDevice {
    type Raw = u64;
    type Report = GpioReport;

    fn decode(&self, raw: &u64) -> Decoded<GpioReport> {
        match u8::try_from(*raw) {
            Ok(bits) => Decoded::clean(GpioReport::from_bits(bits)),
            Err(_) => Decoded::degraded(
                GpioReport::default(),
                DecodeWarning::new(Self::NAME, format!("raw value {raw:#x} is wider than 8 pins")),
            ),
        }
    }

    fn encode(&self, report: &GpioReport) -> serialhid_frame::Result<u64> {
        Ok(u64::from(report.bits()))
    }
}

impl HidDevice for GpioDevice {
    type Framing = ClockedFraming;

    const NAME: &'static str = "gpio";

    fn framing(&self) -> serialhid_frame::Result<ClockedFraming> {
        ClockedFraming::new(Self::descriptor()?)
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }
}
