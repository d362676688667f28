use serde::Serialize;
use serialhid_frame::{ClockedFraming, Decoded, Decoder, ReportDescriptor, MAX_REPORT_BITS};

use crate::device::HidDevice;
use crate::error::{DeviceError, Result};

/// ADC resolution used by [`AnalogDevice::default`].
pub const DEFAULT_RESOLUTION: i32 = 8;

const DEFAULT_VENDOR: &str = "AnalogDevice-Serial-HID";

/// One ADC sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AnalogReport {
    pub value: u64,
}

/// An analog-to-digital converter sending one byte per clock tick.
///
/// A `resolution`-bit sample arrives as `resolution / 8` bytes, least
/// significant first.
#[derive(Debug, Clone)]
pub struct AnalogDevice {
    resolution: u32,
    vendor: String,
}

impl AnalogDevice {
    pub fn new(resolution: i32) -> Result<Self> {
        Ok(Self {
            resolution: validate_resolution(resolution)?,
            vendor: DEFAULT_VENDOR.to_string(),
        })
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Change the sample width. A monitor picks this up the next time it
    /// builds framing for the device.
    pub fn set_resolution(&mut self, resolution: i32) -> Result<()> {
        self.resolution = validate_resolution(resolution)?;
        Ok(())
    }

    /// Sample width in bits.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn descriptor(&self) -> serialhid_frame::Result<ReportDescriptor> {
        ReportDescriptor::new(self.resolution as usize / 8, 1)
    }
}

impl Default for AnalogDevice {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION as u32,
            vendor: DEFAULT_VENDOR.to_string(),
        }
    }
}

fn validate_resolution(resolution: i32) -> Result<u32> {
    match u32::try_from(resolution) {
        Ok(bits) if bits > 0 && bits % 8 == 0 && bits as usize <= MAX_REPORT_BITS => Ok(bits),
        _ => Err(DeviceError::InvalidResolution(resolution)),
    }
}

impl Decoder for AnalogDevice {
    type Raw = u64;
    type Report = AnalogReport;

    fn decode(&self, raw: &u64) -> Decoded<AnalogReport> {
        Decoded::clean(AnalogReport { value: *raw })
    }

    fn encode(&self, report: &AnalogReport) -> serialhid_frame::Result<u64> {
        Ok(report.value)
    }
}

impl HidDevice for AnalogDevice {
    type Framing = ClockedFraming;

    const NAME: &'static str = "analog";

    fn framing(&self) -> serialhid_frame::Result<ClockedFraming> {
        ClockedFraming::new(self.descriptor()?)
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }
}

#[cfg(test)]
mod tests {
    use serialhid_frame::FrameStrategy;

    use super::*;

    #[test]
    fn default_resolution_is_eight_bits() {
        let device = AnalogDevice::default();
        assert_eq!(device.resolution(), 8);
        assert_eq!(device.descriptor().unwrap().report_length(), 1);
        assert_eq!(device.vendor(), "AnalogDevice-Serial-HID");
    }

    #[test]
    fn report_length_follows_resolution() {
        for (bits, ticks) in [(8, 1), (16, 2), (24, 3), (32, 4), (64, 8)] {
            let device = AnalogDevice::new(bits).unwrap();
            assert_eq!(device.descriptor().unwrap().report_length(), ticks);
            assert!(device.framing().is_ok());
        }
    }

    #[test]
    fn rejects_invalid_resolutions() {
        for bits in [0, -8, 7, 12, 72, i32::MIN] {
            let err = AnalogDevice::new(bits).unwrap_err();
            assert!(
                matches!(err, DeviceError::InvalidResolution(b) if b == bits),
                "resolution {bits}"
            );
        }
    }

    #[test]
    fn set_resolution_keeps_old_value_on_error() {
        let mut device = AnalogDevice::new(16).unwrap();
        assert!(device.set_resolution(10).is_err());
        assert_eq!(device.resolution(), 16);

        device.set_resolution(32).unwrap();
        assert_eq!(device.resolution(), 32);
    }

    #[test]
    fn sixteen_bit_sample_is_little_endian_on_the_wire() {
        struct Bytes(Vec<u8>);

        impl serialhid_channel::Channel for Bytes {
            fn read(&mut self, buf: &mut [u8]) -> serialhid_channel::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0.remove(0);
                Ok(1)
            }

            fn write(&mut self, buf: &[u8]) -> serialhid_channel::Result<usize> {
                Ok(buf.len())
            }

            fn close(&mut self) -> serialhid_channel::Result<()> {
                Ok(())
            }

            fn is_open(&self) -> bool {
                true
            }
        }

        let device = AnalogDevice::new(16).unwrap();
        let mut framing = device.framing().unwrap();
        let mut channel = Bytes(vec![0x01, 0x02]);

        let raw = framing.poll_frame(&mut channel).unwrap().unwrap();
        assert_eq!(device.decode(&raw).report, AnalogReport { value: 0x0201 });
    }

    #[test]
    fn encode_passes_value_through() {
        let device = AnalogDevice::default();
        assert_eq!(device.encode(&AnalogReport { value: 0x7F }).unwrap(), 0x7F);
    }
}
