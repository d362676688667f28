use bytes::Bytes;
use serde::Serialize;
use serialhid_frame::{
    DecodeWarning, Decoded, Decoder, FrameError, ReportDescriptor, TerminatedFraming,
};

use crate::device::HidDevice;

/// Line feed followed by carriage return.
pub const JOYSTICK_TERMINATOR: &[u8] = b"\n\r";

const DEFAULT_VENDOR: &str = "DataFrame-Serial-HID";

/// Offset from a marker character to its value: `"x = "`.
const VALUE_OFFSET: usize = 4;

/// Two potentiometer axes and a push button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct JoystickReport {
    pub x: i32,
    pub y: i32,
    pub b: i32,
}

/// A joystick module streaming `"[x = 1023, y = 512, b = 0]\n\r"` text frames.
#[derive(Debug, Clone)]
pub struct JoystickDevice {
    vendor: String,
}

impl JoystickDevice {
    pub fn new() -> Self {
        Self {
            vendor: DEFAULT_VENDOR.to_string(),
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Report length is the final terminator byte (carriage return).
    pub fn descriptor() -> serialhid_frame::Result<ReportDescriptor> {
        ReportDescriptor::new(0x0D, 1)
    }
}

impl Default for JoystickDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JoystickDevice {
    type Raw = Bytes;
    type Report = JoystickReport;

    fn decode(&self, raw: &Bytes) -> Decoded<JoystickReport> {
        // every terminator is dropped, not just the trailing one
        let parsed = std::str::from_utf8(raw)
            .map_err(|_| "frame is not valid UTF-8".to_string())
            .map(|text| text.replace("\n\r", ""))
            .and_then(|frame| parse_frame(&frame));

        match parsed {
            Ok(report) => Decoded::clean(report),
            Err(reason) => Decoded::degraded(
                JoystickReport::default(),
                DecodeWarning::new(Self::NAME, reason),
            ),
        }
    }

    fn encode(&self, _report: &JoystickReport) -> serialhid_frame::Result<Bytes> {
        Err(FrameError::UnsupportedEncode { device: Self::NAME })
    }
}

impl HidDevice for JoystickDevice {
    type Framing = TerminatedFraming;

    const NAME: &'static str = "joystick";

    fn framing(&self) -> serialhid_frame::Result<TerminatedFraming> {
        TerminatedFraming::new(Self::descriptor()?, JOYSTICK_TERMINATOR)
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }
}

/// Scan every character; a later marker overrides an earlier one.
fn parse_frame(frame: &str) -> Result<JoystickReport, String> {
    let (mut x, mut y, mut b) = (None, None, None);

    for (index, ch) in frame.char_indices() {
        match ch {
            'x' => x = Some(field_value(frame, index, ',')?),
            'y' => y = Some(field_value(frame, index, ',')?),
            'b' => b = Some(field_value(frame, index, ']')?),
            _ => {}
        }
    }

    match (x, y, b) {
        (Some(x), Some(y), Some(b)) => Ok(JoystickReport { x, y, b }),
        _ => Err(format!("missing x, y or b field in {frame:?}")),
    }
}

fn field_value(frame: &str, marker: usize, delimiter: char) -> Result<i32, String> {
    let name = &frame[marker..marker + 1];
    let rest = frame
        .get(marker + VALUE_OFFSET..)
        .ok_or_else(|| format!("field '{name}' is truncated"))?;
    let end = rest
        .find(delimiter)
        .ok_or_else(|| format!("field '{name}' has no '{delimiter}' delimiter"))?;
    let value = rest[..end].trim();
    value
        .parse()
        .map_err(|err| format!("field '{name}' value {value:?}: {err}"))
}
