use std::fmt;

use crate::error::{FrameError, Result};

/// Frame-shape metadata for one device.
///
/// `report_length` means the terminator byte in text framing and the number
/// of clock ticks per report in clocked framing. `register_len` is how many
/// bytes are requested from the channel per tick, normally 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportDescriptor {
    report_length: usize,
    register_len: usize,
}

impl ReportDescriptor {
    /// Build a descriptor. Both fields must be non-zero.
    pub fn new(report_length: usize, register_len: usize) -> Result<Self> {
        if report_length == 0 {
            return Err(FrameError::InvalidDescriptor("report length must be non-zero"));
        }
        if register_len == 0 {
            return Err(FrameError::InvalidDescriptor(
                "data register length must be non-zero",
            ));
        }
        Ok(Self {
            report_length,
            register_len,
        })
    }

    pub fn report_length(&self) -> usize {
        self.report_length
    }

    pub fn register_len(&self) -> usize {
        self.register_len
    }
}

/// A non-fatal problem found while decoding a raw frame.
///
/// The decoder still produced a report, usually the zero report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    /// Short device name, e.g. `"joystick"`.
    pub device: &'static str,
    /// What was wrong with the frame.
    pub reason: String,
}

impl DecodeWarning {
    pub fn new(device: &'static str, reason: impl Into<String>) -> Self {
        Self {
            device,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.device, self.reason)
    }
}

/// Output of [`Decoder::decode`]: always a report, sometimes with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<R> {
    pub report: R,
    pub warning: Option<DecodeWarning>,
}

impl<R> Decoded<R> {
    /// A cleanly decoded report.
    pub fn clean(report: R) -> Self {
        Self {
            report,
            warning: None,
        }
    }

    /// A fallback report produced from a malformed frame.
    pub fn degraded(report: R, warning: DecodeWarning) -> Self {
        Self {
            report,
            warning: Some(warning),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }
}

/// Converts between raw frames and typed device reports.
///
/// Implementations are stateless and free of side effects. `decode` is total;
/// `encode` may refuse with [`FrameError::UnsupportedEncode`] for read-only
/// devices.
pub trait Decoder {
    /// What the framing strategy produces: bytes or a packed integer.
    type Raw;
    /// The typed report handed to listeners.
    type Report;

    fn decode(&self, raw: &Self::Raw) -> Decoded<Self::Report>;

    fn encode(&self, report: &Self::Report) -> Result<Self::Raw>;
}

impl<D: Decoder + ?Sized> Decoder for &D {
    type Raw = D::Raw;
    type Report = D::Report;

    fn decode(&self, raw: &Self::Raw) -> Decoded<Self::Report> {
        (**self).decode(raw)
    }

    fn encode(&self, report: &Self::Report) -> Result<Self::Raw> {
        (**self).encode(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_rejects_zero_fields() {
        assert!(matches!(
            ReportDescriptor::new(0, 1),
            Err(FrameError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            ReportDescriptor::new(4, 0),
            Err(FrameError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn descriptor_accessors() {
        let descriptor = ReportDescriptor::new(4, 1).unwrap();
        assert_eq!(descriptor.report_length(), 4);
        assert_eq!(descriptor.register_len(), 1);
    }

    #[test]
    fn decoded_tracks_degradation() {
        let clean = Decoded::clean(7u8);
        assert!(!clean.is_degraded());

        let degraded = Decoded::degraded(0u8, DecodeWarning::new("test", "bad frame"));
        assert!(degraded.is_degraded());
        assert_eq!(
            degraded.warning.unwrap().to_string(),
            "test: bad frame"
        );
    }
}
