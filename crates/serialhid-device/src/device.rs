use serialhid_frame::{Decoder, FrameStrategy};

/// A peripheral: a report decoder plus the framing that feeds it.
///
/// The decoder half is stateless. Each call to [`framing`](Self::framing)
/// builds a fresh strategy with an empty accumulator, so nothing carries over
/// from one monitor to the next.
pub trait HidDevice: Decoder + Send + 'static {
    /// Framing whose raw frames this device decodes.
    type Framing: FrameStrategy<Raw = Self::Raw>;

    /// Short lowercase device name used in logs and errors.
    const NAME: &'static str;

    fn framing(&self) -> serialhid_frame::Result<Self::Framing>;

    /// Vendor string reported by the device registry.
    fn vendor(&self) -> &str;
}
