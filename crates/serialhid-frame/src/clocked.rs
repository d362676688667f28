use bytes::BytesMut;
use serialhid_channel::Channel;

use crate::descriptor::ReportDescriptor;
use crate::error::{FrameError, Result};
use crate::strategy::{read_some, FrameStrategy, Outbox};

/// Widest report the accumulator can hold.
pub const MAX_REPORT_BITS: usize = u64::BITS as usize;

/// Fixed-length binary frames assembled one register per clock tick.
///
/// The register read at clock `c` lands at bit offset
/// `c * register_len * 8`, so the earliest byte is the least significant.
/// Bytes inside a multi-byte register are little-endian.
#[derive(Debug)]
pub struct ClockedFraming {
    descriptor: ReportDescriptor,
    clock: usize,
    acc: u64,
    register: BytesMut,
    outbox: Outbox,
}

impl ClockedFraming {
    /// Build a clocked framing for `descriptor`.
    ///
    /// Fails with [`FrameError::ReportTooWide`] when
    /// `report_length * register_len * 8` exceeds 64 bits.
    pub fn new(descriptor: ReportDescriptor) -> Result<Self> {
        let bits = descriptor
            .report_length()
            .checked_mul(descriptor.register_len())
            .and_then(|bytes| bytes.checked_mul(8))
            .unwrap_or(usize::MAX);
        if bits > MAX_REPORT_BITS {
            return Err(FrameError::ReportTooWide { bits });
        }

        Ok(Self {
            descriptor,
            clock: 0,
            acc: 0,
            register: BytesMut::with_capacity(descriptor.register_len()),
            outbox: Outbox::default(),
        })
    }

    /// Total width of one report in bits.
    pub fn report_bits(&self) -> usize {
        self.descriptor.report_length() * self.descriptor.register_len() * 8
    }

    /// Registers received toward the current report.
    pub fn clock(&self) -> usize {
        self.clock
    }

    fn register_shift(&self) -> usize {
        self.clock * self.descriptor.register_len() * 8
    }
}

impl FrameStrategy for ClockedFraming {
    type Raw = u64;

    fn descriptor(&self) -> &ReportDescriptor {
        &self.descriptor
    }

    fn poll_frame<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<u64>> {
        let register_len = self.descriptor.register_len();
        let mut scratch = [0u8; 8];

        loop {
            let wanted = register_len - self.register.len();
            let read = match read_some(channel, &mut scratch[..wanted]) {
                Ok(n) => n,
                Err(err) => {
                    self.reset();
                    return Err(err);
                }
            };
            if read == 0 {
                return Ok(None);
            }

            self.register.extend_from_slice(&scratch[..read]);
            if self.register.len() < register_len {
                continue;
            }

            let mut le = [0u8; 8];
            le[..register_len].copy_from_slice(&self.register);
            self.register.clear();
            self.acc |= u64::from_le_bytes(le) << self.register_shift();

            if self.clock + 1 == self.descriptor.report_length() {
                let value = self.acc;
                self.clock = 0;
                self.acc = 0;
                return Ok(Some(value));
            }
            self.clock += 1;
        }
    }

    /// Split `raw` into `report_length` registers and send them most
    /// significant first.
    fn write_frame<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        raw: &u64,
    ) -> Result<Option<usize>> {
        let bits = self.report_bits();
        if bits < MAX_REPORT_BITS && *raw >> bits != 0 {
            return Err(FrameError::ValueTooWide { value: *raw, bits });
        }

        let register_len = self.descriptor.register_len();
        let le = raw.to_le_bytes();
        let mut out = BytesMut::with_capacity(bits / 8);
        for register in (0..self.descriptor.report_length()).rev() {
            let start = register * register_len;
            out.extend_from_slice(&le[start..start + register_len]);
        }
        self.outbox.send(channel, &out)
    }

    fn flush<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<usize>> {
        self.outbox.flush(channel)
    }

    fn has_pending_write(&self) -> bool {
        self.outbox.is_pending()
    }

    fn reset(&mut self) {
        self.clock = 0;
        self.acc = 0;
        self.register.clear();
        self.outbox.clear();
    }
}
