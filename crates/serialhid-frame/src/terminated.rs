use bytes::{Bytes, BytesMut};
use serialhid_channel::Channel;
use tracing::warn;

use crate::descriptor::ReportDescriptor;
use crate::error::{FrameError, Result};
use crate::strategy::{read_some, FrameStrategy, Outbox};

/// Bytes that may accumulate without a terminator before the frame is dropped.
pub const MAX_UNTERMINATED_FRAME: usize = 1024;

/// Text frames delimited by a terminator sequence.
///
/// Each completed frame is returned with its terminator still attached.
/// The descriptor's report length must equal the final terminator byte.
#[derive(Debug)]
pub struct TerminatedFraming {
    descriptor: ReportDescriptor,
    terminator: Bytes,
    buf: BytesMut,
    scratch: Vec<u8>,
    max_len: usize,
    outbox: Outbox,
}

impl TerminatedFraming {
    pub fn new(descriptor: ReportDescriptor, terminator: impl Into<Bytes>) -> Result<Self> {
        let terminator = terminator.into();
        match terminator.last() {
            None => return Err(FrameError::InvalidDescriptor("terminator must not be empty")),
            Some(&last) if usize::from(last) != descriptor.report_length() => {
                return Err(FrameError::InvalidDescriptor(
                    "report length must be the final terminator byte",
                ))
            }
            Some(_) => {}
        }

        Ok(Self {
            descriptor,
            terminator,
            buf: BytesMut::with_capacity(MAX_UNTERMINATED_FRAME),
            scratch: vec![0u8; descriptor.register_len()],
            max_len: MAX_UNTERMINATED_FRAME,
            outbox: Outbox::default(),
        })
    }

    /// Override the overflow cap.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// Bytes accumulated toward the current frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl FrameStrategy for TerminatedFraming {
    type Raw = Bytes;

    fn descriptor(&self) -> &ReportDescriptor {
        &self.descriptor
    }

    fn poll_frame<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<Bytes>> {
        loop {
            let read = match read_some(channel, &mut self.scratch) {
                Ok(n) => n,
                Err(err) => {
                    self.reset();
                    return Err(err);
                }
            };
            if read == 0 {
                return Ok(None);
            }

            self.buf.extend_from_slice(&self.scratch[..read]);

            if self.buf.ends_with(&self.terminator) {
                return Ok(Some(self.buf.split().freeze()));
            }

            if self.buf.len() > self.max_len {
                let len = self.buf.len();
                self.reset();
                warn!(len, max = self.max_len, "dropping unterminated frame");
                return Err(FrameError::FrameTooLong {
                    len,
                    max: self.max_len,
                });
            }
        }
    }

    fn write_frame<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        raw: &Bytes,
    ) -> Result<Option<usize>> {
        let mut out = BytesMut::with_capacity(raw.len() + self.terminator.len());
        out.extend_from_slice(raw);
        out.extend_from_slice(&self.terminator);
        self.outbox.send(channel, &out)
    }

    fn flush<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<usize>> {
        self.outbox.flush(channel)
    }

    fn has_pending_write(&self) -> bool {
        self.outbox.is_pending()
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.outbox.clear();
    }
}
