use bytes::{Buf, BytesMut};
use serialhid_channel::Channel;

use crate::descriptor::ReportDescriptor;
use crate::error::{FrameError, Result};

/// Assembles raw frames from a channel and writes them back out.
///
/// A strategy owns its input accumulator and its outgoing staging buffer.
/// Neither `poll_frame` nor `write_frame` waits on the channel: both return
/// as soon as the channel has nothing queued or pushes back, so a caller can
/// interleave them with other work.
pub trait FrameStrategy: Send {
    /// The raw frame type handed to a [`Decoder`](crate::Decoder).
    type Raw;

    fn descriptor(&self) -> &ReportDescriptor;

    /// Read toward the next frame. `Ok(None)` means "no value yet".
    ///
    /// On error the accumulator has already been cleared.
    fn poll_frame<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<Self::Raw>>;

    /// Stage one raw frame and send as much of it as the channel accepts.
    ///
    /// `Ok(Some(n))` once all `n` bytes are out. `Ok(None)` when the channel
    /// pushed back; the rest stays staged until [`flush`](Self::flush).
    fn write_frame<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        raw: &Self::Raw,
    ) -> Result<Option<usize>>;

    /// Continue a frame left staged by `write_frame`.
    ///
    /// `Ok(Some(n))` when the frame completes, `Ok(None)` while bytes remain.
    fn flush<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<usize>>;

    /// True while part of a frame is still staged.
    fn has_pending_write(&self) -> bool;

    /// Drop any partially assembled or partially sent frame.
    fn reset(&mut self);
}

/// Read up to `buf.len()` bytes, folding transient faults into "nothing queued".
pub(crate) fn read_some<C: Channel + ?Sized>(channel: &mut C, buf: &mut [u8]) -> Result<usize> {
    match channel.read(buf) {
        Ok(n) => Ok(n),
        Err(err) if err.is_transient() => Ok(0),
        Err(err) => Err(FrameError::Channel(err)),
    }
}

/// The unsent tail of one outgoing frame.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    staged: BytesMut,
    frame_len: usize,
}

impl Outbox {
    pub(crate) fn is_pending(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Replace the staged frame with `frame` and start sending it.
    pub(crate) fn send<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        frame: &[u8],
    ) -> Result<Option<usize>> {
        self.staged.clear();
        self.staged.extend_from_slice(frame);
        self.frame_len = frame.len();
        if frame.is_empty() {
            return Ok(Some(0));
        }
        self.flush(channel)
    }

    /// Write staged bytes until they run out or the channel pushes back.
    pub(crate) fn flush<C: Channel + ?Sized>(&mut self, channel: &mut C) -> Result<Option<usize>> {
        if !self.is_pending() {
            return Ok(None);
        }
        while self.is_pending() {
            match channel.write(&self.staged) {
                Ok(0) => {
                    let err = FrameError::WriteZero {
                        written: self.frame_len - self.staged.len(),
                        expected: self.frame_len,
                    };
                    self.clear();
                    return Err(err);
                }
                Ok(n) => self.staged.advance(n.min(self.staged.len())),
                Err(err) if err.is_transient() => return Ok(None),
                Err(err) => {
                    self.clear();
                    return Err(FrameError::Channel(err));
                }
            }
        }
        Ok(Some(self.frame_len))
    }

    pub(crate) fn clear(&mut self) {
        self.staged.clear();
        self.frame_len = 0;
    }
}

/// Scripted channels shared by the framing tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use serialhid_channel::{Channel, ChannelError, FaultKind};

    /// One scripted response to a `read` call.
    #[derive(Debug, Clone)]
    pub enum Step {
        Bytes(Vec<u8>),
        Empty,
        Fault(FaultKind),
    }

    /// Replays `steps` one per read, never returning more than the caller
    /// asked for; leftover bytes stay at the front of the script.
    #[derive(Debug, Default)]
    pub struct ScriptedChannel {
        steps: VecDeque<Step>,
        pub written: Vec<u8>,
        pub max_write: Option<usize>,
        /// Upcoming writes that fail with `TryAgain` before any byte is taken.
        pub blocked_writes: usize,
        pub reads: usize,
        open: bool,
    }

    impl ScriptedChannel {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                open: true,
                ..Self::default()
            }
        }

        /// Every byte delivered on its own read.
        pub fn byte_by_byte(bytes: &[u8]) -> Self {
            Self::new(bytes.iter().map(|b| Step::Bytes(vec![*b])))
        }
    }

    impl Channel for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> serialhid_channel::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                None | Some(Step::Empty) => Ok(0),
                Some(Step::Fault(kind)) => Err(ChannelError::Fault { op: "read", kind }),
                Some(Step::Bytes(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Step::Bytes(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }

        fn write(&mut self, buf: &[u8]) -> serialhid_channel::Result<usize> {
            if self.blocked_writes > 0 {
                self.blocked_writes -= 1;
                return Err(ChannelError::Fault {
                    op: "write",
                    kind: FaultKind::TryAgain,
                });
            }
            let n = self.max_write.map_or(buf.len(), |max| max.min(buf.len()));
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn close(&mut self) -> serialhid_channel::Result<()> {
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }
}
