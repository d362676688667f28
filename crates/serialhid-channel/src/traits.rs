use std::io::SeekFrom;

use crate::error::{ChannelError, Result};
use crate::fault::FaultKind;

/// A byte-oriented connection to a peripheral.
///
/// `read` returning `Ok(0)` means "nothing queued right now", not end of
/// stream; a channel that has gone away reports [`ChannelError::Closed`] or a
/// channel-loss fault instead.
pub trait Channel: Send {
    /// Read up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes, returning how many the device accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Reposition the device offset. Character devices usually refuse.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let _ = pos;
        Err(ChannelError::Fault {
            op: "seek",
            kind: FaultKind::IllegalSeek,
        })
    }

    /// Release the underlying handle. Further I/O fails with [`ChannelError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Whether the handle is still held.
    fn is_open(&self) -> bool;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
