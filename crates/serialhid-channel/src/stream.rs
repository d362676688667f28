use std::io::{ErrorKind, Read, Write};

use tracing::debug;

use crate::error::{ChannelError, Result};
use crate::traits::Channel;

/// Adapts any `Read + Write` stream into a [`Channel`].
///
/// Useful for pseudo-terminals, sockets bridged to a device, or pipes. A
/// non-blocking stream with nothing queued surfaces as a transient
/// [`FaultKind::TryAgain`](crate::FaultKind::TryAgain) fault.
pub struct StreamChannel<T> {
    inner: Option<T>,
}

impl<T: Read + Write + Send> StreamChannel<T> {
    /// Wrap an already-open stream.
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    /// Borrow the underlying stream, if the channel is still open.
    pub fn get_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    /// Consume the channel and return the stream, if still open.
    pub fn into_inner(self) -> Option<T> {
        self.inner
    }

    fn stream(&mut self) -> Result<&mut T> {
        self.inner.as_mut().ok_or(ChannelError::Closed)
    }
}

impl<T: Read + Write + Send> Channel for StreamChannel<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream()?;
        match stream.read(buf) {
            Ok(n) => Ok(n),
            Err(err) => Err(ChannelError::from_io("read", &err)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let stream = self.stream()?;
        let written = loop {
            match stream.write(buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::from_io("write", &err)),
            }
        };
        stream
            .flush()
            .map_err(|err| ChannelError::from_io("flush", &err))?;
        Ok(written)
    }

    fn close(&mut self) -> Result<()> {
        if self.inner.take().is_some() {
            debug!("closed stream channel");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl<T> std::fmt::Debug for StreamChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamChannel")
            .field("open", &self.inner.is_some())
            .finish()
    }
}
