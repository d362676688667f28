use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::fault::FaultKind;
use crate::modem::ModemBits;
use crate::traits::Channel;

/// A POSIX terminal device (`/dev/ttyUSB0`, `/dev/ttyACM0`, ...) in raw mode.
///
/// Opening applies [`ChannelConfig`]: 8 data bits with no parity, one stop
/// bit and no hardware flow control, receiver enabled, modem control lines
/// ignored, no echo, no canonical line editing, no signal
/// characters and no output post-processing. The read policy comes from
/// [`ReadMode`](crate::ReadMode).
pub struct TtyChannel {
    file: Option<File>,
    path: PathBuf,
    config: ChannelConfig,
}

impl TtyChannel {
    /// Open and configure the terminal device at `path`.
    pub fn open(path: impl AsRef<Path>, config: &ChannelConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|err| ChannelError::Open {
                path: path.clone(),
                kind: FaultKind::from_io(&err),
            })?;

        debug!(?path, "opened terminal device");

        let mut channel = Self {
            file: Some(file),
            path,
            config: *config,
        };
        channel.configure(config)?;

        info!(
            path = ?channel.path,
            baud = %config.baud,
            read_mode = ?config.read_mode,
            "terminal device ready"
        );
        Ok(channel)
    }

    /// Apply line speed, raw mode and read policy to the open device.
    pub fn configure(&mut self, config: &ChannelConfig) -> Result<()> {
        let fd = self.raw_fd()?;

        // SAFETY: termios is plain old data; zeroed is a valid bit pattern and
        // tcgetattr overwrites it before use.
        let mut tty: libc::termios = unsafe { std::mem::zeroed() };

        // SAFETY: `fd` is an open descriptor owned by `self.file`, and `tty`
        // is a valid writable termios.
        if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
            return Err(last_configure_error());
        }

        tty.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB | libc::CRTSCTS);
        tty.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        tty.c_lflag &= !(libc::ECHO
            | libc::ECHOE
            | libc::ECHOK
            | libc::ECHONL
            | libc::ECHOKE
            | libc::ECHOCTL
            | libc::ECHOPRT
            | libc::ICANON
            | libc::ISIG
            | libc::IEXTEN);
        tty.c_oflag &= !(libc::OPOST | libc::ONLCR);
        tty.c_iflag = 0;

        let (vtime, vmin) = config.read_mode.vtime_vmin();
        tty.c_cc[libc::VTIME] = vtime;
        tty.c_cc[libc::VMIN] = vmin;

        let speed = config.baud.speed();
        // SAFETY: `tty` is a valid termios obtained from tcgetattr.
        let speed_rc =
            unsafe { libc::cfsetispeed(&mut tty, speed) | libc::cfsetospeed(&mut tty, speed) };
        if speed_rc != 0 {
            return Err(last_configure_error());
        }

        // SAFETY: `fd` is open and `tty` is fully initialized.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
            return Err(last_configure_error());
        }

        self.config = *config;
        debug!(path = ?self.path, ?config, "applied terminal attributes");
        Ok(())
    }

    /// Read the modem control lines.
    pub fn modem_bits(&self) -> Result<ModemBits> {
        let fd = self.raw_fd()?;
        let mut raw: libc::c_int = 0;
        // SAFETY: `fd` is open and `raw` is a valid c_int for TIOCMGET to fill.
        if unsafe { libc::ioctl(fd, libc::TIOCMGET, &mut raw) } != 0 {
            return Err(last_fault("modem"));
        }
        Ok(ModemBits::from_raw(raw))
    }

    /// Replace the modem control lines with `bits`.
    ///
    /// Only DTR and RTS are driven by the host; input lines are ignored.
    pub fn set_modem_bits(&mut self, bits: ModemBits) -> Result<()> {
        let fd = self.raw_fd()?;
        let raw = bits.to_raw();
        // SAFETY: `fd` is open and `raw` outlives the call.
        let rc = unsafe { libc::ioctl(fd, libc::TIOCMSET, &raw) };
        self.modem_updated(rc, "set", bits)
    }

    /// Drop the lines asserted in `bits`, leaving the rest untouched.
    pub fn clear_modem_bits(&mut self, bits: ModemBits) -> Result<()> {
        let fd = self.raw_fd()?;
        let raw = bits.to_raw();
        // SAFETY: `fd` is open and `raw` outlives the call.
        let rc = unsafe { libc::ioctl(fd, libc::TIOCMBIC, &raw) };
        self.modem_updated(rc, "cleared", bits)
    }

    fn modem_updated(&self, rc: libc::c_int, action: &str, bits: ModemBits) -> Result<()> {
        if rc != 0 {
            return Err(last_fault("modem"));
        }
        debug!(path = ?self.path, action, lines = ?bits.asserted(), "modem lines updated");
        Ok(())
    }

    fn raw_fd(&self) -> Result<std::os::fd::RawFd> {
        Ok(self.file.as_ref().ok_or(ChannelError::Closed)?.as_raw_fd())
    }

    /// The device path this channel was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration currently applied.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(ChannelError::Closed)
    }
}

fn last_configure_error() -> ChannelError {
    ChannelError::Configure(FaultKind::from_io(&std::io::Error::last_os_error()))
}

fn last_fault(op: &'static str) -> ChannelError {
    ChannelError::from_io(op, &std::io::Error::last_os_error())
}

impl Channel for TtyChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file()?
            .read(buf)
            .map_err(|err| ChannelError::from_io("read", &err))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let file = self.file()?;
        loop {
            match file.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChannelError::from_io("write", &err)),
            }
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.file()?
            .seek(pos)
            .map_err(|err| ChannelError::from_io("seek", &err))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            drop(file);
            debug!(path = ?self.path, "closed terminal device");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl std::fmt::Debug for TtyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyChannel")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("config", &self.config)
            .finish()
    }
}
