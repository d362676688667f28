//! Fault interpretation.
//!
//! Channel primitives report failure as a raw integer: an errno value, a
//! negated errno, or one of the API sentinel codes below. [`FaultKind::interpret`]
//! turns any such code into a closed set of semantic fault kinds.

use std::io;

/// Sentinel returned when a channel primitive fails without a usable errno.
///
/// Sits below `-4095`, the most negative value a negated errno can take.
pub const OPERATION_FAILED: i32 = -4096;

/// Sentinel returned when a port name or descriptor never referred to a device.
pub const INVALID_PORT: i32 = -4097;

/// Sentinel returned when a port scan finds no terminal devices.
pub const NO_AVAILABLE_PORTS: i32 = -4098;

/// Semantic fault kinds derived from raw channel return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FaultKind {
    /// `EBADF`/`EBADFD`: the descriptor is closed or in a bad state.
    #[error("bad file descriptor")]
    BadDescriptor,

    /// `EPIPE`/`ECONNRESET`: the other end of the line hung up.
    #[error("broken pipe")]
    BrokenPipe,

    /// `ENXIO`/`ENODEV`/`ENOENT`: there is no device behind the path.
    #[error("no such device")]
    NoSuchDevice,

    /// `EACCES`/`EPERM`.
    #[error("permission denied")]
    PermissionDenied,

    /// `EAGAIN`/`EWOULDBLOCK`: no data available right now.
    #[error("try again")]
    TryAgain,

    /// `EINTR`.
    #[error("interrupted system call")]
    Interrupted,

    /// `ESPIPE`: the device does not support seeking.
    #[error("illegal seek")]
    IllegalSeek,

    /// `EIO`.
    #[error("input/output error")]
    Io,

    /// `EINVAL`.
    #[error("invalid argument")]
    InvalidArgument,

    /// `ENOTTY`: the descriptor is not a terminal device.
    #[error("not a terminal device")]
    NotATerminal,

    /// `EEXIST`.
    #[error("file exists")]
    AlreadyExists,

    /// `EISDIR`: the path names a directory.
    #[error("is a directory")]
    IsADirectory,

    /// `EMFILE`: this process is out of descriptors.
    #[error("too many open files")]
    TooManyOpenFiles,

    /// `ENFILE`: the system-wide file table is full.
    #[error("file table overflow")]
    FileTableOverflow,

    /// `ENOSPC`.
    #[error("no space left on device")]
    NoSpace,

    /// `EROFS`.
    #[error("read-only file system")]
    ReadOnlyFilesystem,

    /// `EFBIG`.
    #[error("file too large")]
    FileTooLarge,

    /// [`INVALID_PORT`].
    #[error("invalid port")]
    InvalidPort,

    /// [`NO_AVAILABLE_PORTS`].
    #[error("no available terminal devices")]
    NoAvailablePorts,

    /// [`OPERATION_FAILED`].
    #[error("operation failed")]
    OperationFailed,

    /// A code outside every known mapping.
    #[error("unrecognized fault code {0}")]
    Unrecognized(i32),
}

impl FaultKind {
    /// Map a raw return code onto a fault kind.
    ///
    /// Positive codes are read as errno values and negative codes as negated
    /// errno values, so `interpret(libc::EPIPE)` and `interpret(-libc::EPIPE)`
    /// agree. Unknown codes come back as [`FaultKind::Unrecognized`] carrying
    /// the original code.
    pub fn interpret(code: i32) -> FaultKind {
        match code {
            OPERATION_FAILED => return FaultKind::OperationFailed,
            INVALID_PORT => return FaultKind::InvalidPort,
            NO_AVAILABLE_PORTS => return FaultKind::NoAvailablePorts,
            _ => {}
        }

        let Some(errno) = code.checked_abs() else {
            return FaultKind::Unrecognized(code);
        };

        match errno {
            libc::EBADF => FaultKind::BadDescriptor,
            #[cfg(any(target_os = "linux", target_os = "android"))]
            libc::EBADFD => FaultKind::BadDescriptor,
            libc::EPIPE | libc::ECONNRESET => FaultKind::BrokenPipe,
            libc::ENXIO | libc::ENODEV | libc::ENOENT => FaultKind::NoSuchDevice,
            libc::EACCES | libc::EPERM => FaultKind::PermissionDenied,
            libc::EAGAIN => FaultKind::TryAgain,
            libc::EINTR => FaultKind::Interrupted,
            libc::ESPIPE => FaultKind::IllegalSeek,
            libc::EIO => FaultKind::Io,
            libc::EINVAL => FaultKind::InvalidArgument,
            libc::ENOTTY => FaultKind::NotATerminal,
            libc::EEXIST => FaultKind::AlreadyExists,
            libc::EISDIR => FaultKind::IsADirectory,
            libc::EMFILE => FaultKind::TooManyOpenFiles,
            libc::ENFILE => FaultKind::FileTableOverflow,
            libc::ENOSPC => FaultKind::NoSpace,
            libc::EROFS => FaultKind::ReadOnlyFilesystem,
            libc::EFBIG => FaultKind::FileTooLarge,
            _ => FaultKind::Unrecognized(code),
        }
    }

    /// Map a std I/O error onto a fault kind.
    ///
    /// Errors carrying an OS code go through [`FaultKind::interpret`]; synthetic
    /// errors fall back on their [`io::ErrorKind`].
    pub fn from_io(err: &io::Error) -> FaultKind {
        if let Some(code) = err.raw_os_error() {
            return FaultKind::interpret(code);
        }

        match err.kind() {
            io::ErrorKind::WouldBlock => FaultKind::TryAgain,
            io::ErrorKind::Interrupted => FaultKind::Interrupted,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => FaultKind::BrokenPipe,
            io::ErrorKind::NotFound => FaultKind::NoSuchDevice,
            io::ErrorKind::PermissionDenied => FaultKind::PermissionDenied,
            io::ErrorKind::InvalidInput => FaultKind::InvalidArgument,
            _ => FaultKind::Io,
        }
    }

    /// Steady-state conditions: the caller should simply try again next tick.
    pub fn is_transient(self) -> bool {
        matches!(self, FaultKind::TryAgain | FaultKind::Interrupted)
    }

    /// Faults that indicate the device itself went away.
    pub fn is_channel_loss(self) -> bool {
        matches!(
            self,
            FaultKind::NoSuchDevice | FaultKind::BrokenPipe | FaultKind::BadDescriptor
        )
    }

    /// Stable lowercase name for diagnostics and machine-readable output.
    pub fn name(self) -> &'static str {
        match self {
            FaultKind::BadDescriptor => "bad-descriptor",
            FaultKind::BrokenPipe => "broken-pipe",
            FaultKind::NoSuchDevice => "no-such-device",
            FaultKind::PermissionDenied => "permission-denied",
            FaultKind::TryAgain => "try-again",
            FaultKind::Interrupted => "interrupted",
            FaultKind::IllegalSeek => "illegal-seek",
            FaultKind::Io => "io-error",
            FaultKind::InvalidArgument => "invalid-argument",
            FaultKind::NotATerminal => "not-a-terminal",
            FaultKind::AlreadyExists => "already-exists",
            FaultKind::IsADirectory => "is-a-directory",
            FaultKind::TooManyOpenFiles => "too-many-open-files",
            FaultKind::FileTableOverflow => "file-table-overflow",
            FaultKind::NoSpace => "no-space",
            FaultKind::ReadOnlyFilesystem => "read-only-filesystem",
            FaultKind::FileTooLarge => "file-too-large",
            FaultKind::InvalidPort => "invalid-port",
            FaultKind::NoAvailablePorts => "no-available-ports",
            FaultKind::OperationFailed => "operation-failed",
            FaultKind::Unrecognized(_) => "unrecognized",
        }
    }
}
