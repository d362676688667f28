/// Errors that can occur while starting or running a monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Channel-level error.
    #[error("channel error: {0}")]
    Channel(#[from] serialhid_channel::ChannelError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serialhid_frame::FrameError),

    /// Device configuration error.
    #[error("device error: {0}")]
    Device(#[from] serialhid_device::DeviceError),

    /// The device kept reporting channel-loss faults.
    #[error("channel lost after {consecutive} consecutive faults")]
    ChannelLost { consecutive: u32 },

    /// The monitor thread could not be spawned.
    #[error("failed to spawn monitor thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The monitor thread panicked, usually inside a handler.
    #[error("monitor thread panicked: {0}")]
    Panicked(String),

    /// The monitor has stopped and no longer accepts writes.
    #[error("write queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, MonitorError>;
