//! Monitor loop for serial human interface devices.
//!
//! A monitor owns one channel and one device. It spawns a single named thread
//! that alternates a write tick and a read tick until stopped:
//! - the write entity drains at most one queued report per tick, encodes it
//!   and writes it through the device framing
//! - the read entity polls the framing for one frame, decodes it and hands
//!   the report to the configured [`Handlers`]
//!
//! Faults are caught at the entity boundary and reported as
//! [`EntityStatus::ExceptionThrown`]; a closed channel or repeated channel
//! loss ends the loop.

pub mod config;
pub mod entity;
pub mod error;
pub mod listener;
pub mod monitor;
pub mod status;

pub use config::{MonitorConfig, DEFAULT_MAX_CHANNEL_LOSSES};
pub use entity::{EntityProbe, EntitySnapshot, WriteQueue};
pub use error::{MonitorError, Result};
pub use listener::Handlers;
pub use monitor::{Monitor, MonitorBuilder, MonitorHandle};
pub use status::{EntityKind, EntityStatus, Lifecycle};
