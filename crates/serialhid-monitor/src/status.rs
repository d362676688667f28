use std::fmt;

use serde::Serialize;

/// Which half of the monitor an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Read,
    Write,
}

/// Status events delivered to [`Handlers::on_status`](crate::Handlers::on_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Fired once, before the entity's first tick.
    Initialized,
    /// Fired at the start of every tick.
    Updated,
    /// Fired once, when the loop exits.
    Terminated,
    /// Fired when a tick failed; the error goes to `on_exception`.
    ExceptionThrown,
}

/// Where an entity is in its life. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Initialized,
    Updated,
    Terminated,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Read => "read",
            EntityKind::Write => "write",
        })
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityStatus::Initialized => "initialized",
            EntityStatus::Updated => "updated",
            EntityStatus::Terminated => "terminated",
            EntityStatus::ExceptionThrown => "exception_thrown",
        })
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Created => "created",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Updated => "updated",
            Lifecycle::Terminated => "terminated",
        })
    }
}
