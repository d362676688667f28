use std::path::Path;

use serde::Deserialize;
use serialhid_channel::{BaudRate, ChannelConfig};
use serialhid_monitor::MonitorConfig;

use crate::exit::{channel_error, io_error, CliError, CliResult, DATA_INVALID};

/// Contents of a `--config` file.
///
/// ```json
/// {
///   "channel": { "baud": 115200, "read_mode": { "mode": "polling" } },
///   "monitor": { "max_channel_losses": 3, "idle_backoff_ms": 1 }
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub channel: ChannelConfig,
    pub monitor: MonitorConfig,
}

impl Settings {
    /// Read settings from `path`, or the defaults when no file was given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::parse(&text).map_err(|err| {
            CliError::new(DATA_INVALID, format!("invalid config {}: {err}", path.display()))
        })
    }

    fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Apply a `--baud` override.
    pub fn with_baud(mut self, baud: Option<u32>) -> CliResult<Self> {
        if let Some(bps) = baud {
            self.channel.baud =
                BaudRate::try_from(bps).map_err(|err| channel_error("invalid --baud", err))?;
        }
        Ok(self)
    }
}
