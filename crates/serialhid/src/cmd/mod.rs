use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serialhid_device::DEFAULT_RESOLUTION;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod devices;
pub mod fault;
pub mod modem;
pub mod monitor;
pub mod ports;
pub mod settings;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read and print reports from a device.
    Monitor(MonitorArgs),
    /// Write reports to a device.
    Write(WriteArgs),
    /// List supported devices and their report layout.
    Devices(DevicesArgs),
    /// List serial ports found under /dev.
    Ports(PortsArgs),
    /// Show or drive a port's modem control lines.
    Modem(ModemArgs),
    /// Interpret raw channel fault codes.
    Fault(FaultArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Devices(args) => devices::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Modem(args) => modem::run(args, format),
        Command::Fault(args) => fault::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
    Joystick,
    Analog,
    Gpio,
    Mouse,
}

/// Options shared by every command that opens a device.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Terminal device path (e.g. /dev/ttyUSB0).
    pub path: PathBuf,
    /// Device attached to the line.
    #[arg(long, short = 'd')]
    pub device: DeviceKind,
    /// ADC resolution in bits (analog only).
    #[arg(long, default_value_t = DEFAULT_RESOLUTION, allow_negative_numbers = true)]
    pub resolution: i32,
    /// Line speed, overriding the config file.
    #[arg(long)]
    pub baud: Option<u32>,
    /// JSON file with `channel` and `monitor` sections.
    #[arg(long, value_name = "FILE", env = "SERIALHID_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub device_args: DeviceArgs,
    /// Exit after printing N reports.
    #[arg(long)]
    pub count: Option<u64>,
    /// Print entity counters when the monitor stops.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub device_args: DeviceArgs,
    /// Report values to write, in order (decimal or 0x-prefixed hex).
    #[arg(required = true, num_args = 1.., value_parser = parse_value)]
    pub values: Vec<u64>,
    /// Give up on a report not transmitted within this many milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,
}

#[derive(Args, Debug)]
pub struct DevicesArgs {
    /// ADC resolution used for the analog row.
    #[arg(long, default_value_t = DEFAULT_RESOLUTION, allow_negative_numbers = true)]
    pub resolution: i32,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Scan this directory instead of /dev.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModemArgs {
    /// Terminal device path (e.g. /dev/ttyUSB0).
    pub path: PathBuf,
    /// Assert (true) or drop (false) Data Terminal Ready.
    #[arg(long, value_name = "BOOL")]
    pub dtr: Option<bool>,
    /// Assert (true) or drop (false) Request To Send.
    #[arg(long, value_name = "BOOL")]
    pub rts: Option<bool>,
    /// JSON file with a `channel` section.
    #[arg(long, value_name = "FILE", env = "SERIALHID_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FaultArgs {
    /// Raw codes: errno values, negated errno values or API sentinels.
    #[arg(required = true, allow_negative_numbers = true)]
    pub codes: Vec<i32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_value(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("invalid report value {text:?}: {err}"))
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
