use std::sync::mpsc;
use std::time::Duration;

use serde::Serialize;
use serialhid_device::{AnalogDevice, AnalogReport, GpioDevice, GpioReport, HidDevice};
use serialhid_frame::FrameError;
use serialhid_monitor::{EntityKind, Handlers, Monitor};
use tracing::debug;

use crate::cmd::settings::Settings;
use crate::cmd::{DeviceKind, WriteArgs};
use crate::exit::{
    device_error, monitor_error, CliError, CliResult, CHANNEL_ERROR, DATA_INVALID, SUCCESS,
    TIMEOUT, USAGE,
};
use crate::output::{print_rows, OutputFormat};

enum WriteEvent {
    Sent(usize),
    Failed(CliError),
}

#[derive(Serialize)]
struct WriteRow {
    seq: usize,
    value: u64,
    bytes: usize,
}

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = Settings::load(args.device_args.config.as_deref())?
        .with_baud(args.device_args.baud)?;

    match args.device_args.device {
        DeviceKind::Analog => {
            let device = AnalogDevice::new(args.device_args.resolution)
                .map_err(|err| device_error("invalid device", err))?;
            let reports = args
                .values
                .iter()
                .map(|&value| AnalogReport { value })
                .collect();
            transmit(&args, settings, device, reports, format)
        }
        DeviceKind::Gpio => {
            let reports = args
                .values
                .iter()
                .map(|&value| {
                    u8::try_from(value).map(GpioReport::from_bits).map_err(|_| {
                        CliError::new(USAGE, format!("gpio value {value:#x} does not fit in 8 pins"))
                    })
                })
                .collect::<CliResult<Vec<_>>>()?;
            transmit(&args, settings, GpioDevice::new(), reports, format)
        }
        DeviceKind::Joystick | DeviceKind::Mouse => Err(CliError::new(
            USAGE,
            format!("{:?} devices are read-only", args.device_args.device).to_lowercase(),
        )),
    }
}

fn transmit<D>(
    args: &WriteArgs,
    settings: Settings,
    device: D,
    reports: Vec<D::Report>,
    format: OutputFormat,
) -> CliResult<i32>
where
    D: HidDevice,
    D::Report: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let failures = tx.clone();
    let handlers = Handlers::<D::Report>::new()
        .on_data_transmitted(move |bytes| {
            let _ = tx.send(WriteEvent::Sent(bytes));
        })
        .on_exception(move |kind, err| {
            if kind == EntityKind::Write {
                let _ = failures.send(WriteEvent::Failed(write_failure(err)));
            }
        });

    let handle = Monitor::builder(format!("serialhid-{}", D::NAME))
        .with_config(settings.monitor)
        .with_handlers(handlers)
        .open(&args.device_args.path, &settings.channel, device)
        .map_err(|err| monitor_error("open failed", err))?;

    let writer = handle.writer();
    let timeout = Duration::from_millis(args.timeout_ms);
    let mut rows = Vec::with_capacity(reports.len());

    for (index, (report, &value)) in reports.into_iter().zip(&args.values).enumerate() {
        writer
            .submit(report)
            .map_err(|err| monitor_error("submit failed", err))?;

        let bytes = match rx.recv_timeout(timeout) {
            Ok(WriteEvent::Sent(bytes)) => bytes,
            Ok(WriteEvent::Failed(err)) => return Err(err),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("report {} not transmitted within {}ms", index + 1, args.timeout_ms),
                ))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return match handle.join() {
                    Ok(()) => Err(CliError::new(CHANNEL_ERROR, "monitor stopped before writing")),
                    Err(err) => Err(monitor_error("monitor failed", err)),
                };
            }
        };

        debug!(seq = index + 1, value, bytes, "report transmitted");
        rows.push(WriteRow {
            seq: index + 1,
            value,
            bytes,
        });
    }

    handle.stop();
    handle
        .join()
        .map_err(|err| monitor_error("monitor failed", err))?;

    print_rows(
        &["SEQ", "VALUE", "BYTES"],
        &rows,
        |row| {
            vec![
                row.seq.to_string(),
                format!("{:#x}", row.value),
                row.bytes.to_string(),
            ]
        },
        format,
    );
    Ok(SUCCESS)
}

fn write_failure(err: &FrameError) -> CliError {
    let code = match err {
        FrameError::Channel(_) | FrameError::WriteZero { .. } => CHANNEL_ERROR,
        FrameError::UnsupportedEncode { .. } => USAGE,
        _ => DATA_INVALID,
    };
    CliError::new(code, format!("write failed: {err}"))
}
