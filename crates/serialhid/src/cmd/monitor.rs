use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serialhid_device::{AnalogDevice, GpioDevice, HidDevice, JoystickDevice, MouseDevice};
use serialhid_monitor::{Handlers, Monitor};
use tracing::{info, warn};

use crate::cmd::settings::Settings;
use crate::cmd::{install_ctrlc_handler, DeviceKind, MonitorArgs};
use crate::exit::{device_error, monitor_error, CliResult, SUCCESS};
use crate::output::{print_report, print_summary, OutputFormat};

/// How often the printing loop wakes to check for Ctrl-C and a dead monitor.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = Settings::load(args.device_args.config.as_deref())?
        .with_baud(args.device_args.baud)?;

    match args.device_args.device {
        DeviceKind::Joystick => stream(&args, settings, JoystickDevice::new(), format),
        DeviceKind::Analog => {
            let device = AnalogDevice::new(args.device_args.resolution)
                .map_err(|err| device_error("invalid device", err))?;
            stream(&args, settings, device, format)
        }
        DeviceKind::Gpio => stream(&args, settings, GpioDevice::new(), format),
        DeviceKind::Mouse => stream(&args, settings, MouseDevice::new(), format),
    }
}

fn stream<D>(
    args: &MonitorArgs,
    settings: Settings,
    device: D,
    format: OutputFormat,
) -> CliResult<i32>
where
    D: HidDevice,
    D::Report: Serialize + Clone + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    // Reports cross to this thread so printing never stalls a tick.
    let (tx, rx) = mpsc::channel();
    let handlers = Handlers::new()
        .on_data_received(move |report: &D::Report| {
            let _ = tx.send(report.clone());
        })
        .on_exception(|kind, err| warn!(entity = %kind, error = %err, "entity fault"));

    let path = &args.device_args.path;
    let handle = Monitor::builder(format!("serialhid-{}", D::NAME))
        .with_config(settings.monitor)
        .with_handlers(handlers)
        .open(path, &settings.channel, device)
        .map_err(|err| monitor_error("open failed", err))?;

    info!(
        path = %path.display(),
        device = D::NAME,
        baud = %settings.channel.baud,
        "monitoring"
    );

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(report) => {
                printed = printed.saturating_add(1);
                print_report(D::NAME, printed, &report, format);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // The handlers are dropped with the worker, so the loop has ended.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    handle.stop();
    let read = handle.read_probe().clone();
    let write = handle.write_probe().clone();
    handle
        .join()
        .map_err(|err| monitor_error("monitor failed", err))?;

    if args.summary {
        print_summary(&[read.snapshot(), write.snapshot()], format);
    }

    info!(reports = printed, "monitor finished");
    Ok(SUCCESS)
}
