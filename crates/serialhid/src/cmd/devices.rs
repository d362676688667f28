use serde::Serialize;
use serialhid_device::{AnalogDevice, GpioDevice, HidDevice, JoystickDevice, MouseDevice};
use serialhid_frame::FrameStrategy;

use crate::cmd::DevicesArgs;
use crate::exit::{device_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Debug, Serialize)]
struct DeviceRow {
    name: &'static str,
    vendor: String,
    framing: &'static str,
    report_length: usize,
    register_len: usize,
    writable: bool,
}

pub fn run(args: DevicesArgs, format: OutputFormat) -> CliResult<i32> {
    let analog =
        AnalogDevice::new(args.resolution).map_err(|err| device_error("invalid device", err))?;

    let rows = vec![
        describe(&JoystickDevice::new(), "terminated")?,
        describe(&analog, "clocked")?,
        describe(&GpioDevice::new(), "clocked")?,
        describe(&MouseDevice::new(), "clocked")?,
    ];

    print_rows(
        &["DEVICE", "VENDOR", "FRAMING", "REPORT LENGTH", "REGISTER", "WRITABLE"],
        &rows,
        |row| {
            vec![
                row.name.to_string(),
                row.vendor.clone(),
                row.framing.to_string(),
                row.report_length.to_string(),
                row.register_len.to_string(),
                row.writable.to_string(),
            ]
        },
        format,
    );
    Ok(SUCCESS)
}

fn describe<D>(device: &D, framing: &'static str) -> CliResult<DeviceRow>
where
    D: HidDevice,
    D::Report: Default,
{
    let strategy = device
        .framing()
        .map_err(|err| frame_error("framing failed", err))?;
    let descriptor = strategy.descriptor();

    Ok(DeviceRow {
        name: D::NAME,
        vendor: device.vendor().to_string(),
        framing,
        report_length: descriptor.report_length(),
        register_len: descriptor.register_len(),
        // Read-only devices refuse to encode anything, the default report included.
        writable: device.encode(&Default::default()).is_ok(),
    })
}
