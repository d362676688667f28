//! Print joystick reports from a terminal device until Ctrl-C or N reports.
//!
//! Run with:
//!   cargo run --example joystick-monitor -- /dev/ttyUSB0 [count]

use std::sync::mpsc;
use std::time::Duration;

use serialhid::channel::{BaudRate, ChannelConfig, ReadMode};
use serialhid::device::{JoystickDevice, JoystickReport};
use serialhid::monitor::{Handlers, Monitor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: joystick-monitor <tty> [count]");
        std::process::exit(64);
    };
    let count: usize = args.next().map(|n| n.parse()).transpose()?.unwrap_or(10);

    let config = ChannelConfig {
        baud: BaudRate::B9600,
        read_mode: ReadMode::Timeout { deciseconds: 1 },
    };

    let (tx, rx) = mpsc::channel();
    let handlers = Handlers::new()
        .on_data_received(move |report: &JoystickReport| {
            let _ = tx.send(*report);
        })
        .on_decode_warning(|warning| eprintln!("warning: {warning}"));

    let handle = Monitor::builder("joystick")
        .with_handlers(handlers)
        .open(&path, &config, JoystickDevice::new())?;
    eprintln!("Monitoring {path}");

    let mut seen = 0;
    while seen < count && handle.is_running() {
        if let Ok(report) = rx.recv_timeout(Duration::from_millis(500)) {
            seen += 1;
            println!("x={:>6} y={:>6} b={}", report.x, report.y, report.b);
        }
    }

    handle.stop();
    handle.join()?;
    Ok(())
}
