//! GPIO loopback over a socket pair; no hardware needed.
//!
//! One monitor writes pin patterns into one end of a Unix socket pair, a
//! second monitor reads them from the other end.
//!
//! Run with:
//!   cargo run --example gpio-loopback

use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::time::Duration;

use serialhid::channel::StreamChannel;
use serialhid::device::{GpioDevice, GpioReport};
use serialhid::monitor::{Handlers, Monitor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = UnixStream::pair()?;
    // An empty read must mean "nothing yet", never a blocked loop.
    left.set_nonblocking(true)?;
    right.set_nonblocking(true)?;

    let writer = Monitor::builder("gpio-out").start(StreamChannel::new(left), GpioDevice::new())?;

    let (tx, rx) = mpsc::channel();
    let reader = Monitor::builder("gpio-in")
        .with_handlers(Handlers::new().on_data_received(move |report: &GpioReport| {
            let _ = tx.send(*report);
        }))
        .start(StreamChannel::new(right), GpioDevice::new())?;

    let patterns = [0b0000_0001u8, 0b1010_0101, 0b1111_1111];
    let queue = writer.writer();
    for bits in patterns {
        queue.submit(GpioReport::from_bits(bits))?;
    }

    for _ in patterns {
        let report = rx.recv_timeout(Duration::from_secs(2))?;
        let levels: String = report
            .pins
            .iter()
            .rev()
            .map(|high| if *high { '1' } else { '0' })
            .collect();
        eprintln!("pins 7..0: {levels}");
    }

    writer.stop();
    reader.stop();
    writer.join()?;
    reader.join()?;
    Ok(())
}
