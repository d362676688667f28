use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serialhid_channel::Channel;
use serialhid_device::HidDevice;
use serialhid_frame::FrameError;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::entity::{write_queue, EntityProbe, MonitorState, ReadEntity, WriteEntity, WriteQueue};
use crate::error::{MonitorError, Result};
use crate::listener::Handlers;

/// Entry point for building monitors.
#[derive(Debug)]
pub struct Monitor;

impl Monitor {
    /// Start configuring a monitor whose thread will be called `name`.
    pub fn builder<R: Send + 'static>(name: impl Into<String>) -> MonitorBuilder<R> {
        MonitorBuilder::new(name)
    }
}

/// Configures and starts a monitor.
#[derive(Debug)]
pub struct MonitorBuilder<R> {
    name: String,
    config: MonitorConfig,
    handlers: Handlers<R>,
}

impl<R: Send + 'static> MonitorBuilder<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: MonitorConfig::default(),
            handlers: Handlers::new(),
        }
    }

    /// Override loop behavior.
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the callbacks run on the monitor thread.
    pub fn with_handlers(mut self, handlers: Handlers<R>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Open and configure the terminal device at `path`, then start.
    #[cfg(unix)]
    pub fn open<D>(
        self,
        path: impl AsRef<std::path::Path>,
        channel_config: &serialhid_channel::ChannelConfig,
        device: D,
    ) -> Result<MonitorHandle<R>>
    where
        D: HidDevice<Report = R>,
    {
        let channel = serialhid_channel::TtyChannel::open(path, channel_config)?;
        self.start(channel, device)
    }

    /// Take ownership of `channel` and `device` and spawn the monitor thread.
    pub fn start<C, D>(self, channel: C, device: D) -> Result<MonitorHandle<R>>
    where
        C: Channel + 'static,
        D: HidDevice<Report = R>,
    {
        let state = Arc::new(MonitorState::default());
        let (queue, rx) = write_queue();

        let read = ReadEntity::new(device.framing()?, Arc::clone(&state));
        let write = WriteEntity::new(device.framing()?, rx, Arc::clone(&state));
        let read_probe = read.probe();
        let write_probe = write.probe();

        let worker = Worker {
            name: self.name.clone(),
            config: self.config,
            state: Arc::clone(&state),
            channel,
            device,
            handlers: self.handlers,
            read,
            write,
        };

        state.running.store(true, Ordering::Release);
        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                state.running.store(false, Ordering::Release);
                MonitorError::ThreadSpawn(err)
            })?;

        Ok(MonitorHandle {
            name: self.name,
            state,
            thread: Some(thread),
            queue,
            read_probe,
            write_probe,
        })
    }
}

/// Controls a running monitor. Dropping the handle stops and joins it.
#[derive(Debug)]
pub struct MonitorHandle<R> {
    name: String,
    state: Arc<MonitorState>,
    thread: Option<JoinHandle<Result<()>>>,
    queue: WriteQueue<R>,
    read_probe: EntityProbe,
    write_probe: EntityProbe,
}

impl<R> MonitorHandle<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the loop to exit after the current iteration.
    pub fn stop(&self) {
        self.state.stop.store(true, Ordering::Release);
    }

    /// True until the monitor thread has left its loop.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Wait for the loop to exit and return its final result.
    ///
    /// Does not stop the loop; call [`stop`](Self::stop) first to end it.
    pub fn join(mut self) -> Result<()> {
        self.join_thread()
    }

    /// A cloneable handle for submitting reports to the write entity.
    pub fn writer(&self) -> WriteQueue<R> {
        self.queue.clone()
    }

    pub fn read_probe(&self) -> &EntityProbe {
        &self.read_probe
    }

    pub fn write_probe(&self) -> &EntityProbe {
        &self.write_probe
    }

    pub fn read_ticks(&self) -> u64 {
        self.state.read_ticks.load(Ordering::Acquire)
    }

    pub fn write_ticks(&self) -> u64 {
        self.state.write_ticks.load(Ordering::Acquire)
    }

    fn join_thread(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|payload| Err(MonitorError::Panicked(panic_message(&*payload)))),
            None => Ok(()),
        }
    }
}

impl<R> Drop for MonitorHandle<R> {
    fn drop(&mut self) {
        if self.thread.is_none() {
            return;
        }
        self.stop();
        if let Err(err) = self.join_thread() {
            warn!(monitor = %self.name, error = %err, "monitor exited with error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Clears the running flag however the thread exits.
struct RunningGuard(Arc<MonitorState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

/// Everything the monitor thread owns.
struct Worker<C, D: HidDevice> {
    name: String,
    config: MonitorConfig,
    state: Arc<MonitorState>,
    channel: C,
    device: D,
    handlers: Handlers<D::Report>,
    read: ReadEntity<D::Framing>,
    write: WriteEntity<D::Framing, D::Report>,
}

impl<C: Channel, D: HidDevice> Worker<C, D> {
    fn run(mut self) -> Result<()> {
        let _guard = RunningGuard(Arc::clone(&self.state));
        info!(
            monitor = %self.name,
            device = D::NAME,
            vendor = self.device.vendor(),
            "monitor started"
        );

        self.write.initialize(&mut self.handlers);
        self.read.initialize(&mut self.handlers);

        let result = self.run_loop();

        self.write.terminate(&mut self.handlers);
        self.read.terminate(&mut self.handlers);
        if let Err(err) = self.channel.close() {
            warn!(monitor = %self.name, error = %err, "failed to close channel");
        }

        match &result {
            Ok(()) => info!(monitor = %self.name, "monitor stopped"),
            Err(err) => warn!(monitor = %self.name, error = %err, "monitor stopped on error"),
        }
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        let limit = self.config.loss_limit();
        let mut losses = 0u32;

        while !self.state.stop_requested() {
            let wrote = self
                .write
                .tick(&mut self.channel, &self.device, &mut self.handlers);
            let wrote = settle(wrote, &mut losses, limit)?;

            let read = self
                .read
                .tick(&mut self.channel, &self.device, &mut self.handlers);
            let read = settle(read, &mut losses, limit)?;

            if !wrote && !read {
                if let Some(backoff) = self.config.idle_backoff() {
                    thread::sleep(backoff);
                }
            }
        }

        debug!(monitor = %self.name, "stop flag observed");
        Ok(())
    }
}

/// Fold one tick's outcome into the loop: `Ok(busy)` to keep going, `Err` to stop.
///
/// Channel-loss faults count as consecutive until a report moves or a
/// different fault shows the device is still answering.
fn settle(
    outcome: std::result::Result<bool, FrameError>,
    losses: &mut u32,
    limit: u32,
) -> Result<bool> {
    match outcome {
        Ok(busy) => {
            if busy {
                *losses = 0;
            }
            Ok(busy)
        }
        Err(err) if err.is_closed() => Err(MonitorError::Frame(err)),
        Err(err) if err.is_channel_loss() => {
            *losses += 1;
            if *losses >= limit {
                return Err(MonitorError::ChannelLost {
                    consecutive: *losses,
                });
            }
            Ok(false)
        }
        Err(_) => {
            *losses = 0;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use serialhid_channel::{ChannelError, FaultKind};
    use serialhid_device::{
        GpioDevice, GpioReport, JoystickDevice, JoystickReport, MouseDevice, MouseReport,
    };

    use super::*;
    use crate::status::{EntityKind, EntityStatus, Lifecycle};

    /// In-memory line the test thread can feed while the monitor runs.
    #[derive(Clone, Default)]
    struct Line {
        inner: Arc<Mutex<LineState>>,
    }

    #[derive(Default)]
    struct LineState {
        input: VecDeque<u8>,
        output: Vec<u8>,
        fault: Option<FaultKind>,
        closed: bool,
        busy: bool,
    }

    impl Line {
        fn feed(&self, bytes: &[u8]) {
            self.inner.lock().unwrap().input.extend(bytes);
        }

        fn fail_with(&self, kind: FaultKind) {
            self.inner.lock().unwrap().fault = Some(kind);
        }

        /// Every write fails with `TryAgain` until cleared.
        fn set_busy(&self, busy: bool) {
            self.inner.lock().unwrap().busy = busy;
        }

        fn output(&self) -> Vec<u8> {
            self.inner.lock().unwrap().output.clone()
        }

        fn is_closed(&self) -> bool {
            self.inner.lock().unwrap().closed
        }
    }

    impl Channel for Line {
        fn read(&mut self, buf: &mut [u8]) -> serialhid_channel::Result<usize> {
            let mut line = self.inner.lock().unwrap();
            if line.closed {
                return Err(ChannelError::Closed);
            }
            if let Some(kind) = line.fault {
                return Err(ChannelError::Fault { op: "read", kind });
            }
            let mut n = 0;
            while n < buf.len() {
                match line.input.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> serialhid_channel::Result<usize> {
            let mut line = self.inner.lock().unwrap();
            if line.closed {
                return Err(ChannelError::Closed);
            }
            if line.busy {
                return Err(ChannelError::Fault {
                    op: "write",
                    kind: FaultKind::TryAgain,
                });
            }
            line.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) -> serialhid_channel::Result<()> {
            self.inner.lock().unwrap().closed = true;
            Ok(())
        }

        fn is_open(&self) -> bool {
            !self.inner.lock().unwrap().closed
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn delivers_reports_and_stops_on_request() {
        let line = Line::default();
        let (tx, rx) = mpsc::channel();
        let handlers = Handlers::new().on_data_received(move |report: &JoystickReport| {
            tx.send(*report).unwrap();
        });

        let handle = Monitor::builder("joystick-test")
            .with_handlers(handlers)
            .start(line.clone(), JoystickDevice::new())
            .unwrap();
        assert_eq!(handle.name(), "joystick-test");

        line.feed(b"[x = 10, y = 20, b = 1]\n\r");
        let report = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report, JoystickReport { x: 10, y: 20, b: 1 });

        handle.stop();
        let read_probe = handle.read_probe().clone();
        handle.join().unwrap();

        assert_eq!(read_probe.lifecycle(), Lifecycle::Terminated);
        assert!(line.is_closed());
    }

    #[test]
    fn tick_counts_stay_within_one() {
        let line = Line::default();
        let handle = Monitor::builder("ticks")
            .with_config(MonitorConfig {
                idle_backoff_ms: None,
                ..MonitorConfig::default()
            })
            .start(line, GpioDevice::new())
            .unwrap();

        wait_for(|| handle.read_ticks() > 100);
        for _ in 0..100 {
            let read = handle.read_ticks();
            let write = handle.write_ticks();
            // write ticks first, so it may be ahead by one but never behind
            assert!(write + 1 >= read, "write {write} read {read}");
        }

        handle.stop();
        let write_probe = handle.write_probe().clone();
        let read_probe = handle.read_probe().clone();
        handle.join().unwrap();

        let writes = write_probe.snapshot().ticks;
        let reads = read_probe.snapshot().ticks;
        assert!(writes.abs_diff(reads) <= 1, "write {writes} read {reads}");
    }

    #[test]
    fn writer_submits_reports() {
        let line = Line::default();
        let (tx, rx) = mpsc::channel();
        let handlers = Handlers::<GpioReport>::new().on_data_transmitted(move |n| {
            tx.send(n).unwrap();
        });

        let handle = Monitor::builder("gpio-writer")
            .with_handlers(handlers)
            .start(line.clone(), GpioDevice::new())
            .unwrap();

        handle.writer().submit(GpioReport::from_bits(0x5A)).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert_eq!(line.output(), vec![0x5A]);
    }

    #[test]
    fn busy_channel_does_not_block_stop() {
        let line = Line::default();
        line.set_busy(true);
        let handle = Monitor::builder("busy-writer")
            .start(line.clone(), GpioDevice::new())
            .unwrap();

        handle.writer().submit(GpioReport::from_bits(0x3C)).unwrap();
        wait_for(|| handle.write_ticks() >= 3);
        let reads = handle.read_ticks();
        wait_for(|| handle.read_ticks() > reads + 2);

        handle.stop();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || tx.send(handle.join()).unwrap());
        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(result.is_ok());
        assert!(line.output().is_empty());
    }

    #[test]
    fn staged_report_goes_out_once_channel_frees() {
        let line = Line::default();
        line.set_busy(true);
        let (tx, rx) = mpsc::channel();
        let handlers = Handlers::<GpioReport>::new().on_data_transmitted(move |n| {
            tx.send(n).unwrap();
        });
        let handle = Monitor::builder("late-writer")
            .with_handlers(handlers)
            .start(line.clone(), GpioDevice::new())
            .unwrap();

        handle.writer().submit(GpioReport::from_bits(0x99)).unwrap();
        wait_for(|| handle.write_ticks() >= 3);
        assert!(rx.try_recv().is_err());

        line.set_busy(false);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert_eq!(line.output(), vec![0x99]);
        assert_eq!(handle.write_probe().snapshot().reports, 1);
    }

    #[test]
    fn builder_infers_report_type_from_device() {
        let line = Line::default();
        let handle = Monitor::builder("inferred")
            .start(line, JoystickDevice::new())
            .unwrap();
        let _writer: WriteQueue<JoystickReport> = handle.writer();
        handle.stop();
        handle.join().unwrap();

        let builder = Monitor::builder::<GpioReport>("explicit");
        let handle = builder.start(Line::default(), GpioDevice::new()).unwrap();
        assert_eq!(handle.name(), "explicit");
    }

    #[test]
    fn unsupported_encode_surfaces_as_exception() {
        let line = Line::default();
        let (tx, rx) = mpsc::channel();
        let handlers = Handlers::<MouseReport>::new().on_exception(move |kind, err| {
            tx.send((kind, err.to_string())).unwrap();
        });

        let handle = Monitor::builder("mouse-writer")
            .with_handlers(handlers)
            .start(line.clone(), MouseDevice::new())
            .unwrap();

        handle.writer().submit(MouseReport::default()).unwrap();
        let (kind, message) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(kind, EntityKind::Write);
        assert_eq!(message, "mouse does not support encoding reports");
        assert!(handle.is_running());
        assert!(line.output().is_empty());
    }

    #[test]
    fn decode_warning_is_dispatched() {
        let line = Line::default();
        let (tx, rx) = mpsc::channel();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let handlers = Handlers::new()
            .on_data_received(move |report: &JoystickReport| sink.lock().unwrap().push(*report))
            .on_decode_warning(move |warning| tx.send(warning.clone()).unwrap());

        let handle = Monitor::builder("warnings")
            .with_handlers(handlers)
            .start(line.clone(), JoystickDevice::new())
            .unwrap();

        line.feed(b"garbage\n\r");
        let warning = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(warning.device, "joystick");

        handle.stop();
        handle.join().unwrap();
        assert_eq!(*received.lock().unwrap(), vec![JoystickReport::default()]);
    }

    #[test]
    fn repeated_channel_loss_ends_loop() {
        let line = Line::default();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let handlers = Handlers::<GpioReport>::new()
            .on_status(move |kind, status| sink.lock().unwrap().push((kind, status)));

        line.fail_with(FaultKind::NoSuchDevice);
        let handle = Monitor::builder("unplugged")
            .with_config(MonitorConfig {
                max_channel_losses: 2,
                idle_backoff_ms: None,
            })
            .with_handlers(handlers)
            .start(line.clone(), GpioDevice::new())
            .unwrap();

        let err = handle.join().unwrap_err();
        assert!(matches!(err, MonitorError::ChannelLost { consecutive: 2 }));
        assert!(line.is_closed());

        let statuses = statuses.lock().unwrap();
        let exceptions = statuses
            .iter()
            .filter(|(_, status)| *status == EntityStatus::ExceptionThrown)
            .count();
        assert_eq!(exceptions, 2);
        assert_eq!(
            &statuses[statuses.len() - 2..],
            &[
                (EntityKind::Write, EntityStatus::Terminated),
                (EntityKind::Read, EntityStatus::Terminated),
            ]
        );
    }

    #[test]
    fn initialized_precedes_first_update() {
        let line = Line::default();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let handlers = Handlers::<GpioReport>::new()
            .on_status(move |kind, status| sink.lock().unwrap().push((kind, status)));

        let handle = Monitor::builder("lifecycle")
            .with_handlers(handlers)
            .start(line, GpioDevice::new())
            .unwrap();
        wait_for(|| handle.read_ticks() >= 2);
        drop(handle);

        let statuses = statuses.lock().unwrap();
        assert_eq!(
            &statuses[..4],
            &[
                (EntityKind::Write, EntityStatus::Initialized),
                (EntityKind::Read, EntityStatus::Initialized),
                (EntityKind::Write, EntityStatus::Updated),
                (EntityKind::Read, EntityStatus::Updated),
            ]
        );
        let terminated = statuses
            .iter()
            .filter(|(_, status)| *status == EntityStatus::Terminated)
            .count();
        assert_eq!(terminated, 2);
    }

    #[test]
    fn writer_fails_after_monitor_exits() {
        let line = Line::default();
        line.fail_with(FaultKind::BrokenPipe);
        let handle = Monitor::builder("gone")
            .with_config(MonitorConfig {
                max_channel_losses: 1,
                idle_backoff_ms: None,
            })
            .start(line, GpioDevice::new())
            .unwrap();
        let writer = handle.writer();

        assert!(handle.join().is_err());
        assert!(matches!(
            writer.submit(GpioReport::default()),
            Err(MonitorError::QueueClosed)
        ));
    }

    #[test]
    fn handler_panic_is_reported_by_join() {
        let line = Line::default();
        let handlers = Handlers::<GpioReport>::new().on_data_received(|_| panic!("handler boom"));
        let handle = Monitor::builder("panicky")
            .with_handlers(handlers)
            .start(line.clone(), GpioDevice::new())
            .unwrap();

        line.feed(&[0x01]);
        let err = handle.join().unwrap_err();
        assert!(matches!(err, MonitorError::Panicked(msg) if msg == "handler boom"));
    }

    #[test]
    fn settle_counts_consecutive_losses() {
        let loss = || {
            Err(FrameError::Channel(ChannelError::Fault {
                op: "read",
                kind: FaultKind::NoSuchDevice,
            }))
        };
        let mut losses = 0;

        assert!(!settle(loss(), &mut losses, 3).unwrap());
        assert!(!settle(loss(), &mut losses, 3).unwrap());
        let err = settle(loss(), &mut losses, 3).unwrap_err();
        assert!(matches!(err, MonitorError::ChannelLost { consecutive: 3 }));
    }

    #[test]
    fn settle_resets_on_success_and_other_faults() {
        let loss = || {
            Err(FrameError::Channel(ChannelError::Fault {
                op: "write",
                kind: FaultKind::BrokenPipe,
            }))
        };
        let mut losses = 0;

        settle(loss(), &mut losses, 2).unwrap();
        settle(Ok(false), &mut losses, 2).unwrap();
        assert_eq!(losses, 1);
        settle(Ok(true), &mut losses, 2).unwrap();
        assert_eq!(losses, 0);

        settle(loss(), &mut losses, 2).unwrap();
        settle(
            Err(FrameError::FrameTooLong { len: 1025, max: 1024 }),
            &mut losses,
            2,
        )
        .unwrap();
        assert_eq!(losses, 0);
    }

    #[test]
    fn settle_stops_on_closed_channel() {
        let err = settle(
            Err(FrameError::Channel(ChannelError::Closed)),
            &mut 0,
            3,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Frame(FrameError::Channel(ChannelError::Closed))
        ));
    }

    #[test]
    fn panic_message_extracts_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
