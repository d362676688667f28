use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serialhid_channel::Channel;
use serialhid_frame::{Decoder, FrameError, FrameStrategy};
use tracing::{debug, trace, warn};

use crate::error::{MonitorError, Result};
use crate::listener::Handlers;
use crate::status::{EntityKind, EntityStatus, Lifecycle};

/// Flags and counters shared between the monitor thread and its handle.
#[derive(Debug, Default)]
pub(crate) struct MonitorState {
    pub(crate) stop: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) read_ticks: AtomicU64,
    pub(crate) write_ticks: AtomicU64,
}

impl MonitorState {
    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Point-in-time view of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub kind: EntityKind,
    pub lifecycle: Lifecycle,
    pub ticks: u64,
    /// Reports decoded (read) or written (write).
    pub reports: u64,
    pub exceptions: u64,
}

#[derive(Debug)]
struct EntityCell {
    kind: EntityKind,
    lifecycle: Lifecycle,
    ticks: u64,
    reports: u64,
    exceptions: u64,
}

impl EntityCell {
    fn advance(&mut self, next: Lifecycle) -> bool {
        if next < self.lifecycle {
            return false;
        }
        self.lifecycle = next;
        true
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            kind: self.kind,
            lifecycle: self.lifecycle,
            ticks: self.ticks,
            reports: self.reports,
            exceptions: self.exceptions,
        }
    }
}

type SharedCell = Arc<Mutex<EntityCell>>;

fn lock(cell: &SharedCell) -> MutexGuard<'_, EntityCell> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_cell(kind: EntityKind) -> SharedCell {
    Arc::new(Mutex::new(EntityCell {
        kind,
        lifecycle: Lifecycle::Created,
        ticks: 0,
        reports: 0,
        exceptions: 0,
    }))
}

/// Read-only view of an entity from another thread.
///
/// The lock is only held while counters change; handlers run after it is
/// released, so a handler may snapshot the entity that is calling it.
#[derive(Debug, Clone)]
pub struct EntityProbe {
    cell: SharedCell,
}

impl EntityProbe {
    pub fn snapshot(&self) -> EntitySnapshot {
        lock(&self.cell).snapshot()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.cell).lifecycle
    }

    pub fn kind(&self) -> EntityKind {
        lock(&self.cell).kind
    }
}

/// Shared entity plumbing: lifecycle cell plus monitor state.
struct Core {
    cell: SharedCell,
    monitor: Arc<MonitorState>,
}

impl Core {
    fn new(kind: EntityKind, monitor: Arc<MonitorState>) -> Self {
        Self {
            cell: new_cell(kind),
            monitor,
        }
    }

    fn probe(&self) -> EntityProbe {
        EntityProbe {
            cell: Arc::clone(&self.cell),
        }
    }

    fn transition<R>(&self, next: Lifecycle, status: EntityStatus, handlers: &mut Handlers<R>) {
        let (kind, moved) = {
            let mut cell = lock(&self.cell);
            let moved = cell.lifecycle != next && cell.advance(next);
            (cell.kind, moved)
        };
        if moved {
            debug!(entity = %kind, lifecycle = %next, "entity transition");
            handlers.status(kind, status);
        }
    }

    /// Count one tick and mark the entity `Updated`.
    fn begin_tick(&self) {
        let mut cell = lock(&self.cell);
        cell.advance(Lifecycle::Updated);
        cell.ticks += 1;
    }

    fn record_report(&self) {
        lock(&self.cell).reports += 1;
    }

    fn record_exception(&self) {
        lock(&self.cell).exceptions += 1;
    }

    fn initialize<R>(&self, handlers: &mut Handlers<R>) {
        self.transition(Lifecycle::Initialized, EntityStatus::Initialized, handlers);
    }

    fn terminate<R>(&self, handlers: &mut Handlers<R>) {
        self.transition(Lifecycle::Terminated, EntityStatus::Terminated, handlers);
    }
}

/// Polls the framing for one frame per tick and dispatches decoded reports.
pub(crate) struct ReadEntity<F> {
    core: Core,
    framing: F,
}

impl<F: FrameStrategy> ReadEntity<F> {
    pub(crate) fn new(framing: F, monitor: Arc<MonitorState>) -> Self {
        Self {
            core: Core::new(EntityKind::Read, monitor),
            framing,
        }
    }

    pub(crate) fn probe(&self) -> EntityProbe {
        self.core.probe()
    }

    pub(crate) fn initialize<R>(&self, handlers: &mut Handlers<R>) {
        self.core.initialize(handlers);
    }

    pub(crate) fn terminate<R>(&mut self, handlers: &mut Handlers<R>) {
        self.framing.reset();
        self.core.terminate(handlers);
    }

    /// One read tick. `Ok(true)` when a report was delivered.
    ///
    /// A fault has already been dispatched as `ExceptionThrown` by the time
    /// it is returned.
    pub(crate) fn tick<C, D>(
        &mut self,
        channel: &mut C,
        decoder: &D,
        handlers: &mut Handlers<D::Report>,
    ) -> std::result::Result<bool, FrameError>
    where
        C: Channel + ?Sized,
        D: Decoder<Raw = F::Raw>,
    {
        self.core.begin_tick();
        self.core.monitor.read_ticks.fetch_add(1, Ordering::AcqRel);
        handlers.status(EntityKind::Read, EntityStatus::Updated);

        match self.framing.poll_frame(channel) {
            Ok(None) => Ok(false),
            Ok(Some(raw)) => {
                let decoded = decoder.decode(&raw);
                self.core.record_report();
                handlers.data_received(&decoded.report);
                if let Some(warning) = &decoded.warning {
                    warn!(%warning, "decoded fallback report");
                    handlers.decode_warning(warning);
                }
                Ok(true)
            }
            Err(err) => {
                self.framing.reset();
                self.core.record_exception();
                warn!(entity = "read", error = %err, "read tick failed");
                handlers.exception(EntityKind::Read, &err);
                Err(err)
            }
        }
    }
}

/// Sends queued reports, at most one per tick.
pub(crate) struct WriteEntity<F, R> {
    core: Core,
    framing: F,
    queue: Receiver<R>,
}

impl<F: FrameStrategy, R> WriteEntity<F, R> {
    pub(crate) fn new(framing: F, queue: Receiver<R>, monitor: Arc<MonitorState>) -> Self {
        Self {
            core: Core::new(EntityKind::Write, monitor),
            framing,
            queue,
        }
    }

    pub(crate) fn probe(&self) -> EntityProbe {
        self.core.probe()
    }

    pub(crate) fn initialize(&self, handlers: &mut Handlers<R>) {
        self.core.initialize(handlers);
    }

    pub(crate) fn terminate(&mut self, handlers: &mut Handlers<R>) {
        self.framing.reset();
        self.core.terminate(handlers);
    }

    /// One write tick. `Ok(true)` when a report finished going out.
    ///
    /// A frame the channel pushed back on stays staged in the framing and is
    /// resumed on the next tick before another report is taken.
    pub(crate) fn tick<C, D>(
        &mut self,
        channel: &mut C,
        encoder: &D,
        handlers: &mut Handlers<R>,
    ) -> std::result::Result<bool, FrameError>
    where
        C: Channel + ?Sized,
        D: Decoder<Raw = F::Raw, Report = R>,
    {
        self.core.begin_tick();
        self.core.monitor.write_ticks.fetch_add(1, Ordering::AcqRel);
        handlers.status(EntityKind::Write, EntityStatus::Updated);

        let written = if self.framing.has_pending_write() {
            self.framing.flush(channel)
        } else {
            let report = match self.queue.try_recv() {
                Ok(report) => report,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(false),
            };
            encoder
                .encode(&report)
                .and_then(|raw| self.framing.write_frame(channel, &raw))
        };

        match written {
            Ok(Some(count)) => {
                self.core.record_report();
                handlers.data_transmitted(count);
                Ok(true)
            }
            Ok(None) => {
                trace!(entity = "write", "channel busy, frame staged");
                Ok(false)
            }
            Err(err) => {
                self.framing.reset();
                self.core.record_exception();
                warn!(entity = "write", error = %err, "write tick failed");
                handlers.exception(EntityKind::Write, &err);
                Err(err)
            }
        }
    }
}

/// Submits reports to a running monitor's write entity.
#[derive(Debug)]
pub struct WriteQueue<R> {
    tx: Sender<R>,
}

impl<R> Clone for WriteQueue<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R> WriteQueue<R> {
    /// Queue one report. Reports are written in submission order, one per tick.
    pub fn submit(&self, report: R) -> Result<()> {
        self.tx.send(report).map_err(|_| MonitorError::QueueClosed)
    }
}

pub(crate) fn write_queue<R>() -> (WriteQueue<R>, Receiver<R>) {
    let (tx, rx) = mpsc::channel();
    (WriteQueue { tx }, rx)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serialhid_channel::{ChannelError, FaultKind};
    use serialhid_device::{GpioDevice, GpioReport, HidDevice, MouseDevice, MouseReport};

    use super::*;

    #[derive(Default)]
    struct Wire {
        input: VecDeque<u8>,
        output: Vec<u8>,
        fault: Option<FaultKind>,
        busy_writes: usize,
    }

    impl Channel for Wire {
        fn read(&mut self, buf: &mut [u8]) -> serialhid_channel::Result<usize> {
            if let Some(kind) = self.fault {
                return Err(ChannelError::Fault { op: "read", kind });
            }
            match self.input.pop_front() {
                Some(byte) if !buf.is_empty() => {
                    buf[0] = byte;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }

        fn write(&mut self, buf: &[u8]) -> serialhid_channel::Result<usize> {
            if self.busy_writes > 0 {
                self.busy_writes -= 1;
                return Err(ChannelError::Fault {
                    op: "write",
                    kind: FaultKind::TryAgain,
                });
            }
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) -> serialhid_channel::Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn recording_handlers<R: Clone + Send + 'static>(
    ) -> (Handlers<R>, Arc<Mutex<Vec<EntityStatus>>>, Arc<Mutex<Vec<R>>>) {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&statuses);
        let r = Arc::clone(&reports);
        let handlers = Handlers::new()
            .on_status(move |_, status| s.lock().unwrap().push(status))
            .on_data_received(move |report: &R| r.lock().unwrap().push(report.clone()));
        (handlers, statuses, reports)
    }

    #[test]
    fn read_tick_dispatches_decoded_report() {
        let device = GpioDevice::new();
        let monitor = Arc::new(MonitorState::default());
        let mut entity = ReadEntity::new(device.framing().unwrap(), Arc::clone(&monitor));
        let (mut handlers, statuses, reports) = recording_handlers::<GpioReport>();
        let mut wire = Wire {
            input: VecDeque::from([0b0000_0011]),
            ..Wire::default()
        };

        entity.initialize(&mut handlers);
        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert!(!entity.tick(&mut wire, &device, &mut handlers).unwrap());
        entity.terminate(&mut handlers);

        assert_eq!(*reports.lock().unwrap(), vec![GpioReport::from_bits(0b11)]);
        assert_eq!(
            *statuses.lock().unwrap(),
            vec![
                EntityStatus::Initialized,
                EntityStatus::Updated,
                EntityStatus::Updated,
                EntityStatus::Terminated,
            ]
        );
        let snapshot = entity.probe().snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.reports, 1);
        assert_eq!(snapshot.lifecycle, Lifecycle::Terminated);
        assert_eq!(monitor.read_ticks.load(Ordering::Acquire), 2);
    }

    #[test]
    fn read_fault_is_dispatched_and_returned() {
        let device = GpioDevice::new();
        let mut entity = ReadEntity::new(device.framing().unwrap(), Arc::default());
        let (mut handlers, statuses, _) = recording_handlers::<GpioReport>();
        let mut wire = Wire {
            fault: Some(FaultKind::BrokenPipe),
            ..Wire::default()
        };

        let err = entity.tick(&mut wire, &device, &mut handlers).unwrap_err();
        assert!(err.is_channel_loss());
        assert_eq!(
            *statuses.lock().unwrap(),
            vec![EntityStatus::Updated, EntityStatus::ExceptionThrown]
        );
        assert_eq!(entity.probe().snapshot().exceptions, 1);
    }

    #[test]
    fn write_tick_sends_one_report_per_tick() {
        let device = GpioDevice::new();
        let (queue, rx) = write_queue();
        let mut entity = WriteEntity::new(device.framing().unwrap(), rx, Arc::default());
        let mut wire = Wire::default();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let mut handlers =
            Handlers::<GpioReport>::new().on_data_transmitted(move |n| sink.lock().unwrap().push(n));

        queue.submit(GpioReport::from_bits(0xA5)).unwrap();
        queue.submit(GpioReport::from_bits(0x0F)).unwrap();

        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert_eq!(wire.output, vec![0xA5]);
        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert_eq!(wire.output, vec![0xA5, 0x0F]);
        assert!(!entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert_eq!(*sent.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn busy_channel_keeps_frame_for_next_tick() {
        let device = GpioDevice::new();
        let (queue, rx) = write_queue();
        let mut entity = WriteEntity::new(device.framing().unwrap(), rx, Arc::default());
        let mut wire = Wire {
            busy_writes: 2,
            ..Wire::default()
        };
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        let mut handlers =
            Handlers::<GpioReport>::new().on_data_transmitted(move |n| sink.lock().unwrap().push(n));

        queue.submit(GpioReport::from_bits(0x81)).unwrap();
        queue.submit(GpioReport::from_bits(0x42)).unwrap();

        assert!(!entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert!(!entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert!(wire.output.is_empty());
        assert!(sent.lock().unwrap().is_empty());

        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert_eq!(wire.output, vec![0x81]);
        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());
        assert_eq!(wire.output, vec![0x81, 0x42]);
        assert_eq!(*sent.lock().unwrap(), vec![1, 1]);

        let snapshot = entity.probe().snapshot();
        assert_eq!(snapshot.ticks, 4);
        assert_eq!(snapshot.reports, 2);
        assert_eq!(snapshot.exceptions, 0);
    }

    #[test]
    fn handler_can_snapshot_its_own_entity() {
        let device = GpioDevice::new();
        let mut entity = ReadEntity::new(device.framing().unwrap(), Arc::default());
        let probe = entity.probe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut handlers = Handlers::<GpioReport>::new()
            .on_data_received(move |_| sink.lock().unwrap().push(probe.snapshot()));
        let mut wire = Wire {
            input: VecDeque::from([0x01]),
            ..Wire::default()
        };

        assert!(entity.tick(&mut wire, &device, &mut handlers).unwrap());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reports, 1);
        assert_eq!(seen[0].ticks, 1);
        assert_eq!(seen[0].lifecycle, Lifecycle::Updated);
    }

    #[test]
    fn status_handler_can_read_lifecycle() {
        let device = GpioDevice::new();
        let mut entity = ReadEntity::new(device.framing().unwrap(), Arc::default());
        let probe = entity.probe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut handlers = Handlers::<GpioReport>::new()
            .on_status(move |_, _| sink.lock().unwrap().push(probe.lifecycle()));

        entity.initialize(&mut handlers);
        entity.terminate(&mut handlers);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Lifecycle::Initialized, Lifecycle::Terminated]
        );
    }

    #[test]
    fn unsupported_encode_throws() {
        let device = MouseDevice::new();
        let (queue, rx) = write_queue();
        let mut entity = WriteEntity::new(device.framing().unwrap(), rx, Arc::default());
        let mut wire = Wire::default();
        let (mut handlers, statuses, _) = recording_handlers::<MouseReport>();

        queue.submit(MouseReport::default()).unwrap();
        let err = entity.tick(&mut wire, &device, &mut handlers).unwrap_err();

        assert!(matches!(err, FrameError::UnsupportedEncode { device: "mouse" }));
        assert!(wire.output.is_empty());
        assert_eq!(
            statuses.lock().unwrap().last(),
            Some(&EntityStatus::ExceptionThrown)
        );
    }

    #[test]
    fn lifecycle_never_moves_backwards() {
        let device = GpioDevice::new();
        let mut entity = ReadEntity::new(device.framing().unwrap(), Arc::default());
        let (mut handlers, statuses, _) = recording_handlers::<GpioReport>();

        entity.terminate(&mut handlers);
        entity.initialize(&mut handlers);
        entity.terminate(&mut handlers);

        assert_eq!(entity.probe().lifecycle(), Lifecycle::Terminated);
        assert_eq!(*statuses.lock().unwrap(), vec![EntityStatus::Terminated]);
    }

    #[test]
    fn submit_after_receiver_dropped_fails() {
        let (queue, rx) = write_queue::<u8>();
        drop(rx);
        assert!(matches!(queue.submit(1), Err(MonitorError::QueueClosed)));
    }
}
