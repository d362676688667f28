use std::fmt;

use serialhid_frame::{DecodeWarning, FrameError};

use crate::status::{EntityKind, EntityStatus};

type StatusFn = Box<dyn FnMut(EntityKind, EntityStatus) + Send>;
type ExceptionFn = Box<dyn FnMut(EntityKind, &FrameError) + Send>;
type ReceivedFn<R> = Box<dyn FnMut(&R) + Send>;
type TransmittedFn = Box<dyn FnMut(usize) + Send>;
type WarningFn = Box<dyn FnMut(&DecodeWarning) + Send>;

/// Callbacks invoked on the monitor thread.
///
/// Every handler is optional; unset handlers are skipped. Handlers run
/// synchronously inside a tick, so a slow handler slows the loop.
pub struct Handlers<R> {
    on_status: Option<StatusFn>,
    on_exception: Option<ExceptionFn>,
    on_data_received: Option<ReceivedFn<R>>,
    on_data_transmitted: Option<TransmittedFn>,
    on_decode_warning: Option<WarningFn>,
}

impl<R> Handlers<R> {
    /// An empty handler set.
    pub fn new() -> Self {
        Self {
            on_status: None,
            on_exception: None,
            on_data_received: None,
            on_data_transmitted: None,
            on_decode_warning: None,
        }
    }

    /// Entity lifecycle and fault notifications.
    pub fn on_status(mut self, f: impl FnMut(EntityKind, EntityStatus) + Send + 'static) -> Self {
        self.on_status = Some(Box::new(f));
        self
    }

    /// The error behind each [`EntityStatus::ExceptionThrown`].
    pub fn on_exception(mut self, f: impl FnMut(EntityKind, &FrameError) + Send + 'static) -> Self {
        self.on_exception = Some(Box::new(f));
        self
    }

    /// A report decoded by the read entity.
    pub fn on_data_received(mut self, f: impl FnMut(&R) + Send + 'static) -> Self {
        self.on_data_received = Some(Box::new(f));
        self
    }

    /// Bytes written by the write entity for one report.
    pub fn on_data_transmitted(mut self, f: impl FnMut(usize) + Send + 'static) -> Self {
        self.on_data_transmitted = Some(Box::new(f));
        self
    }

    /// A frame that decoded to a fallback report.
    pub fn on_decode_warning(mut self, f: impl FnMut(&DecodeWarning) + Send + 'static) -> Self {
        self.on_decode_warning = Some(Box::new(f));
        self
    }

    pub(crate) fn status(&mut self, kind: EntityKind, status: EntityStatus) {
        if let Some(f) = self.on_status.as_mut() {
            f(kind, status);
        }
    }

    pub(crate) fn exception(&mut self, kind: EntityKind, err: &FrameError) {
        self.status(kind, EntityStatus::ExceptionThrown);
        if let Some(f) = self.on_exception.as_mut() {
            f(kind, err);
        }
    }

    pub(crate) fn data_received(&mut self, report: &R) {
        if let Some(f) = self.on_data_received.as_mut() {
            f(report);
        }
    }

    pub(crate) fn data_transmitted(&mut self, count: usize) {
        if let Some(f) = self.on_data_transmitted.as_mut() {
            f(count);
        }
    }

    pub(crate) fn decode_warning(&mut self, warning: &DecodeWarning) {
        if let Some(f) = self.on_decode_warning.as_mut() {
            f(warning);
        }
    }
}

impl<R> Default for Handlers<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Handlers<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_status", &self.on_status.is_some())
            .field("on_exception", &self.on_exception.is_some())
            .field("on_data_received", &self.on_data_received.is_some())
            .field("on_data_transmitted", &self.on_data_transmitted.is_some())
            .field("on_decode_warning", &self.on_decode_warning.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn unset_handlers_are_skipped() {
        let mut handlers = Handlers::<u8>::new();
        handlers.status(EntityKind::Read, EntityStatus::Updated);
        handlers.data_received(&1);
        handlers.data_transmitted(1);
    }

    #[test]
    fn exception_fires_status_then_error() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let status_events = Arc::clone(&events);
        let error_events = Arc::clone(&events);

        let mut handlers = Handlers::<u8>::new()
            .on_status(move |kind, status| {
                status_events
                    .lock()
                    .unwrap()
                    .push(format!("{kind}:{status}"));
            })
            .on_exception(move |kind, err| {
                error_events.lock().unwrap().push(format!("{kind}:{err}"));
            });

        handlers.exception(
            EntityKind::Write,
            &FrameError::UnsupportedEncode { device: "mouse" },
        );

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "write:exception_thrown".to_string(),
                "write:mouse does not support encoding reports".to_string(),
            ]
        );
    }

    #[test]
    fn debug_shows_configured_handlers() {
        let handlers = Handlers::<u8>::new().on_data_transmitted(|_| {});
        let debug = format!("{handlers:?}");
        assert!(debug.contains("on_data_transmitted: true"));
        assert!(debug.contains("on_status: false"));
    }
}
