use std::{fmt, io, sync::Arc};

use thiserror::Error;
use tracing::debug;

/// A metric could not be handed off to the transport.
///
/// The metric is dropped. Transport errors are never returned from the emitting call; they are delivered to the
/// client's error hook instead (see [`Events`]).
#[derive(Debug, Error)]
#[error("failed to send {payload_len}-byte payload over {transport}: {source}")]
pub struct TransportError {
    transport: &'static str,
    payload_len: usize,
    #[source]
    source: io::Error,
}

impl TransportError {
    pub(crate) fn new(transport: &'static str, payload_len: usize, source: io::Error) -> Self {
        TransportError { transport, payload_len, source }
    }

    /// Returns the ID of the transport that failed.
    pub fn transport(&self) -> &'static str {
        self.transport
    }

    /// Returns the length of the payload that was dropped.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Returns the kind of the underlying I/O error.
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

type ErrorHook = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Notification hooks for conditions that occur while emitting metrics.
///
/// Without a registered error hook, transport errors are logged at `DEBUG` level and otherwise discarded.
#[derive(Clone, Default)]
pub struct Events {
    on_error: Option<ErrorHook>,
}

impl Events {
    /// Creates an empty set of hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the error hook, replacing any previously registered one.
    ///
    /// The hook runs synchronously on the thread that emitted the metric, so it should be cheap, and must not panic.
    pub fn on_error<F>(&mut self, hook: F)
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
    }

    pub(crate) fn emit_error(&self, error: &TransportError) {
        match &self.on_error {
            Some(hook) => hook(error),
            None => debug!(%error, "Failed to send metric."),
        }
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events").field("on_error", &self.on_error.is_some()).finish()
    }
}
