use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::broadcast;
use tracing::{trace, warn};

/// A registered "read" listener.
///
/// Runs on the port's worker, so it should return promptly.
pub(crate) type ReadListener = Box<dyn FnMut(&[u8]) + Send>;

/// Fans one flushed read event out to every registered listener, in
/// registration order, and to the broadcast tap.
pub(crate) struct ReadDispatcher {
    listeners: Vec<ReadListener>,
    tap: broadcast::Sender<Vec<u8>>,
}

impl ReadDispatcher {
    pub(crate) fn new(tap: broadcast::Sender<Vec<u8>>) -> Self {
        Self {
            listeners: Vec::new(),
            tap,
        }
    }

    /// Listeners are invoked in the order they were registered.
    pub(crate) fn register(&mut self, listener: ReadListener) {
        self.listeners.push(listener);
    }

    /// Deliver one flush.
    ///
    /// The trigger buffer has already committed the flush when this is
    /// called, so a misbehaving listener cannot corrupt it. A panicking
    /// listener is caught and does not rob later listeners of the event.
    pub(crate) fn dispatch(&mut self, bytes: &[u8]) {
        for listener in self.listeners.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| listener(bytes))).is_err() {
                warn!("A read listener panicked; continuing with the rest");
            }
        }

        match self.tap.send(bytes.to_vec()) {
            Ok(subscribers) => trace!("Read event to {subscribers} subscriber(s)"),
            Err(_) => trace!("No subscribers for read event"),
        }
    }
}
