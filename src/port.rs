use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{channel::mpsc, future, stream, StreamExt};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::{
    config::ValidatedConfig,
    dispatch::{ReadDispatcher, ReadListener},
    error::{Error, PayloadError, TransportError},
    hardware::{HardwareLink, Transmitter, WireChunk},
    trigger::{ReadRange, TriggerBuffer},
};

/// A value handed to [`PortHandle::write`].
///
/// The wire only takes bytes. Anything else is refused through the
/// write's completion, the same channel transport failures use, so
/// callers have one error-handling path for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A byte buffer. The only payload a wire can carry.
    Bytes(Vec<u8>),

    /// Text. Not transmittable as-is; encode it into bytes first.
    Text(String),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

/// The completion of one [`PortHandle::write`].
///
/// The write was already submitted when this future was handed out, so
/// dropping it does not cancel anything; it only discards the verdict.
#[must_use = "The write's fate is only reported if this is awaited"]
pub struct WriteRequest {
    done: oneshot::Receiver<Result<(), Error>>,
}

impl Future for WriteRequest {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        Pin::new(&mut this.done).poll(cx).map(|answer| match answer {
            Ok(result) => result,
            // The worker went away before answering.
            Err(_) => Err(TransportError::PortClosed.into()),
        })
    }
}

struct PendingWrite {
    payload: Payload,
    done: oneshot::Sender<Result<(), Error>>,
}

enum ControlRequest {
    Arm(ReadRange),
    AddListener(ReadListener),
    Close,
}

/// An open port.
///
/// Created only by a successful [`crate::driver::Driver::init`] and
/// exclusively owned by the caller that received it. All state lives on
/// the port's worker task; the handle talks to it through channels, so
/// every operation here is non-blocking.
///
/// The port's lifetime ends on [`PortHandle::close`] or drop. Either
/// releases the line; `close` additionally waits until it has happened.
pub struct PortHandle {
    port: String,
    writes: mpsc::UnboundedSender<PendingWrite>,
    control: mpsc::UnboundedSender<ControlRequest>,
    tap: broadcast::Sender<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
}

impl PortHandle {
    pub(crate) fn spawn(config: ValidatedConfig, link: HardwareLink) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded();
        let (control_tx, control_rx) = mpsc::unbounded();

        // Outsiders observe read events from this broadcast.
        let (tap, _) = broadcast::channel(1024);

        let worker = Worker {
            buffer: TriggerBuffer::default(),
            dispatcher: ReadDispatcher::new(tap.clone()),
            transmitter: link.transmitter,
        };

        let port = config.0.port;
        let span = info_span!("port", name = %port);
        let handle = tokio::spawn(
            worker
                .run(link.incoming, write_rx, control_rx)
                .instrument(span),
        );

        Self {
            port,
            writes: write_tx,
            control: control_tx,
            tap,
            worker: Some(handle),
        }
    }

    /// The port identifier this handle owns.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Arm the read trigger: flush as soon as `min` bytes have
    /// accumulated, delivering at most `max` per event.
    ///
    /// Errs synchronously on a nonsensical range. The update itself
    /// travels to the port asynchronously and applies from the next
    /// accumulation decision; bytes already buffered stay put.
    pub fn set_read_range(&self, min: usize, max: usize) -> Result<(), Error> {
        let range = ReadRange::new(min, max)?;

        self.control
            .unbounded_send(ControlRequest::Arm(range))
            .map_err(|_| TransportError::PortClosed)?;

        Ok(())
    }

    /// Register a "read" listener.
    ///
    /// Listeners run on the port's worker, once per flush, in
    /// registration order, with the flushed bytes.
    pub fn on_read<F>(&self, listener: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.control
            .unbounded_send(ControlRequest::AddListener(Box::new(listener)))
            .map_err(|_| TransportError::PortClosed)?;

        Ok(())
    }

    /// A stream-style tap of flushed read events.
    ///
    /// Only events flushed after subscribing are seen. A subscriber
    /// which cannot keep up misses events; registered listeners never do.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tap.subscribe()
    }

    /// Submit a write.
    ///
    /// Submission happens in this call, so wire order follows call
    /// order even when several completions are still in flight. The
    /// returned future resolves once the transport accepted the bytes,
    /// or rejects: with a payload problem if `payload` is not a byte
    /// buffer, with a transport problem if transmission failed. A
    /// failed write neither closes the port nor cancels queued writes.
    pub fn write(&self, payload: impl Into<Payload>) -> WriteRequest {
        let (done_tx, done_rx) = oneshot::channel();

        let pending = PendingWrite {
            payload: payload.into(),
            done: done_tx,
        };

        if let Err(refused) = self.writes.unbounded_send(pending) {
            // Worker is gone. Answer through the same channel the
            // caller is already holding.
            let _ = refused
                .into_inner()
                .done
                .send(Err(TransportError::PortClosed.into()));
        }

        WriteRequest { done: done_rx }
    }

    /// Close the port and wait until the line has been released.
    ///
    /// Pending writes which never reached the wire resolve with
    /// [`TransportError::PortClosed`].
    pub async fn close(mut self) {
        let _ = self.control.unbounded_send(ControlRequest::Close);

        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        // Best effort; after `close` the channel is already gone.
        let _ = self.control.unbounded_send(ControlRequest::Close);
    }
}

/// The single logical worker of one open port.
///
/// Owns the trigger buffer, the listeners and the transmitter; every
/// operation against the port is serialized through its event loop, which
/// is what upholds the buffer invariants without locks.
struct Worker {
    buffer: TriggerBuffer,
    dispatcher: ReadDispatcher,
    transmitter: Box<dyn Transmitter>,
}

enum Event {
    ThisCameFromWire(WireChunk),
    WireGone,
    PleasePutThisOnWire(PendingWrite),
    Control(ControlRequest),
}

impl Worker {
    async fn run(
        mut self,
        incoming: mpsc::UnboundedReceiver<WireChunk>,
        writes: mpsc::UnboundedReceiver<PendingWrite>,
        control: mpsc::UnboundedReceiver<ControlRequest>,
    ) {
        let incoming = incoming
            .map(Event::ThisCameFromWire)
            .chain(stream::once(future::ready(Event::WireGone)));
        let writes = writes.map(Event::PleasePutThisOnWire);
        let control = control.map(Event::Control);

        let mut events = stream::select(incoming, stream::select(writes, control));

        while let Some(event) = events.next().await {
            match event {
                Event::ThisCameFromWire(chunk) => {
                    trace!(len = chunk.len(), "Bytes from wire");
                    self.buffer.arrived(&chunk);
                    self.drain();
                }
                Event::WireGone => {
                    debug!("Wire went away, exiting");
                    break;
                }
                Event::PleasePutThisOnWire(write) => self.transmit(write).await,
                Event::Control(ControlRequest::Arm(range)) => {
                    self.buffer.arm(range);

                    // Re-arming is itself a decision point: a backlog
                    // which now satisfies the range flushes right away.
                    self.drain();
                }
                Event::Control(ControlRequest::AddListener(listener)) => {
                    self.dispatcher.register(listener);
                }
                Event::Control(ControlRequest::Close) => {
                    debug!("Close requested, exiting");
                    break;
                }
            }
        }

        // Dropping self releases the transmitter, and with it the line.
    }

    /// Flush until the accumulated length falls below the armed minimum.
    ///
    /// The flush commits before listeners see it; each iteration is one
    /// atomic "empty and deliver" step.
    fn drain(&mut self) {
        while let Some(flush) = self.buffer.decide() {
            trace!(len = flush.len(), "Read event");
            self.dispatcher.dispatch(&flush);
        }
    }

    async fn transmit(&mut self, write: PendingWrite) {
        let verdict = match write.payload {
            Payload::Bytes(bytes) => self
                .transmitter
                .transmit(&bytes)
                .await
                .map_err(Error::from),
            other => Err(PayloadError::NotBytes(other.kind().into()).into()),
        };

        if let Err(e) = &verdict {
            warn!(?e, "Write failed");
        }

        // The caller may have dropped the completion; their call.
        let _ = write.done.send(verdict);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn byte_like_values_become_byte_payloads() {
        assert_eq!(Payload::from(vec![1, 2, 3]), Payload::Bytes(vec![1, 2, 3]));
        assert_eq!(Payload::from(&b"hi"[..]), Payload::Bytes(b"hi".to_vec()));
        assert_eq!(Payload::from(b"hi"), Payload::Bytes(b"hi".to_vec()));
    }

    #[test]
    fn string_like_values_become_text_payloads() {
        assert_eq!(Payload::from("hi"), Payload::Text("hi".into()));
        assert_eq!(Payload::from(String::from("hi")), Payload::Text("hi".into()));
    }

    #[test]
    fn only_bytes_are_wire_worthy() {
        assert_eq!(Payload::Bytes(vec![]).kind(), "bytes");
        assert_eq!(Payload::Text(String::new()).kind(), "text");
    }
}
