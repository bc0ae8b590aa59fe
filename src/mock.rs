//! A mock bench, useful to exercise the driver without actual serial ports.
//!
//! The bench side of an open line is the inverse of the driver side:
//! [`MockHardware::feed`] plays the role of the far end putting bytes on
//! the wire, and [`MockHardware::transmitted`] observes what the driver
//! sent. Transmit faults can be injected to exercise error paths.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, trace};

use crate::{
    config::Bench,
    error::{ConfigError, TransportError},
    hardware::{Hardware, HardwareLink, Reservation, Reservations, Transmitter, WireChunk},
};

/// In-memory hardware.
///
/// Which ports exist and which baud rates they accept comes from a
/// [`Bench`] description. Each open line is exclusively owned until its
/// handle goes away, just like a physical one.
pub struct MockHardware {
    bench: Bench,
    lines: Arc<Mutex<HashMap<String, Line>>>,
    reservations: Reservations,
}

/// The bench side of one opened line.
struct Line {
    feed: mpsc::UnboundedSender<WireChunk>,
    transmitted: broadcast::Sender<Vec<u8>>,
    faults: Arc<Mutex<u32>>,
}

impl MockHardware {
    /// A bench as described.
    pub fn new(bench: Bench) -> Result<Self, ConfigError> {
        bench.validate()?;

        Ok(Self {
            bench,
            lines: Arc::new(Mutex::new(HashMap::new())),
            reservations: Reservations::default(),
        })
    }

    /// The example bench: two ports, the common baud rates.
    pub fn example() -> Self {
        Self::new(Bench::example()).expect("The example bench is valid")
    }

    /// Put `bytes` on an open port's wire, as if the far end sent them.
    ///
    /// Chunking is up to the caller; the driver promises the same
    /// behavior regardless.
    pub fn feed(&self, port: &str, bytes: &[u8]) -> Result<(), TransportError> {
        let lines = self.lines.lock();

        let line = lines.get(port).ok_or(TransportError::PortClosed)?;
        line.feed
            .unbounded_send(bytes.to_vec())
            .map_err(|_| TransportError::PortClosed)
    }

    /// Observe everything the driver transmits on `port`.
    ///
    /// Only transmissions after subscribing are seen.
    pub fn transmitted(&self, port: &str) -> Result<broadcast::Receiver<Vec<u8>>, TransportError> {
        let lines = self.lines.lock();

        let line = lines.get(port).ok_or(TransportError::PortClosed)?;
        Ok(line.transmitted.subscribe())
    }

    /// Make the next `count` transmissions on `port` fail.
    pub fn break_transmits(&self, port: &str, count: u32) -> Result<(), TransportError> {
        let lines = self.lines.lock();

        let line = lines.get(port).ok_or(TransportError::PortClosed)?;
        *line.faults.lock() += count;

        Ok(())
    }

    /// Yank the port out, as if the cable was pulled.
    ///
    /// The driver sees the wire end; the port's worker shuts down and
    /// operations on its handle report a closed port.
    pub fn unplug(&self, port: &str) -> Result<(), TransportError> {
        let mut lines = self.lines.lock();

        lines
            .remove(port)
            .map(|_| ())
            .ok_or(TransportError::PortClosed)
    }
}

#[async_trait]
impl Hardware for MockHardware {
    fn available_ports(&self) -> Vec<String> {
        self.bench.ports.clone()
    }

    fn supported_bauds(&self) -> Vec<u32> {
        self.bench.bauds.clone()
    }

    async fn open(&self, port: &str, baud: u32) -> Result<HardwareLink, TransportError> {
        if !self.bench.ports.iter().any(|p| p == port) {
            return Err(TransportError::OpenFailed(format!(
                "The bench has no port `{port}`"
            )));
        }

        let reservation = self.reservations.reserve(port)?;
        info!(%port, baud, "Mock line open");

        let (feed_tx, feed_rx) = mpsc::unbounded();
        let (transmitted_tx, _) = broadcast::channel(1024);
        let faults = Arc::new(Mutex::new(0));

        self.lines.lock().insert(
            port.to_string(),
            Line {
                feed: feed_tx,
                transmitted: transmitted_tx.clone(),
                faults: faults.clone(),
            },
        );

        let transmitter = MockTransmitter {
            transmitted: transmitted_tx,
            faults,
            _reservation: reservation,
        };

        Ok(HardwareLink {
            incoming: feed_rx,
            transmitter: Box::new(transmitter),
        })
    }
}

struct MockTransmitter {
    transmitted: broadcast::Sender<Vec<u8>>,

    // Injected faults left to consume.
    faults: Arc<Mutex<u32>>,

    // Held so the line frees when the driver lets go of us.
    _reservation: Reservation,
}

#[async_trait]
impl Transmitter for MockTransmitter {
    async fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        {
            let mut faults = self.faults.lock();
            if *faults > 0 {
                *faults -= 1;
                return Err(TransportError::TransmitFailed("Injected fault".into()));
            }
        }

        trace!(len = bytes.len(), "Mock transmit");

        // No observers is fine; the bytes still "went out".
        let _ = self.transmitted.send(bytes.to_vec());

        Ok(())
    }
}
