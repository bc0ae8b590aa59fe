use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;

/// One chunk of bytes as the hardware hands them over.
///
/// Carries no size guarantee whatsoever: a chunk may be a single byte or
/// a whole burst.
pub type WireChunk = Vec<u8>;

/// The board support seam.
///
/// Everything register-level lives behind this trait: enumerating ports
/// and baud rates, opening a line, moving bytes. The driver core never
/// assumes more than what is promised here.
#[async_trait]
pub trait Hardware: Send + Sync {
    /// The ports this hardware layer can open.
    fn available_ports(&self) -> Vec<String>;

    /// The baud rates this hardware layer accepts.
    fn supported_bauds(&self) -> Vec<u32>;

    /// Open a line.
    ///
    /// A port with a live handle must not open a second time;
    /// that is [`TransportError::AlreadyOpen`].
    async fn open(&self, port: &str, baud: u32) -> Result<HardwareLink, TransportError>;
}

/// Puts bytes on the physical wire, one buffer at a time.
#[async_trait]
pub trait Transmitter: Send {
    /// Hand `bytes` to the transport.
    ///
    /// Resolves once the transport has accepted them,
    /// errs if it could not.
    async fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// What a successful open yields: the receive side and the transmit side
/// of one exclusively owned line.
pub struct HardwareLink {
    /// Chunks read off the wire.
    pub incoming: mpsc::UnboundedReceiver<WireChunk>,

    /// The transmit side. Letting go of it releases the line.
    pub transmitter: Box<dyn Transmitter>,
}

impl std::fmt::Debug for HardwareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareLink").finish_non_exhaustive()
    }
}

/// Bookkeeping of which ports have a live handle.
///
/// Shared between a hardware layer and the reservations it hands out,
/// so that dropping a reservation frees the line.
#[derive(Debug, Default, Clone)]
pub(crate) struct Reservations(Arc<Mutex<HashSet<String>>>);

impl Reservations {
    /// Claim `port`. Errs if it already has a live claim.
    pub(crate) fn reserve(&self, port: &str) -> Result<Reservation, TransportError> {
        let mut held = self.0.lock();

        if !held.insert(port.to_string()) {
            return Err(TransportError::AlreadyOpen(port.to_string()));
        }

        Ok(Reservation {
            port: port.to_string(),
            held: self.clone(),
        })
    }
}

/// A live claim on one port. Dropping it frees the line.
#[derive(Debug)]
pub(crate) struct Reservation {
    port: String,
    held: Reservations,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        debug!(port = %self.port, "Line released");
        self.held.0.lock().remove(&self.port);
    }
}
