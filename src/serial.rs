//! The real hardware layer, on top of the operating system's serial ports.

use async_trait::async_trait;
use futures::channel::mpsc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::{
    error::TransportError,
    hardware::{Hardware, HardwareLink, Reservation, Reservations, Transmitter, WireChunk},
};

/// The baud rates the driver will ask the operating system for.
const SUPPORTED_BAUDS: &[u32] = &[
    1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

/// Opens real serial ports via the operating system.
///
/// Lines are opened 8N1. Exclusivity is tracked per driver: a port with
/// a live handle refuses a second open until the first one goes away.
#[derive(Debug, Default, Clone)]
pub struct SystemHardware {
    reservations: Reservations,
}

#[async_trait]
impl Hardware for SystemHardware {
    fn available_ports(&self) -> Vec<String> {
        match tokio_serial::available_ports() {
            Ok(ports) => ports.into_iter().map(|port| port.port_name).collect(),
            Err(e) => {
                warn!(?e, "Could not enumerate serial ports");
                vec![]
            }
        }
    }

    fn supported_bauds(&self) -> Vec<u32> {
        SUPPORTED_BAUDS.to_vec()
    }

    async fn open(&self, port: &str, baud: u32) -> Result<HardwareLink, TransportError> {
        let reservation = self.reservations.reserve(port)?;

        debug!(%port, baud, "Opening serial stream");
        let stream = tokio_serial::new(port, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()
            .map_err(|e| TransportError::OpenFailed(e.to_string()))?;

        let (reader, writer) = tokio::io::split(stream);

        let (chunk_tx, chunk_rx) = mpsc::unbounded();

        let span = info_span!("wire", %port);
        tokio::spawn(pump(reader, chunk_tx).instrument(span));

        Ok(HardwareLink {
            incoming: chunk_rx,
            transmitter: Box::new(SystemTransmitter {
                writer,
                _reservation: reservation,
            }),
        })
    }
}

/// Moves bytes off the wire and into the driver until the port goes away
/// or the driver hangs up.
// TODO: tear the pump down as soon as the driver hangs up, instead of
// noticing on the next wire byte.
async fn pump(mut reader: ReadHalf<SerialStream>, chunks: mpsc::UnboundedSender<WireChunk>) {
    let mut scratch = [0u8; 512];

    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => {
                debug!("Wire end of stream");
                break;
            }
            Ok(n) => {
                trace!(len = n, "Chunk from wire");
                if chunks.unbounded_send(scratch[..n].to_vec()).is_err() {
                    // Driver hung up.
                    break;
                }
            }
            Err(e) => {
                warn!(?e, "Wire read failed");
                break;
            }
        }
    }
}

struct SystemTransmitter {
    writer: WriteHalf<SerialStream>,

    // Held so the line frees when the driver lets go of us.
    _reservation: Reservation,
}

#[async_trait]
impl Transmitter for SystemTransmitter {
    async fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| TransportError::TransmitFailed(e.to_string()))?;

        self.writer
            .flush()
            .await
            .map_err(|e| TransportError::TransmitFailed(e.to_string()))?;

        Ok(())
    }
}
