use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Any error this library may hand to a caller.
///
/// Errors are always structured values carrying a kind and a message.
/// Success is never signalled through the absence of an error value.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The caller's configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport failed underneath us.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller handed us something which cannot go on a wire.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Configuration problems.
///
/// Surfaced by the operation which triggered them, never silently corrected.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested port is not one the hardware layer enumerates.
    #[error("The port `{0}` does not exist")]
    UnknownPort(String),

    /// The requested baud rate is not one the hardware layer accepts.
    #[error("The baud rate `{0}` is not supported")]
    UnsupportedBaud(u32),

    /// A read range must satisfy `1 <= min <= max`.
    #[error("Invalid read range: min `{min}`, max `{max}`")]
    InvalidRange {
        /// The requested minimum.
        min: usize,

        /// The requested maximum.
        max: usize,
    },

    /// The bench description did not conform to valid usage.
    #[error("Bad bench description. Problem: `{0}`")]
    BadBench(String),
}

/// Transport problems.
///
/// These surface through the same asynchronous completion channel as
/// success, never as a synchronous panic.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransportError {
    /// The port already has a live handle.
    #[error("The port `{0}` is already open")]
    AlreadyOpen(String),

    /// The hardware layer could not open the port.
    #[error("Could not open the port: {0}")]
    OpenFailed(String),

    /// The hardware layer could not put the bytes on the wire.
    #[error("Could not put the data on the wire: {0}")]
    TransmitFailed(String),

    /// The port is closed (or went away underneath us).
    #[error("The port is closed")]
    PortClosed,
}

/// The caller handed [`crate::port::PortHandle::write`] something other
/// than a byte buffer.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PayloadError {
    /// Only byte buffers can be written.
    #[error("Can only write byte buffers, got {0}")]
    NotBytes(String),
}
