#![deny(missing_docs)]

//! This crate is an asynchronous driver front for UART serial ports.
//!
//! A port is opened via [`driver::Driver::init`] with a port name and baud rate.
//! Validation and acquisition share a single asynchronous success/failure channel.
//!
//! Incoming bytes accumulate in a trigger buffer.
//! Once at least `min` bytes have arrived they are flushed,
//! at most `max` at a time, as one read event to every registered listener.
//! The `[min, max]` range may be re-armed between events.
//! No byte is ever dropped, duplicated or reordered.
//!
//! Writes are queued and put on the wire in submission order.
//! Each write resolves or rejects independently through its own completion future.
//!
//! The board support layer sits behind the [`hardware::Hardware`] trait.
//! Two implementations ship:
//! [`serial::SystemHardware`] for the operating system's serial ports,
//! and [`mock::MockHardware`], an in-memory bench for tests and development.

/// Entry point. Owns a hardware layer, validates configurations, opens ports.
pub mod driver;

/// What a caller asks to open, plus the bench description file.
pub mod config;

/// An open port: read events, trigger range control, writes, close.
pub mod port;

/// The `[min, max]` byte-count read trigger.
pub mod trigger;

/// Fans flushed read events out to listeners.
pub(crate) mod dispatch;

/// The seam towards the board support layer.
pub mod hardware;

/// In-memory hardware for tests and development.
pub mod mock;

/// Real serial ports via the operating system.
pub mod serial;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;
