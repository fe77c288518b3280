//! labdriver: the shared plumbing behind the bench instrument drivers in this workspace.
//!
//! Every driver in this workspace talks to its instrument through the [`InstrumentInterface`]
//! trait and reports failures with the [`InstrumentError`] enum defined here. On top of that,
//! this crate bundles the few pieces that more than one driver needs:
//!
//! - [`Instrument`], a blocking interface for anything that implements [`std::io::Read`] and
//!   [`std::io::Write`], with shortcuts for serial ports ([`SerialInterface`], feature `serial`)
//!   and TCP/IP sockets ([`TcpIpInterface`]).
//! - [`PrologixInterface`], which wraps another interface and drives a GPIB bus through a
//!   Prologix style GPIB-USB or GPIB-Ethernet adapter. This gives access to serial polls, device
//!   clears, and group triggers.
//! - [`LoopbackInterface`], a scripted interface to test drivers without hardware.
//! - [`status_word::StatusWord`] to decode fixed-layout status strings, [`params`] for static
//!   parameter tables and bounds checks, [`units`] for canonical unit conversion, and
//!   [`wait::poll_until`] for bounded polling loops.
//!
//! # Logging
//!
//! All traffic is logged through the [`log`] facade: every command that is sent and every line
//! that is received is emitted at `debug` level. Install any logger (e.g., `env_logger`) in your
//! application to see it.
//!
//! Licensed under MIT or Apache-2.0, at your option.

#![warn(missing_docs)]

use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

mod instrument;
mod loopback;
pub mod params;
mod prologix;
#[cfg(feature = "serial")]
mod serial;
pub mod status_word;
mod tcp_ip;
pub mod units;
pub mod wait;

pub use instrument::Instrument;
pub use loopback::{BusEvent, LoopbackInterface};
pub use prologix::PrologixInterface;
#[cfg(feature = "serial")]
pub use serial::SerialInterface;
pub use tcp_ip::TcpIpInterface;

/// Everything that can go wrong while talking to an instrument.
///
/// Driver methods return `Result<_, InstrumentError>` throughout, so failures from the transport,
/// from parsing, and from the instrument itself all bubble up through `?`.
///
/// Callers usually care about which stage failed:
/// - argument checks, done before any byte leaves the host:
///   [`InstrumentError::ChannelIndexOutOfRange`], [`InstrumentError::FloatValueOutOfRange`],
///   [`InstrumentError::IntValueOutOfRange`], [`InstrumentError::IncompatibleUnit`], and
///   [`InstrumentError::InvalidArgument`],
/// - a reply the driver does not understand: [`InstrumentError::ResponseParseError`],
/// - a failure the instrument reports itself: [`InstrumentError::DeviceError`],
/// - timeouts and transport errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstrumentError {
    /// A channel or axis index beyond the configured count was used.
    #[error("Index {idx} is out of range, only {nof_channels} channel(s) configured")]
    ChannelIndexOutOfRange {
        /// Requested zero-based index.
        idx: usize,
        /// Number of configured channels.
        nof_channels: usize,
    },
    /// The instrument reported a non-zero error code after a command.
    #[error(
        "Instrument reported error {code}{}: {message}",
        axis.map(|ax| format!(" on axis {ax}")).unwrap_or_default()
    )]
    DeviceError {
        /// Error code as reported by the instrument, without the axis part.
        code: u32,
        /// Axis the error concerns, `None` for errors that concern the whole instrument.
        axis: Option<usize>,
        /// Human readable message that belongs to the error code.
        message: String,
        /// Time at which the error occured, if the instrument reports it.
        timestamp: Option<Duration>,
    },
    /// A floating point argument lies outside the accepted interval.
    #[error("{value} is not within [{min}, {max}]")]
    FloatValueOutOfRange {
        /// Rejected value.
        value: f64,
        /// Lower bound, inclusive.
        min: f64,
        /// Upper bound, inclusive.
        max: f64,
    },
    /// A quantity was given that cannot be converted into the unit the instrument expects, e.g.,
    /// an angle for an axis that is configured in millimeters.
    #[error("A {quantity} cannot be converted to {unit}")]
    IncompatibleUnit {
        /// The kind of quantity that was given.
        quantity: String,
        /// The unit the instrument expects.
        unit: String,
    },
    /// The interface has no way to perform the requested bus operation.
    #[error("Operation not available on this interface")]
    InterfaceCommandNotSupported,
    /// An integer argument lies outside the accepted interval.
    #[error("{value} is not within [{min}, {max}]")]
    IntValueOutOfRange {
        /// Rejected value.
        value: i64,
        /// Lower bound, inclusive.
        min: i64,
        /// Upper bound, inclusive.
        max: i64,
    },
    /// An argument was rejected; the message says why.
    #[error("{0}")]
    InvalidArgument(String),
    /// Transport level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The reply did not have the layout the driver expects. Holds the raw reply.
    #[error("Unexpected reply from instrument: {0:?}")]
    ResponseParseError(String),
    #[cfg(feature = "serial")]
    /// Failure while opening or configuring a serial port.
    #[error(transparent)]
    Serialport(#[from] serialport::Error),
    /// No terminator or expected state was seen within the given time.
    #[error("Instrument did not respond within {0:?}")]
    Timeout(Duration),
    /// Like [`InstrumentError::Timeout`], but for the reply to a specific query.
    #[error("No reply to {query:?} within {timeout:?}")]
    TimeoutQuery {
        /// Query that went unanswered.
        query: String,
        /// Read timeout of the interface.
        timeout: Duration,
    },
}

/// Byte transport to an instrument, plus line based helpers on top of it.
///
/// Only [`InstrumentInterface::read_exact`] and [`InstrumentInterface::write_raw`] are required.
/// Terminated commands, line reads, and queries come for free.
///
/// Serial polls, device clears, and triggers only exist on a GPIB bus. Interfaces without one
/// keep the defaults, which fail with [`InstrumentError::InterfaceCommandNotSupported`].
pub trait InstrumentInterface {
    /// Fill `buf` completely with bytes from the instrument.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError>;

    /// Write the given bytes to the interface and flush it.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError>;

    /// Line terminator, `"\n"` unless overridden.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Change the line terminator. Interfaces with a fixed terminator ignore this.
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Get the timeout used when reading from the interface. Defaults to three seconds.
    fn get_timeout(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Write a string to the interface as is, i.e., without appending a terminator.
    fn write(&mut self, data: &str) -> Result<(), InstrumentError> {
        self.write_raw(data.as_bytes())
    }

    /// Write `cmd` followed by the terminator.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        debug!("-> {cmd:?}");
        let line = format!("{cmd}{}", self.get_terminator());
        self.write(&line)
    }

    /// Read from the instrument until the terminator is found and return the line, trimmed.
    ///
    /// Bytes are read one by one. If the terminator is not encountered before the timeout
    /// elapses, [`InstrumentError::Timeout`] is returned. Bytes that are not valid UTF-8 are
    /// replaced and a warning is logged.
    fn read_until_terminator(&mut self) -> Result<String, InstrumentError> {
        let terminator = self.get_terminator().as_bytes().to_vec();
        let timeout = self.get_timeout();
        let mut received = Vec::new();
        let mut byte = [0u8; 1];

        let start = Instant::now();
        while start.elapsed() < timeout {
            self.read_exact(&mut byte)?;
            received.push(byte[0]);
            if !received.ends_with(&terminator) {
                continue;
            }
            let line = String::from_utf8(received).unwrap_or_else(|err| {
                warn!("Received invalid UTF-8 data: {:?}", err.as_bytes());
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            });
            let line = line.trim().to_owned();
            debug!("<- {line:?}");
            return Ok(line);
        }
        Err(InstrumentError::Timeout(timeout))
    }

    /// Send `cmd` and return the next line.
    ///
    /// A read timeout is reported as [`InstrumentError::TimeoutQuery`] so that the caller sees
    /// which query went unanswered.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.sendcmd(cmd)?;
        self.read_until_terminator().map_err(|err| match err {
            InstrumentError::Timeout(timeout) => InstrumentError::TimeoutQuery {
                query: cmd.to_owned(),
                timeout,
            },
            other => other,
        })
    }

    /// Read the status byte of the instrument with a serial poll (GPIB only).
    fn read_status_byte(&mut self) -> Result<u8, InstrumentError> {
        Err(InstrumentError::InterfaceCommandNotSupported)
    }

    /// Send a selected device clear to the instrument (GPIB only).
    fn device_clear(&mut self) -> Result<(), InstrumentError> {
        Err(InstrumentError::InterfaceCommandNotSupported)
    }

    /// Send a group execute trigger to the instrument (GPIB only).
    fn trigger(&mut self) -> Result<(), InstrumentError> {
        Err(InstrumentError::InterfaceCommandNotSupported)
    }
}
