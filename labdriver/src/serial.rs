//! This module provides shortcuts to open an [`Instrument`] on a serial port.
//!
//! The blocking implementation uses the [`serialport`] crate.

use serialport::{SerialPort, SerialPortBuilder};

use crate::{Instrument, InstrumentError};

/// Shortcuts to open a blocking serial port as an [`Instrument`].
#[derive(Debug)]
pub struct SerialInterface {}

impl SerialInterface {
    /// Open a serial port with the given baud rate and all other settings left at the defaults of
    /// [`serialport`] (8 data bits, no parity, one stop bit). The timeout is set to 3 seconds.
    ///
    /// # Arguments
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    /// * `baud_rate` - The baud rate to use.
    pub fn simple(
        port: &str,
        baud_rate: u32,
    ) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let spb = serialport::new(port, baud_rate).timeout(std::time::Duration::from_secs(3));
        Self::full(spb)
    }

    /// Open a serial port from a fully configured [`SerialPortBuilder`].
    ///
    /// The timeout of the builder is also used as the read timeout of the returned
    /// [`Instrument`].
    ///
    /// # Arguments
    /// * `spb` - A `SerialPortBuilder` to configure the serial port. See
    ///   [`serialport::SerialPortBuilder`] and the [`serialport::new`] function for more details.
    pub fn full(spb: SerialPortBuilder) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let port = spb.open()?;
        let timeout = port.timeout();
        Ok(Instrument::new(port, timeout))
    }
}
