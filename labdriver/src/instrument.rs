//! Blocking line-based transport over any byte stream.

use std::{
    io::{Read, Write},
    time::Duration,
};

use crate::{InstrumentError, InstrumentInterface};

/// A blocking transport over a byte stream, e.g., a serial port or a TCP socket.
///
/// [`crate::SerialInterface`] and [`crate::TcpIpInterface`] build one for you. Anything else
/// that reads and writes bytes works too:
///
/// ```no_run
/// use std::{net::TcpStream, time::Duration};
///
/// use labdriver::Instrument;
///
/// // a GPIB-Ethernet adapter
/// let stream = TcpStream::connect("192.168.1.20:1234").unwrap();
/// let adapter = Instrument::new(stream, Duration::from_secs(3));
/// ```
pub struct Instrument<P: Read + Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: Read + Write> Instrument<P> {
    /// Wrap `port`, waiting at most `timeout` for a terminated line.
    ///
    /// Lines end in `"\n"` until the driver that takes over the transport selects the terminator
    /// its instrument uses.
    pub fn new(port: P, timeout: Duration) -> Self {
        Instrument {
            port,
            terminator: String::from("\n"),
            timeout,
        }
    }

    /// Change how long to wait for a terminated line.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl<P: Read + Write> InstrumentInterface for Instrument<P> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        Ok(self.port.read_exact(buf)?)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.port.write_all(data)?;
        Ok(self.port.flush()?)
    }

    fn get_terminator(&self) -> &str {
        &self.terminator
    }

    fn set_terminator(&mut self, terminator: &str) {
        terminator.clone_into(&mut self.terminator);
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }
}
