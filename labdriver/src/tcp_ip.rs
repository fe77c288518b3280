//! TCP/IP transport, e.g., for a Prologix GPIB-Ethernet adapter or a serial device server.

use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use crate::{Instrument, InstrumentError};

/// Shortcut to open an [`Instrument`] on a TCP socket.
#[derive(Debug)]
pub struct TcpIpInterface {}

impl TcpIpInterface {
    /// Connect to `sock_addr`.
    ///
    /// Socket reads and writes give up after three seconds, which is also the time the returned
    /// [`Instrument`] waits for a terminated line. Change the latter with
    /// [`Instrument::set_timeout`].
    ///
    /// # Arguments
    /// * `sock_addr` - Address of the adapter, e.g., `"192.168.1.20:1234"`.
    pub fn simple<A: ToSocketAddrs>(sock_addr: A) -> Result<Instrument<TcpStream>, InstrumentError> {
        let timeout = Duration::from_secs(3);
        let stream = TcpStream::connect(sock_addr)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Instrument::new(stream, timeout))
    }
}
