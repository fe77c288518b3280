//! GPIB access through a Prologix style GPIB-USB or GPIB-Ethernet adapter.
//!
//! The adapter is itself controlled with a line based protocol: commands that start with `++`
//! configure the adapter, everything else is forwarded to the instrument at the currently
//! selected GPIB address.

use std::time::Duration;

use log::debug;

use crate::{InstrumentError, InstrumentInterface};

const ESC: char = '\u{1b}';

/// An interface that talks to a single GPIB instrument through a Prologix adapter.
///
/// The adapter is wrapped around any other interface, usually a serial port (GPIB-USB) or a TCP
/// stream (GPIB-Ethernet). On creation, the adapter is put into controller mode and automatic
/// read-after-write is disabled. Responses are requested explicitly with `++read eoi` and forwarded
/// as the instrument sends them, so the instrument must terminate its responses with a line feed.
///
/// Next to sending commands and reading responses, this interface supports the GPIB specific
/// serial poll, selected device clear, and group execute trigger.
///
/// ```no_run
/// use labdriver::{InstrumentInterface, PrologixInterface, TcpIpInterface};
///
/// let adapter = TcpIpInterface::simple("192.168.1.20:1234").unwrap();
/// let mut gpib = PrologixInterface::try_new(adapter, 12).unwrap();
/// let stb = gpib.read_status_byte().unwrap();
/// ```
pub struct PrologixInterface<T: InstrumentInterface> {
    inner: T,
    address: u8,
}

impl<T: InstrumentInterface> PrologixInterface<T> {
    /// Configure the adapter behind `inner` and select the given GPIB address.
    ///
    /// # Arguments
    /// * `inner` - The interface the adapter is connected with.
    /// * `address` - The primary GPIB address of the instrument, 0 to 30.
    pub fn try_new(inner: T, address: u8) -> Result<Self, InstrumentError> {
        if address > 30 {
            return Err(InstrumentError::IntValueOutOfRange {
                value: address.into(),
                min: 0,
                max: 30,
            });
        }
        let mut inner = inner;
        inner.set_terminator("\n");
        for cmd in [
            "++mode 1",
            "++auto 0",
            "++eoi 1",
            "++eos 2",
            "++eot_enable 0",
        ] {
            inner.sendcmd(cmd)?;
        }
        inner.sendcmd(&format!("++addr {address}"))?;
        debug!("Prologix adapter configured for GPIB address {address}");
        Ok(Self { inner, address })
    }

    /// Get the GPIB address the adapter talks to.
    pub fn get_address(&self) -> u8 {
        self.address
    }
}

impl<T: InstrumentInterface> InstrumentInterface for PrologixInterface<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        self.inner.read_exact(buf)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.inner.write_raw(data)
    }

    fn get_terminator(&self) -> &str {
        self.inner.get_terminator()
    }

    /// Commands to the adapter are always terminated with a line feed, the adapter adds the bus
    /// terminator itself. This does nothing.
    fn set_terminator(&mut self, _terminator: &str) {}

    fn get_timeout(&self) -> Duration {
        self.inner.get_timeout()
    }

    /// Send a command to the instrument.
    ///
    /// Characters that the adapter would otherwise interpret (`+`, ESC, CR, LF) are escaped.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let mut escaped = String::with_capacity(cmd.len());
        for c in cmd.chars() {
            if matches!(c, '+' | ESC | '\r' | '\n') {
                escaped.push(ESC);
            }
            escaped.push(c);
        }
        self.inner.sendcmd(&escaped)
    }

    fn read_until_terminator(&mut self) -> Result<String, InstrumentError> {
        self.inner.sendcmd("++read eoi")?;
        self.inner.read_until_terminator()
    }

    fn read_status_byte(&mut self) -> Result<u8, InstrumentError> {
        let resp = self.inner.query("++spoll")?;
        resp.trim()
            .parse::<u8>()
            .map_err(|_| InstrumentError::ResponseParseError(resp))
    }

    fn device_clear(&mut self) -> Result<(), InstrumentError> {
        self.inner.sendcmd("++clr")
    }

    fn trigger(&mut self) -> Result<(), InstrumentError> {
        self.inner.sendcmd("++trg")
    }
}
