//! Scripted interface for driver tests.
//!
//! A [`LoopbackInterface`] plays back a transcript: the lines a driver has to write, the replies
//! the instrument gives, and the GPIB bus events ([`BusEvent`]) the driver has to raise. Anything
//! that deviates from the transcript makes the test panic.

use std::collections::VecDeque;

use crate::{InstrumentError, InstrumentInterface};

/// A GPIB bus level event that a driver is expected to trigger on a [`LoopbackInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// A selected device clear is expected.
    Clear,
    /// A group execute trigger is expected.
    Trigger,
    /// A serial poll is expected, the instrument answers with the given status byte.
    StatusByte(u8),
}

/// Transcript based stand-in for a real instrument connection.
///
/// Lines are given without terminator; `terminator_exp` is appended to both directions. Writes
/// are compared against the next expected line, reads are served byte by byte from the next
/// reply. Dropping the interface with unused entries left panics, see [`Self::finalize`].
///
/// # Example
///
/// ```
/// use labdriver::{InstrumentError, InstrumentInterface, LoopbackInterface};
///
/// fn identify<T: InstrumentInterface>(port: &mut T) -> Result<String, InstrumentError> {
///     port.query("ID?")
/// }
///
/// let mut port = LoopbackInterface::new(
///     vec!["ID?".to_string()],
///     vec!["WAVETEK 39".to_string()],
///     "\n",
/// );
/// assert_eq!("WAVETEK 39", identify(&mut port).unwrap());
/// ```
pub struct LoopbackInterface {
    expected_writes: VecDeque<String>,
    replies: VecDeque<String>,
    events: VecDeque<BusEvent>,
    line_end: String,
    pending: VecDeque<u8>,
    terminator: String,
}

impl LoopbackInterface {
    /// Build a loopback from the expected host writes and the instrument replies.
    ///
    /// `terminator_exp` is appended to every entry and has to match the terminator the driver
    /// sets on the interface.
    pub fn new(from_host: Vec<String>, from_inst: Vec<String>, terminator_exp: &str) -> Self {
        Self {
            expected_writes: from_host.into(),
            replies: from_inst.into(),
            events: VecDeque::new(),
            line_end: terminator_exp.to_owned(),
            pending: VecDeque::new(),
            terminator: String::from("\n"),
        }
    }

    /// Script the bus events the driver has to raise, in order.
    pub fn with_bus_events(mut self, bus_events: Vec<BusEvent>) -> Self {
        self.events = bus_events.into();
        self
    }

    /// Panic if any write, reply, or bus event of the transcript was not consumed.
    ///
    /// Runs on drop as well.
    pub fn finalize(&mut self) {
        if let Some(line) = self.expected_writes.front() {
            panic!("Host never sent the expected line: {line}");
        }
        if let Some(line) = self.replies.front() {
            panic!("Host never read the reply: {line}");
        }
        if let Some(ev) = self.events.front() {
            panic!("Host never raised the bus event: {ev:?}");
        }
    }

    fn next_event(&mut self) -> BusEvent {
        match self.events.pop_front() {
            Some(ev) => ev,
            None => panic!("Host raised a bus event that is not in the transcript."),
        }
    }

    fn next_reply_byte(&mut self) -> u8 {
        if self.pending.is_empty() {
            let Some(reply) = self.replies.pop_front() else {
                panic!("Host read more than the transcript replies.");
            };
            self.pending.extend(reply.bytes());
            self.pending.extend(self.line_end.bytes());
        }
        // refilled above with at least the line end
        self.pending.pop_front().unwrap_or_default()
    }
}

impl InstrumentInterface for LoopbackInterface {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        buf.iter_mut().for_each(|b| *b = self.next_reply_byte());
        Ok(())
    }

    fn write_raw(&mut self, cmd: &[u8]) -> Result<(), InstrumentError> {
        let sent = String::from_utf8_lossy(cmd);
        let Some(line) = self.expected_writes.pop_front() else {
            panic!("Host sent {sent:?} but the transcript expects no more writes.");
        };
        let exp = format!("{line}{}", self.line_end);
        assert_eq!(exp, sent, "Host wrote {sent:?}, transcript expects {exp:?}");
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        &self.terminator
    }

    fn set_terminator(&mut self, terminator: &str) {
        terminator.clone_into(&mut self.terminator);
    }

    fn read_status_byte(&mut self) -> Result<u8, InstrumentError> {
        match self.next_event() {
            BusEvent::StatusByte(stb) => Ok(stb),
            ev => panic!("Expected bus event {ev:?}, got a serial poll."),
        }
    }

    fn device_clear(&mut self) -> Result<(), InstrumentError> {
        let ev = self.next_event();
        assert_eq!(ev, BusEvent::Clear, "Expected bus event {ev:?}, got a device clear.");
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), InstrumentError> {
        let ev = self.next_event();
        assert_eq!(ev, BusEvent::Trigger, "Expected bus event {ev:?}, got a trigger.");
        Ok(())
    }
}

impl Drop for LoopbackInterface {
    fn drop(&mut self) {
        // a second panic while unwinding would abort the test binary
        if !std::thread::panicking() {
            self.finalize();
        }
    }
}
