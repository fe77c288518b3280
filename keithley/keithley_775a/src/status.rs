//! Decoded status words and the status byte of the Keithley 775A.

use std::fmt::Display;

use labdriver::{InstrumentError, status_word::StatusWord};

use crate::enums::{
    Attenuator, Coupling, DataFormat, DisplayMode, Mode, Rate, Slope, Terminator, Totalize,
};

/// Literal prefix of both status words.
pub(crate) const PREFIX: &str = "775";

/// Length of the operating mode status word.
const OPERATING_MODE_LEN: usize = 22;

/// Settings of one input channel as reported in the operating mode status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Input coupling.
    pub coupling: Coupling,
    /// Input attenuator.
    pub attenuator: Attenuator,
    /// Whether the input filter is on.
    pub filter: bool,
    /// Trigger slope.
    pub slope: Slope,
}

impl ChannelSettings {
    fn decode(sw: &StatusWord, offset: usize) -> Result<Self, InstrumentError> {
        Ok(Self {
            coupling: sw.field(offset)?,
            attenuator: sw.field(offset + 1)?,
            filter: sw.flag(offset + 2)?,
            slope: sw.field(offset + 3)?,
        })
    }
}

/// The operating mode status word (`U0X`), i.e., all current settings of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingMode {
    /// Measurement mode (`F`).
    pub mode: Mode,
    /// Channel A (`AC`, `AA`, `AF`, `AS`).
    pub channel_a: ChannelSettings,
    /// Channel B (`BC`, `BA`, `BF`, `BS`).
    pub channel_b: ChannelSettings,
    /// Whether the delay is on (`I`).
    pub delay: bool,
    /// Display mode (`D`).
    pub display_mode: DisplayMode,
    /// Data format (`P`).
    pub data_format: DataFormat,
    /// Number of displayed digits (`N`).
    pub displayed_digits: u8,
    /// EOI setting (`K`).
    pub eoi: bool,
    /// SRQ mask (`M`).
    pub srq_mask: u8,
    /// Reading rate (`S`).
    pub rate: Rate,
    /// Response terminator (`Y`).
    pub terminator: Terminator,
    /// Totalize mode (`TO`).
    pub totalize: Totalize,
}

impl OperatingMode {
    /// Decode the operating mode from the raw status word.
    pub fn decode(raw: &str) -> Result<Self, InstrumentError> {
        let sw = StatusWord::new(raw, PREFIX)?;
        sw.expect_len(OPERATING_MODE_LEN)?;
        Ok(Self {
            mode: sw.field(3)?,
            channel_a: ChannelSettings::decode(&sw, 4)?,
            channel_b: ChannelSettings::decode(&sw, 8)?,
            delay: sw.flag(12)?,
            display_mode: sw.field(13)?,
            data_format: sw.field(14)?,
            displayed_digits: sw.digit(15)?,
            eoi: sw.flag(16)?,
            srq_mask: sw.int(17, 2)? as u8,
            rate: sw.field(19)?,
            terminator: sw.field(20)?,
            totalize: sw.field(21)?,
        })
    }

    /// Settings of channel A (`idx = 0`) or channel B (`idx = 1`).
    pub(crate) fn channel(&self, idx: usize) -> ChannelSettings {
        if idx == 0 {
            self.channel_a
        } else {
            self.channel_b
        }
    }
}

/// The error status word (`U1X`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorStatus {
    /// An illegal device dependent command was received.
    pub illegal_command: bool,
    /// An illegal device dependent command option was received.
    pub illegal_option: bool,
    /// A gate error occured in the last measurement cycle.
    pub gate_error: bool,
    /// The self test failed.
    pub self_test_error: bool,
}

impl ErrorStatus {
    /// Decode the error status from the raw status word.
    pub fn decode(raw: &str) -> Result<Self, InstrumentError> {
        let sw = StatusWord::new(raw, PREFIX)?;
        sw.expect_suffix(7, "00000")?;
        Ok(Self {
            illegal_command: sw.flag(3)?,
            illegal_option: sw.flag(4)?,
            gate_error: sw.flag(5)?,
            self_test_error: sw.flag(6)?,
        })
    }

    /// Whether any error flag is set.
    pub fn any(&self) -> bool {
        self.illegal_command || self.illegal_option || self.gate_error || self.self_test_error
    }
}

impl Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags: Vec<&str> = [
            (self.illegal_command, "illegal command"),
            (self.illegal_option, "illegal command option"),
            (self.gate_error, "gate error"),
            (self.self_test_error, "self test error"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect();
        if flags.is_empty() {
            write!(f, "no error")
        } else {
            write!(f, "{}", flags.join(", "))
        }
    }
}

/// The GPIB status byte as read with a serial poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusByte {
    /// A service request condition occured. Cleared by reading the status byte.
    pub rqs: bool,
    /// An illegal command was received or a gate error occured. Cleared by reading the error
    /// status word.
    pub error: bool,
    /// Ready for device dependent commands.
    pub ready: bool,
    /// A measurement cycle has completed. Cleared when the measuring buffer is read.
    pub reading_done: bool,
    /// The self test has completed. Cleared by reading the error status word.
    pub self_test_done: bool,
    /// A time interval overflow occured.
    pub overflow: bool,
}

impl From<u8> for StatusByte {
    fn from(stb: u8) -> Self {
        Self {
            rqs: stb & 64 != 0,
            error: stb & 32 != 0,
            ready: stb & 16 != 0,
            reading_done: stb & 8 != 0,
            self_test_done: stb & 2 != 0,
            overflow: stb & 1 != 0,
        }
    }
}
