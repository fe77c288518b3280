//! A rust driver for the Keithley 775A programmable counter/timer.
//!
//! The Keithley 775A is a 120 MHz counter/timer with two configurable input channels (A and B)
//! and an optional channel C. It is controlled over GPIB with device dependent commands of the
//! form `<mnemonic><value>X`. This driver covers all settings of the instrument, reading back
//! the operating mode and error status words, the GPIB status byte, triggering, and reading
//! measurements.
//!
//! All settings can be read back. Most of them are decoded from the operating mode status word,
//! the gate time, delay time, and trigger levels are read by switching the data control of the
//! instrument.
//!
//! # Example
//!
//! This example uses a Prologix style GPIB-USB adapter.
//! ```no_run
//! use keithley_775a::{Keithley775A, Mode, SerialInterfaceKeithley775A};
//!
//! // The port where the GPIB-USB adapter is connected to and the GPIB address of the counter
//! let port = "/dev/ttyUSB0";
//! let address = 12;
//!
//! let gpib = SerialInterfaceKeithley775A::gpibusb(port, address).unwrap();
//! let mut inst = Keithley775A::try_new(gpib).unwrap();
//!
//! inst.set_mode(Mode::FrequencyA).unwrap();
//! inst.set_gate_time(0.1).unwrap();
//! println!("{:?}", inst.measure(false).unwrap());
//! ```

#![deny(warnings, missing_docs)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use labdriver::{
    Instrument, InstrumentError, InstrumentInterface, PrologixInterface, SerialInterface,
    params::{Access, Domain, ParameterSpec},
    units::{Unitful, duration_from_secs},
    wait::poll_until,
};
use log::{info, warn};
use measurements::{Frequency, Voltage};
use serialport::SerialPort;

mod enums;
mod status;

pub use enums::{
    ActionMode, Attenuator, Coupling, DataControl, DataFormat, DisplayMode, Mode, Rate, Slope,
    SrqCondition, StatusWordKind, Terminator, Totalize,
};
pub use status::{ChannelSettings, ErrorStatus, OperatingMode, StatusByte};

/// Command string that puts the instrument into its default state.
const RESET_CMD: &str = "F0AC0AA0AF0AS0BC0BA0BF0BS0I0D0P0N9K0M00S1Y0G0W0AL0BL0TO0X";

/// Interval at which the status byte is polled while waiting for a reading.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const DISPLAYED_DIGITS: ParameterSpec = ParameterSpec {
    name: "displayed digits",
    mnemonic: "N",
    domain: Domain::IntRange { min: 3, max: 9 },
    access: Access::ReadWrite,
};

const SRQ_MASK: ParameterSpec = ParameterSpec {
    name: "SRQ mask",
    mnemonic: "M",
    domain: Domain::IntRange { min: 0, max: 59 },
    access: Access::ReadWrite,
};

/// Settings of one input channel.
///
/// On the wire, these mnemonics are preceded by the channel letter `A` or `B`.
pub const CHANNEL_PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "coupling",
        mnemonic: "C",
        domain: Domain::Enum(&["DC", "AC"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "attenuator",
        mnemonic: "A",
        domain: Domain::Enum(&["X1", "X10"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "filter",
        mnemonic: "F",
        domain: Domain::Bool { on: "1", off: "0" },
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "slope",
        mnemonic: "S",
        domain: Domain::Enum(&["positive", "negative"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "trigger level",
        mnemonic: "L",
        domain: Domain::Unit("V"),
        access: Access::ReadWrite,
    },
];

/// Instrument-wide parameters of the Keithley 775A. See [`CHANNEL_PARAMETERS`] for the
/// per-channel settings.
pub const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "mode",
        mnemonic: "F",
        domain: Domain::Enum(&[
            "frequency A",
            "frequency B",
            "period A",
            "period average A",
            "time interval A to B",
            "pulse A",
            "frequency C",
            "totalize A",
        ]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "rate",
        mnemonic: "S",
        domain: Domain::Enum(&["one shot", "normal", "fast", "dump"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "data control",
        mnemonic: "B",
        domain: Domain::Enum(&[
            "measuring buffer",
            "gate time",
            "delay time",
            "trigger level A",
            "trigger level B",
        ]),
        access: Access::WriteOnly,
    },
    ParameterSpec {
        name: "gate time",
        mnemonic: "G",
        domain: Domain::Unit("s"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "delay time",
        mnemonic: "W",
        domain: Domain::Unit("s"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "delay",
        mnemonic: "I",
        domain: Domain::Bool { on: "1", off: "0" },
        access: Access::ReadWrite,
    },
    DISPLAYED_DIGITS,
    ParameterSpec {
        name: "EOI",
        mnemonic: "K",
        domain: Domain::Bool { on: "1", off: "0" },
        access: Access::ReadWrite,
    },
    SRQ_MASK,
    ParameterSpec {
        name: "terminator",
        mnemonic: "Y",
        domain: Domain::Enum(&["CRLF", "LFCR", "CR", "LF", "none"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "display mode",
        mnemonic: "D",
        domain: Domain::Enum(&[
            "measurement",
            "gate time",
            "delay time",
            "trigger levels",
            "totalize gate",
            "message",
        ]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "message",
        mnemonic: "D5",
        domain: Domain::Text,
        access: Access::WriteOnly,
    },
    ParameterSpec {
        name: "data format",
        mnemonic: "P",
        domain: Domain::Enum(&[
            "with prefix, without leading zero",
            "without prefix, without leading zero",
            "with prefix, with leading zero",
            "without prefix, with leading zero",
        ]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "totalize",
        mnemonic: "TO",
        domain: Domain::Enum(&["A by B", "cumulative"]),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "status word",
        mnemonic: "U",
        domain: Domain::Enum(&["operating mode", "error status"]),
        access: Access::ReadOnly,
    },
];

/// A GPIB interface for the Keithley 775A through a Prologix style GPIB-USB adapter.
#[derive(Debug)]
pub struct SerialInterfaceKeithley775A {}

impl SerialInterfaceKeithley775A {
    /// Open the GPIB-USB adapter at `port` and address the counter at `address`.
    ///
    /// The adapter is opened with 115200 baud and a timeout of 3 seconds.
    ///
    /// Arguments:
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    /// * `address` - The GPIB address of the counter.
    pub fn gpibusb(
        port: &str,
        address: u8,
    ) -> Result<PrologixInterface<Instrument<Box<dyn SerialPort>>>, InstrumentError> {
        let serial = SerialInterface::simple(port, 115200)?;
        PrologixInterface::try_new(serial, address)
    }
}

/// A single reading of the counter, in the unit that belongs to the current mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// A frequency, for the frequency modes.
    Frequency(Frequency),
    /// A time, for the period, time interval, and pulse width modes.
    Time(Duration),
    /// A number of events, for the totalize mode.
    Count(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingKind {
    Frequency,
    Time,
    Count,
}

impl From<Mode> for ReadingKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FrequencyA | Mode::FrequencyB | Mode::FrequencyC => ReadingKind::Frequency,
            Mode::PeriodA | Mode::PeriodAverageA | Mode::TimeIntervalAToB | Mode::PulseA => {
                ReadingKind::Time
            }
            Mode::TotalizeA => ReadingKind::Count,
        }
    }
}

/// A rust driver for the Keithley 775A.
///
/// See the top-level documentation for an example on how to use this driver.
pub struct Keithley775A<T: InstrumentInterface> {
    interface: Arc<Mutex<T>>,
    data_control: Arc<Mutex<DataControl>>,
    reading_kind: ReadingKind,
    reset_mode: ActionMode,
    trigger_mode: ActionMode,
}

impl<T: InstrumentInterface> Keithley775A<T> {
    /// Create a new Keithley 775A instance with the given instrument interface.
    ///
    /// The instrument is reset to its default settings. Afterwards, its terminator is set to line
    /// feed and the data format to "without prefix, with leading zeros", which this driver needs
    /// to read values back.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let mut interface = interface;
        interface.set_terminator("\n");

        let mut inst = Keithley775A {
            interface: Arc::new(Mutex::new(interface)),
            data_control: Arc::new(Mutex::new(DataControl::MeasuringBuffer)),
            reading_kind: ReadingKind::Frequency,
            reset_mode: ActionMode::default(),
            trigger_mode: ActionMode::default(),
        };
        inst.reset()?;
        inst.set_terminator(Terminator::Lf)?;
        inst.set_data_format(DataFormat::WithoutPrefixWithLeadingZero)?;
        Ok(inst)
    }

    /// Get channel A (`idx = 0`) or channel B (`idx = 1`).
    ///
    /// Channel C has no settings and thus no channel structure.
    pub fn get_channel(&mut self, idx: usize) -> Result<Channel<T>, InstrumentError> {
        if idx >= 2 {
            return Err(InstrumentError::ChannelIndexOutOfRange {
                idx,
                nof_channels: 2,
            });
        }
        Ok(Channel::new(
            idx,
            Arc::clone(&self.interface),
            Arc::clone(&self.data_control),
        ))
    }

    /// Select how [`Keithley775A::reset`] reaches the instrument. Defaults to a command string.
    pub fn set_reset_mode(&mut self, mode: ActionMode) {
        self.reset_mode = mode;
    }

    /// Select how [`Keithley775A::trigger`] reaches the instrument. Defaults to the `T` command.
    pub fn set_trigger_mode(&mut self, mode: ActionMode) {
        self.trigger_mode = mode;
    }

    /// Put the instrument into its default settings.
    ///
    /// Depending on the reset mode, this either sends the full default command string or a GPIB
    /// selected device clear.
    pub fn reset(&mut self) -> Result<(), InstrumentError> {
        {
            let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
            match self.reset_mode {
                ActionMode::Command => intf.sendcmd(RESET_CMD)?,
                ActionMode::Gpib => intf.device_clear()?,
            }
        }
        info!("Keithley 775A reset ({:?})", self.reset_mode);
        self.reading_kind = ReadingKind::Frequency;
        *self
            .data_control
            .lock()
            .expect("Mutex should not be poisoned") = DataControl::MeasuringBuffer;
        Ok(())
    }

    /// Get the measurement mode.
    pub fn get_mode(&mut self) -> Result<Mode, InstrumentError> {
        Ok(self.get_operating_mode()?.mode)
    }

    /// Set the measurement mode. This also selects the kind of [`Reading`] that
    /// [`Keithley775A::measure`] returns.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("F{}X", mode.ordinal()))?;
        self.reading_kind = mode.into();
        Ok(())
    }

    /// Get the reading rate.
    pub fn get_rate(&mut self) -> Result<Rate, InstrumentError> {
        Ok(self.get_operating_mode()?.rate)
    }

    /// Set the reading rate.
    pub fn set_rate(&mut self, rate: Rate) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("S{}X", rate.ordinal()))
    }

    /// Get the raw content of the measuring buffer.
    pub fn get_measuring_buffer(&mut self) -> Result<String, InstrumentError> {
        self.read_data(DataControl::MeasuringBuffer)
    }

    /// Get the gate time.
    pub fn get_gate_time(&mut self) -> Result<Duration, InstrumentError> {
        let resp = self.read_data(DataControl::GateTime)?;
        duration_from_secs(parse_f64(&resp)?)
    }

    /// Set the gate time, either in seconds or as a [`Duration`].
    pub fn set_gate_time(&mut self, value: impl Into<Unitful<Duration>>) -> Result<(), InstrumentError> {
        let secs = non_negative_secs(value.into())?;
        self.sendcmd(&format!("G{secs:.6}X"))
    }

    /// Use the gate time that is set with the front panel user knob.
    pub fn set_gate_time_user(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("GUX")
    }

    /// Get the delay time.
    pub fn get_delay_time(&mut self) -> Result<Duration, InstrumentError> {
        let resp = self.read_data(DataControl::DelayTime)?;
        duration_from_secs(parse_f64(&resp)?)
    }

    /// Set the delay time, either in seconds or as a [`Duration`].
    pub fn set_delay_time(
        &mut self,
        value: impl Into<Unitful<Duration>>,
    ) -> Result<(), InstrumentError> {
        let secs = non_negative_secs(value.into())?;
        self.sendcmd(&format!("W{secs:.6}X"))
    }

    /// Use the delay time that is set with the front panel user knob.
    pub fn set_delay_time_user(&mut self) -> Result<(), InstrumentError> {
        self.sendcmd("WUX")
    }

    /// Get whether the delay is on.
    pub fn get_delay(&mut self) -> Result<bool, InstrumentError> {
        Ok(self.get_operating_mode()?.delay)
    }

    /// Turn the delay on or off.
    pub fn set_delay(&mut self, on: bool) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("I{}X", u8::from(on)))
    }

    /// Get the number of displayed digits.
    pub fn get_displayed_digits(&mut self) -> Result<u8, InstrumentError> {
        Ok(self.get_operating_mode()?.displayed_digits)
    }

    /// Set the number of displayed digits, 3 to 9.
    pub fn set_displayed_digits(&mut self, digits: u8) -> Result<(), InstrumentError> {
        let digits = DISPLAYED_DIGITS.validate_int(digits.into())?;
        self.sendcmd(&format!("N{digits}X"))
    }

    /// Get the EOI setting.
    pub fn get_eoi(&mut self) -> Result<bool, InstrumentError> {
        Ok(self.get_operating_mode()?.eoi)
    }

    /// Set the EOI setting.
    pub fn set_eoi(&mut self, eoi: bool) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("K{}X", u8::from(eoi)))
    }

    /// Get the SRQ mask.
    pub fn get_srq_mask(&mut self) -> Result<u8, InstrumentError> {
        Ok(self.get_operating_mode()?.srq_mask)
    }

    /// Set the SRQ mask, 0 to 59. Build it with [`SrqCondition::mask`].
    pub fn set_srq_mask(&mut self, mask: u8) -> Result<(), InstrumentError> {
        let mask = SRQ_MASK.validate_int(mask.into())?;
        self.sendcmd(&format!("M{mask}X"))
    }

    /// Get the terminator the instrument appends to its responses.
    pub fn get_terminator(&mut self) -> Result<Terminator, InstrumentError> {
        Ok(self.get_operating_mode()?.terminator)
    }

    /// Set the terminator the instrument appends to its responses.
    ///
    /// Note that the interface must still be able to find the end of a response. Only
    /// [`Terminator::Lf`] and [`Terminator::CrLf`] work with the default interface terminator.
    pub fn set_terminator(&mut self, terminator: Terminator) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("Y{}X", terminator.ordinal()))
    }

    /// Get the display mode.
    pub fn get_display_mode(&mut self) -> Result<DisplayMode, InstrumentError> {
        Ok(self.get_operating_mode()?.display_mode)
    }

    /// Set the display mode.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("D{}X", mode.ordinal()))
    }

    /// Show a message on the display.
    ///
    /// The message must not contain an `X`, which would end the command.
    pub fn show_message(&mut self, msg: &str) -> Result<(), InstrumentError> {
        if msg.contains(['X', 'x']) || !msg.is_ascii() {
            return Err(InstrumentError::InvalidArgument(format!(
                "Message {msg:?} must be ASCII and must not contain an X"
            )));
        }
        self.sendcmd(&format!("D5{msg}X"))
    }

    /// Get the data format.
    pub fn get_data_format(&mut self) -> Result<DataFormat, InstrumentError> {
        Ok(self.get_operating_mode()?.data_format)
    }

    /// Set the data format.
    pub fn set_data_format(&mut self, format: DataFormat) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("P{}X", format.ordinal()))
    }

    /// Get the totalize mode.
    pub fn get_totalize(&mut self) -> Result<Totalize, InstrumentError> {
        Ok(self.get_operating_mode()?.totalize)
    }

    /// Set the totalize mode.
    pub fn set_totalize(&mut self, totalize: Totalize) -> Result<(), InstrumentError> {
        self.sendcmd(&format!("TO{}X", totalize.ordinal()))
    }

    /// Run the self test. Read the result with [`Keithley775A::get_error_status`].
    pub fn self_test(&mut self) -> Result<(), InstrumentError> {
        info!("Keithley 775A self test started");
        self.sendcmd("JX")
    }

    /// Get a status word as raw string.
    pub fn get_status_word(&mut self, kind: StatusWordKind) -> Result<String, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        read_status_word(&mut *intf, kind)
    }

    /// Get and decode the operating mode status word.
    pub fn get_operating_mode(&mut self) -> Result<OperatingMode, InstrumentError> {
        OperatingMode::decode(&self.get_status_word(StatusWordKind::OperatingMode)?)
    }

    /// Get and decode the error status word. Reading it clears the error flags.
    pub fn get_error_status(&mut self) -> Result<ErrorStatus, InstrumentError> {
        let status = ErrorStatus::decode(&self.get_status_word(StatusWordKind::ErrorStatus)?)?;
        if status.any() {
            warn!("Keithley 775A error status: {status}");
        }
        Ok(status)
    }

    /// Read the GPIB status byte with a serial poll.
    pub fn get_status_byte(&mut self) -> Result<StatusByte, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        Ok(intf.read_status_byte()?.into())
    }

    /// Trigger a reading in one-shot mode ([`Rate::OneShot`]).
    pub fn trigger(&mut self) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        match self.trigger_mode {
            ActionMode::Command => intf.sendcmd("TX"),
            ActionMode::Gpib => intf.trigger(),
        }
    }

    /// Trigger a reading and wait until the status byte reports it as done.
    ///
    /// The status byte is read with serial polls, so this needs a GPIB interface.
    ///
    /// # Arguments
    /// * `max_wait` - Give up with [`InstrumentError::Timeout`] after this time. `None` waits
    ///   forever.
    pub fn trigger_and_wait(&mut self, max_wait: Option<Duration>) -> Result<(), InstrumentError> {
        self.trigger()?;
        poll_until(POLL_INTERVAL, max_wait, || {
            Ok(self.get_status_byte()?.reading_done)
        })
    }

    /// Read the measuring buffer as a raw string, optionally triggering a reading first.
    pub fn read(&mut self, trigger: bool) -> Result<String, InstrumentError> {
        self.switch_data_control(DataControl::MeasuringBuffer)?;
        if trigger {
            self.trigger()?;
        }
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.read_until_terminator()
    }

    /// Read a measurement as a float.
    pub fn measure_float(&mut self, trigger: bool) -> Result<f64, InstrumentError> {
        parse_f64(&self.read(trigger)?)
    }

    /// Read a measurement as an integer, e.g., a totalize count.
    pub fn measure_int(&mut self, trigger: bool) -> Result<i64, InstrumentError> {
        let resp = self.read(trigger)?;
        resp.trim()
            .parse::<i64>()
            .map_err(|_| InstrumentError::ResponseParseError(resp))
    }

    /// Read a measurement in the unit that belongs to the mode last set with
    /// [`Keithley775A::set_mode`]. After a reset, this is a frequency.
    pub fn measure(&mut self, trigger: bool) -> Result<Reading, InstrumentError> {
        match self.reading_kind {
            ReadingKind::Frequency => Ok(Reading::Frequency(Frequency::from_hertz(
                self.measure_float(trigger)?,
            ))),
            ReadingKind::Time => Ok(Reading::Time(duration_from_secs(
                self.measure_float(trigger)?,
            )?)),
            ReadingKind::Count => Ok(Reading::Count(self.measure_int(trigger)?)),
        }
    }

    fn switch_data_control(&mut self, dc: DataControl) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        switch_data_control(&mut *intf, &self.data_control, dc)
    }

    fn read_data(&mut self, dc: DataControl) -> Result<String, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        switch_data_control(&mut *intf, &self.data_control, dc)?;
        intf.read_until_terminator()
    }

    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.sendcmd(cmd)
    }
}

/// Channel A or B of the Keithley 775A.
///
/// **This structure can only be created through the [`Keithley775A`] struct.**
pub struct Channel<T: InstrumentInterface> {
    idx: usize,
    interface: Arc<Mutex<T>>,
    data_control: Arc<Mutex<DataControl>>,
}

impl<T: InstrumentInterface> Channel<T> {
    fn new(idx: usize, interface: Arc<Mutex<T>>, data_control: Arc<Mutex<DataControl>>) -> Self {
        Channel {
            idx,
            interface,
            data_control,
        }
    }

    /// Get the input coupling.
    pub fn get_coupling(&mut self) -> Result<Coupling, InstrumentError> {
        Ok(self.get_settings()?.coupling)
    }

    /// Set the input coupling.
    pub fn set_coupling(&mut self, coupling: Coupling) -> Result<(), InstrumentError> {
        self.sendcmd("C", coupling.ordinal())
    }

    /// Get the input attenuator.
    pub fn get_attenuator(&mut self) -> Result<Attenuator, InstrumentError> {
        Ok(self.get_settings()?.attenuator)
    }

    /// Set the input attenuator.
    pub fn set_attenuator(&mut self, attenuator: Attenuator) -> Result<(), InstrumentError> {
        self.sendcmd("A", attenuator.ordinal())
    }

    /// Get whether the input filter is on.
    pub fn get_filter(&mut self) -> Result<bool, InstrumentError> {
        Ok(self.get_settings()?.filter)
    }

    /// Turn the input filter on or off.
    pub fn set_filter(&mut self, on: bool) -> Result<(), InstrumentError> {
        self.sendcmd("F", on)
    }

    /// Get the trigger slope.
    pub fn get_slope(&mut self) -> Result<Slope, InstrumentError> {
        Ok(self.get_settings()?.slope)
    }

    /// Set the trigger slope.
    pub fn set_slope(&mut self, slope: Slope) -> Result<(), InstrumentError> {
        self.sendcmd("S", slope.ordinal())
    }

    /// Get the trigger level.
    pub fn get_trigger_level(&mut self) -> Result<Voltage, InstrumentError> {
        let dc = if self.idx == 0 {
            DataControl::TriggerLevelA
        } else {
            DataControl::TriggerLevelB
        };
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        switch_data_control(&mut *intf, &self.data_control, dc)?;
        let resp = intf.read_until_terminator()?;
        Ok(Voltage::from_volts(parse_f64(&resp)?))
    }

    /// Set the trigger level, either in volts or as a [`Voltage`].
    ///
    /// Note that the instrument may change the attenuator to reach the trigger level.
    pub fn set_trigger_level(
        &mut self,
        level: impl Into<Unitful<Voltage>>,
    ) -> Result<(), InstrumentError> {
        let level = level.into().finite()?;
        if level.abs() > 999.99 {
            return Err(InstrumentError::FloatValueOutOfRange {
                value: level,
                min: -999.99,
                max: 999.99,
            });
        }
        self.sendcmd("L", format!("{level:+07.2}"))
    }

    fn get_settings(&mut self) -> Result<ChannelSettings, InstrumentError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        let raw = read_status_word(&mut *intf, StatusWordKind::OperatingMode)?;
        Ok(OperatingMode::decode(&raw)?.channel(self.idx))
    }

    fn sendcmd(&mut self, mnemonic: &str, value: impl ToCmdValue) -> Result<(), InstrumentError> {
        let letter = if self.idx == 0 { 'A' } else { 'B' };
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.sendcmd(&format!("{letter}{mnemonic}{}X", value.to_cmd_value()))
    }
}

/// Values that can be placed between a mnemonic and the execute character.
trait ToCmdValue {
    fn to_cmd_value(&self) -> String;
}

impl ToCmdValue for u8 {
    fn to_cmd_value(&self) -> String {
        self.to_string()
    }
}

impl ToCmdValue for bool {
    fn to_cmd_value(&self) -> String {
        u8::from(*self).to_string()
    }
}

impl ToCmdValue for String {
    fn to_cmd_value(&self) -> String {
        self.clone()
    }
}

fn read_status_word<T: InstrumentInterface>(
    intf: &mut T,
    kind: StatusWordKind,
) -> Result<String, InstrumentError> {
    intf.sendcmd(&format!("U{}X", kind.ordinal()))?;
    intf.read_until_terminator()
}

/// Switch what the instrument returns when addressed to talk. Only sends `B<n>X` if the data
/// control changes.
fn switch_data_control<T: InstrumentInterface>(
    intf: &mut T,
    current: &Mutex<DataControl>,
    dc: DataControl,
) -> Result<(), InstrumentError> {
    let mut current = current.lock().expect("Mutex should not be poisoned");
    if *current != dc {
        intf.sendcmd(&format!("B{}X", dc.ordinal()))?;
        *current = dc;
    }
    Ok(())
}

fn parse_f64(resp: &str) -> Result<f64, InstrumentError> {
    resp.trim()
        .parse::<f64>()
        .map_err(|_| InstrumentError::ResponseParseError(resp.to_string()))
}

fn non_negative_secs(value: Unitful<Duration>) -> Result<f64, InstrumentError> {
    let secs = value.finite()?;
    if secs < 0.0 {
        return Err(InstrumentError::FloatValueOutOfRange {
            value: secs,
            min: 0.0,
            max: f64::INFINITY,
        });
    }
    Ok(secs)
}
