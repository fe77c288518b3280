//! Settings of the Keithley 775A that are selected by number.
//!
//! Every setting is sent as its ordinal between the mnemonic and the execute character, e.g.,
//! `F2X` selects [`Mode::PeriodA`]. The same ordinal shows up in the operating mode status word.

macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $val:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $val,)+
        }

        impl $name {
            /// All variants, in the order of their ordinal.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The ordinal that selects this setting on the instrument.
            pub fn ordinal(&self) -> u8 {
                *self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = labdriver::InstrumentError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($val => Ok($name::$variant),)+
                    _ => Err(labdriver::InstrumentError::ResponseParseError(value.to_string())),
                }
            }
        }
    };
}

ordinal_enum! {
    /// Measurement mode.
    Mode {
        /// Frequency on channel A.
        FrequencyA = 0,
        /// Frequency on channel B.
        FrequencyB = 1,
        /// Single period on channel A.
        PeriodA = 2,
        /// Period on channel A, averaged over the gate time.
        PeriodAverageA = 3,
        /// Time interval, started by channel A and stopped by channel B.
        TimeIntervalAToB = 4,
        /// Pulse width on channel A.
        PulseA = 5,
        /// Frequency on channel C, if the optional module is installed.
        FrequencyC = 6,
        /// Totalize channel A.
        TotalizeA = 7,
    }
}

ordinal_enum! {
    /// Input coupling of a channel.
    Coupling {
        /// DC coupling.
        Dc = 0,
        /// AC coupling.
        Ac = 1,
    }
}

ordinal_enum! {
    /// Input attenuator of a channel.
    Attenuator {
        /// No attenuation.
        X1 = 0,
        /// Attenuation by a factor of 10.
        X10 = 1,
    }
}

ordinal_enum! {
    /// Trigger slope of a channel.
    Slope {
        /// Trigger on the rising edge.
        Positive = 0,
        /// Trigger on the falling edge.
        Negative = 1,
    }
}

ordinal_enum! {
    /// Reading rate.
    Rate {
        /// One reading per trigger (`T` command, GPIB trigger, or external).
        OneShot = 0,
        /// Three readings per second, the power-on default.
        Normal = 1,
        /// 25 readings per second.
        Fast = 2,
        /// 140 readings per second in BCD format.
        Dump = 3,
    }
}

ordinal_enum! {
    /// Terminator the instrument appends to its responses.
    Terminator {
        /// Carriage return and line feed.
        CrLf = 0,
        /// Line feed and carriage return.
        LfCr = 1,
        /// Carriage return.
        Cr = 2,
        /// Line feed.
        Lf = 3,
        /// No terminator, the end of a response is only signalled with EOI.
        None = 4,
    }
}

ordinal_enum! {
    /// What the front panel display shows.
    DisplayMode {
        /// The measurement.
        Measurement = 0,
        /// The gate time.
        GateTime = 1,
        /// The delay time.
        DelayTime = 2,
        /// The trigger levels.
        TriggerLevels = 3,
        /// The totalize gate.
        TotalizeGate = 4,
        /// A message sent with the display command.
        Message = 5,
    }
}

ordinal_enum! {
    /// Format of the readings returned over the bus.
    DataFormat {
        /// With prefix, without leading zeros.
        WithPrefixWithoutLeadingZero = 0,
        /// Without prefix, without leading zeros.
        WithoutPrefixWithoutLeadingZero = 1,
        /// With prefix, with leading zeros.
        WithPrefixWithLeadingZero = 2,
        /// Without prefix, with leading zeros.
        WithoutPrefixWithLeadingZero = 3,
    }
}

ordinal_enum! {
    /// Totalize mode, used when the mode is [`Mode::TotalizeA`].
    Totalize {
        /// Channel A pulses are counted while the gate on channel B is open.
        AByB = 0,
        /// Channel A pulses are counted for as long as they arrive.
        Cumulative = 1,
    }
}

ordinal_enum! {
    /// What the instrument returns when it is addressed to talk.
    DataControl {
        /// The measuring buffer, i.e., the last reading.
        MeasuringBuffer = 0,
        /// The gate time.
        GateTime = 1,
        /// The delay time.
        DelayTime = 2,
        /// The trigger level of channel A.
        TriggerLevelA = 3,
        /// The trigger level of channel B.
        TriggerLevelB = 4,
    }
}

ordinal_enum! {
    /// Which status word to read.
    StatusWordKind {
        /// The operating mode, i.e., all current settings.
        OperatingMode = 0,
        /// The error status.
        ErrorStatus = 1,
    }
}

/// Conditions that can raise a service request. Combine them with
/// [`SrqCondition::mask`] and pass the result to `set_srq_mask`.
///
/// After power-up or a device clear, service requests are disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrqCondition {
    /// A time interval overflow occured.
    Overflow = 1,
    /// The self test is done.
    SelfTestDone = 2,
    /// A reading is done.
    ReadingDone = 8,
    /// The instrument is ready for device dependent commands.
    Ready = 16,
    /// An error occured.
    Error = 32,
}

impl SrqCondition {
    /// Combine conditions into an SRQ mask.
    pub fn mask(conditions: &[SrqCondition]) -> u8 {
        conditions.iter().fold(0, |acc, c| acc | *c as u8)
    }
}

/// How a reset or a trigger reaches the instrument.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    /// With a device dependent command string.
    #[default]
    Command,
    /// With the GPIB bus line (device clear or group execute trigger). Requires an interface that
    /// supports these, e.g., a `PrologixInterface`.
    Gpib,
}
