//! Settings of the Wavetek 39A that are selected by a token, e.g., `WAVE SINE`.

use std::fmt::Display;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// All variants.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The token that selects this setting on the instrument.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

token_enum! {
    /// Output waveform.
    Function {
        /// Sine.
        Sine => "SINE",
        /// Square.
        Square => "SQUARE",
        /// Triangle.
        Triangle => "TRIANG",
        /// Constant voltage.
        Dc => "DC",
        /// Positive ramp.
        PositiveRamp => "POSRMP",
        /// Negative ramp.
        NegativeRamp => "NEGRMP",
        /// Cosine.
        Cosine => "COSINE",
        /// Haversine, `(1 - cos x) / 2`.
        Haversine => "HAVSIN",
        /// Havercosine, `(1 + cos x) / 2`.
        Havercosine => "HAVCOS",
        /// `sin(x) / x`.
        Sinc => "SINC",
        /// Pulse.
        Pulse => "PULSE",
        /// Pulse train.
        PulseTrain => "PULSTRN",
        /// The selected arbitrary waveform.
        Arbitrary => "ARB",
        /// A sequence of up to 16 waveforms.
        Sequence => "SEQ",
    }
}

token_enum! {
    /// Output load the amplitude is calibrated for.
    ZLoad {
        /// 50 Ohm.
        Z50 => "50",
        /// 600 Ohm.
        Z600 => "600",
        /// Open circuit.
        Open => "OPEN",
    }
}

token_enum! {
    /// Output polarity.
    OutputMode {
        /// Normal output.
        Normal => "NORMAL",
        /// Inverted output, around the same offset.
        Invert => "INVERT",
    }
}

token_enum! {
    /// Operating mode.
    Mode {
        /// Continuous output.
        Continuous => "CONT",
        /// Output while the gate is open.
        Gated => "GATE",
        /// One burst per active trigger edge.
        Triggered => "TRIG",
        /// Frequency sweep.
        Sweep => "SWEEP",
        /// Tone mode.
        Tone => "TONE",
    }
}

token_enum! {
    /// Signal on the sync output.
    SyncOutMode {
        /// Selected automatically for the current waveform.
        Auto => "AUTO",
        /// Rising edge at the 0 degree point, or at the first point of an arbitrary waveform.
        WaveformSync => "WFMSYNC",
        /// Position marker of an arbitrary waveform.
        PositionMarker => "POSNMKR",
        /// Low while a burst is active.
        BurstDone => "BSTDONE",
        /// Low during the last cycle of the last waveform in a sequence.
        SequenceSync => "SEQSYNC",
        /// Positive going version of the trigger signal.
        Trigger => "TRIGGER",
        /// High for the duration of a sweep.
        Sweep => "SWPTRG",
        /// Positive edge at the start of the current waveform.
        PhaseLock => "PHASLOC",
    }
}

token_enum! {
    /// Source of the trigger input.
    TriggerInput {
        /// Internal trigger generator.
        Internal => "INT",
        /// External trigger input.
        External => "EXT",
        /// Manual trigger.
        Manual => "MAN",
    }
}

token_enum! {
    /// Active edge of the external trigger input.
    TriggerInputEdge {
        /// Rising edge.
        Positive => "POS",
        /// Falling edge.
        Negative => "NEG",
    }
}

token_enum! {
    /// Output filter.
    Filter {
        /// Selected automatically for the current waveform.
        Auto => "AUTO",
        /// 10 MHz elliptic.
        Elliptic10 => "EL10",
        /// 16 MHz elliptic.
        Elliptic16 => "EL16",
        /// 10 MHz Bessel.
        Bessel => "BESS",
        /// No filter.
        None => "NONE",
    }
}

token_enum! {
    /// Unit in which the amplitude is given.
    AmplitudeUnit {
        /// Volts peak to peak.
        PeakToPeak => "VPP",
        /// Volts RMS.
        Rms => "VRMS",
        /// dBm.
        Dbm => "DBM",
    }
}
