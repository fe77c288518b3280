//! Error codes of the ESP-301 and their meaning.
//!
//! The controller reports errors as a number. Errors that concern a single axis carry the axis
//! number in the hundreds, e.g., `305` is error `5` (negative hardware limit) on axis 3. Errors
//! below 100 concern the controller as a whole.

use std::{fmt::Display, time::Duration};

use labdriver::InstrumentError;

/// Duration of one servo cycle, the unit of the timestamps in the error buffer.
const TICK: Duration = Duration::from_micros(400);

const GLOBAL_MESSAGES: [&str; 42] = [
    "NO ERROR DETECTED",
    "PCI COMMUNICATION TIME-OUT",
    "Reserved for future use",
    "Reserved for future use",
    "EMERGENCY STOP ACTIVATED",
    "Reserved for future use",
    "COMMAND DOES NOT EXIST",
    "PARAMETER OUT OF RANGE",
    "CABLE INTERLOCK ERROR",
    "AXIS NUMBER OUT OF RANGE",
    "Reserved for future use",
    "Reserved for future use",
    "Reserved for future use",
    "GROUP NUMBER MISSING",
    "GROUP NUMBER OUT OF RANGE",
    "GROUP NUMBER NOT ASSIGNED",
    "GROUP NUMBER ALREADY ASSIGNED",
    "GROUP AXIS OUT OF RANGE",
    "GROUP AXIS ALREADY ASSIGNED",
    "GROUP AXIS DUPLICATED",
    "DATA ACQUISITION IS BUSY",
    "DATA ACQUISITION SETUP ERROR",
    "DATA ACQUISITION NOT ENABLED",
    "SERVO CYCLE (400 µS) TICK FAILURE",
    "Reserved for future use",
    "DOWNLOAD IN PROGRESS",
    "STORED PROGRAM NOT STARTED",
    "COMMAND NOT ALLOWED",
    "STORED PROGRAM FLASH AREA FULL",
    "GROUP PARAMETER MISSING",
    "GROUP PARAMETER OUT OF RANGE",
    "GROUP MAXIMUM VELOCITY EXCEEDED",
    "GROUP MAXIMUM ACCELERATION EXCEEDED",
    "GROUP MAXIMUM DECELERATION EXCEEDED",
    "GROUP MOVE NOT ALLOWED DURING MOTION",
    "PROGRAM NOT FOUND",
    "Reserved for future use",
    "AXIS NUMBER MISSING",
    "COMMAND PARAMETER MISSING",
    "PROGRAM LABEL NOT FOUND",
    "LAST COMMAND CANNOT BE REPEATED",
    "MAX NUMBER OF LABELS PER PROGRAM EXCEEDED",
];

const AXIS_MESSAGES: [&str; 33] = [
    "MOTOR TYPE NOT DEFINED",
    "PARAMETER OUT OF RANGE",
    "AMPLIFIER FAULT DETECTED",
    "FOLLOWING ERROR THRESHOLD EXCEEDED",
    "POSITIVE HARDWARE LIMIT DETECTED",
    "NEGATIVE HARDWARE LIMIT DETECTED",
    "POSITIVE SOFTWARE LIMIT DETECTED",
    "NEGATIVE SOFTWARE LIMIT DETECTED",
    "MOTOR / STAGE NOT CONNECTED",
    "FEEDBACK SIGNAL FAULT DETECTED",
    "MAXIMUM VELOCITY EXCEEDED",
    "MAXIMUM ACCELERATION EXCEEDED",
    "Reserved for future use",
    "MOTOR NOT ENABLED",
    "Reserved for future use",
    "MAXIMUM JERK EXCEEDED",
    "MAXIMUM DAC OFFSET EXCEEDED",
    "ESP CRITICAL SETTINGS ARE PROTECTED",
    "ESP STAGE DEVICE ERROR",
    "ESP STAGE DATA INVALID",
    "HOMING ABORTED",
    "MOTOR CURRENT NOT DEFINED",
    "UNIDRIVE COMMUNICATIONS ERROR",
    "UNIDRIVE NOT DETECTED",
    "SPEED OUT OF RANGE",
    "INVALID TRAJECTORY MASTER AXIS",
    "PARAMETER CHANGE NOT ALLOWED",
    "INVALID TRAJECTORY MODE FOR HOMING",
    "INVALID ENCODER STEP RATIO",
    "DIGITAL I/O INTERLOCK DETECTED",
    "COMMAND NOT ALLOWED DURING HOMING",
    "COMMAND NOT ALLOWED DUE TO GROUP",
    "INVALID TRAJECTORY MODE FOR MOVING",
];

const UNKNOWN: &str = "Error code not recognised";

/// An error code as reported by the ESP-301.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewportErrorCode {
    code: u32,
}

impl NewportErrorCode {
    /// Wrap a raw error code.
    pub fn new(code: u32) -> Self {
        Self { code }
    }

    /// The raw error code, including the axis part.
    pub fn raw(&self) -> u32 {
        self.code
    }

    /// Whether this code reports an error at all.
    pub fn is_error(&self) -> bool {
        self.code != 0
    }

    /// The axis the error concerns (1-based), `None` for errors of the whole controller.
    pub fn axis(&self) -> Option<usize> {
        match self.code / 100 {
            0 => None,
            axis => Some(axis as usize),
        }
    }

    /// The error code without the axis part.
    pub fn sub_code(&self) -> u32 {
        self.code % 100
    }

    /// Human readable description of the error.
    pub fn message(&self) -> &'static str {
        let table: &[&str] = if self.axis().is_some() {
            &AXIS_MESSAGES
        } else {
            &GLOBAL_MESSAGES
        };
        table
            .get(self.sub_code() as usize)
            .copied()
            .unwrap_or(UNKNOWN)
    }

    /// Turn the code into an [`InstrumentError::DeviceError`].
    pub fn into_error(self, timestamp: Option<Duration>) -> InstrumentError {
        InstrumentError::DeviceError {
            code: self.sub_code(),
            axis: self.axis(),
            message: self.message().to_string(),
            timestamp,
        }
    }
}

impl Display for NewportErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.axis() {
            Some(axis) => write!(f, "{} (axis {axis}): {}", self.sub_code(), self.message()),
            None => write!(f, "{}: {}", self.code, self.message()),
        }
    }
}

/// An entry of the error buffer as returned by `TB?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorBufferEntry {
    /// The error code.
    pub code: NewportErrorCode,
    /// Time at which the error occured, counted in servo cycles since power-up.
    pub timestamp: Duration,
}

impl ErrorBufferEntry {
    /// Parse a `TB?` reply of the form `code, timestamp, message`.
    pub fn parse(resp: &str) -> Result<Self, InstrumentError> {
        let parse_err = || InstrumentError::ResponseParseError(resp.to_string());
        let mut parts = resp.splitn(3, ',');
        let code = parts
            .next()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(parse_err)?;
        let ticks = parts
            .next()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(parse_err)?;
        Ok(Self {
            code: NewportErrorCode::new(code),
            timestamp: TICK * ticks,
        })
    }

    /// `Ok(())` if no error is reported, otherwise the corresponding
    /// [`InstrumentError::DeviceError`].
    pub fn into_result(self) -> Result<(), InstrumentError> {
        if self.code.is_error() {
            Err(self.code.into_error(Some(self.timestamp)))
        } else {
            Ok(())
        }
    }
}
