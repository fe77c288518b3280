//! Units of an ESP-301 axis.
//!
//! Every axis works in the unit it is configured for with `SN`, see [`AxisUnit`]. Setters accept
//! an [`AxisQuantity`]: a bare `f64` in the axis unit, or a [`measurements`] quantity that is
//! converted into the axis unit. Quantities of the wrong dimension are rejected before anything is
//! sent to the controller.

use std::{f64::consts::PI, fmt::Display};

use labdriver::InstrumentError;
use measurements::{Acceleration, Angle, AngularVelocity, Length, Speed};

/// Physical dimension of an axis unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Steps or counts, no physical unit.
    Count,
    /// Linear axis.
    Length,
    /// Rotary axis.
    Angle,
}

/// Unit an axis is configured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisUnit {
    /// Encoder counts.
    EncoderCount,
    /// Motor steps.
    MotorStep,
    /// Millimeter.
    Millimeter,
    /// Micrometer.
    Micrometer,
    /// Inch.
    Inch,
    /// Milli-inch.
    MilliInch,
    /// Micro-inch.
    MicroInch,
    /// Degree.
    Degree,
    /// Gradian.
    Gradian,
    /// Radian.
    Radian,
    /// Milliradian.
    Milliradian,
    /// Microradian.
    Microradian,
}

impl AxisUnit {
    /// All units in the order of their code.
    pub const ALL: [AxisUnit; 12] = [
        AxisUnit::EncoderCount,
        AxisUnit::MotorStep,
        AxisUnit::Millimeter,
        AxisUnit::Micrometer,
        AxisUnit::Inch,
        AxisUnit::MilliInch,
        AxisUnit::MicroInch,
        AxisUnit::Degree,
        AxisUnit::Gradian,
        AxisUnit::Radian,
        AxisUnit::Milliradian,
        AxisUnit::Microradian,
    ];

    /// Code of the unit as used by `SN`.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a unit by its `SN` code.
    pub fn from_code(code: u8) -> Result<Self, InstrumentError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(InstrumentError::IntValueOutOfRange {
                value: code as i64,
                min: 0,
                max: Self::ALL.len() as i64 - 1,
            })
    }

    /// Physical dimension of the unit.
    pub fn dimension(&self) -> Dimension {
        use AxisUnit::*;
        match self {
            EncoderCount | MotorStep => Dimension::Count,
            Millimeter | Micrometer | Inch | MilliInch | MicroInch => Dimension::Length,
            Degree | Gradian | Radian | Milliradian | Microradian => Dimension::Angle,
        }
    }

    /// Size of one unit in meters or radians, `1.0` for counts.
    pub fn si_scale(&self) -> f64 {
        use AxisUnit::*;
        match self {
            EncoderCount | MotorStep => 1.0,
            Millimeter => 1e-3,
            Micrometer => 1e-6,
            Inch => 0.0254,
            MilliInch => 0.0254e-3,
            MicroInch => 0.0254e-6,
            Degree => PI / 180.0,
            Gradian => PI / 200.0,
            Radian => 1.0,
            Milliradian => 1e-3,
            Microradian => 1e-6,
        }
    }

    /// Short symbol of the unit.
    pub fn symbol(&self) -> &'static str {
        use AxisUnit::*;
        match self {
            EncoderCount => "counts",
            MotorStep => "steps",
            Millimeter => "mm",
            Micrometer => "µm",
            Inch => "in",
            MilliInch => "mil",
            MicroInch => "µin",
            Degree => "deg",
            Gradian => "grad",
            Radian => "rad",
            Milliradian => "mrad",
            Microradian => "µrad",
        }
    }
}

impl Display for AxisUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A value for an axis setting.
///
/// `per_second` is the power of seconds in the denominator: 0 for positions, 1 for velocities,
/// 2 for accelerations, and 3 for jerks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisQuantity {
    /// A bare number in the unit of the axis.
    Native(f64),
    /// A quantity in meters or radians (per second to the power of `per_second`).
    Si {
        /// Magnitude in SI base units.
        value: f64,
        /// Dimension of the quantity.
        dimension: Dimension,
        /// Power of seconds in the denominator.
        per_second: u8,
    },
}

impl AxisQuantity {
    /// Convert into a value in `unit` (per second to the power of `per_second`).
    pub fn to_native(&self, unit: AxisUnit, per_second: u8) -> Result<f64, InstrumentError> {
        let value = match *self {
            AxisQuantity::Native(value) => value,
            AxisQuantity::Si {
                value,
                dimension,
                per_second: given,
            } => {
                if dimension != unit.dimension() || given != per_second {
                    return Err(InstrumentError::IncompatibleUnit {
                        quantity: describe(dimension, given),
                        unit: rate_symbol(unit, per_second),
                    });
                }
                value / unit.si_scale()
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(InstrumentError::InvalidArgument(format!(
                "Value must be finite, got {value}"
            )))
        }
    }
}

fn describe(dimension: Dimension, per_second: u8) -> String {
    match (dimension, per_second) {
        (Dimension::Length, 0) => "length".to_string(),
        (Dimension::Length, 1) => "speed".to_string(),
        (Dimension::Length, 2) => "acceleration".to_string(),
        (Dimension::Angle, 0) => "angle".to_string(),
        (Dimension::Angle, 1) => "angular velocity".to_string(),
        (dim, n) => format!("{dim:?} per s^{n}").to_lowercase(),
    }
}

fn rate_symbol(unit: AxisUnit, per_second: u8) -> String {
    match per_second {
        0 => unit.symbol().to_string(),
        1 => format!("{unit}/s"),
        n => format!("{unit}/s^{n}"),
    }
}

impl From<f64> for AxisQuantity {
    fn from(value: f64) -> Self {
        AxisQuantity::Native(value)
    }
}

macro_rules! axis_quantity_from {
    ($($q:ty => $dim:ident, $per_second:literal, $as_si:ident;)+) => {
        $(
            impl From<$q> for AxisQuantity {
                fn from(value: $q) -> Self {
                    AxisQuantity::Si {
                        value: value.$as_si(),
                        dimension: Dimension::$dim,
                        per_second: $per_second,
                    }
                }
            }
        )+
    };
}

axis_quantity_from! {
    Length => Length, 0, as_meters;
    Angle => Angle, 0, as_radians;
    Speed => Length, 1, as_meters_per_second;
    AngularVelocity => Angle, 1, as_radians_per_second;
    Acceleration => Length, 2, as_meters_per_second_per_second;
}

/// A value read from an axis, in the unit the axis is configured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisReading {
    /// The value as reported by the controller.
    pub value: f64,
    /// The unit of the axis at the time of reading.
    pub unit: AxisUnit,
}

impl AxisReading {
    /// The reading as a length, if the axis is linear.
    pub fn as_length(&self) -> Option<Length> {
        (self.unit.dimension() == Dimension::Length)
            .then(|| Length::from_meters(self.value * self.unit.si_scale()))
    }

    /// The reading as an angle, if the axis is rotary.
    pub fn as_angle(&self) -> Option<Angle> {
        (self.unit.dimension() == Dimension::Angle)
            .then(|| Angle::from_radians(self.value * self.unit.si_scale()))
    }
}
