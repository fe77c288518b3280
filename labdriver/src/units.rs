//! Conversion of unitful arguments into the canonical unit an instrument expects.
//!
//! Setters that take a physical value accept either a bare `f64`, which is interpreted in the
//! canonical unit of the quantity, or a [`measurements`] quantity (or a [`Duration`] for times).
//! Both convert into a [`Unitful`] with `.into()`.

use std::time::Duration;

use measurements::{Angle, Current, Frequency, Voltage};

use crate::InstrumentError;

/// A quantity with a canonical unit in which instruments expect it.
pub trait Canonical {
    /// Name of the canonical unit, used in error messages.
    const UNIT: &'static str;

    /// Magnitude of the quantity in its canonical unit.
    fn canonical(&self) -> f64;
}

impl Canonical for Frequency {
    const UNIT: &'static str = "Hz";

    fn canonical(&self) -> f64 {
        self.as_hertz()
    }
}

impl Canonical for Voltage {
    const UNIT: &'static str = "V";

    fn canonical(&self) -> f64 {
        self.as_volts()
    }
}

impl Canonical for Current {
    const UNIT: &'static str = "A";

    fn canonical(&self) -> f64 {
        self.as_amperes()
    }
}

impl Canonical for Angle {
    const UNIT: &'static str = "deg";

    fn canonical(&self) -> f64 {
        self.as_degrees()
    }
}

impl Canonical for Duration {
    const UNIT: &'static str = "s";

    fn canonical(&self) -> f64 {
        self.as_secs_f64()
    }
}

/// A value that is either bare (already in the canonical unit) or a dimensioned quantity.
///
/// ```
/// use labdriver::units::Unitful;
/// use measurements::Frequency;
///
/// let bare: Unitful<Frequency> = 1000.0.into();
/// let quantity: Unitful<Frequency> = Frequency::from_kilohertz(1.0).into();
/// assert_eq!(bare.canonical(), quantity.canonical());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unitful<Q> {
    /// A bare number in the canonical unit of `Q`.
    Bare(f64),
    /// A dimensioned quantity.
    Quantity(Q),
}

impl<Q: Canonical> Unitful<Q> {
    /// Magnitude in the canonical unit.
    pub fn canonical(&self) -> f64 {
        match self {
            Unitful::Bare(val) => *val,
            Unitful::Quantity(q) => q.canonical(),
        }
    }

    /// Magnitude in the canonical unit, failing for NaN and infinite values.
    pub fn finite(&self) -> Result<f64, InstrumentError> {
        let val = self.canonical();
        if val.is_finite() {
            Ok(val)
        } else {
            Err(InstrumentError::InvalidArgument(format!(
                "Value {val} {} is not a finite number",
                Q::UNIT
            )))
        }
    }
}

impl<Q> From<f64> for Unitful<Q> {
    fn from(value: f64) -> Self {
        Unitful::Bare(value)
    }
}

macro_rules! unitful_from {
    ($($q:ty),*) => {
        $(
            impl From<$q> for Unitful<$q> {
                fn from(value: $q) -> Self {
                    Unitful::Quantity(value)
                }
            }
        )*
    };
}

unitful_from!(Frequency, Voltage, Current, Angle, Duration);

/// Build a [`Duration`] from seconds as reported by an instrument.
pub fn duration_from_secs(secs: f64) -> Result<Duration, InstrumentError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        InstrumentError::InvalidArgument(format!("{secs} s is not a valid duration"))
    })
}

/// Format a float argument in plain decimal notation, never with an exponent.
///
/// Whole numbers keep a trailing `.0`, e.g., `2000.0`, `0.00001`, or `-25.0`.
pub fn fmt_decimal(value: f64) -> String {
    let s = value.to_string();
    if value.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measurements::test_utils::assert_almost_eq;
    use rstest::*;

    #[rstest]
    fn test_frequency() {
        let val: Unitful<Frequency> = Frequency::from_megahertz(1.0).into();
        assert_almost_eq(1e6, val.canonical());
        let val: Unitful<Frequency> = 13.0.into();
        assert_almost_eq(13.0, val.canonical());
    }

    #[rstest]
    fn test_angle_is_degrees() {
        let val: Unitful<Angle> = Angle::from_radians(std::f64::consts::PI).into();
        assert_almost_eq(180.0, val.canonical());
    }

    #[rstest]
    fn test_duration_and_voltage() {
        let val: Unitful<Duration> = Duration::from_millis(2500).into();
        assert_almost_eq(2.5, val.canonical());
        let val: Unitful<Voltage> = Voltage::from_millivolts(500.0).into();
        assert_almost_eq(0.5, val.canonical());
        let val: Unitful<Current> = Current::from_milliamperes(20.0).into();
        assert_almost_eq(0.02, val.canonical());
    }

    #[rstest]
    fn test_finite() {
        let val: Unitful<Frequency> = f64::NAN.into();
        assert!(val.finite().is_err());
        let val: Unitful<Frequency> = f64::INFINITY.into();
        assert!(val.finite().is_err());
    }

    #[rstest]
    fn test_duration_from_secs() {
        assert_eq!(Duration::from_millis(2500), duration_from_secs(2.5).unwrap());
        assert!(duration_from_secs(-1.0).is_err());
    }

    #[rstest]
    #[case(2000.0, "2000.0")]
    #[case(-25.0, "-25.0")]
    #[case(0.0001, "0.0001")]
    #[case(1e-5, "0.00001")]
    #[case(-2.5e-7, "-0.00000025")]
    #[case(1e17, "100000000000000000.0")]
    #[case(12.5, "12.5")]
    fn test_fmt_decimal(#[case] value: f64, #[case] exp: &str) {
        assert_eq!(exp, fmt_decimal(value));
    }
}
