//! Static parameter tables.
//!
//! Drivers describe the settings of their instrument as `const` tables of [`ParameterSpec`]s.
//! The tables document which mnemonic belongs to which setting and what values it takes. Integer
//! setters run their value through [`ParameterSpec::validate_int`] before anything is sent.

use crate::InstrumentError;

/// The values a parameter can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// One of a fixed list of variants, listed by name.
    Enum(&'static [&'static str]),
    /// An integer within the inclusive range.
    IntRange {
        /// Smallest allowed value.
        min: i64,
        /// Largest allowed value.
        max: i64,
    },
    /// A boolean with the tokens that encode on and off.
    Bool {
        /// Token for `true`.
        on: &'static str,
        /// Token for `false`.
        off: &'static str,
    },
    /// A floating point value in the given canonical unit.
    Unit(&'static str),
    /// Free text.
    Text,
}

/// Whether a parameter can be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Can only be queried.
    ReadOnly,
    /// Can only be set.
    WriteOnly,
    /// Can be queried and set.
    ReadWrite,
}

/// Description of a single instrument parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Human readable name.
    pub name: &'static str,
    /// The command mnemonic that sets or queries the parameter.
    pub mnemonic: &'static str,
    /// Values the parameter takes.
    pub domain: Domain,
    /// Read/write access.
    pub access: Access,
}

impl ParameterSpec {
    /// Check an integer against the range of this parameter and return it unchanged if it fits.
    ///
    /// Parameters that are not integer ranges reject every value with
    /// [`InstrumentError::InvalidArgument`].
    pub fn validate_int(&self, value: i64) -> Result<i64, InstrumentError> {
        match self.domain {
            Domain::IntRange { min, max } if (min..=max).contains(&value) => Ok(value),
            Domain::IntRange { min, max } => {
                Err(InstrumentError::IntValueOutOfRange { value, min, max })
            }
            _ => Err(InstrumentError::InvalidArgument(format!(
                "Parameter {} does not take an integer value",
                self.name
            ))),
        }
    }

    /// Whether the parameter can be set.
    pub fn is_writable(&self) -> bool {
        self.access != Access::ReadOnly
    }

    /// Whether the parameter can be queried.
    pub fn is_readable(&self) -> bool {
        self.access != Access::WriteOnly
    }
}

/// Find a parameter in a table by its mnemonic.
///
/// A command that accepts several kinds of argument, e.g., `ON`/`OFF` as well as a mode, is
/// listed once per kind. `find` returns the first of these entries, use [`find_all`] to get all
/// of them.
pub fn find<'a>(table: &'a [ParameterSpec], mnemonic: &str) -> Option<&'a ParameterSpec> {
    find_all(table, mnemonic).next()
}

/// All entries of a table with the given mnemonic, in table order.
pub fn find_all<'a, 'b>(
    table: &'a [ParameterSpec],
    mnemonic: &'b str,
) -> impl Iterator<Item = &'a ParameterSpec> {
    table.iter().filter(move |p| p.mnemonic == mnemonic)
}
