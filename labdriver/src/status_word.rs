//! Decoding of fixed-layout ASCII status words.
//!
//! Some instruments report their complete configuration as one string of digits, where every
//! setting sits at a fixed character offset. [`StatusWord`] checks the literal prefix of such a
//! string and gives typed access to the fields at given offsets.

use crate::InstrumentError;

/// A status word as returned by an instrument, with a verified literal prefix.
///
/// ```
/// use labdriver::status_word::StatusWord;
///
/// let sw = StatusWord::new("7751001", "775").unwrap();
/// assert_eq!(1, sw.digit(3).unwrap());
/// assert!(!sw.flag(4).unwrap());
///
/// assert!(StatusWord::new("7741001", "775").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWord {
    raw: String,
}

impl StatusWord {
    /// Wrap a raw status word, failing if it does not start with `prefix`.
    pub fn new(raw: &str, prefix: &str) -> Result<Self, InstrumentError> {
        let raw = raw.trim();
        if !raw.is_ascii() || !raw.starts_with(prefix) {
            return Err(InstrumentError::ResponseParseError(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// The status word as received, trimmed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Fail unless the status word is exactly `len` characters long.
    pub fn expect_len(&self, len: usize) -> Result<(), InstrumentError> {
        if self.raw.len() == len {
            Ok(())
        } else {
            Err(self.parse_error())
        }
    }

    /// Fail unless the status word ends in the literal `suffix` at the given offset.
    pub fn expect_suffix(&self, offset: usize, suffix: &str) -> Result<(), InstrumentError> {
        match self.raw.get(offset..) {
            Some(tail) if tail == suffix => Ok(()),
            _ => Err(self.parse_error()),
        }
    }

    /// A single decimal digit at `offset`.
    pub fn digit(&self, offset: usize) -> Result<u8, InstrumentError> {
        self.int(offset, 1).map(|val| val as u8)
    }

    /// A boolean flag at `offset`, encoded as `0` or `1`.
    pub fn flag(&self, offset: usize) -> Result<bool, InstrumentError> {
        match self.digit(offset)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(self.parse_error()),
        }
    }

    /// A decimal integer that spans `width` characters starting at `offset`.
    pub fn int(&self, offset: usize, width: usize) -> Result<u32, InstrumentError> {
        let field = self
            .raw
            .get(offset..offset + width)
            .ok_or_else(|| self.parse_error())?;
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.parse_error());
        }
        field.parse::<u32>().map_err(|_| self.parse_error())
    }

    /// Decode the digit at `offset` into any type that can be built from its ordinal.
    pub fn field<E: TryFrom<u8>>(&self, offset: usize) -> Result<E, InstrumentError> {
        E::try_from(self.digit(offset)?).map_err(|_| self.parse_error())
    }

    fn parse_error(&self) -> InstrumentError {
        InstrumentError::ResponseParseError(self.raw.clone())
    }
}
