//! Postal code (CEP) normalization and formatting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Digits in a valid CEP.
const CEP_LEN: usize = 8;

/// Split point for the hyphenated `XXXXX-XXX` rendering.
const CEP_PREFIX_LEN: usize = 5;

/// Errors from CEP parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CepError {
    /// The cleaned input did not contain exactly eight digits.
    #[error("postal code must have {CEP_LEN} digits, got {got} in {input:?}")]
    InvalidLength {
        /// The raw input as given.
        input: String,
        /// Number of digits after cleaning.
        got: usize,
    },
}

/// Strip everything but ASCII digits from a postal-code string.
///
/// This is the normalization the carrier's address-lookup endpoint expects;
/// it deliberately does not enforce a length so that lookups of partial or
/// malformed input fail on the carrier side, as the source system did.
#[must_use]
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// A validated eight-digit CEP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cep(String);

impl Cep {
    /// Parse a CEP from freeform input ("01310-100", "01310100", ...).
    ///
    /// # Errors
    ///
    /// Returns [`CepError::InvalidLength`] unless exactly eight digits
    /// remain after stripping non-digit characters.
    pub fn parse(raw: &str) -> Result<Self, CepError> {
        let digits = digits_only(raw);
        if digits.len() != CEP_LEN {
            return Err(CepError::InvalidLength {
                input: raw.to_string(),
                got: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// The eight digits without separator.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Hyphenated `XXXXX-XXX` rendering.
    #[must_use]
    pub fn hyphenated(&self) -> String {
        let (prefix, suffix) = self.0.split_at(CEP_PREFIX_LEN);
        format!("{prefix}-{suffix}")
    }
}

impl std::fmt::Display for Cep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
