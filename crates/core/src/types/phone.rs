//! Brazilian phone-number splitting.
//!
//! The carrier API wants the area code (DDD) and the subscriber number as
//! separate fields, while storefront orders carry a single freeform phone
//! string ("+55 (11) 99888-7766", "11998887766", ...).

use serde::{Deserialize, Serialize};

/// Country calling code stripped from the front of normalized numbers.
const COUNTRY_CODE: &str = "55";

/// Area code (DDD) length in digits.
const AREA_CODE_LEN: usize = 2;

/// A phone number split into area code and subscriber number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneParts {
    /// Two-digit area code (DDD). Empty when the input had fewer than two
    /// digits left after normalization.
    pub area_code: String,
    /// Subscriber number (everything after the area code).
    pub number: String,
}

impl PhoneParts {
    /// Split a freeform phone string into area code and subscriber number.
    ///
    /// Normalization: strip every non-digit character, then strip one
    /// leading literal `"55"` country prefix if present. The first two
    /// remaining digits become the area code, the rest the subscriber
    /// number. Fewer than two remaining digits yield an empty area code and
    /// the full remainder as the number.
    #[must_use]
    pub fn split(raw: &str) -> Self {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let digits = digits.strip_prefix(COUNTRY_CODE).unwrap_or(&digits);

        if digits.len() < AREA_CODE_LEN {
            return Self {
                area_code: String::new(),
                number: digits.to_string(),
            };
        }

        let (area_code, number) = digits.split_at(AREA_CODE_LEN);
        Self {
            area_code: area_code.to_string(),
            number: number.to_string(),
        }
    }
}
