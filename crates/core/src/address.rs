//! Postal codes (CEP) and delivery addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a Brazilian postal code.
pub const POSTAL_CODE_DIGITS: usize = 8;

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// The input does not contain exactly eight digits.
    #[error("postal code must have {expected} digits (got {got})")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        got: usize,
    },
}

/// A complete 8-digit postal code, stored without punctuation.
///
/// ```
/// use rhema_core::PostalCode;
///
/// let cep = PostalCode::parse("76997-000").unwrap();
/// assert_eq!(cep.digits(), "76997000");
/// assert_eq!(cep.formatted(), "76997-000");
/// assert!(PostalCode::parse("7699").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Parse a postal code, ignoring any non-digit characters.
    ///
    /// # Errors
    ///
    /// Returns [`PostalCodeError::WrongLength`] unless exactly eight digits remain.
    pub fn parse(input: &str) -> Result<Self, PostalCodeError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != POSTAL_CODE_DIGITS {
            return Err(PostalCodeError::WrongLength {
                expected: POSTAL_CODE_DIGITS,
                got: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// The eight digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The `NNNNN-NNN` display form.
    #[must_use]
    pub fn formatted(&self) -> String {
        format_postal_code_input(&self.0)
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for PostalCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(value: PostalCode) -> Self {
        value.0
    }
}

/// Normalise what a customer typed into the postal code field.
///
/// Keeps at most eight digits and inserts the hyphen once more than five
/// digits are present, so partial input stays editable.
#[must_use]
pub fn format_postal_code_input(input: &str) -> String {
    let digits: String = input
        .chars()
        .filter(char::is_ascii_digit)
        .take(POSTAL_CODE_DIGITS)
        .collect();
    if digits.len() > 5 {
        let (head, tail) = digits.split_at(5);
        format!("{head}-{tail}")
    } else {
        digits
    }
}

/// Street-level data returned by a postal code lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (UF), e.g. `RO`.
    pub region: String,
}

/// A delivery address as collected at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// As typed, normalised by [`format_postal_code_input`].
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code.
    pub region: String,
}

impl Address {
    /// Merge a lookup result into the form.
    ///
    /// Only the looked-up fields change; `number` and `complement` are always
    /// left as the customer entered them.
    pub fn apply_resolved(&mut self, resolved: &ResolvedAddress) {
        self.street.clone_from(&resolved.street);
        self.neighborhood.clone_from(&resolved.neighborhood);
        self.city.clone_from(&resolved.city);
        self.region.clone_from(&resolved.region);
    }

    /// `street, number[ - complement], neighborhood`
    #[must_use]
    pub fn line(&self) -> String {
        let complement = if self.complement.trim().is_empty() {
            String::new()
        } else {
            format!(" - {}", self.complement.trim())
        };
        format!(
            "{}, {}{}, {}",
            self.street.trim(),
            self.number.trim(),
            complement,
            self.neighborhood.trim()
        )
    }

    /// `city / STATE`
    #[must_use]
    pub fn city_line(&self) -> String {
        format!("{} / {}", self.city.trim(), self.region.trim())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_partial_input() {
        assert_eq!(format_postal_code_input("769"), "769");
        assert_eq!(format_postal_code_input("76997"), "76997");
        assert_eq!(format_postal_code_input("769970"), "76997-0");
        assert_eq!(format_postal_code_input("76997-000123"), "76997-000");
    }

    #[test]
    fn test_parse_rejects_short_codes() {
        assert_eq!(
            PostalCode::parse("12.345"),
            Err(PostalCodeError::WrongLength {
                expected: 8,
                got: 5
            })
        );
    }

    #[test]
    fn test_apply_resolved_keeps_number_and_complement() {
        let mut address = Address {
            postal_code: "76997-000".to_string(),
            number: "42".to_string(),
            complement: "Casa 2".to_string(),
            ..Address::default()
        };
        address.apply_resolved(&ResolvedAddress {
            street: "Rua Principal".to_string(),
            neighborhood: "Centro".to_string(),
            city: "Cerejeiras".to_string(),
            region: "RO".to_string(),
        });

        assert_eq!(address.number, "42");
        assert_eq!(address.complement, "Casa 2");
        assert_eq!(address.city, "Cerejeiras");
        assert_eq!(address.region, "RO");
    }

    #[test]
    fn test_address_lines() {
        let address = Address {
            postal_code: "01310-100".to_string(),
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            complement: String::new(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            region: "SP".to_string(),
        };
        assert_eq!(address.line(), "Av. Paulista, 1000, Bela Vista");
        assert_eq!(address.city_line(), "São Paulo / SP");
    }
}
