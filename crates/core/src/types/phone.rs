//! Phone contact value.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty or only whitespace.
    #[error("Valor do contato é obrigatório.")]
    Empty,
    /// The input is not 10 or 11 ASCII digits.
    #[error("Telefone inválido. Deve conter apenas dígitos e ter 10 ou 11 caracteres.")]
    Invalid,
}

/// A Brazilian phone number: area code plus 8 or 9 digits, digits only.
///
/// ```
/// use customer_registry_core::Phone;
///
/// assert!(Phone::parse("11999999999").is_ok());
/// assert!(Phone::parse("1133334444").is_ok());
/// assert!(Phone::parse("123").is_err());
/// assert!(Phone::parse("(11) 99999-9999").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (landline with area code).
    pub const MIN_DIGITS: usize = 10;
    /// Maximum number of digits (mobile with area code).
    pub const MAX_DIGITS: usize = 11;

    /// Parse a `Phone` from user input.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] for blank input and
    /// [`PhoneError::Invalid`] for anything other than 10-11 ASCII digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let valid_length = (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&s.len());
        if !valid_length || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::Invalid);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
