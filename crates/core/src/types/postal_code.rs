//! Brazilian postal code (CEP).

use core::fmt;

/// A postal code in the form sent to the lookup service: separators removed.
///
/// Users type CEPs as `01310-100` or `01.310-100`; the lookup service wants
/// `01310100`. No digit-count check is made here: the lookup service is the
/// authority on which codes exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    /// Strip hyphens, periods and surrounding whitespace.
    ///
    /// Returns `None` when nothing is left to look up.
    ///
    /// ```
    /// use customer_registry_core::PostalCode;
    ///
    /// let cep = PostalCode::normalize("01.310-100");
    /// assert_eq!(cep.as_ref().map(PostalCode::as_str), Some("01310100"));
    /// assert!(PostalCode::normalize(" - . ").is_none());
    /// ```
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw.chars().filter(|c| !matches!(c, '-' | '.')).collect();
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned.to_owned()))
        }
    }

    /// Returns the normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
