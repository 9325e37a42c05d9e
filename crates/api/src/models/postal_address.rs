//! Address data returned by the postal code lookup.

/// A street address resolved from a postal code.
///
/// `city` is what the lookup service calls "localidade" and `state` is the
/// two-letter "UF".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    pub postal_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}
