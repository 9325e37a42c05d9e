//! Customer contact kinds and validated contact values.

use serde::{Deserialize, Serialize};

use super::{Email, Phone};

/// The kind of a stored contact.
///
/// Serialized and persisted with the registry's public names:
/// `"Email"` and `"Telefone"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "registry.contact_kind"))]
pub enum ContactKind {
    Email,
    #[serde(rename = "Telefone")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Telefone"))]
    Phone,
}

impl ContactKind {
    /// The public name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Phone => "Telefone",
        }
    }
}

impl std::fmt::Display for ContactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a contact kind name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Tipo de contato não suportado: {0}")]
pub struct UnknownContactKind(pub String);

impl std::str::FromStr for ContactKind {
    type Err = UnknownContactKind;

    /// Case-insensitive: `email`, `EMAIL` and `Email` are all accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "telefone" => Ok(Self::Phone),
            _ => Err(UnknownContactKind(s.to_owned())),
        }
    }
}

/// A contact whose value has already passed its kind's format rule.
///
/// This is what the service layer receives; raw request contacts are turned
/// into `ContactInfo` at the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactInfo {
    Email(Email),
    Phone(Phone),
}

impl ContactInfo {
    /// The kind tag for this contact.
    #[must_use]
    pub const fn kind(&self) -> ContactKind {
        match self {
            Self::Email(_) => ContactKind::Email,
            Self::Phone(_) => ContactKind::Phone,
        }
    }

    /// Consumes the contact and returns the validated value as stored.
    #[must_use]
    pub fn into_value(self) -> String {
        match self {
            Self::Email(email) => email.into_inner(),
            Self::Phone(phone) => phone.into_inner(),
        }
    }
}

impl From<Email> for ContactInfo {
    fn from(email: Email) -> Self {
        Self::Email(email)
    }
}

impl From<Phone> for ContactInfo {
    fn from(phone: Phone) -> Self {
        Self::Phone(phone)
    }
}
