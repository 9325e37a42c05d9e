//! Customer aggregate: a customer with its owned addresses and contacts.

use chrono::{DateTime, Utc};

use customer_registry_core::{AddressId, ContactId, ContactInfo, ContactKind, CustomerId};

use super::PostalAddress;

/// House number stored when the customer does not give one ("sem número").
pub const NO_NUMBER: &str = "S/N";

/// Maximum length of a customer name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// A persisted customer with its addresses and contacts loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Sequence-assigned ID.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// When the customer was registered (UTC). Never changes.
    pub registered_at: DateTime<Utc>,
    /// Owned addresses, in ID order.
    pub addresses: Vec<Address>,
    /// Owned contacts, in ID order.
    pub contacts: Vec<Contact>,
}

/// A persisted address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// A persisted contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub customer_id: CustomerId,
    pub kind: ContactKind,
    pub value: String,
}

/// A customer aggregate that has not been persisted yet.
///
/// Built entirely in memory, then handed to the repository in one call. The
/// repository assigns every ID and fills in the children's customer ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub addresses: Vec<NewAddress>,
    pub contacts: Vec<NewContact>,
}

/// An address of a [`NewCustomer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// A contact of a [`NewCustomer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub kind: ContactKind,
    pub value: String,
}

impl NewCustomer {
    /// Assemble a new customer from validated input and a postal lookup.
    ///
    /// Produces exactly one address. A missing or blank `number` becomes
    /// [`NO_NUMBER`].
    #[must_use]
    pub fn assemble(
        name: &str,
        number: Option<&str>,
        contacts: Vec<ContactInfo>,
        postal_address: PostalAddress,
        registered_at: DateTime<Utc>,
    ) -> Self {
        let number = number
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(NO_NUMBER);

        Self {
            name: name.trim().to_owned(),
            registered_at,
            addresses: vec![NewAddress::from_lookup(postal_address, number)],
            contacts: contacts.into_iter().map(NewContact::from).collect(),
        }
    }
}

impl NewAddress {
    /// Build an address from a lookup result plus the customer's house number.
    #[must_use]
    pub fn from_lookup(postal_address: PostalAddress, number: &str) -> Self {
        Self {
            postal_code: postal_address.postal_code,
            street: postal_address.street,
            number: number.to_owned(),
            neighborhood: postal_address.neighborhood,
            city: postal_address.city,
            state: postal_address.state,
        }
    }
}

impl From<ContactInfo> for NewContact {
    fn from(contact: ContactInfo) -> Self {
        Self {
            kind: contact.kind(),
            value: contact.into_value(),
        }
    }
}
