//! Domain models for the customer registry.
//!
//! These types represent validated domain objects, separate from the
//! database row types in [`crate::db`] and the JSON shapes in
//! [`crate::routes`].

pub mod customer;
pub mod history;
pub mod postal_address;

pub use customer::{Address, Contact, Customer, NewAddress, NewContact, NewCustomer};
pub use history::{ChangeHistoryRecord, CustomerSummary};
pub use postal_address::PostalAddress;
