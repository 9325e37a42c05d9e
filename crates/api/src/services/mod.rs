//! Business logic services for the registry API.
//!
//! # Services
//!
//! - `customers` - Customer registration, reads, rename, removal and history
//! - `postal_code` - ViaCEP postal code lookup

pub mod customers;
pub mod postal_code;

pub use customers::{CustomerService, NewCustomerRequest, ServiceError};
pub use postal_code::{PostalCodeError, PostalCodeLookup, ViaCepClient};
