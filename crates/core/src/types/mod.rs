//! Core types for the customer registry.
//!
//! This module provides type-safe wrappers for the registry's domain concepts.

pub mod contact;
pub mod email;
pub mod history;
pub mod id;
pub mod phone;
pub mod postal_code;

pub use contact::{ContactInfo, ContactKind, UnknownContactKind};
pub use email::{Email, EmailError};
pub use history::HistoryOperation;
pub use id::*;
pub use phone::{Phone, PhoneError};
pub use postal_code::PostalCode;
