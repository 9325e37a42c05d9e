//! Customer Registry Core - Shared domain types.
//!
//! This crate provides the types shared by every customer registry component:
//! - `api` - HTTP service that registers and serves customers
//! - `cli` - Command-line tools for migrations and history inspection
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O, no
//! database access, no HTTP clients. Database encoding is available behind
//! the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, contact values, postal codes and history operations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
