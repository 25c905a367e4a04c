//! Common types module for the address validation system.
//!
//! This module defines the data model shared by every component: the
//! carrier-facing address format, the verdict produced by validation, the
//! fixed status vocabulary written back onto the order, and the order fields
//! the workflow reads from the host record store.

/// Carrier address format and its construction from order fields.
pub mod address;
/// Carrier fault payloads shared by the outbound clients.
pub mod carrier;
/// Order record fields read by the workflow.
pub mod order;
/// Implementation registry for config-selected backends.
pub mod registry;
/// Redacting string type for credentials and bearer tokens.
pub mod secret_string;
/// Status field vocabulary.
pub mod status;
/// Configuration validation types for implementation tables.
pub mod validation;
/// Validation verdicts and address classification.
pub mod verdict;

pub use address::{Address, AddressError, US_COUNTRY_CODE};
pub use carrier::{truncate_body, CarrierFault};
pub use order::SalesOrder;
pub use registry::ImplementationRegistry;
pub use secret_string::{AccessToken, SecretString};
pub use status::AddressStatus;
pub use validation::*;
pub use verdict::{AddressClassification, ValidationVerdict};
