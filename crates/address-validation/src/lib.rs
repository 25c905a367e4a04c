//! Address validation module for the address validation service.
//!
//! Sends the order's shipping address to the carrier and turns the best
//! candidate it returns into a [`ValidationVerdict`]. A missing candidate is
//! reported as [`ValidationError::NotFound`] so callers can tell "the carrier
//! does not know this address" apart from transport and auth failures.

use address_types::{AccessToken, Address, ConfigSchema, ImplementationRegistry, ValidationVerdict};
use async_trait::async_trait;
use thiserror::Error;

pub mod xav;

/// Re-export implementations
pub mod implementations {
	pub mod ups;
}

pub use xav::{evaluate_candidate, interpret_response};

/// Errors that can occur during address validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// The carrier returned no candidate for the address.
	#[error("Address not found by carrier")]
	NotFound,
	/// The validation endpoint answered with a non-success status.
	#[error("Validation endpoint returned HTTP {status}: {message}")]
	Http { status: u16, message: String },
	/// The request never got a response (connection failure, timeout).
	#[error("Validation request failed: {0}")]
	Transport(String),
	/// The response could not be interpreted.
	#[error("Invalid validation response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait implemented by address validators.
#[async_trait]
pub trait ValidationInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Validates `address` against the carrier's address database.
	async fn validate(
		&self,
		address: &Address,
		token: &AccessToken,
	) -> Result<ValidationVerdict, ValidationError>;
}

/// Factory signature every validator exposes.
pub type ValidationFactory =
	fn(&toml::Value) -> Result<Box<dyn ValidationInterface>, ValidationError>;

pub trait ValidationRegistry: ImplementationRegistry<Factory = ValidationFactory> {}

/// Returns every available validator as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, ValidationFactory)> {
	use implementations::ups;

	vec![(ups::Registry::NAME, ups::Registry::factory())]
}
