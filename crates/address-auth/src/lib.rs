//! Token provider module for the address validation service.
//!
//! Obtains the bearer credential the carrier requires on every validation
//! call. Tokens are fetched fresh for each workflow run and never cached; a
//! run happens at most once per submitted order.

use address_types::{AccessToken, ConfigSchema, ImplementationRegistry};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod ups;
}

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The identity endpoint answered with an error payload.
	#[error("Error obtaining UPS access token: {0}")]
	Rejected(String),
	/// The identity endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}: {message}")]
	Http { status: u16, message: String },
	/// The request never got a response (connection failure, timeout).
	#[error("Token request failed: {0}")]
	Transport(String),
	/// A success response without a usable token.
	#[error("Invalid token response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait implemented by token providers.
#[async_trait]
pub trait TokenInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches a new access token.
	async fn access_token(&self) -> Result<AccessToken, AuthError>;
}

/// Factory signature every token provider exposes.
pub type TokenFactory = fn(&toml::Value) -> Result<Box<dyn TokenInterface>, AuthError>;

pub trait TokenRegistry: ImplementationRegistry<Factory = TokenFactory> {}

/// Returns every available token provider as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, TokenFactory)> {
	use implementations::ups;

	vec![(ups::Registry::NAME, ups::Registry::factory())]
}

/// Builds the value of a `Basic` authorization header.
///
/// Standard alphabet with `=` padding.
pub fn basic_credentials(username: &str, password: &str) -> String {
	format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_basic_credentials_padding() {
		// 9 bytes, no padding
		assert_eq!(basic_credentials("user", "pass"), "Basic dXNlcjpwYXNz");
		// 10 bytes, two pad characters
		assert_eq!(basic_credentials("user", "passw"), "Basic dXNlcjpwYXNzdw==");
		// 11 bytes, one pad character
		assert_eq!(basic_credentials("user", "passwd"), "Basic dXNlcjpwYXNzd2Q=");
	}

	#[test]
	fn test_registry_lists_ups() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["ups"]);
	}
}
