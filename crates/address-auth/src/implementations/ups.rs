//! UPS OAuth client-credentials token provider.
//!
//! Posts `grant_type=client_credentials` to the UPS identity endpoint with
//! Basic authentication and the merchant id header, and extracts
//! `access_token` from the JSON answer.

use crate::{basic_credentials, AuthError, TokenFactory, TokenInterface, TokenRegistry};
use address_types::{
	http_url, non_empty_string, truncate_body, AccessToken, CarrierFault, ConfigSchema, Field,
	FieldType, ImplementationRegistry, Schema, SecretString, ValidationError,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

/// Default UPS identity endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://onlinetools.ups.com/security/v1/oauth/token";

const GRANT_BODY: &str = "grant_type=client_credentials";
const MERCHANT_ID_HEADER: &str = "x-merchant-id";

/// Configuration of the UPS token provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsAuthConfig {
	pub username: String,
	pub password: SecretString,
	pub merchant_id: String,
	#[serde(default = "default_token_url")]
	pub token_url: String,
	/// Upper bound on the whole token request.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

fn default_token_url() -> String {
	DEFAULT_TOKEN_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
	10
}

/// Identity endpoint answer. Success and error payloads share one shape.
#[derive(Debug, Deserialize)]
struct TokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

impl TokenResponse {
	fn error_message(&self) -> Option<String> {
		let error = self.error.as_deref()?;
		Some(
			self.error_description
				.clone()
				.filter(|d| !d.trim().is_empty())
				.unwrap_or_else(|| error.to_string()),
		)
	}
}

pub struct UpsTokenProvider {
	client: reqwest::Client,
	token_url: String,
	merchant_id: String,
	username: String,
	password: SecretString,
}

impl UpsTokenProvider {
	/// Creates a provider whose requests give up after `timeout`.
	pub fn new(config: UpsAuthConfig, timeout: Duration) -> Result<Self, AuthError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AuthError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			client,
			token_url: config.token_url,
			merchant_id: config.merchant_id,
			username: config.username,
			password: config.password,
		})
	}
}

#[async_trait]
impl TokenInterface for UpsTokenProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(UpsAuthSchema)
	}

	async fn access_token(&self) -> Result<AccessToken, AuthError> {
		tracing::debug!(url = %self.token_url, "Requesting UPS access token");

		let response = self
			.client
			.post(&self.token_url)
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(MERCHANT_ID_HEADER, &self.merchant_id)
			.header(
				AUTHORIZATION,
				basic_credentials(&self.username, self.password.expose_secret()),
			)
			.body(GRANT_BODY)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					AuthError::Transport(format!("request to {} timed out", self.token_url))
				} else {
					AuthError::Transport(e.to_string())
				}
			})?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| AuthError::Transport(format!("Failed to read token response: {}", e)))?;

		let parsed = serde_json::from_str::<TokenResponse>(&body).ok();
		if let Some(message) = parsed.as_ref().and_then(TokenResponse::error_message) {
			tracing::warn!(status = %status, "UPS rejected token request");
			return Err(AuthError::Rejected(message));
		}

		if !status.is_success() {
			let message = CarrierFault::summarize_body(&body).unwrap_or_else(|| truncate_body(&body));
			tracing::warn!(status = %status, "UPS token endpoint returned an error status");
			return Err(AuthError::Http {
				status: status.as_u16(),
				message,
			});
		}

		let token = parsed
			.ok_or_else(|| AuthError::InvalidResponse("response is not JSON".to_string()))?
			.access_token
			.filter(|t| !t.trim().is_empty())
			.ok_or_else(|| AuthError::InvalidResponse("missing access_token".to_string()))?;

		tracing::debug!("Obtained UPS access token");
		Ok(AccessToken::new(token))
	}
}

/// Configuration schema for the UPS token provider.
pub struct UpsAuthSchema;

impl ConfigSchema for UpsAuthSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("username", FieldType::String).with_validator(non_empty_string),
				Field::new("password", FieldType::String).with_validator(non_empty_string),
				Field::new("merchant_id", FieldType::String).with_validator(non_empty_string),
			],
			vec![
				Field::new("token_url", FieldType::String).with_validator(http_url),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Creates the UPS token provider from its `[auth.implementations.ups]` table.
pub fn create_token_provider(config: &toml::Value) -> Result<Box<dyn TokenInterface>, AuthError> {
	UpsAuthSchema
		.validate(config)
		.map_err(|e| AuthError::Configuration(format!("Invalid configuration: {}", e)))?;

	let config: UpsAuthConfig = config
		.clone()
		.try_into()
		.map_err(|e| AuthError::Configuration(format!("Invalid UPS auth config: {}", e)))?;
	let timeout = Duration::from_secs(config.timeout_seconds);

	Ok(Box::new(UpsTokenProvider::new(config, timeout)?))
}

/// Registry for the UPS token provider.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "ups";
	type Factory = TokenFactory;

	fn factory() -> Self::Factory {
		create_token_provider
	}
}

impl TokenRegistry for Registry {}
