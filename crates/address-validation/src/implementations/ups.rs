//! UPS address validation client.
//!
//! Calls the street-level validation with classification request option
//! (`/api/addressvalidation/v1/3`) asking for a single candidate.

use crate::xav::{interpret_response, XavRequest};
use crate::{ValidationError, ValidationFactory, ValidationInterface, ValidationRegistry};
use address_types::{
	http_url, truncate_body, AccessToken, Address, CarrierFault, ConfigSchema, Field, FieldType,
	ImplementationRegistry, Schema, ValidationError as SchemaError, ValidationVerdict,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::time::Duration;

/// Default UPS API host.
pub const DEFAULT_BASE_URL: &str = "https://onlinetools.ups.com";

const API_VERSION: &str = "v1";
/// Address validation plus classification.
const REQUEST_OPTION: &str = "3";
const QUERY: &str = "regionalrequestindicator=false&maximumcandidatelistsize=1";

/// Configuration of the UPS address validator.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsValidationConfig {
	#[serde(default = "default_base_url")]
	pub base_url: String,
	/// Upper bound on the whole validation request.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

impl Default for UpsValidationConfig {
	fn default() -> Self {
		Self {
			base_url: default_base_url(),
			timeout_seconds: default_timeout_seconds(),
		}
	}
}

fn default_base_url() -> String {
	DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
	10
}

pub struct UpsAddressValidator {
	client: reqwest::Client,
	endpoint: String,
}

impl UpsAddressValidator {
	/// Creates a validator whose requests give up after `timeout`.
	pub fn new(config: UpsValidationConfig, timeout: Duration) -> Result<Self, ValidationError> {
		let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
			ValidationError::Configuration(format!("Failed to create HTTP client: {}", e))
		})?;

		Ok(Self {
			client,
			endpoint: endpoint_url(&config.base_url),
		})
	}
}

fn endpoint_url(base_url: &str) -> String {
	format!(
		"{}/api/addressvalidation/{}/{}?{}",
		base_url.trim_end_matches('/'),
		API_VERSION,
		REQUEST_OPTION,
		QUERY
	)
}

#[async_trait]
impl ValidationInterface for UpsAddressValidator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(UpsValidationSchema)
	}

	async fn validate(
		&self,
		address: &Address,
		token: &AccessToken,
	) -> Result<ValidationVerdict, ValidationError> {
		tracing::debug!(
			city = %address.political_division2,
			postcode = %address.postcode_primary_low,
			"Sending UPS address validation request"
		);

		let response = self
			.client
			.post(&self.endpoint)
			.header(AUTHORIZATION, token.bearer_header())
			.json(&XavRequest::new(address))
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					ValidationError::Transport(format!("request to {} timed out", self.endpoint))
				} else {
					ValidationError::Transport(e.to_string())
				}
			})?;

		let status = response.status();
		let body = response.text().await.map_err(|e| {
			ValidationError::Transport(format!("Failed to read validation response: {}", e))
		})?;

		if !status.is_success() {
			let message = CarrierFault::summarize_body(&body).unwrap_or_else(|| truncate_body(&body));
			tracing::warn!(status = %status, error = %message, "UPS validation endpoint returned an error status");
			return Err(ValidationError::Http {
				status: status.as_u16(),
				message,
			});
		}

		let verdict = interpret_response(address, &body)?;
		tracing::debug!(valid = verdict.is_valid(), "Interpreted UPS validation response");
		Ok(verdict)
	}
}

/// Configuration schema for the UPS address validator.
pub struct UpsValidationSchema;

impl ConfigSchema for UpsValidationSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("base_url", FieldType::String).with_validator(http_url),
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

/// Creates the UPS validator from its `[validation.implementations.ups]` table.
pub fn create_validator(
	config: &toml::Value,
) -> Result<Box<dyn ValidationInterface>, ValidationError> {
	UpsValidationSchema
		.validate(config)
		.map_err(|e| ValidationError::Configuration(format!("Invalid configuration: {}", e)))?;

	let config: UpsValidationConfig = config.clone().try_into().map_err(|e| {
		ValidationError::Configuration(format!("Invalid UPS validation config: {}", e))
	})?;
	let timeout = Duration::from_secs(config.timeout_seconds);

	Ok(Box::new(UpsAddressValidator::new(config, timeout)?))
}

/// Registry for the UPS address validator.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "ups";
	type Factory = ValidationFactory;

	fn factory() -> Self::Factory {
		create_validator
	}
}

impl ValidationRegistry for Registry {}
