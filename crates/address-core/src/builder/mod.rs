//! Builder for constructing the validation workflow.
//!
//! Each component section of the configuration names a `primary`
//! implementation; the builder looks its factory up by name, hands it the
//! matching `implementations.<name>` table and wires the results together.

use crate::workflow::ValidationWorkflow;
use address_auth::{AuthError, TokenInterface};
use address_config::{ComponentConfig, Config};
use address_records::{RecordError, RecordInterface, RecordService};
use address_validation::{ValidationError, ValidationInterface};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building the workflow.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every component, keyed by implementation name.
pub struct WorkflowFactories<TF, VF, RF> {
	pub token_factories: HashMap<String, TF>,
	pub validation_factories: HashMap<String, VF>,
	pub record_factories: HashMap<String, RF>,
}

pub struct WorkflowBuilder {
	config: Config,
}

impl WorkflowBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the workflow from the primary implementation of each component.
	pub fn build<TF, VF, RF>(
		self,
		factories: WorkflowFactories<TF, VF, RF>,
	) -> Result<ValidationWorkflow, BuilderError>
	where
		TF: Fn(&toml::Value) -> Result<Box<dyn TokenInterface>, AuthError>,
		VF: Fn(&toml::Value) -> Result<Box<dyn ValidationInterface>, ValidationError>,
		RF: Fn(&toml::Value) -> Result<Box<dyn RecordInterface>, RecordError>,
	{
		let records = load_primary("records", &self.config.records, &factories.record_factories)?;
		let token = load_primary("auth", &self.config.auth, &factories.token_factories)?;
		let validator = load_primary(
			"validation",
			&self.config.validation,
			&factories.validation_factories,
		)?;

		tracing::info!(service = %self.config.service.id, "Workflow ready");

		Ok(ValidationWorkflow::new(
			Arc::from(token),
			Arc::from(validator),
			Arc::new(RecordService::new(records)),
		))
	}
}

fn load_primary<T, E, F>(
	component: &str,
	section: &ComponentConfig,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	T: ?Sized,
	E: Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let name = &section.primary;

	for other in section.implementations.keys().filter(|n| *n != name) {
		tracing::debug!(component, implementation = %other, "Skipping non-primary implementation");
	}

	let factory = factories.get(name).ok_or_else(|| {
		BuilderError::MissingComponent(format!("{} implementation '{}'", component, name))
	})?;
	let config = section.primary_config().ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' not found in implementations",
			component, name
		))
	})?;

	match factory(config) {
		Ok(implementation) => {
			tracing::info!(component, implementation = %name, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component,
				implementation = %name,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, name, e
			)))
		},
	}
}
