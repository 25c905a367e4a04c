//! Factory registry for the configurable components.
//!
//! Collects every implementation the component crates export and builds the
//! workflow from whichever ones the configuration selects.

use address_auth::TokenFactory;
use address_config::{ComponentConfig, Config};
use address_core::{ValidationWorkflow, WorkflowBuilder, WorkflowFactories};
use address_records::RecordFactory;
use address_validation::ValidationFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every known implementation, by component.
pub struct FactoryRegistry {
	pub auth: HashMap<String, TokenFactory>,
	pub validation: HashMap<String, ValidationFactory>,
	pub records: HashMap<String, RecordFactory>,
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry {
			auth: HashMap::new(),
			validation: HashMap::new(),
			records: HashMap::new(),
		};

		for (name, factory) in address_auth::get_all_implementations() {
			tracing::debug!("Registering auth implementation: {}", name);
			registry.auth.insert(name.to_string(), factory);
		}

		for (name, factory) in address_validation::get_all_implementations() {
			tracing::debug!("Registering validation implementation: {}", name);
			registry.validation.insert(name.to_string(), factory);
		}

		for (name, factory) in address_records::get_all_implementations() {
			tracing::debug!("Registering records implementation: {}", name);
			registry.records.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Picks the factories the section configures, failing on unknown names.
fn select<F: Copy>(
	available: &HashMap<String, F>,
	section: &ComponentConfig,
	component: &str,
) -> Result<HashMap<String, F>, String> {
	let mut factories = HashMap::new();
	for name in section.implementations.keys() {
		match available.get(name) {
			Some(factory) => {
				factories.insert(name.clone(), *factory);
			},
			None => {
				let mut known: Vec<_> = available.keys().cloned().collect();
				known.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					component,
					name,
					known.join(", ")
				));
			},
		}
	}
	Ok(factories)
}

/// Builds the workflow from configuration.
pub fn build_workflow_from_config(
	config: Config,
) -> Result<ValidationWorkflow, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = WorkflowFactories {
		token_factories: select(&registry.auth, &config.auth, "auth")?,
		validation_factories: select(&registry.validation, &config.validation, "validation")?,
		record_factories: select(&registry.records, &config.records, "records")?,
	};

	Ok(WorkflowBuilder::new(config).build(factories)?)
}
