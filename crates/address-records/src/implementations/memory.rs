//! In-memory order records.
//!
//! Useful for tests and demos. Orders can be seeded from configuration:
//!
//! ```toml
//! [[records.implementations.memory.orders]]
//! id = "1001"
//! ship_country = "US"
//! ship_zip = "10118"
//! ```

use crate::{RecordError, RecordFactory, RecordInterface, RecordRegistry};
use address_types::{
	non_empty_string, ConfigSchema, Field, FieldType, ImplementationRegistry, SalesOrder, Schema,
	ValidationError,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Order records held in a map, lost on restart.
pub struct MemoryRecords {
	orders: Arc<RwLock<HashMap<String, SalesOrder>>>,
}

impl MemoryRecords {
	pub fn new() -> Self {
		Self {
			orders: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Creates a store holding `orders`, keyed by their id.
	pub fn with_orders(orders: impl IntoIterator<Item = SalesOrder>) -> Self {
		let orders = orders
			.into_iter()
			.map(|order| (order.id.clone(), order))
			.collect();
		Self {
			orders: Arc::new(RwLock::new(orders)),
		}
	}
}

impl Default for MemoryRecords {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl RecordInterface for MemoryRecords {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryRecordsSchema)
	}

	async fn load_order(&self, order_id: &str) -> Result<SalesOrder, RecordError> {
		let orders = self.orders.read().await;
		orders
			.get(order_id)
			.cloned()
			.ok_or_else(|| RecordError::NotFound(order_id.to_string()))
	}

	async fn submit_status(&self, order_id: &str, value: &str) -> Result<(), RecordError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(order_id)
			.ok_or_else(|| RecordError::NotFound(order_id.to_string()))?;
		order.address_status = Some(value.to_string());
		Ok(())
	}
}

/// Configuration schema for MemoryRecords.
pub struct MemoryRecordsSchema;

impl ConfigSchema for MemoryRecordsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let order = Schema::new(
			vec![
				Field::new("id", FieldType::String).with_validator(non_empty_string),
				Field::new("ship_country", FieldType::String),
			],
			vec![
				Field::new("ship_state", FieldType::String),
				Field::new("ship_zip", FieldType::String),
				Field::new("ship_city", FieldType::String),
				Field::new(
					"ship_address_lines",
					FieldType::Array(Box::new(FieldType::String)),
				),
				Field::new("manually_verified", FieldType::Boolean),
				Field::new("address_status", FieldType::String),
			],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"orders",
				FieldType::Array(Box::new(FieldType::Table(order))),
			)],
		);
		schema.validate(config)
	}
}

#[derive(Debug, Default, Deserialize)]
struct MemoryRecordsConfig {
	#[serde(default)]
	orders: Vec<SalesOrder>,
}

/// Creates the memory backend, seeding it with any configured `orders`.
pub fn create_records(config: &toml::Value) -> Result<Box<dyn RecordInterface>, RecordError> {
	MemoryRecordsSchema
		.validate(config)
		.map_err(|e| RecordError::Configuration(format!("Invalid configuration: {}", e)))?;

	let config: MemoryRecordsConfig = config
		.clone()
		.try_into()
		.map_err(|e| RecordError::Configuration(format!("Invalid memory records config: {}", e)))?;

	tracing::debug!(orders = config.orders.len(), "Seeded memory records");
	Ok(Box::new(MemoryRecords::with_orders(config.orders)))
}

/// Registry for the memory backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = RecordFactory;

	fn factory() -> Self::Factory {
		create_records
	}
}

impl RecordRegistry for Registry {}
