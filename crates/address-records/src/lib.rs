//! Order record module for the address validation service.
//!
//! Reads the shipping fields of a sales order from the host record store and
//! writes the address status field back. Backends are pluggable the same way
//! the carrier clients are; the workflow only ever talks to [`RecordService`].

use address_types::{AddressStatus, ConfigSchema, ImplementationRegistry, SalesOrder};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur while reading or updating order records.
#[derive(Debug, Error)]
pub enum RecordError {
	/// No order with the given id exists.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// A stored record could not be encoded or decoded.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the record backend.
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait implemented by order record backends.
#[async_trait]
pub trait RecordInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Loads the order with the given id.
	async fn load_order(&self, order_id: &str) -> Result<SalesOrder, RecordError>;

	/// Sets the address status field of an existing order. No other field
	/// may change.
	async fn submit_status(&self, order_id: &str, value: &str) -> Result<(), RecordError>;
}

/// Factory signature every record backend exposes.
pub type RecordFactory = fn(&toml::Value) -> Result<Box<dyn RecordInterface>, RecordError>;

pub trait RecordRegistry: ImplementationRegistry<Factory = RecordFactory> {}

/// Returns every available record backend as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, RecordFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed access to the order record store.
pub struct RecordService {
	backend: Box<dyn RecordInterface>,
}

impl RecordService {
	pub fn new(backend: Box<dyn RecordInterface>) -> Self {
		Self { backend }
	}

	/// Loads an order by id.
	pub async fn load_order(&self, order_id: &str) -> Result<SalesOrder, RecordError> {
		self.backend.load_order(order_id).await
	}

	/// Writes `status` into the order's address status field.
	pub async fn write_status(
		&self,
		order_id: &str,
		status: &AddressStatus,
	) -> Result<(), RecordError> {
		let value = status.to_field_value();
		tracing::debug!(order_id = %order_id, value = %value, "Writing address status");
		self.backend.submit_status(order_id, &value).await
	}
}
