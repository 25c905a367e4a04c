//! File-backed order records.
//!
//! Each order is one JSON document named `<id>.json` under `storage_path`.
//! Status updates rewrite the document through a temp file and a rename, and
//! leave every other key of the document untouched, including keys this
//! service does not know about.

use crate::{RecordError, RecordFactory, RecordInterface, RecordRegistry};
use address_types::{
	non_empty_string, ConfigSchema, Field, FieldType, ImplementationRegistry, SalesOrder, Schema,
	ValidationError,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/orders";
const STATUS_KEY: &str = "address_status";

/// Distinguishes temp files of concurrent writes within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct FileRecords {
	base_path: PathBuf,
}

impl FileRecords {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn order_path(&self, order_id: &str) -> PathBuf {
		let safe_id = order_id.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_id))
	}

	async fn read_document(&self, order_id: &str) -> Result<Vec<u8>, RecordError> {
		match fs::read(self.order_path(order_id)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(RecordError::NotFound(order_id.to_string()))
			},
			Err(e) => Err(RecordError::Backend(e.to_string())),
		}
	}
}

#[async_trait]
impl RecordInterface for FileRecords {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileRecordsSchema)
	}

	async fn load_order(&self, order_id: &str) -> Result<SalesOrder, RecordError> {
		let data = self.read_document(order_id).await?;
		serde_json::from_slice(&data).map_err(|e| RecordError::Serialization(e.to_string()))
	}

	async fn submit_status(&self, order_id: &str, value: &str) -> Result<(), RecordError> {
		let data = self.read_document(order_id).await?;
		let mut document: serde_json::Value =
			serde_json::from_slice(&data).map_err(|e| RecordError::Serialization(e.to_string()))?;

		let fields = document.as_object_mut().ok_or_else(|| {
			RecordError::Serialization(format!("order {} is not a JSON object", order_id))
		})?;
		fields.insert(
			STATUS_KEY.to_string(),
			serde_json::Value::String(value.to_string()),
		);

		let bytes = serde_json::to_vec_pretty(&document)
			.map_err(|e| RecordError::Serialization(e.to_string()))?;

		let path = self.order_path(order_id);
		let temp_path = path.with_extension(format!(
			"{}.{}.tmp",
			std::process::id(),
			TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
		));
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| RecordError::Backend(e.to_string()))?;
		if let Err(e) = fs::rename(&temp_path, &path).await {
			let _ = fs::remove_file(&temp_path).await;
			return Err(RecordError::Backend(e.to_string()));
		}

		Ok(())
	}
}

/// Configuration schema for FileRecords.
pub struct FileRecordsSchema;

impl ConfigSchema for FileRecordsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(non_empty_string)],
		);
		schema.validate(config)
	}
}

/// Creates the file backend.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the order documents (default: "./data/orders")
pub fn create_records(config: &toml::Value) -> Result<Box<dyn RecordInterface>, RecordError> {
	FileRecordsSchema
		.validate(config)
		.map_err(|e| RecordError::Configuration(format!("Invalid configuration: {}", e)))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileRecords::new(PathBuf::from(storage_path))))
}

/// Registry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = RecordFactory;

	fn factory() -> Self::Factory {
		create_records
	}
}

impl RecordRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn write_order(dir: &TempDir, name: &str, json: serde_json::Value) {
		std::fs::write(
			dir.path().join(name),
			serde_json::to_vec(&json).unwrap(),
		)
		.unwrap();
	}

	#[tokio::test]
	async fn test_load_order() {
		let dir = TempDir::new().unwrap();
		write_order(
			&dir,
			"1001.json",
			serde_json::json!({
				"id": "1001",
				"ship_country": "US",
				"ship_state": "NY",
				"ship_zip": "10118",
				"ship_city": "New York",
				"ship_address_lines": ["350 5th Ave", "Floor 20"]
			}),
		);

		let records = FileRecords::new(dir.path().to_path_buf());
		let order = records.load_order("1001").await.unwrap();
		assert_eq!(order.ship_address_lines.len(), 2);
		assert_eq!(order.address_status, None);
		assert!(!order.manually_verified);
	}

	#[tokio::test]
	async fn test_status_update_rewrites_only_status() {
		let dir = TempDir::new().unwrap();
		write_order(
			&dir,
			"A_7.json",
			serde_json::json!({
				"id": "A/7",
				"ship_country": "US",
				"ship_zip": "30328",
				"salesrep": "Jane",
				"address_status": "Given Address was not found on UPS database."
			}),
		);

		let records = FileRecords::new(dir.path().to_path_buf());
		records.submit_status("A/7", "Verified Address").await.unwrap();

		let raw: serde_json::Value =
			serde_json::from_slice(&std::fs::read(dir.path().join("A_7.json")).unwrap()).unwrap();
		assert_eq!(raw["address_status"], "Verified Address");
		assert_eq!(raw["salesrep"], "Jane");
		assert_eq!(raw["ship_zip"], "30328");
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[tokio::test]
	async fn test_concurrent_updates_do_not_share_temp_file() {
		let dir = TempDir::new().unwrap();
		write_order(
			&dir,
			"SO-9.json",
			serde_json::json!({"id": "SO-9", "ship_country": "US"}),
		);
		let records = FileRecords::new(dir.path().to_path_buf());

		for _ in 0..20 {
			let (first, second) = tokio::join!(
				records.submit_status("SO-9", "Verified Address"),
				records.submit_status("SO-9", "Address verified manually"),
			);
			first.unwrap();
			second.unwrap();
		}

		let stored = records.load_order("SO-9").await.unwrap();
		assert!(matches!(
			stored.address_status.as_deref(),
			Some("Verified Address") | Some("Address verified manually")
		));
		let names: Vec<_> = std::fs::read_dir(dir.path())
			.unwrap()
			.map(|entry| entry.unwrap().file_name())
			.collect();
		assert_eq!(names, vec![std::ffi::OsString::from("SO-9.json")]);
	}

	#[tokio::test]
	async fn test_missing_and_corrupt_documents() {
		let dir = TempDir::new().unwrap();
		std::fs::write(dir.path().join("bad.json"), b"not json").unwrap();

		let records = FileRecords::new(dir.path().to_path_buf());
		assert!(matches!(
			records.load_order("absent").await,
			Err(RecordError::NotFound(_))
		));
		assert!(matches!(
			records.submit_status("absent", "x").await,
			Err(RecordError::NotFound(_))
		));
		assert!(matches!(
			records.load_order("bad").await,
			Err(RecordError::Serialization(_))
		));
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str("storage_path = 5").unwrap();
		assert!(matches!(
			create_records(&config),
			Err(RecordError::Configuration(_))
		));

		let empty = toml::Value::Table(toml::map::Map::new());
		assert!(create_records(&empty).is_ok());
	}
}
