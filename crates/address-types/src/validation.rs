//! Configuration validation for implementation tables.
//!
//! Every backend declares a [`Schema`] describing its TOML table. Factories
//! validate their table against it before constructing anything, so bad
//! configuration fails at startup instead of on the first order.

use thiserror::Error;

/// Errors produced while validating an implementation table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with inclusive bounds.
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
	Array(Box<FieldType>),
	Table(Schema),
}

/// Extra check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, path: &str, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(path, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: path.to_string(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a table, reporting nested field paths as `outer.inner`.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		self.validate_at("", config)
	}

	fn validate_at(&self, prefix: &str, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: if prefix.is_empty() { "root".to_string() } else { prefix.to_string() },
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		let path_of = |name: &str| {
			if prefix.is_empty() {
				name.to_string()
			} else {
				format!("{}.{}", prefix, name)
			}
		};

		for field in &self.required {
			let path = path_of(&field.name);
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(path.clone()))?;
			field.check(&path, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(&path_of(&field.name), value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	path: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: path.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch("string"))?;
		},
		FieldType::Boolean => {
			value.as_bool().ok_or_else(|| mismatch("boolean"))?;
		},
		FieldType::Integer { min, max } => {
			let n = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min) = min.filter(|min| n < *min) {
				return Err(ValidationError::InvalidValue {
					field: path.to_string(),
					message: format!("Value {} is less than minimum {}", n, min),
				});
			}
			if let Some(max) = max.filter(|max| n > *max) {
				return Err(ValidationError::InvalidValue {
					field: path.to_string(),
					message: format!("Value {} is greater than maximum {}", n, max),
				});
			}
		},
		FieldType::Array(inner) => {
			let items = value.as_array().ok_or_else(|| mismatch("array"))?;
			for (i, item) in items.iter().enumerate() {
				check_type(&format!("{}[{}]", path, i), item, inner)?;
			}
		},
		FieldType::Table(schema) => schema.validate_at(path, value)?,
	}

	Ok(())
}

/// A configuration schema attached to an implementation.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

/// Rejects blank strings.
pub fn non_empty_string(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some(s) if !s.trim().is_empty() => Ok(()),
		_ => Err("must not be empty".to_string()),
	}
}

/// Accepts `http://` and `https://` URLs only.
pub fn http_url(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some(s) if s.starts_with("https://") || s.starts_with("http://") => Ok(()),
		_ => Err("must be an http(s) URL".to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("username", FieldType::String).with_validator(non_empty_string)],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new("token_url", FieldType::String).with_validator(http_url),
				Field::new(
					"seed",
					FieldType::Table(Schema::new(
						vec![Field::new("enabled", FieldType::Boolean)],
						vec![],
					)),
				),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value = toml::from_str(
			r#"
username = "svc"
timeout_seconds = 10
token_url = "https://example.test/token"
"#,
		)
		.unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_blank_required_field() {
		let config: toml::Value = toml::from_str("timeout_seconds = 10").unwrap();
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::MissingField("username".to_string()))
		);

		let config: toml::Value = toml::from_str("username = \"  \"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "username"
		));
	}

	#[test]
	fn test_bounds_and_types() {
		let config: toml::Value =
			toml::from_str("username = \"svc\"\ntimeout_seconds = 0").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "timeout_seconds"
		));

		let config: toml::Value =
			toml::from_str("username = \"svc\"\ntimeout_seconds = \"ten\"").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { expected, .. }) if expected == "integer"
		));
	}

	#[test]
	fn test_nested_table_paths() {
		let config: toml::Value =
			toml::from_str("username = \"svc\"\n[seed]\nenabled = 1").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch { field, .. }) if field == "seed.enabled"
		));
	}
}
