//! Validation verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier delivery point classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressClassification {
	Residential,
	Commercial,
	Unknown,
}

impl AddressClassification {
	/// Maps a carrier classification code (`"1"` commercial, `"2"` residential).
	pub fn from_code(code: Option<&str>) -> Self {
		match code.map(str::trim) {
			Some("2") => Self::Residential,
			Some("1") => Self::Commercial,
			_ => Self::Unknown,
		}
	}
}

impl fmt::Display for AddressClassification {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Residential => write!(f, "Residential"),
			Self::Commercial => write!(f, "Commercial"),
			Self::Unknown => write!(f, "Unknown"),
		}
	}
}

/// Outcome of comparing the carrier candidate with the submitted address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ValidationVerdict {
	Valid {
		classification: AddressClassification,
	},
	Invalid {
		error_message: String,
	},
}

impl ValidationVerdict {
	pub fn is_valid(&self) -> bool {
		matches!(self, Self::Valid { .. })
	}

	/// Classification, present only for valid verdicts.
	pub fn classification(&self) -> Option<AddressClassification> {
		match self {
			Self::Valid { classification } => Some(*classification),
			Self::Invalid { .. } => None,
		}
	}

	pub fn error_message(&self) -> Option<&str> {
		match self {
			Self::Valid { .. } => None,
			Self::Invalid { error_message } => Some(error_message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classification_codes() {
		assert_eq!(
			AddressClassification::from_code(Some("2")),
			AddressClassification::Residential
		);
		assert_eq!(
			AddressClassification::from_code(Some("1")),
			AddressClassification::Commercial
		);
		assert_eq!(
			AddressClassification::from_code(Some("0")),
			AddressClassification::Unknown
		);
		assert_eq!(
			AddressClassification::from_code(None),
			AddressClassification::Unknown
		);
	}

	#[test]
	fn test_verdict_accessors() {
		let valid = ValidationVerdict::Valid {
			classification: AddressClassification::Commercial,
		};
		assert!(valid.is_valid());
		assert_eq!(valid.classification(), Some(AddressClassification::Commercial));
		assert_eq!(valid.error_message(), None);

		let invalid = ValidationVerdict::Invalid {
			error_message: "wrong city".to_string(),
		};
		assert!(!invalid.is_valid());
		assert_eq!(invalid.classification(), None);
		assert_eq!(invalid.error_message(), Some("wrong city"));
	}
}
