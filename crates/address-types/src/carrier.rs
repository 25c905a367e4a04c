//! Carrier fault payloads.
//!
//! Both carrier endpoints report failures as
//! `{"response":{"errors":[{"code":"...","message":"..."}]}}`.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarrierFault {
	#[serde(default)]
	pub response: Option<FaultBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultBody {
	#[serde(default)]
	pub errors: Vec<FaultDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaultDetail {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub message: Option<String>,
}

impl CarrierFault {
	/// Joins the reported errors as `code: message; ...`, if there are any.
	pub fn summary(&self) -> Option<String> {
		let errors = &self.response.as_ref()?.errors;
		let parts: Vec<String> = errors
			.iter()
			.filter_map(|e| match (e.code.as_deref(), e.message.as_deref()) {
				(Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
				(None, Some(message)) => Some(message.to_string()),
				(Some(code), None) => Some(code.to_string()),
				(None, None) => None,
			})
			.collect();
		if parts.is_empty() {
			None
		} else {
			Some(parts.join("; "))
		}
	}

	/// Parses a response body, returning the summary when it is a fault.
	pub fn summarize_body(body: &str) -> Option<String> {
		serde_json::from_str::<CarrierFault>(body)
			.ok()
			.and_then(|fault| fault.summary())
	}
}

/// Shortens a response body for inclusion in an error message.
pub fn truncate_body(body: &str) -> String {
	const MAX_LEN: usize = 256;
	let body = body.trim();
	match body.char_indices().nth(MAX_LEN) {
		Some((idx, _)) => format!("{}...", &body[..idx]),
		None => body.to_string(),
	}
}
