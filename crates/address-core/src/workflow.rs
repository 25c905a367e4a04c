//! The per-order validation run.
//!
//! A run loads the order, skips orders whose status is already settled,
//! settles non-US and manually verified orders without calling the carrier,
//! and otherwise asks the carrier. Every non-exempt run ends with exactly one
//! status write, including runs that fail.

use crate::state::WorkflowState;
use address_auth::{AuthError, TokenInterface};
use address_records::{RecordError, RecordService};
use address_types::{
	Address, AddressClassification, AddressError, AddressStatus, ValidationVerdict,
	US_COUNTRY_CODE,
};
use address_validation::{ValidationError, ValidationInterface};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Failures of a single run.
#[derive(Debug, Error)]
pub enum WorkflowError {
	#[error(transparent)]
	Records(#[from] RecordError),
	#[error(transparent)]
	Address(#[from] AddressError),
	#[error(transparent)]
	Auth(#[from] AuthError),
	#[error(transparent)]
	Validation(#[from] ValidationError),
}

impl WorkflowError {
	/// Returns true when the carrier had no candidate for the address.
	pub fn is_not_found(&self) -> bool {
		matches!(self, WorkflowError::Validation(ValidationError::NotFound))
	}

	/// Status written for a failed run.
	pub fn to_status(&self) -> AddressStatus {
		if self.is_not_found() {
			AddressStatus::NotFound
		} else {
			AddressStatus::Error(self.to_string())
		}
	}
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
	pub order_id: String,
	/// `Done` or `Errored`.
	pub state: WorkflowState,
	/// Status the run decided on; `None` for exempt orders.
	pub status: Option<AddressStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub classification: Option<AddressClassification>,
	/// Whether the status reached the record store.
	pub written: bool,
}

enum Decision {
	Exempt,
	Write {
		status: AddressStatus,
		classification: Option<AddressClassification>,
	},
}

pub struct ValidationWorkflow {
	token: Arc<dyn TokenInterface>,
	validator: Arc<dyn ValidationInterface>,
	records: Arc<RecordService>,
}

impl ValidationWorkflow {
	pub fn new(
		token: Arc<dyn TokenInterface>,
		validator: Arc<dyn ValidationInterface>,
		records: Arc<RecordService>,
	) -> Self {
		Self {
			token,
			validator,
			records,
		}
	}

	pub fn records(&self) -> &Arc<RecordService> {
		&self.records
	}

	/// Runs the workflow for one order. Failures are reported through the
	/// outcome and the written status, never returned.
	#[instrument(skip_all, fields(order_id = %order_id))]
	pub async fn run(&self, order_id: &str) -> WorkflowOutcome {
		let mut state = WorkflowState::Start;

		let decision = match self.decide(order_id, &mut state).await {
			Ok(decision) => decision,
			Err(e) => {
				tracing::error!(
					state = %state,
					error = %e,
					not_found = e.is_not_found(),
					"Address validation failed"
				);
				state.advance(WorkflowState::Errored);
				Decision::Write {
					status: e.to_status(),
					classification: None,
				}
			},
		};

		match decision {
			Decision::Exempt => {
				state.advance(WorkflowState::Done);
				WorkflowOutcome {
					order_id: order_id.to_string(),
					state,
					status: None,
					classification: None,
					written: false,
				}
			},
			Decision::Write {
				status,
				classification,
			} => self.finish(order_id, state, status, classification).await,
		}
	}

	async fn decide(
		&self,
		order_id: &str,
		state: &mut WorkflowState,
	) -> Result<Decision, WorkflowError> {
		let order = self.records.load_order(order_id).await?;
		state.advance(WorkflowState::ExemptCheck);

		if let Some(current) = order
			.address_status
			.as_deref()
			.filter(|s| AddressStatus::is_settled(s))
		{
			tracing::info!(status = %current, "Order already settled, skipping");
			return Ok(Decision::Exempt);
		}

		if !order.ships_to(US_COUNTRY_CODE) {
			tracing::info!(country = %order.ship_country, "Order ships outside the US");
			return Ok(Decision::Write {
				status: AddressStatus::OutsideUs,
				classification: None,
			});
		}

		if order.manually_verified {
			tracing::info!("Address verified manually");
			return Ok(Decision::Write {
				status: AddressStatus::VerifiedManually,
				classification: None,
			});
		}

		let address = Address::from_order(&order)?;

		let token = self.token.access_token().await?;
		state.advance(WorkflowState::TokenAcquired);

		let verdict = self.validator.validate(&address, &token).await?;
		state.advance(WorkflowState::Validated);

		Ok(match verdict {
			ValidationVerdict::Valid { classification } => {
				tracing::info!(classification = %classification, "Address verified");
				Decision::Write {
					status: AddressStatus::Verified,
					classification: Some(classification),
				}
			},
			ValidationVerdict::Invalid { error_message } => {
				tracing::info!(reason = %error_message, "Address rejected");
				Decision::Write {
					status: AddressStatus::Invalid(error_message),
					classification: None,
				}
			},
		})
	}

	async fn finish(
		&self,
		order_id: &str,
		mut state: WorkflowState,
		status: AddressStatus,
		classification: Option<AddressClassification>,
	) -> WorkflowOutcome {
		let written = match self.records.write_status(order_id, &status).await {
			Ok(()) => {
				if !state.is_final() {
					state.advance(WorkflowState::Written);
					state.advance(WorkflowState::Done);
				}
				true
			},
			Err(e) => {
				tracing::error!(status = %status, error = %e, "Failed to write address status");
				if !state.is_final() {
					state.advance(WorkflowState::Errored);
				}
				false
			},
		};

		tracing::info!(state = %state, status = %status, written, "Address validation finished");

		WorkflowOutcome {
			order_id: order_id.to_string(),
			state,
			status: Some(status),
			classification,
			written,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use address_records::implementations::memory::MemoryRecords;
	use address_records::RecordInterface;
	use address_types::{AccessToken, ConfigSchema, SalesOrder, Schema, ValidationError as SchemaError};
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	struct EmptySchema;

	impl ConfigSchema for EmptySchema {
		fn validate(&self, config: &toml::Value) -> Result<(), SchemaError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	type TokenResult = Box<dyn Fn() -> Result<AccessToken, AuthError> + Send + Sync>;
	type VerdictResult = Box<dyn Fn() -> Result<ValidationVerdict, ValidationError> + Send + Sync>;

	struct FakeToken {
		respond: TokenResult,
		calls: AtomicUsize,
	}

	#[async_trait]
	impl TokenInterface for FakeToken {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(EmptySchema)
		}

		async fn access_token(&self) -> Result<AccessToken, AuthError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			(self.respond)()
		}
	}

	struct FakeValidator {
		respond: VerdictResult,
		seen: Mutex<Vec<(Address, String)>>,
	}

	#[async_trait]
	impl ValidationInterface for FakeValidator {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(EmptySchema)
		}

		async fn validate(
			&self,
			address: &Address,
			token: &AccessToken,
		) -> Result<ValidationVerdict, ValidationError> {
			self.seen
				.lock()
				.unwrap()
				.push((address.clone(), token.expose_secret().to_string()));
			(self.respond)()
		}
	}

	struct Harness {
		workflow: ValidationWorkflow,
		token: Arc<FakeToken>,
		validator: Arc<FakeValidator>,
	}

	impl Harness {
		fn new(orders: Vec<SalesOrder>, token: TokenResult, verdict: VerdictResult) -> Self {
			Self::with_backend(Box::new(MemoryRecords::with_orders(orders)), token, verdict)
		}

		fn with_backend(
			backend: Box<dyn RecordInterface>,
			token: TokenResult,
			verdict: VerdictResult,
		) -> Self {
			let token = Arc::new(FakeToken {
				respond: token,
				calls: AtomicUsize::new(0),
			});
			let validator = Arc::new(FakeValidator {
				respond: verdict,
				seen: Mutex::new(Vec::new()),
			});
			let workflow = ValidationWorkflow::new(
				token.clone(),
				validator.clone(),
				Arc::new(RecordService::new(backend)),
			);
			Self {
				workflow,
				token,
				validator,
			}
		}

		fn token_calls(&self) -> usize {
			self.token.calls.load(Ordering::SeqCst)
		}

		fn validator_calls(&self) -> usize {
			self.validator.seen.lock().unwrap().len()
		}

		async fn stored_status(&self, order_id: &str) -> Option<String> {
			self.workflow
				.records()
				.load_order(order_id)
				.await
				.unwrap()
				.address_status
		}
	}

	fn us_order(zip: &str) -> SalesOrder {
		SalesOrder {
			id: "SO-1".to_string(),
			ship_country: "US".to_string(),
			ship_state: "GA".to_string(),
			ship_zip: zip.to_string(),
			ship_city: "Atlanta".to_string(),
			ship_address_lines: vec!["55 Glenlake Pkwy NE".to_string()],
			manually_verified: false,
			address_status: None,
		}
	}

	fn good_token() -> TokenResult {
		Box::new(|| Ok(AccessToken::new("tok")))
	}

	fn residential() -> VerdictResult {
		Box::new(|| {
			Ok(ValidationVerdict::Valid {
				classification: AddressClassification::Residential,
			})
		})
	}

	#[tokio::test]
	async fn test_settled_order_is_left_alone() {
		for settled in [
			"Verified Address",
			"Addresses out of the US are not validated",
			"Address verified manually",
		] {
			let mut order = us_order("30328");
			order.address_status = Some(settled.to_string());
			let harness = Harness::new(vec![order], good_token(), residential());

			let outcome = harness.workflow.run("SO-1").await;

			assert_eq!(outcome.state, WorkflowState::Done);
			assert_eq!(outcome.status, None);
			assert!(!outcome.written);
			assert_eq!(harness.token_calls(), 0);
			assert_eq!(harness.validator_calls(), 0);
			assert_eq!(harness.stored_status("SO-1").await.as_deref(), Some(settled));
		}
	}

	#[tokio::test]
	async fn test_non_us_order_skips_carrier() {
		let mut order = us_order("K1A 0B1");
		order.ship_country = "CA".to_string();
		let harness = Harness::new(vec![order], good_token(), residential());

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.status, Some(AddressStatus::OutsideUs));
		assert_eq!(outcome.state, WorkflowState::Done);
		assert!(outcome.written);
		assert_eq!(harness.token_calls(), 0);
		assert_eq!(harness.validator_calls(), 0);
		assert_eq!(
			harness.stored_status("SO-1").await.as_deref(),
			Some("Addresses out of the US are not validated")
		);
	}

	#[tokio::test]
	async fn test_manually_verified_order_skips_carrier() {
		let mut order = us_order("30328");
		order.manually_verified = true;
		let harness = Harness::new(vec![order], good_token(), residential());

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.status, Some(AddressStatus::VerifiedManually));
		assert_eq!(harness.validator_calls(), 0);
		assert_eq!(
			harness.stored_status("SO-1").await.as_deref(),
			Some("Address verified manually")
		);
	}

	#[tokio::test]
	async fn test_verified_residential_address() {
		let harness = Harness::new(vec![us_order("303281234")], good_token(), residential());

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(
			outcome,
			WorkflowOutcome {
				order_id: "SO-1".to_string(),
				state: WorkflowState::Done,
				status: Some(AddressStatus::Verified),
				classification: Some(AddressClassification::Residential),
				written: true,
			}
		);
		assert_eq!(harness.token_calls(), 1);

		let seen = harness.validator.seen.lock().unwrap();
		let (address, token) = &seen[0];
		assert_eq!(token, "tok");
		assert_eq!(address.postcode_primary_low, "30328");
		assert_eq!(address.postcode_extended_low.as_deref(), Some("1234"));
		drop(seen);

		assert_eq!(
			harness.stored_status("SO-1").await.as_deref(),
			Some("Verified Address")
		);
	}

	#[tokio::test]
	async fn test_mismatch_writes_invalid_status() {
		let harness = Harness::new(
			vec![us_order("30328")],
			good_token(),
			Box::new(|| {
				Ok(ValidationVerdict::Invalid {
					error_message: "Based on the address given City or Zip Code is incorrect. \
					                Expected: SANDY SPRINGS, 30328-3498"
						.to_string(),
				})
			}),
		);

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.state, WorkflowState::Done);
		assert_eq!(outcome.classification, None);
		let stored = harness.stored_status("SO-1").await.unwrap();
		assert!(stored.starts_with(
			"Invalid address: Based on the address given City or Zip Code is incorrect."
		));
		assert!(stored.contains("SANDY SPRINGS, 30328-3498"));
	}

	#[tokio::test]
	async fn test_not_found_writes_fixed_status() {
		let harness = Harness::new(
			vec![us_order("30328")],
			good_token(),
			Box::new(|| Err(ValidationError::NotFound)),
		);

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.state, WorkflowState::Errored);
		assert_eq!(outcome.status, Some(AddressStatus::NotFound));
		assert!(outcome.written);
		assert_eq!(
			harness.stored_status("SO-1").await.as_deref(),
			Some("Given Address was not found on UPS database.")
		);
	}

	#[tokio::test]
	async fn test_auth_failure_stops_before_validation() {
		let harness = Harness::new(
			vec![us_order("30328")],
			Box::new(|| Err(AuthError::Rejected("Invalid Authentication Information.".to_string()))),
			residential(),
		);

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.state, WorkflowState::Errored);
		assert_eq!(harness.validator_calls(), 0);
		assert_eq!(
			harness.stored_status("SO-1").await.as_deref(),
			Some(
				"ERROR ON THE ADDRESS VERIFICATION: Error obtaining UPS access token: \
				 Invalid Authentication Information."
			)
		);
	}

	#[tokio::test]
	async fn test_transport_failure_writes_error_status() {
		let harness = Harness::new(
			vec![us_order("30328")],
			good_token(),
			Box::new(|| Err(ValidationError::Transport("request timed out".to_string()))),
		);

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(
			outcome.status,
			Some(AddressStatus::Error(
				"Validation request failed: request timed out".to_string()
			))
		);
		assert!(outcome.written);
	}

	#[tokio::test]
	async fn test_short_postal_code_fails_without_outbound_calls() {
		let harness = Harness::new(vec![us_order("303")], good_token(), residential());

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.state, WorkflowState::Errored);
		assert_eq!(harness.token_calls(), 0);
		assert_eq!(harness.validator_calls(), 0);
		let stored = harness.stored_status("SO-1").await.unwrap();
		assert!(stored.starts_with("ERROR ON THE ADDRESS VERIFICATION: "));
	}

	#[tokio::test]
	async fn test_previous_failure_is_revalidated() {
		let mut order = us_order("30328");
		order.address_status = Some("Given Address was not found on UPS database.".to_string());
		let harness = Harness::new(vec![order], good_token(), residential());

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.status, Some(AddressStatus::Verified));
		assert_eq!(harness.validator_calls(), 1);
	}

	#[tokio::test]
	async fn test_unknown_order_reports_unwritten_error() {
		let harness = Harness::new(vec![], good_token(), residential());

		let outcome = harness.workflow.run("missing").await;

		assert_eq!(outcome.state, WorkflowState::Errored);
		assert!(!outcome.written);
		assert_eq!(harness.token_calls(), 0);
	}

	struct ReadOnlyRecords(MemoryRecords);

	#[async_trait]
	impl RecordInterface for ReadOnlyRecords {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(EmptySchema)
		}

		async fn load_order(&self, order_id: &str) -> Result<SalesOrder, RecordError> {
			self.0.load_order(order_id).await
		}

		async fn submit_status(&self, _order_id: &str, _value: &str) -> Result<(), RecordError> {
			Err(RecordError::Backend("record is locked".to_string()))
		}
	}

	#[tokio::test]
	async fn test_failed_write_is_reported() {
		let harness = Harness::with_backend(
			Box::new(ReadOnlyRecords(MemoryRecords::with_orders(vec![us_order("30328")]))),
			good_token(),
			residential(),
		);

		let outcome = harness.workflow.run("SO-1").await;

		assert_eq!(outcome.state, WorkflowState::Errored);
		assert_eq!(outcome.status, Some(AddressStatus::Verified));
		assert!(!outcome.written);
	}

	#[test]
	fn test_outcome_json() {
		let outcome = WorkflowOutcome {
			order_id: "SO-1".to_string(),
			state: WorkflowState::Done,
			status: Some(AddressStatus::Verified),
			classification: Some(AddressClassification::Commercial),
			written: true,
		};
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["state"], "done");
		assert_eq!(json["status"]["kind"], "verified");
		assert_eq!(json["written"], true);
	}
}
