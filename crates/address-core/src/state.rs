//! Workflow state machine.
//!
//! A run moves `Start -> ExemptCheck -> TokenAcquired -> Validated -> Written
//! -> Done`. Exempt orders go straight from `ExemptCheck` to `Done`; orders
//! settled without a carrier call go from `ExemptCheck` to `Written`.
//! `Errored` can be entered from any non-final state and is absorbing.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
	Start,
	ExemptCheck,
	TokenAcquired,
	Validated,
	Written,
	Done,
	Errored,
}

impl WorkflowState {
	/// Checks if moving to `next` is allowed.
	pub fn can_transition_to(self, next: WorkflowState) -> bool {
		use WorkflowState::*;

		match (self, next) {
			(Done | Errored, _) => false,
			(_, Errored) => true,
			(Start, ExemptCheck) => true,
			(ExemptCheck, Done | Written | TokenAcquired) => true,
			(TokenAcquired, Validated) => true,
			(Validated, Written) => true,
			(Written, Done) => true,
			_ => false,
		}
	}

	/// Moves to `next`, logging transitions the table does not allow.
	pub fn advance(&mut self, next: WorkflowState) {
		if !self.can_transition_to(next) {
			tracing::warn!(from = %self, to = %next, "Unexpected workflow transition");
		}
		tracing::trace!(from = %self, to = %next, "Workflow transition");
		*self = next;
	}

	/// Returns true for `Done` and `Errored`.
	pub fn is_final(self) -> bool {
		matches!(self, WorkflowState::Done | WorkflowState::Errored)
	}
}

impl fmt::Display for WorkflowState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			WorkflowState::Start => "start",
			WorkflowState::ExemptCheck => "exempt_check",
			WorkflowState::TokenAcquired => "token_acquired",
			WorkflowState::Validated => "validated",
			WorkflowState::Written => "written",
			WorkflowState::Done => "done",
			WorkflowState::Errored => "errored",
		};
		f.write_str(name)
	}
}
