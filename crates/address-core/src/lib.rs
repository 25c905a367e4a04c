//! Core workflow for the address validation service.
//!
//! Ties the token provider, the address validator and the order record store
//! together into one run per submitted order, and builds that run from
//! configuration.

pub mod builder;
pub mod state;
pub mod workflow;

pub use builder::{BuilderError, WorkflowBuilder, WorkflowFactories};
pub use state::WorkflowState;
pub use workflow::{ValidationWorkflow, WorkflowError, WorkflowOutcome};
