//! HTTP server for order-submitted events.
//!
//! The host platform posts `{"order_id": "..."}` when a sales order is
//! submitted. Each event is one independent workflow run; the response
//! carries the run's outcome.

use address_config::ApiConfig;
use address_core::{ValidationWorkflow, WorkflowOutcome};
use axum::{
	extract::{rejection::JsonRejection, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub workflow: Arc<ValidationWorkflow>,
}

/// Body of an order-submitted event.
#[derive(Debug, Deserialize)]
pub struct OrderSubmitted {
	pub order_id: String,
}

/// Builds the router. `timeout` bounds each request.
pub fn router(workflow: Arc<ValidationWorkflow>, timeout: Duration) -> Router {
	Router::new()
		.route("/health", get(handle_health))
		.nest(
			"/api",
			Router::new().route("/events/order-submitted", post(handle_order_submitted)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(timeout))
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { workflow })
}

/// Starts the HTTP server and runs until it fails.
pub async fn start_server(
	api_config: ApiConfig,
	workflow: Arc<ValidationWorkflow>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(workflow, Duration::from_secs(api_config.timeout_seconds));

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Address validation API listening on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

async fn handle_health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

/// Handles POST /api/events/order-submitted.
///
/// Negative outcomes still answer 200: the status field has been written and
/// the host has nothing to retry. If the request times out first, the run
/// still completes and writes its status.
async fn handle_order_submitted(
	State(state): State<AppState>,
	payload: Result<Json<OrderSubmitted>, JsonRejection>,
) -> Result<Json<WorkflowOutcome>, Response> {
	let Json(event) = payload.map_err(|rejection| {
		tracing::warn!(error = %rejection.body_text(), "Rejected order-submitted event");
		bad_request(rejection.body_text())
	})?;

	let order_id = event.order_id.trim();
	if order_id.is_empty() {
		return Err(bad_request("order_id must not be empty".to_string()));
	}

	// Detached from the request so a timed out or dropped request cannot stop
	// the run before its status write.
	let workflow = Arc::clone(&state.workflow);
	let order_id = order_id.to_string();
	let run = tokio::spawn(async move { workflow.run(&order_id).await });

	run.await.map(Json).map_err(|e| {
		tracing::error!(error = %e, "Workflow task failed");
		(
			StatusCode::INTERNAL_SERVER_ERROR,
			Json(serde_json::json!({ "error": "workflow task failed" })),
		)
			.into_response()
	})
}

fn bad_request(message: String) -> Response {
	(
		StatusCode::BAD_REQUEST,
		Json(serde_json::json!({ "error": message })),
	)
		.into_response()
}
