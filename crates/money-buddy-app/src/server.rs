// HTTP boundary: the chat endpoint, the autonomous-operations endpoint and a
// health check.
//
// Validation failures answer 400 and processing failures answer 500, both
// with an `{"error": "..."}` body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument};

use money_buddy_chain::LocalAccount;

use crate::autonomous::{TradingStrategy, UserPreferences};
use crate::runtime::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/agent", post(agent_handler))
        .route("/api/autonomous", post(autonomous_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// A field counts as present only when it is a non-empty string.
fn required<'a>(field: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    match field.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub response: String,
}

/// POST /api/agent
#[instrument(skip_all)]
async fn agent_handler(
    State(state): State<AppState>,
    Json(body): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let message = required(&body.message, "Message is required")?;
    let private_key = required(&body.private_key, "Private key is required")?;

    let internal = |e: &dyn std::fmt::Display| {
        error!("Error processing request: {e}");
        ApiError::Internal(format!("Error processing request: {e}"))
    };

    let agent = state
        .agent_for(private_key, body.wallet_address.as_deref())
        .map_err(|e| internal(&e))?;
    let response = agent.run(message).await.map_err(|e| internal(&e))?;

    Ok(Json(AgentResponse { response }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousRequest {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub preferences: Option<Value>,
    #[serde(default)]
    pub strategy: Option<Value>,
}

/// POST /api/autonomous
#[instrument(skip_all)]
async fn autonomous_handler(
    State(state): State<AppState>,
    Json(body): Json<AutonomousRequest>,
) -> Result<Json<Value>, ApiError> {
    let private_key = required(&body.private_key, "Private key is required")?;
    let operation = required(&body.operation, "Operation type is required")?;

    let internal = |e: &dyn std::fmt::Display| {
        error!("Error processing autonomous operation: {e}");
        ApiError::Internal(format!("Error processing operation: {e}"))
    };

    // The key is not used by the simulated operations, but a bad key is
    // still an error.
    LocalAccount::from_private_key(private_key).map_err(|e| internal(&e))?;

    let preferences = match body.preferences {
        Some(Value::Null) | None => None,
        Some(raw) => Some(
            serde_json::from_value::<UserPreferences>(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid preferences: {e}")))?,
        ),
    };
    let manager = state.autonomous_manager(preferences);

    let result = match operation {
        "analyzePortfolio" => {
            let wallet = required(&body.wallet_address, "Wallet address is required")?;
            let analysis = manager
                .analyze_portfolio(wallet)
                .await
                .map_err(|e| internal(&format!("{e:#}")))?;
            to_value(&analysis)?
        }
        "findYieldOpportunities" => {
            let report = manager
                .find_best_yield_opportunities()
                .await
                .map_err(|e| internal(&format!("{e:#}")))?;
            to_value(&report)?
        }
        "executeTradingStrategy" => {
            let raw = match body.strategy {
                Some(Value::Null) | None => {
                    return Err(ApiError::BadRequest("Trading strategy is required".into()))
                }
                Some(raw) => raw,
            };
            let strategy: TradingStrategy = serde_json::from_value(raw)
                .map_err(|e| ApiError::BadRequest(format!("Invalid trading strategy: {e}")))?;
            to_value(&manager.execute_trading_strategy(&strategy))?
        }
        _ => return Err(ApiError::BadRequest("Invalid operation type".into())),
    };

    Ok(Json(json!({ "result": result })))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("Error processing operation: {e}")))
}
