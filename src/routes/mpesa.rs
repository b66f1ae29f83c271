use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::mpesa_handlers;
use crate::state::AppState;

pub fn mpesa_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(mpesa_health))
        .route("/token", get(mpesa_handlers::get_token))
        .route("/stkpush", post(mpesa_handlers::initiate_stk_push))
        .route("/callback", post(mpesa_handlers::mpesa_callback))
}

async fn mpesa_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "mpesa",
        "environment": state.mpesa_service.config().mpesa_environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
