// handlers/mpesa_handlers.rs
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, State},
    response::IntoResponse,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use validator::Validate;

use crate::dtos::payment_dtos::StkPushBody;
use crate::errors::Result;
use crate::models::callback::CallbackData;
use crate::models::payment::PaymentRequest;
use crate::state::AppState;

pub async fn get_token(State(state): State<AppState>) -> Result<Json<Value>> {
    let token_response = state.mpesa_service.request_token().await.map_err(|e| {
        error!("Failed to fetch access token: {}", e);
        e
    })?;
    Ok(Json(token_response))
}

pub async fn initiate_stk_push(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StkPushBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = payload?;
    info!("Received STK push request: {:?}", body);
    body.validate()?;

    let request = PaymentRequest::from(body);
    match state.mpesa_service.initiate_stk_push(&request).await {
        Ok(response) => Ok(Json(json!({
            "success": true,
            "response": response,
        }))),
        Err(e) => {
            error!("Failed to initiate STK push: {}", e);
            Err(e)
        }
    }
}

// Always acks so the gateway does not retry, even when the body is unusable.
pub async fn mpesa_callback(body: Bytes) -> impl IntoResponse {
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            info!("M-Pesa callback received: {}", payload);
            match serde_json::from_value::<CallbackData>(payload) {
                Ok(data) => {
                    let callback = data.body.stk_callback;
                    if callback.is_success() {
                        info!(
                            "STK payment completed: merchant {} checkout {} receipt {:?}",
                            callback.merchant_request_id,
                            callback.checkout_request_id,
                            callback.metadata_value("MpesaReceiptNumber")
                        );
                    } else {
                        warn!(
                            "STK payment failed: checkout {} - {} {}",
                            callback.checkout_request_id, callback.result_code, callback.result_desc
                        );
                    }
                }
                Err(e) => info!("Callback is not an STK result: {}", e),
            }
        }
        Err(e) => warn!("Dropping malformed callback body ({} bytes): {}", body.len(), e),
    }

    Json(json!({ "success": true }))
}
