// services/mpesa_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, GatewayUrls};
use crate::errors::{AppError, Result};
use crate::models::payment::PaymentRequest;
use crate::services::phone;

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3599;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: i64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MpesaService {
    config: AppConfig,
    urls: GatewayUrls,
    client: Client,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl MpesaService {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::http_client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(MpesaService {
            urls: config.get_mpesa_urls(),
            config,
            client,
            cached_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Raw token response from the gateway, passed through for any 2xx status.
    /// Always hits the network.
    pub async fn request_token(&self) -> Result<Value> {
        info!("Requesting new access token");
        let basic = basic_auth(&self.config.mpesa_consumer_key, &self.config.mpesa_consumer_secret);

        let response = self
            .client
            .get(&self.urls.auth_url)
            .header(header::AUTHORIZATION, format!("Basic {}", basic))
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                AppError::upstream_auth(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::upstream_auth(e.to_string()))?;

        if !status.is_success() {
            error!("Failed to get access token: {} - {}", status, body);
            return Err(AppError::upstream_auth(format!("{} - {}", status, body)));
        }

        Ok(serde_json::from_str::<Value>(&body).unwrap_or_else(|_| Value::String(body)))
    }

    pub async fn get_access_token(&self) -> Result<String> {
        if self.config.cache_token {
            let cached = self.cached_token.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.expires_at > Utc::now() + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
                    debug!("Using cached access token");
                    return Ok(entry.token.clone());
                }
            }
        }

        let token_response = self.request_token().await?;
        let token = token_response
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                error!("Token response has no access_token: {}", token_response);
                AppError::upstream_auth("token response has no access_token")
            })?;

        if self.config.cache_token {
            let lifetime = token_lifetime_secs(&token_response);
            let mut cached = self.cached_token.write().await;
            *cached = Some(CachedToken {
                token: token.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
            });
        }

        debug!("Access token obtained: {}...", token.get(..8).unwrap_or(&token));
        Ok(token)
    }

    /// Builds the signed payload for `request` at instant `now`.
    pub fn build_stk_request(
        &self,
        request: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<StkPushRequest> {
        let amount = round_amount(request.amount)?;
        let formatted_phone =
            phone::format_phone_number(&self.config.country_code, &request.phone_number);
        let timestamp = format_timestamp(now);
        let password = generate_password(
            &self.config.mpesa_short_code,
            &self.config.mpesa_passkey,
            &timestamp,
        );

        Ok(StkPushRequest {
            business_short_code: self.config.mpesa_short_code.clone(),
            password,
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount,
            party_a: formatted_phone.clone(),
            party_b: self.config.mpesa_short_code.clone(),
            phone_number: formatted_phone,
            callback_url: self.config.mpesa_callback_url.clone(),
            account_reference: request
                .account_reference
                .clone()
                .unwrap_or_else(|| self.config.account_reference.clone()),
            transaction_desc: request
                .transaction_desc
                .clone()
                .unwrap_or_else(|| self.config.transaction_desc.clone()),
        })
    }

    // C2B: Customer to Business
    pub async fn initiate_stk_push(&self, request: &PaymentRequest) -> Result<Value> {
        info!("C2B: STK push for {} - KSh {}", request.phone_number, request.amount);

        phone::ensure_digits(&request.phone_number)?;
        round_amount(request.amount)?;
        if !phone::looks_like_subscriber_number(&request.phone_number) {
            warn!(
                "{} does not look like a local subscriber number, forwarding anyway",
                request.phone_number
            );
        }

        let access_token = self.get_access_token().await?;
        let stk_request = self.build_stk_request(request, Utc::now())?;

        info!(
            "Sending STK push: party {} amount {} timestamp {}",
            stk_request.party_a, stk_request.amount, stk_request.timestamp
        );

        let response = self
            .client
            .post(&self.urls.stk_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&stk_request)
            .send()
            .await
            .map_err(|e| {
                error!("C2B request failed: {}", e);
                AppError::upstream_transaction(e.to_string(), None)
            })?;

        let stk_response = read_transaction_response(response).await?;
        info!("STK response: {}", stk_response);
        Ok(stk_response)
    }
}

async fn read_transaction_response(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AppError::upstream_transaction(e.to_string(), None))?;

    let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| Value::String(text));

    if !status.is_success() {
        error!("C2B failed: {} - {}", status, body);
        return Err(AppError::upstream_transaction(
            format!("C2B failed: {}", status),
            Some(body),
        ));
    }

    if !is_accepted(&body) {
        error!("C2B response lacks a success ResponseCode: {}", body);
        return Err(AppError::upstream_transaction(
            "gateway did not accept the request",
            Some(body),
        ));
    }

    Ok(body)
}

pub fn basic_auth(key: &str, secret: &str) -> String {
    base64.encode(format!("{}:{}", key, secret))
}

/// `YYYYMMDDHHMMSS` in UTC.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

pub fn generate_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    base64.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

// 2^63, the first f64 past i64::MAX.
const AMOUNT_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The gateway takes whole currency units only. Amounts that round below 1 or
/// past `i64::MAX` are rejected rather than clamped.
pub fn round_amount(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::invalid_data("amount must be greater than 0"));
    }
    let rounded = amount.round();
    if rounded < 1.0 {
        return Err(AppError::invalid_data(format!(
            "amount {} rounds to {}, the gateway needs at least 1",
            amount, rounded
        )));
    }
    if rounded >= AMOUNT_UPPER_BOUND {
        return Err(AppError::invalid_data(format!("amount {} is too large", amount)));
    }
    Ok(rounded as i64)
}

/// True when the gateway reported `ResponseCode` 0, as a string or a number.
pub fn is_accepted(body: &Value) -> bool {
    match body.get("ResponseCode") {
        Some(Value::String(code)) => code.trim() == "0",
        Some(Value::Number(code)) => code.as_i64() == Some(0),
        _ => false,
    }
}

fn token_lifetime_secs(token_response: &Value) -> i64 {
    let lifetime = match token_response.get("expires_in") {
        Some(Value::String(raw)) => raw.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    lifetime
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
}
