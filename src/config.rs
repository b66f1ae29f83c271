// config.rs
use std::env;

use tracing::{info, warn};

use crate::errors::{AppError, Result};

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mpesa_consumer_key: String,
    pub mpesa_consumer_secret: String,
    pub mpesa_short_code: String,
    pub mpesa_passkey: String,
    pub mpesa_callback_url: String,
    pub mpesa_environment: String,
    pub mpesa_base_url: String,
    pub country_code: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub cache_token: bool,
    pub http_timeout_secs: u64,
    pub port: u16,
    pub host: String,
}

/// Fully qualified gateway endpoints derived from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayUrls {
    pub auth_url: String,
    pub stk_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. `from_env` is a thin
    /// wrapper over this.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = |key: &str| match var(key) {
            Some(value) => value,
            None => {
                warn!("{} is not set; gateway calls will likely fail", key);
                String::new()
            }
        };

        let mpesa_environment = var("MPESA_ENVIRONMENT").unwrap_or_else(|| "sandbox".to_string());

        let mpesa_base_url = var("MPESA_BASE_URL")
            .unwrap_or_else(|| default_base_url(&mpesa_environment).to_string())
            .trim_end_matches('/')
            .to_string();

        let cache_token = match var("MPESA_CACHE_TOKEN") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                AppError::configuration(format!("MPESA_CACHE_TOKEN must be a boolean, got '{}'", raw))
            })?,
            None => false,
        };

        let http_timeout_secs = match var("MPESA_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::configuration(format!("MPESA_HTTP_TIMEOUT_SECS must be a number: {}", e))
            })?,
            None => 30,
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::configuration(format!("PORT must be a number: {}", e)))?,
            None => 3000,
        };

        Ok(AppConfig {
            mpesa_consumer_key: required("MPESA_CONSUMER_KEY"),
            mpesa_consumer_secret: required("MPESA_CONSUMER_SECRET"),
            mpesa_short_code: required("MPESA_SHORT_CODE"),
            mpesa_passkey: required("MPESA_PASSKEY"),
            mpesa_callback_url: required("MPESA_CALLBACK_URL"),
            mpesa_environment,
            mpesa_base_url,
            country_code: var("MPESA_COUNTRY_CODE").unwrap_or_else(|| "254".to_string()),
            account_reference: var("MPESA_ACCOUNT_REFERENCE")
                .unwrap_or_else(|| "TestOrder".to_string()),
            transaction_desc: var("MPESA_TRANSACTION_DESC")
                .unwrap_or_else(|| "Test Payment".to_string()),
            cache_token,
            http_timeout_secs,
            port,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        })
    }

    pub fn get_mpesa_urls(&self) -> GatewayUrls {
        GatewayUrls {
            auth_url: format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.mpesa_base_url
            ),
            stk_url: format!("{}/mpesa/stkpush/v1/processrequest", self.mpesa_base_url),
        }
    }

    pub fn is_production(&self) -> bool {
        self.mpesa_environment == "production"
    }

    pub fn log_summary(&self) {
        info!("M-Pesa environment: {}", self.mpesa_environment);
        info!("M-Pesa base URL: {}", self.mpesa_base_url);
        info!("Business short code: {}", self.mpesa_short_code);
        info!("Token caching: {}", self.cache_token);
    }

    /// Redacted view of the config; secrets only report whether they are set.
    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.mpesa_environment,
            "is_production": self.is_production(),
            "base_url": self.mpesa_base_url,
            "business_shortcode": self.mpesa_short_code,
            "callback_url": self.mpesa_callback_url,
            "country_code": self.country_code,
            "consumer_key_set": !self.mpesa_consumer_key.is_empty(),
            "consumer_secret_set": !self.mpesa_consumer_secret.is_empty(),
            "passkey_set": !self.mpesa_passkey.is_empty(),
            "cache_token": self.cache_token,
            "http_timeout_secs": self.http_timeout_secs,
            "port": self.port,
            "host": self.host,
        })
    }
}

fn default_base_url(environment: &str) -> &'static str {
    if environment == "production" {
        PRODUCTION_BASE_URL
    } else {
        SANDBOX_BASE_URL
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
