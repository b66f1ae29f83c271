#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use mpesa_relay::build_router;
use mpesa_relay::config::AppConfig;
use mpesa_relay::services::mpesa_service::MpesaService;
use mpesa_relay::state::AppState;

/// Canned responses and call records for a fake Daraja gateway.
pub struct MockGateway {
    pub token_status: StatusCode,
    pub token_body: Value,
    pub stk_status: StatusCode,
    pub stk_body: Value,
    /// Sent verbatim instead of `stk_body` when set.
    pub stk_raw_body: Option<&'static str>,
    pub token_calls: AtomicUsize,
    pub stk_calls: AtomicUsize,
    pub last_token_auth: Mutex<Option<String>>,
    pub last_stk_auth: Mutex<Option<String>>,
    pub last_stk_payload: Mutex<Option<Value>>,
}

impl MockGateway {
    pub fn accepting() -> Self {
        MockGateway {
            token_status: StatusCode::OK,
            token_body: json!({ "access_token": "mock-access-token", "expires_in": "3599" }),
            stk_status: StatusCode::OK,
            stk_body: json!({ "ResponseCode": "0" }),
            stk_raw_body: None,
            token_calls: AtomicUsize::new(0),
            stk_calls: AtomicUsize::new(0),
            last_token_auth: Mutex::new(None),
            last_stk_auth: Mutex::new(None),
            last_stk_payload: Mutex::new(None),
        }
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn stk_calls(&self) -> usize {
        self.stk_calls.load(Ordering::SeqCst)
    }

    pub fn last_stk_payload(&self) -> Value {
        self.last_stk_payload
            .lock()
            .unwrap()
            .clone()
            .expect("no STK payload recorded")
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn token_endpoint(
    State(gateway): State<Arc<MockGateway>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    gateway.token_calls.fetch_add(1, Ordering::SeqCst);
    *gateway.last_token_auth.lock().unwrap() = authorization(&headers);
    (gateway.token_status, Json(gateway.token_body.clone()))
}

async fn stk_endpoint(
    State(gateway): State<Arc<MockGateway>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    gateway.stk_calls.fetch_add(1, Ordering::SeqCst);
    *gateway.last_stk_auth.lock().unwrap() = authorization(&headers);
    *gateway.last_stk_payload.lock().unwrap() = Some(payload);
    match gateway.stk_raw_body {
        Some(raw) => (gateway.stk_status, raw).into_response(),
        None => (gateway.stk_status, Json(gateway.stk_body.clone())).into_response(),
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    addr
}

pub async fn spawn_gateway(gateway: MockGateway) -> (Arc<MockGateway>, SocketAddr) {
    let gateway = Arc::new(gateway);
    let app = Router::new()
        .route("/oauth/v1/generate", get(token_endpoint))
        .route("/mpesa/stkpush/v1/processrequest", post(stk_endpoint))
        .with_state(gateway.clone());
    let addr = serve(app).await;
    (gateway, addr)
}

pub fn relay_config(gateway_addr: SocketAddr) -> AppConfig {
    AppConfig {
        mpesa_consumer_key: "key".to_string(),
        mpesa_consumer_secret: "secret".to_string(),
        mpesa_short_code: "174379".to_string(),
        mpesa_passkey: "passkey".to_string(),
        mpesa_callback_url: "https://relay.example.com/callback".to_string(),
        mpesa_environment: "sandbox".to_string(),
        mpesa_base_url: format!("http://{}", gateway_addr),
        country_code: "254".to_string(),
        account_reference: "TestOrder".to_string(),
        transaction_desc: "Test Payment".to_string(),
        cache_token: false,
        http_timeout_secs: 5,
        port: 0,
        host: "127.0.0.1".to_string(),
    }
}

/// Starts the relay and returns its base URL.
pub async fn spawn_relay(config: AppConfig) -> String {
    let service = MpesaService::new(config).expect("build service");
    let addr = serve(build_router(AppState::new(service))).await;
    format!("http://{}", addr)
}

pub async fn spawn_stack(gateway: MockGateway) -> (Arc<MockGateway>, String) {
    let (gateway, gateway_addr) = spawn_gateway(gateway).await;
    let relay = spawn_relay(relay_config(gateway_addr)).await;
    (gateway, relay)
}
