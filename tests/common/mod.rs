//! Local stand-ins for the Gemini and analytics upstreams

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, Uri},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crunchbot::config::Config;

pub const GEMINI_KEY: &str = "gemini-test-key";
pub const ANALYTICS_KEY: &str = "bc-test-key";
pub const JWT_SECRET: &str = "integration-secret";
pub const BAYC: &str = "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D";

/// Serve `app` on an ephemeral port and return its base URL
pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// One request seen by the fake analytics provider
#[derive(Debug, Clone)]
pub struct AnalyticsHit {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub api_key: Option<String>,
}

impl AnalyticsHit {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Fake `/nft/collection/{endpoint}` provider with a fixed reply
#[derive(Clone)]
pub struct FakeAnalytics {
    status: StatusCode,
    body: Value,
    hits: Arc<Mutex<Vec<AnalyticsHit>>>,
}

impl FakeAnalytics {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            hits: Arc::default(),
        }
    }

    pub fn hits(&self) -> Vec<AnalyticsHit> {
        self.hits.lock().unwrap().clone()
    }

    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/nft/collection/{endpoint}", get(analytics_handler))
            .with_state(self.clone());
        spawn(app).await
    }
}

async fn analytics_handler(
    State(fake): State<FakeAnalytics>,
    uri: Uri,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    let query = query
        .map(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(&q).unwrap())
        .unwrap_or_default();
    fake.hits.lock().unwrap().push(AnalyticsHit {
        path: uri.path().to_string(),
        query,
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    (fake.status, Json(fake.body.clone()))
}

/// Fake Gemini `generateContent` that replays scripted texts in order
#[derive(Clone, Default)]
pub struct FakeGemini {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl FakeGemini {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().map(Into::into).collect())),
            requests: Arc::default(),
        }
    }

    /// Request bodies received so far, with their `x-goog-api-key`
    pub fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/models/{action}", post(gemini_handler))
            .with_state(self.clone());
        spawn(app).await
    }
}

async fn gemini_handler(
    State(fake): State<FakeGemini>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    fake.requests.lock().unwrap().push((key, body));

    match fake.replies.lock().unwrap().pop_front() {
        Some(text) => (
            StatusCode::OK,
            Json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
            })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "script exhausted"}})),
        ),
    }
}

/// Config pointing both upstreams at local fakes
pub fn config(gemini_url: &str, analytics_url: &str) -> Config {
    let mut config = Config::default();
    config.llm.base_url = gemini_url.to_string();
    config.llm.model = "gemini-test".to_string();
    config.llm.api_key = GEMINI_KEY.to_string();
    config.llm.timeout = Duration::from_secs(5);
    config.analytics.base_url = analytics_url.to_string();
    config.analytics.api_key = ANALYTICS_KEY.to_string();
    config.analytics.timeout = Duration::from_secs(5);
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.server.request_timeout = Duration::from_secs(10);
    config
}
