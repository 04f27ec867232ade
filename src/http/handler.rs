//! The gateway request handler.
//!
//! # Responsibilities
//! - Hold every early request until the query engine answers its first probe
//! - Serve the playground to non-JSON requests outside production
//! - Answer introspection queries from the engine's SDL endpoint
//! - Proxy everything else with paced admission and bounded retry

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::uri::InvalidUri;
use axum::http::{header, Method, Request, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::json;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::graphql::{introspect, playground_html, IntrospectionError};
use crate::http::admission::RateBudget;
use crate::lifecycle::{ActivitySignal, IdleTimer};

/// Delivery attempts per proxied request.
const MAX_ATTEMPTS: u32 = 3;
/// Wall-clock bound on each upstream round-trip.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);
/// Delay between readiness probes of the engine.
const READINESS_POLL_DELAY: Duration = Duration::from_millis(3);
/// Cap on buffered request and response bodies.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared state behind the gateway handler.
pub struct GatewayState {
    client: Client<HttpConnector, Body>,
    engine_url: Uri,
    engine_sdl_url: Uri,
    playground_enabled: bool,
    idle_enabled: bool,
    budget: RateBudget,
    activity: ActivitySignal,
    idle_timer: StdMutex<Option<IdleTimer>>,
    ready: OnceCell<()>,
    shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(config: &Config, shutdown: CancellationToken) -> Result<Self, InvalidUri> {
        let (idle_timer, activity) = IdleTimer::new(
            Duration::from_secs(config.sleep_after_seconds),
            shutdown.clone(),
        );
        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            engine_url: config.query_engine_url().parse()?,
            engine_sdl_url: config.query_engine_sdl_url().parse()?,
            playground_enabled: !config.production,
            idle_enabled: config.enable_sleep_mode,
            budget: RateBudget::new(config.read_limit_rps, config.write_limit_rps),
            activity,
            idle_timer: StdMutex::new(Some(idle_timer)),
            ready: OnceCell::new(),
            shutdown,
        })
    }

    /// One-time initialization, run by whichever request arrives first while
    /// the rest wait: arm the idle timer and poll the engine until it answers.
    async fn wait_until_ready(&self) {
        if self.idle_enabled {
            let timer = self.idle_timer.lock().expect("idle timer mutex").take();
            if let Some(timer) = timer {
                tokio::spawn(timer.run());
            }
        }
        loop {
            let probe = match Request::builder()
                .method(Method::GET)
                .uri(self.engine_url.clone())
                .body(Body::empty())
            {
                Ok(request) => request,
                Err(err) => {
                    tracing::error!(error = %err, "failed to build readiness probe");
                    return;
                }
            };
            match self.client.request(probe).await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("query engine ready");
                    return;
                }
                Ok(_) | Err(_) => tokio::time::sleep(READINESS_POLL_DELAY).await,
            }
        }
    }

    async fn serve(&self, request: Request<Body>) -> Response {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if self.playground_enabled && content_type != "application/json" {
            let page = playground_html(&request.uri().to_string());
            return Html(page).into_response();
        }

        let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read request body");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if contains(&body, b"IntrospectionQuery") {
            return match self.introspection_response().await {
                Ok(response) => response,
                Err(err) => {
                    // Fatal classification: the schema endpoint is deployment
                    // configuration, not runtime state.
                    tracing::error!(error = %err, "introspection synthesis failed, shutting down");
                    self.shutdown.cancel();
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
        }

        self.proxy(body).await
    }

    async fn introspection_response(&self) -> Result<Response, IntrospectionFailure> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.engine_sdl_url.clone())
            .body(Body::empty())
            .map_err(|err| IntrospectionFailure::Request(err.to_string()))?;
        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| IntrospectionFailure::Fetch(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IntrospectionFailure::Status(status));
        }
        let sdl = axum::body::to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES)
            .await
            .map_err(|err| IntrospectionFailure::Read(err.to_string()))?;
        let schema = introspect(&String::from_utf8_lossy(&sdl))?;
        Ok(Json(json!({ "data": schema })).into_response())
    }

    async fn proxy(&self, raw: Bytes) -> Response {
        let body = normalize_body(&raw);
        let mutation = is_mutation(&body);
        for attempt in 1..=MAX_ATTEMPTS {
            self.budget.admit(mutation).await;
            match self.forward_once(&body).await {
                Ok(data) => {
                    return ([(header::CONTENT_TYPE, "application/json")], data).into_response();
                }
                Err(failure) => {
                    tracing::warn!(attempt, error = %failure, "upstream attempt failed");
                }
            }
        }
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }

    async fn forward_once(&self, body: &Bytes) -> Result<Bytes, UpstreamFailure> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.engine_url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.clone()))
            .map_err(|err| UpstreamFailure::Transport(err.to_string()))?;

        let response = match tokio::time::timeout(UPSTREAM_TIMEOUT, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(UpstreamFailure::Transport(err.to_string())),
            Err(_) => return Err(UpstreamFailure::Deadline(UPSTREAM_TIMEOUT)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamFailure::Status(status));
        }
        let data = axum::body::to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES)
            .await
            .map_err(|err| UpstreamFailure::Read(err.to_string()))?;
        // The engine reports its own timeouts inside a 200; treat those as
        // transient like any transport failure.
        if data.starts_with(b"{\"e") && contains(&data, b"Timed out") {
            return Err(UpstreamFailure::EngineTimedOut);
        }
        Ok(data)
    }
}

/// The gateway entry point, mounted on every path.
pub async fn gateway_handler(
    State(state): State<Arc<GatewayState>>,
    request: Request<Body>,
) -> Response {
    state.ready.get_or_init(|| state.wait_until_ready()).await;

    let response = state.serve(request).await;

    // Every handled request counts as activity, whatever its outcome.
    if state.idle_enabled {
        state.activity.touch();
    }
    response
}

#[derive(Debug, thiserror::Error)]
enum UpstreamFailure {
    #[error("transport: {0}")]
    Transport(String),
    #[error("status {0}")]
    Status(StatusCode),
    #[error("read body: {0}")]
    Read(String),
    #[error("engine reported a timeout")]
    EngineTimedOut,
    #[error("no response within {0:?}")]
    Deadline(Duration),
}

#[derive(Debug, thiserror::Error)]
enum IntrospectionFailure {
    #[error("build schema request: {0}")]
    Request(String),
    #[error("fetch schema definition: {0}")]
    Fetch(String),
    #[error("schema endpoint answered {0}")]
    Status(StatusCode),
    #[error("read schema definition: {0}")]
    Read(String),
    #[error(transparent)]
    Generate(#[from] IntrospectionError),
}

/// Normalize the inbound envelope so the engine never sees absent fields:
/// `variables` defaults to `{}`, `operationName` to `null`.
fn normalize_body(raw: &[u8]) -> Bytes {
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(raw) else {
        return Bytes::copy_from_slice(raw);
    };
    if let Some(map) = value.as_object_mut() {
        map.entry("variables").or_insert_with(|| json!({}));
        map.entry("operationName").or_insert(serde_json::Value::Null);
        if let Ok(body) = serde_json::to_vec(&value) {
            return Bytes::from(body);
        }
    }
    Bytes::copy_from_slice(raw)
}

/// Mutations are classified by raw containment of the `mutation` keyword.
fn is_mutation(body: &[u8]) -> bool {
    contains(body, b"mutation")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
