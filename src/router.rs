use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Client;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::UpstreamConfig;
use crate::error::{ErrorEnvelope, Result};
use crate::extract::extract_direct_link;
use crate::headers::{apply_cors, preflight_response};
use crate::landing::fetch_landing_page;
use crate::link::SourceLink;
use crate::relay::relay_file;

const SOURCE_PARAM: &str = "require";

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub upstream: Arc<UpstreamConfig>,
}

impl AppState {
    pub fn new(upstream: UpstreamConfig) -> color_eyre::Result<Self> {
        let client = http_client_builder().build()?;
        Ok(Self::with_client(client, upstream))
    }

    pub fn with_client(client: Client, upstream: UpstreamConfig) -> Self {
        Self {
            client,
            upstream: Arc::new(upstream),
        }
    }
}

/// Outbound client settings shared by both upstream calls.
pub fn http_client_builder() -> reqwest::ClientBuilder {
    Client::builder().redirect(reqwest::redirect::Policy::limited(10))
}

/// validate -> fetch landing page -> extract -> relay
#[tracing::instrument(skip_all)]
async fn run_pipeline(
    state: &AppState,
    require: Option<&str>,
    caller_user_agent: Option<&str>,
) -> Result<Response> {
    let link = SourceLink::parse(require)?;
    tracing::debug!(%link, "source link accepted");

    let page =
        fetch_landing_page(&state.client, &link, &state.upstream.landing_user_agent).await?;
    tracing::debug!(status = %page.status, bytes = page.body.len(), "landing page fetched");

    let direct = extract_direct_link(&page.body)?;
    drop(page);
    tracing::info!(url = %direct.url, strategy = direct.strategy, "direct link found");

    let user_agent = caller_user_agent
        .filter(|ua| !ua.is_empty())
        .unwrap_or(&state.upstream.fallback_user_agent);

    relay_file(&state.client, &direct.url, &link, user_agent).await
}

/// Single entry point: every pipeline failure becomes the JSON envelope here.
pub async fn relay_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let require = params
        .iter()
        .find(|(key, _)| key == SOURCE_PARAM)
        .map(|(_, value)| value.as_str());
    let caller_user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    match run_pipeline(&state, require, caller_user_agent).await {
        Ok(resp) => resp,
        Err(e) => e.into_envelope(require).into_response(),
    }
}

/// Answers preflight for any path and stamps CORS on everything else.
async fn cors_guard(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }
    let mut resp = next.run(req).await;
    apply_cors(resp.headers_mut());
    resp
}

fn panic_envelope(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(%detail, "request handler panicked");
    ErrorEnvelope::new(detail, StatusCode::INTERNAL_SERVER_ERROR, None).into_response()
}

async fn method_not_allowed() -> ErrorEnvelope {
    ErrorEnvelope::new("Method not allowed", StatusCode::METHOD_NOT_ALLOWED, None)
}

async fn not_found() -> ErrorEnvelope {
    ErrorEnvelope::new("Not Found", StatusCode::NOT_FOUND, None)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(relay_handler).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_envelope))
        .layer(middleware::from_fn(cors_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
