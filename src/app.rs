use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ServiceMode};
use crate::state::AppState;
use crate::{auth, local};

/// Build the router for whichever shape the config selects.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let router = match state.config.mode {
        ServiceMode::Remote => Router::new()
            .nest("/api/v1", auth::router())
            .route("/", get(remote_root))
            .route("/health", get(health)),
        ServiceMode::Local => local::router()
            .route("/", get(local_root))
            .route("/health", get(health)),
    };

    router.with_state(state).layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                tracing::info_span!("http_request", %method, uri = %uri)
            })
            .on_response(
                |res: &axum::http::Response<_>,
                 _latency: std::time::Duration,
                 span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, "response");
                    } else {
                        tracing::info!(%status, "response");
                    }
                },
            ),
    )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn remote_root() -> Json<Value> {
    Json(json!({
        "message": "Call Receptionist API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn local_root() -> Json<Value> {
    Json(json!({
        "message": "Call Receptionist Local Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "note": "This service runs locally only for security",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn serve(app: Router, default_host: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| default_host.into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
