use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lgrelay_core::{signature, CommandKind, Envelope, LocalEngine, RelayError, ReplayGuard};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::RelaydConfig;

const FORBIDDEN_BODY: &str = "Forbidden: Invalid signature or timestamp";

#[derive(Clone)]
pub struct RelayState {
    inner: Arc<RelayStateInner>,
}

struct RelayStateInner {
    engine: Arc<LocalEngine>,
    secret: Option<String>,
    replay: Option<ReplayGuard>,
}

impl RelayState {
    pub fn new(engine: Arc<LocalEngine>, secret: Option<String>, replay_protection: bool) -> Self {
        Self {
            inner: Arc::new(RelayStateInner {
                engine,
                secret,
                replay: replay_protection.then(ReplayGuard::default),
            }),
        }
    }

    fn engine(&self) -> &LocalEngine {
        &self.inner.engine
    }

    fn authorize(&self, envelope: &Envelope) -> Result<(), ApiError> {
        signature::verify(envelope, self.inner.secret.as_deref())
            .and_then(|()| match (&self.inner.replay, envelope.signature.as_deref()) {
                (Some(guard), Some(sig)) => guard.check(&envelope.server_id, sig),
                _ => Ok(()),
            })
            .map_err(|err| {
                warn!(
                    server_id = %envelope.server_id,
                    command = %envelope.command,
                    timestamp = ?envelope.timestamp,
                    reason = %err,
                    "rejected remote request"
                );
                ApiError::Forbidden
            })
    }
}

#[derive(Debug)]
enum ApiError {
    MissingServerId,
    Forbidden,
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingServerId => (StatusCode::BAD_REQUEST, "Missing serverId".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, FORBIDDEN_BODY.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => {
                error!("remote command failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, [(CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}

/// Routes served by the receiver: the run endpoint plus `/health`.
pub fn router(state: RelayState, run_path: &str) -> Router {
    Router::new()
        .route(run_path, post(run_command))
        .route("/health", get(health))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(config: &RelaydConfig, engine: Arc<LocalEngine>) -> Result<()> {
    let state = RelayState::new(engine, config.secret.clone(), config.replay_protection);
    let app = router(state, &config.run_path);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay listener to {addr}"))?;

    info!("[Runner] Listening on {} (POST {})", addr, config.run_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay HTTP server encountered an unrecoverable error")?;

    Ok(())
}

async fn run_command(
    Extension(state): Extension<RelayState>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(envelope) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    if envelope.server_id.trim().is_empty() {
        return Err(ApiError::MissingServerId);
    }

    state.authorize(&envelope)?;

    let kind: CommandKind = envelope
        .command
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid command".to_string()))?;

    info!(
        server_id = %envelope.server_id,
        command = %kind,
        args = %envelope.args().join(" "),
        "RemoteExec"
    );

    match state.engine().execute(kind, envelope.args()).await {
        Ok(output) => Ok((
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            output,
        )
            .into_response()),
        Err(RelayError::Validation(message)) => Err(ApiError::BadRequest(message)),
        Err(err) => Err(ApiError::Internal(err.to_string())),
    }
}

async fn health(Extension(state): Extension<RelayState>) -> impl IntoResponse {
    let routing = state
        .engine()
        .routing()
        .resolved()
        .map(|daemon| daemon.as_str())
        .unwrap_or("unknown");

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build": lgrelay_build_info::build_id(),
        "routing": routing,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, stopping relay");
}
