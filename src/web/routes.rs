//! HTTP handlers for the game webhook and the Discord Interactions endpoint

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn, Instrument};

use crate::commands::{dispatch_interaction, Interaction, LinkCommandHandler};
use crate::error::NotifierError;
use crate::managers::{parse_days, LfgBanner, MatchNotifier, ThreadCleanup};
use crate::models::WebhookEvent;
use crate::verification::{
    verify_interaction_signature, verify_webhook_auth, SHARED_SECRET_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub shared_secret: String,
    pub public_key: VerifyingKey,
    pub link_handler: LinkCommandHandler,
    pub notifier: MatchNotifier,
    /// Only available when delivering with a bot token
    pub cleanup: Option<ThreadCleanup>,
    /// Bot token plus `DISCORD_LFG_CHANNEL_ID`
    pub lfg: Option<LfgBanner>,
    pub delivery_mode: &'static str,
}

/// Query parameters for thread cleanup
#[derive(Deserialize)]
pub struct CleanupParams {
    days: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/showdown", get(health).post(match_webhook))
        .route("/api/interactions", post(interactions))
        .route(
            "/api/cleanup-threads",
            get(cleanup_threads).post(cleanup_threads),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn request_span(endpoint: &'static str) -> tracing::Span {
    tracing::info_span!("request", endpoint, request_id = %uuid::Uuid::new_v4())
}

/// Health check endpoint
async fn health() -> &'static str {
    "Match notifier running"
}

/// POST /api/showdown - match-start webhook from the game engine
async fn match_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    async move {
        // Authenticate before touching the body or the store
        if !verify_webhook_auth(header(&headers, SHARED_SECRET_HEADER), &state.shared_secret) {
            warn!("Rejected match webhook: bad or missing shared secret");
            return NotifierError::Unauthorized.into_response();
        }

        let raw = if header(&headers, "content-transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("base64"))
        {
            match base64::engine::general_purpose::STANDARD.decode(body.as_ref()) {
                Ok(decoded) => decoded,
                Err(e) => {
                    return NotifierError::validation(format!("invalid base64 body: {}", e))
                        .into_response()
                }
            }
        } else {
            body.to_vec()
        };

        let event = match WebhookEvent::from_slice(&raw) {
            Ok(WebhookEvent::MatchStart(event)) => event,
            Ok(WebhookEvent::QueueStatus(status)) => {
                return queue_status(&state, status.is_looking).await
            }
            Err(e) => {
                warn!("Rejected match webhook: {}", e);
                return e.into_response();
            }
        };
        info!("Match started: {} vs {}", event.player_one, event.player_two);

        match state.notifier.notify(&event).await {
            Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
            Err(e) => {
                error!("Match notification failed: {}", e);
                e.into_response()
            }
        }
    }
    .instrument(request_span("showdown"))
    .await
}

/// Queue-status updates raise or clear the looking-for-game banner
async fn queue_status(state: &AppState, is_looking: bool) -> Response {
    let lfg = match &state.lfg {
        Some(lfg) => lfg,
        None => {
            warn!("Queue status received but no LFG channel is configured");
            return NotifierError::Unsupported {
                mode: state.delivery_mode.to_string(),
                operation: "looking-for-game banners".to_string(),
            }
            .into_response();
        }
    };

    info!("Queue status: looking={}", is_looking);
    match lfg.update(is_looking).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({ "ok": true, "lfg": report })),
        )
            .into_response(),
        Err(e) => {
            error!("LFG banner update failed: {}", e);
            e.into_response()
        }
    }
}

/// POST /api/interactions - Discord Interactions callback
async fn interactions(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    async move {
        // The signature covers the exact bytes received, so verify before parsing
        if !verify_interaction_signature(
            &body,
            header(&headers, SIGNATURE_HEADER),
            header(&headers, TIMESTAMP_HEADER),
            &state.public_key,
        ) {
            warn!("Rejected interaction: invalid request signature");
            return StatusCode::UNAUTHORIZED.into_response();
        }

        let interaction = match Interaction::from_slice(&body) {
            Ok(interaction) => interaction,
            Err(e) => {
                warn!("Rejected interaction: {}", e);
                return e.into_response();
            }
        };
        debug!("Interaction: {:?}", interaction);

        match dispatch_interaction(interaction, &state.link_handler).await {
            Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
            Err(e) => {
                error!("Interaction failed: {}", e);
                e.into_response()
            }
        }
    }
    .instrument(request_span("interactions"))
    .await
}

/// GET|POST /api/cleanup-threads?days=N - delete old archived match threads
async fn cleanup_threads(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CleanupParams>,
) -> Response {
    async move {
        if !verify_webhook_auth(header(&headers, SHARED_SECRET_HEADER), &state.shared_secret) {
            warn!("Rejected thread cleanup: bad or missing shared secret");
            return NotifierError::Unauthorized.into_response();
        }

        let cleanup = match &state.cleanup {
            Some(cleanup) => cleanup,
            None => {
                return NotifierError::Unsupported {
                    mode: state.delivery_mode.to_string(),
                    operation: "thread cleanup".to_string(),
                }
                .into_response()
            }
        };

        match cleanup.run(parse_days(params.days.as_deref())).await {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(e) => {
                error!("Thread cleanup failed: {}", e);
                e.into_response()
            }
        }
    }
    .instrument(request_span("cleanup-threads"))
    .await
}
