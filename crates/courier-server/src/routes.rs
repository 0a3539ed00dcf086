//! HTTP endpoint set: liveness, authentication, and message submission.
//!
//! Submit processing order is fixed: gate on the session token first, and
//! only then touch the encrypted body. A stale or missing token gets the
//! authentication-required status without any decrypt attempt; a failed
//! decrypt or malformed payload is rejected without anything reaching the
//! sink; a saturated sink rejects the request rather than dropping the
//! message or blocking.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use courier_common::{
    AuthRequest, AuthResponse, Envelope, ErrorResponse, Message, ServerStatus, SubmitResponse,
    ROUTE_CLIENT_AUTH, ROUTE_IS_RUNNING, ROUTE_MESSAGE_SUBMIT, SESSION_TOKEN_HEADER,
    STATUS_AUTH_REQUIRED,
};
use courier_crypto::MessageCipher;

use crate::auth::{AuthError, AuthProtocol};
use crate::session::hash_token;
use crate::sink::Sink;

/// Everything a request handler needs, injected at construction.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthProtocol>,
    pub cipher: Arc<MessageCipher>,
    pub sink: Arc<dyn Sink>,
}

/// Build the Courier route set over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_IS_RUNNING, get(is_running))
        .route(ROUTE_CLIENT_AUTH, post(client_auth))
        .route(ROUTE_MESSAGE_SUBMIT, post(message_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn auth_required_status() -> StatusCode {
    StatusCode::from_u16(STATUS_AUTH_REQUIRED).unwrap_or(StatusCode::UNAUTHORIZED)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(SESSION_TOKEN_HEADER) {
        if let Ok(token) = value.to_str() {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

async fn is_running(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServerStatus {
        active_sessions: state.auth.store().active_count(),
    })
}

async fn client_auth(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Response {
    match state.auth.login(&payload.username, &payload.password) {
        Ok(session) => {
            tracing::info!(username = %session.username, "session issued");
            (
                StatusCode::OK,
                Json(AuthResponse {
                    token: session.token,
                    expires_at: session.expires_at,
                }),
            )
                .into_response()
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!(username = %payload.username, "login rejected: invalid credentials");
            error_response(StatusCode::UNAUTHORIZED, "invalid credentials")
        }
        Err(err) => {
            tracing::error!("login failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "login failed")
        }
    }
}

async fn message_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(token) = extract_session_token(&headers) else {
        tracing::warn!("submit rejected: no session token presented");
        return error_response(auth_required_status(), "authentication required");
    };

    let session = match state.auth.authorize(&token) {
        Ok(session) => session,
        Err(AuthError::SessionExpired) => {
            tracing::warn!(token_hash = %hash_token(&token), "submit rejected: session expired");
            return error_response(auth_required_status(), "authentication required");
        }
        Err(_) => {
            tracing::warn!(token_hash = %hash_token(&token), "submit rejected: unknown session token");
            return error_response(auth_required_status(), "authentication required");
        }
    };

    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(username = %session.username, "malformed submit body: {err}");
            return error_response(StatusCode::BAD_REQUEST, "malformed envelope");
        }
    };

    let (ciphertext, nonce) = match envelope.decode() {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::warn!(username = %session.username, "malformed envelope: {err}");
            return error_response(StatusCode::BAD_REQUEST, "malformed envelope");
        }
    };

    let plaintext = match state.cipher.decrypt(&ciphertext, &nonce) {
        Ok(plaintext) => plaintext,
        Err(err) => {
            tracing::warn!(username = %session.username, "rejected undecryptable envelope: {err}");
            return error_response(StatusCode::BAD_REQUEST, "undecryptable envelope");
        }
    };

    let message = match Message::from_bytes(&plaintext) {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(username = %session.username, "invalid message payload: {err}");
            return error_response(StatusCode::BAD_REQUEST, "invalid message payload");
        }
    };

    if !state.sink.try_enqueue(message) {
        tracing::warn!(username = %session.username, "sink full, rejecting submit");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "queue full");
    }

    (StatusCode::OK, Json(SubmitResponse { queued: true })).into_response()
}
