//! HTTP endpoints: identity registration, login, and health.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ghostchat_core::IdentityError;
use ghostchat_proto::Code;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct RegisterResponse {
    code: Code,
    pin: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    code: String,
    pin: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    token: String,
}

/// Error body returned by the HTTP endpoints.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// Bad credentials or an unparseable login body
    Invalid,
    /// Store failure
    Internal,
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::Invalid,
            IdentityError::TokenCollision => {
                tracing::error!("login refused: session tokens are not unique");
                Self::Internal
            },
            IdentityError::Store(e) => {
                tracing::warn!("identity store failure: {}", e);
                Self::Internal
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Invalid => (StatusCode::UNAUTHORIZED, "Invalid"),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

pub(crate) async fn register_handler(
    State(state): State<AppState>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let creds = state.gateway.lock().await.register()?;
    Ok(Json(RegisterResponse { code: creds.code, pin: creds.pin }))
}

/// The body is parsed by hand so that any unparseable request maps to the
/// same 401 as bad credentials.
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let Ok(request) = serde_json::from_slice::<LoginRequest>(&body) else {
        tracing::debug!("unparseable login body");
        return Err(ApiError::Invalid);
    };

    let token = state.gateway.lock().await.login(&Code::new(request.code), &request.pin)?;
    Ok(Json(LoginResponse { token: token.as_str().to_string() }))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let gateway = state.gateway.lock().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "identities": gateway.identity_count().unwrap_or_default(),
        "connections": gateway.connection_count(),
    }))
}
