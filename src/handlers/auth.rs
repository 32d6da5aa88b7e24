use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    errors::{ApiError, ValidatedJson},
    models::{JwtAuthResponse, LoginDto, RegisterDto},
};

/// login
///
/// [Public Route] Exchanges username-or-email and password for a bearer token.
/// Also mounted at `/api/v1/auth/signin`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Token issued", body = JwtAuthResponse),
        (status = 401, description = "Bad credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginDto>,
) -> Result<Json<JwtAuthResponse>, ApiError> {
    Ok(Json(state.auth.login(payload).await?))
}

/// register
///
/// [Public Route] Self-service sign-up. Also mounted at `/api/v1/auth/signup`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "User registered", body = String),
        (status = 400, description = "Validation failed or username/email taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterDto>,
) -> Result<(StatusCode, String), ApiError> {
    let message = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, message))
}
