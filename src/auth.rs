use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    config::{AppConfig, Env},
    errors::ApiError,
    models::User,
    repository::Repository,
};

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_USER: &str = "ROLE_USER";

/// Header honored only in `Env::Local`: resolves the principal by username without a token.
pub const LOCAL_PRINCIPAL_HEADER: &str = "x-username";

const AUTHENTICATION_REQUIRED: &str = "Full authentication is required to access this resource";

/// Claims
///
/// Payload of every issued access token. `sub` is the username; the user's roles are
/// re-read from the store on each request so revoking a role takes effect immediately.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// TokenProvider
///
/// Issues and validates HS256 access tokens with the configured secret and lifetime.
#[derive(Clone)]
pub struct TokenProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_ms: u64,
}

impl TokenProvider {
    pub fn new(secret: &str, expiration_ms: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiration_ms,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiration_ms)
    }

    pub fn generate_token(&self, username: &str) -> Result<String, ApiError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + (self.expiration_ms / 1000) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Unexpected(format!("failed to sign token: {e}")))
    }

    /// Checks signature and expiry, returning the claims of a usable token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let message = match e.kind() {
                    ErrorKind::ExpiredSignature => "Expired JWT token",
                    ErrorKind::InvalidSignature => "Invalid JWT signature",
                    _ => "Invalid JWT token",
                };
                ApiError::Unauthorized(message.to_string())
            })
    }
}

/// AuthUser
///
/// The authenticated principal of a request, resolved once by `authenticate` and
/// handed to handlers through the extractor below.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Role gate used by handlers: `Forbidden` unless the principal holds `role`.
    pub fn require_role(&self, role: &str) -> Result<(), ApiError> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::warn!(username = %self.username, required = role, "access denied");
            Err(ApiError::Forbidden)
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles.into_iter().map(|r| r.name).collect(),
        }
    }
}

/// AuthUser Extractor
///
/// Reads the principal stored by `authenticate`. Rejects with 401 when the request
/// carried no (valid) credentials.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized(AUTHENTICATION_REQUIRED.to_string()))
    }
}

/// resolve_principal
///
/// Works out who is calling:
/// 1. In `Env::Local`, an `x-username` header naming an existing user wins.
/// 2. Otherwise an `Authorization: Bearer <jwt>` header is validated and its subject
///    loaded from the store.
///
/// No credentials at all yields `Ok(None)` (anonymous). A token that is present but
/// invalid, or whose user no longer exists, is an error.
pub async fn resolve_principal(
    repo: &dyn Repository,
    tokens: &TokenProvider,
    env: &Env,
    headers: &HeaderMap,
) -> Result<Option<AuthUser>, ApiError> {
    if *env == Env::Local {
        if let Some(username) = headers
            .get(LOCAL_PRINCIPAL_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            if let Some(user) = repo.find_user_by_username(username).await? {
                return Ok(Some(user.into()));
            }
        }
    }

    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };

    let claims = tokens.validate_token(token.trim())?;

    // Tokens outlive accounts; a deleted user must not keep access. The subject is
    // matched against usernames only, never emails.
    let user = repo
        .find_user_by_username(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Some(user.into()))
}

/// authenticate
///
/// Global middleware: resolves the principal once per request and stores it in the
/// request extensions for the `AuthUser` extractor.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user) = resolve_principal(
        state.repo.as_ref(),
        &state.tokens,
        &state.config.env,
        request.headers(),
    )
    .await?
    {
        tracing::debug!(username = %user.username, "request authenticated");
        request.extensions_mut().insert(user);
    }
    Ok(next.run(request).await)
}

/// require_auth
///
/// Route layer for protected routers: extracting `AuthUser` rejects anonymous
/// requests with 401 before any handler runs.
pub async fn require_auth(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}
