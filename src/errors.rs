use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::{models::ErrorDetails, repository::RepositoryError};

/// ApiError
///
/// The single error type surfaced by services and handlers. Every variant maps to a
/// status code and, except validation failures, to an `ErrorDetails` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{resource} not found with {field} : '{value}'")]
    NotFound {
        resource: &'static str,
        field: &'static str,
        value: i64,
    },
    /// A domain rule between two entities was violated (e.g. a comment addressed
    /// under a post it does not belong to).
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Access Denied")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, field: &'static str, value: i64) -> Self {
        ApiError::NotFound {
            resource,
            field,
            value,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            // Conflicts, bad input and anything unhandled all surface as 400.
            ApiError::Conflict(_)
            | ApiError::BadRequest(_)
            | ApiError::Validation(_)
            | ApiError::Repository(_)
            | ApiError::Unexpected(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Marker left on error responses so `attach_request_path` can fill in `details`.
#[derive(Clone, Debug)]
struct PendingErrorDetails(ErrorDetails);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::Validation(errors) = &self {
            return (status, Json(field_messages(errors))).into_response();
        }

        match &self {
            ApiError::Repository(_) | ApiError::Unexpected(_) => {
                tracing::error!(error = %self, "unhandled error");
            }
            _ => tracing::debug!(error = %self, status = %status, "request failed"),
        }

        let details = ErrorDetails {
            timestamp: Utc::now(),
            message: self.to_string(),
            details: String::new(),
        };
        let mut response = (status, Json(details.clone())).into_response();
        response
            .extensions_mut()
            .insert(PendingErrorDetails(details));
        response
    }
}

/// Flattens validator output to `field -> first message`.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("{field} is invalid"));
            (field.to_string(), message)
        })
        .collect()
}

/// attach_request_path
///
/// Rewrites error bodies produced by `ApiError` so that `details` names the request
/// path (`uri=/api/v1/posts/7`).
pub async fn attach_request_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<PendingErrorDetails>() {
        Some(PendingErrorDetails(mut details)) => {
            details.details = format!("uri={path}");
            (response.status(), Json(details)).into_response()
        }
        None => response,
    }
}

/// ValidatedJson
///
/// JSON body extractor that runs the payload's `validator` rules before the handler
/// sees it. Malformed JSON becomes `ApiError::BadRequest`, rule violations become
/// `ApiError::Validation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostDto;

    #[test]
    fn not_found_message_names_resource_field_and_value() {
        let err = ApiError::not_found("Category", "categoryId", 42);
        assert_eq!(err.to_string(), "Category not found with categoryId : '42'");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unhandled_errors_fall_back_to_bad_request() {
        assert_eq!(
            ApiError::Unexpected("boom".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Repository(RepositoryError::Constraint("fk".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn field_messages_maps_each_invalid_field() {
        let dto = PostDto {
            title: "x".into(),
            description: "short".into(),
            content: "body".into(),
            ..PostDto::default()
        };
        let errors = dto.validate().unwrap_err();
        let map = field_messages(&errors);

        assert_eq!(
            map.get("title").map(String::as_str),
            Some("Post title should have at least 2 characters")
        );
        assert!(map.contains_key("description"));
        assert!(!map.contains_key("content"));
    }
}
