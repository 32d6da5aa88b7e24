use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    auth::{AuthUser, ROLE_ADMIN},
    errors::{ApiError, ValidatedJson},
    extract::{Path, Query},
    models::{PostDto, PostDtoV2, PostResponse},
    pagination::{PageParams, PageRequest},
};

/// Custom header carrying the requested representation number.
pub const API_VERSION_HEADER: &str = "x-api-version";

/// Vendor media type selecting the v5 representation through `Accept`.
pub const V5_MEDIA_TYPE: &str = "application/vnd.companyname.v5+json";

const VENDOR_MEDIA_PREFIX: &str = "application/vnd.companyname.v";

/// ApiVersion
///
/// The five representations of a single post. Only `V2` changes the payload shape
/// and only `V5` changes the response media type; the rest serve `PostDto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
}

impl ApiVersion {
    fn parse(raw: &str) -> Result<Self, ApiError> {
        let trimmed = raw.trim();
        let number = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        match number {
            "1" => Ok(ApiVersion::V1),
            "2" => Ok(ApiVersion::V2),
            "3" => Ok(ApiVersion::V3),
            "4" => Ok(ApiVersion::V4),
            "5" => Ok(ApiVersion::V5),
            _ => Err(ApiError::BadRequest(format!(
                "Unsupported API version: {trimmed}"
            ))),
        }
    }

    /// negotiate
    ///
    /// Picks the representation for `GET /api/v1/posts/{id}`. The `version` query
    /// parameter wins over the `X-API-VERSION` header, which wins over a vendor
    /// media type in `Accept`. Nothing at all means v1.
    pub fn negotiate(query: Option<&str>, headers: &HeaderMap) -> Result<Self, ApiError> {
        if let Some(raw) = query {
            return Self::parse(raw);
        }

        if let Some(value) = headers.get(API_VERSION_HEADER) {
            let raw = value
                .to_str()
                .map_err(|_| ApiError::BadRequest("Unsupported API version".to_string()))?;
            return Self::parse(raw);
        }

        let accept = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        for media in accept.split(',') {
            let media = media.split(';').next().unwrap_or_default().trim();
            if let Some(number) = media
                .strip_prefix(VENDOR_MEDIA_PREFIX)
                .and_then(|rest| rest.strip_suffix("+json"))
            {
                return Self::parse(number);
            }
        }

        Ok(ApiVersion::V1)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VersionParams {
    /// Representation number, `1` through `5`.
    pub version: Option<String>,
}

/// get_all_posts
///
/// [Public Route] One page of posts with their comments.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(PageParams),
    responses(
        (status = 200, description = "Page of posts", body = PostResponse),
        (status = 400, description = "Invalid paging or sort parameters")
    ),
    tag = "posts"
)]
pub async fn get_all_posts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostResponse>, ApiError> {
    let request = PageRequest::try_from(params)?;
    Ok(Json(state.posts.get_all_posts(request).await?))
}

/// get_post_by_id
///
/// [Public Route] Reads one post. The representation is negotiated from the
/// `version` query parameter, the `X-API-VERSION` header or the `Accept` media type.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(
        ("id" = i64, Path, description = "Post ID"),
        VersionParams,
        ("X-API-VERSION" = Option<String>, Header, description = "Representation number")
    ),
    responses(
        (status = 200, description = "Post (v2 adds tags)", body = PostDto),
        (status = 400, description = "Unsupported API version"),
        (status = 404, description = "Post not found")
    ),
    tag = "posts"
)]
pub async fn get_post_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<VersionParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let version = ApiVersion::negotiate(params.version.as_deref(), &headers)?;
    tracing::debug!(post_id = id, ?version, "post representation negotiated");

    match version {
        ApiVersion::V2 => Ok(Json(state.posts.get_post_by_id_v2(id).await?).into_response()),
        ApiVersion::V5 => {
            let mut response = Json(state.posts.get_post_by_id(id).await?).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(V5_MEDIA_TYPE));
            Ok(response)
        }
        ApiVersion::V1 | ApiVersion::V3 | ApiVersion::V4 => {
            Ok(Json(state.posts.get_post_by_id(id).await?).into_response())
        }
    }
}

/// get_post_by_id_v2
///
/// [Public Route] The v2 representation addressed by path suffix.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/v2",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post with tags", body = PostDtoV2),
        (status = 404, description = "Post not found")
    ),
    tag = "posts"
)]
pub async fn get_post_by_id_v2(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDtoV2>, ApiError> {
    Ok(Json(state.posts.get_post_by_id_v2(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/category/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Posts in category", body = [PostDto]),
        (status = 404, description = "Category not found")
    ),
    tag = "posts"
)]
pub async fn get_posts_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<PostDto>>, ApiError> {
    Ok(Json(state.posts.get_posts_by_category(category_id).await?))
}

/// create_post
///
/// [Admin Route] Creates a post in an existing category.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostDto,
    responses(
        (status = 201, description = "Created", body = PostDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PostDto>,
) -> Result<(StatusCode, Json<PostDto>), ApiError> {
    user.require_role(ROLE_ADMIN)?;
    let post = state.posts.create_post(payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostDto,
    responses(
        (status = 200, description = "Updated", body = PostDto),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Post or category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<PostDto>,
) -> Result<Json<PostDto>, ApiError> {
    user.require_role(ROLE_ADMIN)?;
    Ok(Json(state.posts.update_post(id, payload).await?))
}

/// delete_post
///
/// [Admin Route] Deletes a post together with its comments.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "posts"
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<String, ApiError> {
    user.require_role(ROLE_ADMIN)?;
    state.posts.delete_post_by_id(id).await?;
    Ok(format!("Post with ID {id} deleted successfully!"))
}
