use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    errors::{ApiError, ValidatedJson},
    extract::Path,
    models::CommentDto,
};

/// get_comments
///
/// [Public Route] All comments of a post, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentDto]),
        (status = 404, description = "Post not found")
    ),
    tag = "comments"
)]
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentDto>>, ApiError> {
    Ok(Json(state.comments.get_comments_by_post_id(post_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments/{comment_id}",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Found", body = CommentDto),
        (status = 400, description = "Comment does not belong to post"),
        (status = 404, description = "Post or comment not found")
    ),
    tag = "comments"
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Json<CommentDto>, ApiError> {
    Ok(Json(state.comments.get_comment_by_id(post_id, comment_id).await?))
}

/// add_comment
///
/// [Authenticated Route] Adds a comment under an existing post.
#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CommentDto,
    responses(
        (status = 201, description = "Comment Added", body = CommentDto),
        (status = 400, description = "Validation failed or postId mismatch"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Post not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn add_comment(
    user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<CommentDto>,
) -> Result<(StatusCode, Json<CommentDto>), ApiError> {
    tracing::debug!(username = %user.username, post_id, "adding comment");
    let comment = state.comments.create_comment(post_id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}/comments/{comment_id}",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body = CommentDto,
    responses(
        (status = 200, description = "Updated", body = CommentDto),
        (status = 400, description = "Comment does not belong to post"),
        (status = 404, description = "Post or comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn update_comment(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    ValidatedJson(payload): ValidatedJson<CommentDto>,
) -> Result<Json<CommentDto>, ApiError> {
    Ok(Json(
        state
            .comments
            .update_comment(post_id, comment_id, payload)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}/comments/{comment_id}",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 400, description = "Comment does not belong to post"),
        (status = 404, description = "Post or comment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn delete_comment(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<String, ApiError> {
    state.comments.delete_comment(post_id, comment_id).await?;
    Ok("Comment deleted successfully".to_string())
}
