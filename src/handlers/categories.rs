use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{AuthUser, ROLE_ADMIN},
    errors::{ApiError, ValidatedJson},
    extract::Path,
    models::CategoryDto,
};

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "All categories", body = [CategoryDto])),
    tag = "categories"
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    Ok(Json(state.categories.get_all_categories().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryDto),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryDto>, ApiError> {
    Ok(Json(state.categories.get_category(id).await?))
}

/// add_category
///
/// [Admin Route] Creates a category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryDto,
    responses(
        (status = 201, description = "Created", body = CategoryDto),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn add_category(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CategoryDto>,
) -> Result<(StatusCode, Json<CategoryDto>), ApiError> {
    user.require_role(ROLE_ADMIN)?;
    let category = state.categories.add_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryDto,
    responses(
        (status = 200, description = "Updated", body = CategoryDto),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<CategoryDto>,
) -> Result<Json<CategoryDto>, ApiError> {
    user.require_role(ROLE_ADMIN)?;
    Ok(Json(state.categories.update_category(id, payload).await?))
}

/// delete_category
///
/// [Admin Route] Deletes a category. Refused while any post still uses it.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = String),
        (status = 400, description = "Category still has posts"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<String, ApiError> {
    user.require_role(ROLE_ADMIN)?;
    state.categories.delete_category(id).await?;
    Ok(format!("Category with id {id} deleted successfully!"))
}
