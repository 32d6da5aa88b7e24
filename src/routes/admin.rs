use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Admin Router Module
///
/// Create, update and delete on posts and categories. Wrapped in the
/// authentication route layer (401 for anonymous callers); each handler then
/// requires `ROLE_ADMIN` (403 otherwise).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::posts::create_post))
        .route(
            "/posts/{id}",
            put(handlers::posts::update_post).delete(handlers::posts::delete_post),
        )
        .route("/categories", post(handlers::categories::add_category))
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
}
