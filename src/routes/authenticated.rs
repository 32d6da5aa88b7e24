use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Comment writes. Any signed-in user may post, edit or remove comments; the
/// handlers only need the `AuthUser` to exist.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /posts/{id}/comments
        .route("/posts/{id}/comments", post(handlers::comments::add_comment))
        // PUT/DELETE /posts/{id}/comments/{comment_id}
        // The comment must belong to the post in the path.
        .route(
            "/posts/{id}/comments/{comment_id}",
            put(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        )
}
