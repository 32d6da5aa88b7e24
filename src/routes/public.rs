use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without credentials: every read on posts, categories and
/// comments, plus the auth endpoints that hand out tokens.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- Auth ---
        // login/signin and register/signup are aliases of each other.
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/signin", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/signup", post(handlers::auth::register))
        // --- Posts ---
        // GET /posts?pageNo=&pageSize=&sortBy=&sortDir=
        .route("/posts", get(handlers::posts::get_all_posts))
        // GET /posts/{id}: representation picked by ?version, X-API-VERSION or Accept.
        .route("/posts/{id}", get(handlers::posts::get_post_by_id))
        .route("/posts/{id}/v2", get(handlers::posts::get_post_by_id_v2))
        .route(
            "/posts/category/{id}",
            get(handlers::posts::get_posts_by_category),
        )
        // --- Categories ---
        .route("/categories", get(handlers::categories::get_categories))
        .route("/categories/{id}", get(handlers::categories::get_category))
        // --- Comments ---
        .route("/posts/{id}/comments", get(handlers::comments::get_comments))
        .route(
            "/posts/{id}/comments/{comment_id}",
            get(handlers::comments::get_comment),
        )
}
