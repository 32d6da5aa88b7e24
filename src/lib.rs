use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod password;
pub mod repository;
pub mod services;

// Routers split by access level (public, authenticated, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenProvider;
pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
use services::{AuthService, CategoryService, CommentService, PostService};

/// ApiDoc
///
/// OpenAPI document for every `/api/v1` endpoint, served as JSON at
/// `/api-docs/openapi.json` and rendered by Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog API",
        description = "Posts, categories and comments with JWT authentication."
    ),
    paths(
        handlers::auth::login, handlers::auth::register,
        handlers::posts::get_all_posts, handlers::posts::get_post_by_id,
        handlers::posts::get_post_by_id_v2, handlers::posts::get_posts_by_category,
        handlers::posts::create_post, handlers::posts::update_post, handlers::posts::delete_post,
        handlers::categories::get_categories, handlers::categories::get_category,
        handlers::categories::add_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::comments::get_comments, handlers::comments::get_comment,
        handlers::comments::add_comment, handlers::comments::update_comment,
        handlers::comments::delete_comment
    ),
    components(
        schemas(
            models::PostDto, models::PostDtoV2, models::PostResponse, models::CategoryDto,
            models::CommentDto, models::LoginDto, models::RegisterDto, models::JwtAuthResponse,
            models::ErrorDetails,
        )
    ),
    tags(
        (name = "auth", description = "Sign-up and token issuance"),
        (name = "posts", description = "Blog posts, paged listing and versioned reads"),
        (name = "categories", description = "Post categories"),
        (name = "comments", description = "Comments under a post"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/v1/auth/login"))
                        .build(),
                ),
            )
        }
    }
}

/// AppState
///
/// The single shared container handed to every handler and middleware. Services
/// hold their own clone of the repository handle, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
    /// Signs and validates bearer tokens.
    pub tokens: TokenProvider,
    pub posts: PostService,
    pub categories: CategoryService,
    pub comments: CommentService,
    pub auth: AuthService,
}

impl AppState {
    /// Wires every service to `repo` and a token provider derived from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let tokens = TokenProvider::from_config(&config);
        Self {
            posts: PostService::new(repo.clone()),
            categories: CategoryService::new(repo.clone()),
            comments: CommentService::new(repo.clone()),
            auth: AuthService::new(repo.clone(), tokens.clone()),
            repo,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenProvider {
    fn from_ref(app_state: &AppState) -> TokenProvider {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the whole application: the `/api/v1` routers, Swagger UI, the
/// authentication and error-detail middleware, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        // Protected routers reject anonymous callers with 401 before the handler runs.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn(auth::require_auth)),
        )
        .merge(admin::admin_routes().route_layer(middleware::from_fn(auth::require_auth)));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api)
        // Resolves the bearer token (or local header) once per request.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ))
        // Outside `authenticate` so its 401s also carry `details`.
        .layer(middleware::from_fn(errors::attach_request_path))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for `TraceLayer`, tagging it with method, URI and
/// the `x-request-id` assigned by `SetRequestIdLayer`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
