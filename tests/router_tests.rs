use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use blog_api::{
    AppConfig, AppState, create_router,
    config::AdminBootstrap,
    repository::InMemoryRepository,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

// --- Test Harness ---

struct TestRouter {
    app: Router,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl TestRouter {
    /// Router over a fresh in-memory store with an `admin` account provisioned.
    async fn new() -> Self {
        let state = AppState::new(Arc::new(InMemoryRepository::new()), AppConfig::default());
        state
            .auth
            .bootstrap_admin(&AdminBootstrap {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: "admin-password".into(),
            })
            .await
            .unwrap();
        Self {
            app: create_router(state),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None, &[], None).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                &[],
                Some(json!({ "usernameOrEmail": username, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        let body = response.json();
        assert_eq!(body["tokenType"], "Bearer");
        body["accessToken"].as_str().unwrap().to_string()
    }

    async fn register_and_login(&self, username: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/auth/register",
                None,
                &[],
                Some(json!({
                    "name": "Reader",
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123"
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        self.login(username, "password123").await
    }

    /// Creates a category and a post as admin, returning `(category_id, post_id)`.
    async fn seed_post(&self, admin: &str, title: &str) -> (i64, i64) {
        let category = self
            .send(
                Method::POST,
                "/api/v1/categories",
                Some(admin),
                &[],
                Some(json!({ "name": "Rust", "description": "Systems" })),
            )
            .await;
        assert_eq!(category.status, StatusCode::CREATED);
        let category_id = category.json()["id"].as_i64().unwrap();

        let post = self
            .send(
                Method::POST,
                "/api/v1/posts",
                Some(admin),
                &[],
                Some(json!({
                    "title": title,
                    "description": "A description long enough",
                    "content": "Body text",
                    "categoryId": category_id
                })),
            )
            .await;
        assert_eq!(post.status, StatusCode::CREATED, "{}", post.text());
        (category_id, post.json()["id"].as_i64().unwrap())
    }
}

// --- Tests ---

#[tokio::test]
async fn test_health_and_request_id() {
    let app = TestRouter::new().await;
    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestRouter::new().await;
    let response = app.get("/api-docs/openapi.json").await;

    assert_eq!(response.status, StatusCode::OK);
    let doc = response.json();
    assert!(doc["paths"]["/api/v1/posts/{id}"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_anonymous_write_is_unauthorized_with_error_details() {
    let app = TestRouter::new().await;
    let response = app
        .send(
            Method::POST,
            "/api/v1/categories",
            None,
            &[],
            Some(json!({ "name": "Rust" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body = response.json();
    assert_eq!(
        body["message"],
        "Full authentication is required to access this resource"
    );
    assert_eq!(body["details"], "uri=/api/v1/categories");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_non_admin_write_is_forbidden() {
    let app = TestRouter::new().await;
    let token = app.register_and_login("reader").await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/categories",
            Some(&token),
            &[],
            Some(json!({ "name": "Rust" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["message"], "Access Denied");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized_even_on_public_route() {
    let app = TestRouter::new().await;
    let response = app
        .send(Method::GET, "/api/v1/posts", Some("not.a.jwt"), &[], None)
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["details"], "uri=/api/v1/posts");
}

#[tokio::test]
async fn test_all_five_versions_read_the_same_post() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;
    let (category_id, post_id) = app.seed_post(&admin, "Versioned").await;
    let base = format!("/api/v1/posts/{post_id}");

    let v1 = app.get(&base).await;
    let v2 = app.get(&format!("{base}/v2")).await;
    let v3 = app.get(&format!("{base}?version=3")).await;
    let v4 = app
        .send(Method::GET, &base, None, &[("x-api-version", "4")], None)
        .await;
    let v5 = app
        .send(
            Method::GET,
            &base,
            None,
            &[("accept", "application/vnd.companyname.v5+json")],
            None,
        )
        .await;

    for response in [&v1, &v2, &v3, &v4, &v5] {
        assert_eq!(response.status, StatusCode::OK);
        let body = response.json();
        assert_eq!(body["id"], post_id);
        assert_eq!(body["title"], "Versioned");
        assert_eq!(body["categoryId"], category_id);
    }
    assert_eq!(v1.json(), v3.json());
    assert_eq!(v1.json(), v4.json());
    assert_eq!(v1.json(), v5.json());
    assert_eq!(v2.json()["tags"], json!(["Rust"]));
    assert_eq!(
        v5.headers[header::CONTENT_TYPE],
        "application/vnd.companyname.v5+json"
    );

    let unsupported = app.get(&format!("{base}?version=6")).await;
    assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_failure_returns_field_map() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/posts",
            Some(&admin),
            &[],
            Some(json!({
                "title": "x",
                "description": "short",
                "content": "Body",
                "categoryId": 1
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["title"], "Post title should have at least 2 characters");
    assert_eq!(
        body["description"],
        "Post description should have at least 10 characters"
    );
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn test_post_with_missing_category_is_not_found() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;

    let response = app
        .send(
            Method::POST,
            "/api/v1/posts",
            Some(&admin),
            &[],
            Some(json!({
                "title": "Orphan",
                "description": "No category behind this one",
                "content": "Body",
                "categoryId": 999
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let body = response.json();
    assert_eq!(body["message"], "Category not found with categoryId : '999'");
    assert_eq!(body["details"], "uri=/api/v1/posts");
}

#[tokio::test]
async fn test_paged_listing_respects_parameters() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;
    let (category_id, _) = app.seed_post(&admin, "Alpha").await;
    for title in ["Bravo", "Charlie"] {
        let response = app
            .send(
                Method::POST,
                "/api/v1/posts",
                Some(&admin),
                &[],
                Some(json!({
                    "title": title,
                    "description": "A description long enough",
                    "content": "Body text",
                    "categoryId": category_id
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let page = app
        .get("/api/v1/posts?pageNo=0&pageSize=2&sortBy=title&sortDir=desc")
        .await
        .json();
    assert_eq!(page["content"][0]["title"], "Charlie");
    assert_eq!(page["content"][1]["title"], "Bravo");
    assert_eq!(page["pageNo"], 0);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["last"], false);

    let defaults = app.get("/api/v1/posts").await.json();
    assert_eq!(defaults["pageSize"], 10);
    assert_eq!(defaults["content"][0]["title"], "Alpha");
    assert_eq!(defaults["last"], true);

    let bad = app.get("/api/v1/posts?sortBy=secret").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_login_and_comment_flow() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;
    let (category_id, post_id) = app.seed_post(&admin, "Discuss").await;
    let other = app
        .send(
            Method::POST,
            "/api/v1/posts",
            Some(&admin),
            &[],
            Some(json!({
                "title": "Elsewhere",
                "description": "A description long enough",
                "content": "Body text",
                "categoryId": category_id
            })),
        )
        .await;
    assert_eq!(other.status, StatusCode::CREATED);
    let other_post_id = other.json()["id"].as_i64().unwrap();

    let reader = app.register_and_login("reader").await;
    let comments_uri = format!("/api/v1/posts/{post_id}/comments");
    let comment = json!({
        "name": "Reader",
        "email": "reader@example.com",
        "body": "Really enjoyed this one"
    });

    // Anonymous callers may read but not write.
    let anonymous = app
        .send(Method::POST, &comments_uri, None, &[], Some(comment.clone()))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let created = app
        .send(Method::POST, &comments_uri, Some(&reader), &[], Some(comment.clone()))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let comment_id = created.json()["id"].as_i64().unwrap();
    assert_eq!(created.json()["postId"], post_id);

    // Addressing the comment under another post is a 400.
    let wrong_post = app
        .get(&format!("/api/v1/posts/{other_post_id}/comments/{comment_id}"))
        .await;
    assert_eq!(wrong_post.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_post.json()["message"], "Comment does not belong to post");

    let listed = app.get(&comments_uri).await.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let post = app.get(&format!("/api/v1/posts/{post_id}")).await.json();
    assert_eq!(post["comments"][0]["id"], comment_id);
}

#[tokio::test]
async fn test_duplicate_registration_and_bad_login() {
    let app = TestRouter::new().await;
    app.register_and_login("reader").await;

    let duplicate = app
        .send(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            &[],
            Some(json!({
                "name": "Again",
                "username": "reader",
                "email": "new@example.com",
                "password": "password123"
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json()["message"], "Username already exists!");

    let bad_login = app
        .send(
            Method::POST,
            "/api/v1/auth/signin",
            None,
            &[],
            Some(json!({ "usernameOrEmail": "reader", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(bad_login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_username_cannot_reuse_an_existing_email() {
    let app = TestRouter::new().await;

    let register = |username: &str, email: &str| {
        json!({
            "name": "Mallory",
            "username": username,
            "email": email,
            "password": "password123"
        })
    };
    let taken_as_username = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            &[],
            Some(register("admin@example.com", "mallory@example.com")),
        )
        .await;
    assert_eq!(taken_as_username.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken_as_username.json()["message"], "Username already exists!");

    // Usernames may look like addresses; such a username blocks that email too.
    let ops = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            &[],
            Some(register("ops@example.com", "ops-mailbox@example.com")),
        )
        .await;
    assert_eq!(ops.status, StatusCode::CREATED);
    let taken_as_email = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            &[],
            Some(register("mallory", "ops@example.com")),
        )
        .await;
    assert_eq!(taken_as_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken_as_email.json()["message"], "Email already exists!");

    // A regular account still cannot reach admin routes.
    let reader = app.register_and_login("mallory").await;
    let response = app
        .send(
            Method::POST,
            "/api/v1/categories",
            Some(&reader),
            &[],
            Some(json!({ "name": "Hijacked", "description": "Nope" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_extreme_page_values_do_not_overflow() {
    let app = TestRouter::new().await;
    let admin = app.login("admin", "admin-password").await;
    app.seed_post(&admin, "Only").await;

    let far = app
        .get(&format!("/api/v1/posts?pageNo={}", i64::MAX))
        .await;
    assert_eq!(far.status, StatusCode::OK, "{}", far.text());
    let page = far.json();
    assert_eq!(page["content"].as_array().map(Vec::len), Some(0));
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["totalPages"], 1);
    assert_eq!(page["last"], true);

    let huge = app
        .get(&format!("/api/v1/posts?pageSize={}", i64::MAX))
        .await
        .json();
    assert_eq!(huge["content"].as_array().map(Vec::len), Some(1));
    assert_eq!(huge["totalPages"], 1);
    assert_eq!(huge["last"], true);
}

#[tokio::test]
async fn test_malformed_path_and_query_use_error_details() {
    let app = TestRouter::new().await;

    let bad_query = app.get("/api/v1/posts?pageNo=abc").await;
    assert_eq!(bad_query.status, StatusCode::BAD_REQUEST);
    let body = bad_query.json();
    assert!(body["message"].as_str().unwrap().contains("pageNo"));
    assert_eq!(body["details"], "uri=/api/v1/posts");
    assert!(body["timestamp"].is_string());

    let bad_path = app.get("/api/v1/posts/abc").await;
    assert_eq!(bad_path.status, StatusCode::BAD_REQUEST);
    let body = bad_path.json();
    assert!(body["message"].as_str().unwrap().contains("abc"));
    assert_eq!(body["details"], "uri=/api/v1/posts/abc");

    let bad_comment = app.get("/api/v1/posts/1/comments/xyz").await;
    assert_eq!(bad_comment.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_comment.json()["details"], "uri=/api/v1/posts/1/comments/xyz");
}
