use blog_api::{
    errors::field_messages,
    models::{
        CategoryDto, CommentDto, ErrorDetails, JwtAuthResponse, LoginDto, PostDto, PostResponse,
        RegisterDto,
    },
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

// --- Validation Rules ---

#[test]
fn test_comment_body_needs_ten_characters_and_valid_email() {
    let comment = CommentDto {
        name: "Ann".into(),
        email: "not-an-email".into(),
        body: "too short".into(),
        ..CommentDto::default()
    };

    let messages = field_messages(&comment.validate().unwrap_err());
    assert_eq!(
        messages.get("body").map(String::as_str),
        Some("Comment body must be minimum 10 characters")
    );
    assert_eq!(
        messages.get("email").map(String::as_str),
        Some("Email should be a valid address")
    );
    assert!(!messages.contains_key("name"));
}

#[test]
fn test_register_dto_rules() {
    let valid = RegisterDto {
        name: "Jane".into(),
        username: "jane".into(),
        email: "jane@example.com".into(),
        password: "password123".into(),
    };
    assert!(valid.validate().is_ok());

    let invalid = RegisterDto {
        name: String::new(),
        username: "jo".into(),
        email: "jane".into(),
        password: "short".into(),
    };
    let messages = field_messages(&invalid.validate().unwrap_err());
    assert_eq!(messages.len(), 4);
}

#[test]
fn test_category_and_login_require_non_empty_fields() {
    assert!(CategoryDto::default().validate().is_err());
    assert!(LoginDto::default().validate().is_err());
    assert!(
        LoginDto {
            username_or_email: "jane".into(),
            password: "x".into(),
        }
        .validate()
        .is_ok()
    );
}

// --- Wire Shape ---

#[test]
fn test_post_dto_uses_camel_case_and_ignores_missing_output_fields() {
    let post: PostDto = serde_json::from_value(json!({
        "title": "Hello",
        "description": "A long description",
        "content": "Body",
        "categoryId": 3
    }))
    .unwrap();

    assert_eq!(post.id, 0);
    assert_eq!(post.category_id, 3);
    assert!(post.comments.is_empty());

    let value = serde_json::to_value(&post).unwrap();
    assert!(value.get("categoryId").is_some());
    assert!(value.get("category_id").is_none());
}

#[test]
fn test_comment_post_id_is_optional_on_the_wire() {
    let comment: CommentDto = serde_json::from_value(json!({
        "name": "Ann",
        "email": "ann@example.com",
        "body": "Long enough comment"
    }))
    .unwrap();
    assert_eq!(comment.post_id, None);
    assert!(serde_json::to_value(&comment).unwrap().get("postId").is_none());
}

#[test]
fn test_post_response_and_token_field_names() {
    let page = serde_json::to_value(PostResponse {
        page_size: 10,
        total_pages: 1,
        last: true,
        ..PostResponse::default()
    })
    .unwrap();
    for key in ["content", "pageNo", "pageSize", "totalElements", "totalPages", "last"] {
        assert!(page.get(key).is_some(), "missing {key}");
    }

    let token = serde_json::to_value(JwtAuthResponse::bearer("abc".into())).unwrap();
    assert_eq!(token, json!({ "accessToken": "abc", "tokenType": "Bearer" }));
}

#[test]
fn test_error_details_shape() {
    let details = serde_json::to_value(ErrorDetails {
        timestamp: Utc::now(),
        message: "Post not found with ID : '1'".into(),
        details: "uri=/api/v1/posts/1".into(),
    })
    .unwrap();

    assert!(details["timestamp"].is_string());
    assert_eq!(details["details"], "uri=/api/v1/posts/1");
}
