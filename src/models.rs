use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

// --- Persisted Records (Mapped to Database) ---

/// Category
///
/// A row of the `categories` table. Posts reference it through `category_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Post
///
/// A row of the `posts` table. Comments are loaded separately by `post_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    // FK to categories.id, always resolvable.
    pub category_id: i64,
}

/// Comment
///
/// A row of the `comments` table. Deleted together with its post.
#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub post_id: i64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// User
///
/// A row of the `users` table. `password` holds the argon2 PHC string, never the
/// plaintext. Roles live in `users_roles` and are attached by the repository.
#[derive(Debug, Clone, PartialEq, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[sqlx(skip)]
    pub roles: Vec<Role>,
}

// --- Insert Shapes ---

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub body: String,
    pub post_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    // Already hashed.
    pub password: String,
}

// --- Request / Response Payloads ---

/// CategoryDto
///
/// Input and output shape of the category endpoints. `id` is ignored on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryDto {
    #[serde(default)]
    pub id: i64,
    #[validate(length(min = 1, message = "Category name should not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// CommentDto
///
/// Input and output shape of the comment endpoints. On input, `postId` is optional;
/// when present it must name the post in the request path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentDto {
    #[serde(default)]
    pub id: i64,
    #[validate(length(min = 1, message = "Name should not be null or empty"))]
    pub name: String,
    #[validate(
        length(min = 1, message = "Email should not be null or empty"),
        email(message = "Email should be a valid address")
    )]
    pub email: String,
    #[validate(length(min = 10, message = "Comment body must be minimum 10 characters"))]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

/// PostDto
///
/// The v1 representation of a post, also used as the create/update payload.
/// `id` and `comments` are ignored on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDto {
    #[serde(default)]
    pub id: i64,
    #[validate(length(min = 2, message = "Post title should have at least 2 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Post description should have at least 10 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Post content should not be empty"))]
    pub content: String,
    #[serde(default)]
    pub comments: Vec<CommentDto>,
    #[serde(default)]
    pub category_id: i64,
}

/// PostDtoV2
///
/// The v2 representation: the v1 fields plus `tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDtoV2 {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub comments: Vec<CommentDto>,
    pub category_id: i64,
    pub tags: Vec<String>,
}

/// PostResponse
///
/// One page of posts plus the accounting needed to walk the remaining pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostResponse {
    pub content: Vec<PostDto>,
    pub page_no: i64,
    pub page_size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub last: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginDto {
    #[validate(length(min = 1, message = "Username or email should not be empty"))]
    pub username_or_email: String,
    #[validate(length(min = 1, message = "Password should not be empty"))]
    pub password: String,
}

/// RegisterDto
///
/// Self-service sign-up payload. New accounts always receive `ROLE_USER`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterDto {
    #[validate(length(min = 1, message = "Name should not be empty"))]
    pub name: String,
    #[validate(length(min = 3, message = "Username should have at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Email should be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password should have at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JwtAuthResponse {
    pub access_token: String,
    pub token_type: String,
}

impl JwtAuthResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// ErrorDetails
///
/// Uniform error body. `details` carries the request path as `uri=/api/v1/...`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorDetails {
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub details: String,
}

// --- Field Copies Between Records and Payloads ---

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

impl From<Comment> for CommentDto {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            name: comment.name,
            email: comment.email,
            body: comment.body,
            post_id: Some(comment.post_id),
        }
    }
}

impl PostDto {
    /// Assembles the v1 representation from a stored post and its comments.
    pub fn from_record(post: Post, comments: Vec<Comment>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            content: post.content,
            comments: comments.into_iter().map(CommentDto::from).collect(),
            category_id: post.category_id,
        }
    }
}

impl PostDtoV2 {
    pub fn from_v1(post: PostDto, tags: Vec<String>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            description: post.description,
            content: post.content,
            comments: post.comments,
            category_id: post.category_id,
            tags,
        }
    }
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.name == role)
    }
}
