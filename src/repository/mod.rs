use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    models::{Category, Comment, NewCategory, NewComment, NewPost, NewUser, Post, Role, User},
    pagination::{Page, PageRequest},
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Persistence failures. Unique and foreign-key violations are split out as
/// `Constraint` so callers can tell a rejected write from a broken connection.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() || db.is_foreign_key_violation() {
                return RepositoryError::Constraint(db.message().to_string());
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The contract for every persistence operation. Services only ever talk to
/// `Arc<dyn Repository>`, so Postgres and the in-memory store are interchangeable.
///
/// `update_*` return `None` and `delete_*` return `false` when the row is gone.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Categories ---
    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category>;
    async fn find_category(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn update_category(&self, category: Category) -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;

    // --- Posts ---
    async fn insert_post(&self, post: NewPost) -> RepoResult<Post>;
    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>>;
    // Sorted, offset-limited slice plus the total row count.
    async fn page_posts(&self, request: PageRequest) -> RepoResult<Page<Post>>;
    async fn find_posts_by_category(&self, category_id: i64) -> RepoResult<Vec<Post>>;
    async fn update_post(&self, post: Post) -> RepoResult<Option<Post>>;
    // Cascades to the post's comments.
    async fn delete_post(&self, id: i64) -> RepoResult<bool>;

    // --- Comments ---
    async fn insert_comment(&self, comment: NewComment) -> RepoResult<Comment>;
    async fn find_comment(&self, id: i64) -> RepoResult<Option<Comment>>;
    async fn find_comments_by_post(&self, post_id: i64) -> RepoResult<Vec<Comment>>;
    // Batch variant used when assembling a page of posts.
    async fn find_comments_by_posts(&self, post_ids: &[i64]) -> RepoResult<Vec<Comment>>;
    async fn update_comment(&self, comment: Comment) -> RepoResult<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> RepoResult<bool>;

    // --- Users & Roles ---
    // Exact username match only; token subjects are always usernames.
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    // Matches either column; roles are attached to the returned user.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> RepoResult<Option<User>>;
    async fn exists_by_username(&self, username: &str) -> RepoResult<bool>;
    async fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    async fn find_role_by_name(&self, name: &str) -> RepoResult<Option<Role>>;
    /// Inserts the user and its role links atomically.
    async fn create_user(&self, user: NewUser, role_ids: &[i64]) -> RepoResult<User>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held by the application state.
pub type RepositoryState = Arc<dyn Repository>;
