//! Business rules between the HTTP handlers and the repository.
//!
//! Every service follows the same shape: resolve related rows by primary key,
//! fail with `ApiError::NotFound` when one is missing, copy fields, persist, and
//! map the stored record back to a DTO.

mod auth;
mod categories;
mod comments;
mod posts;

pub use auth::AuthService;
pub use categories::CategoryService;
pub use comments::CommentService;
pub use posts::PostService;
