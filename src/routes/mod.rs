//! Router Module Index
//!
//! Splits the API by access level. Each router declares paths relative to
//! `/api/v1`; `create_router` nests them and applies the authentication layer to
//! every router except the public one.

/// Anonymous read access plus sign-up and login.
pub mod public;

/// Any authenticated principal. Guarded by `auth::require_auth`.
pub mod authenticated;

/// Posts and categories writes. Authentication is enforced by the route layer,
/// the `ROLE_ADMIN` check inside each handler.
pub mod admin;
