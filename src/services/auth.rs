use crate::{
    auth::{ROLE_ADMIN, ROLE_USER, TokenProvider},
    config::AdminBootstrap,
    errors::ApiError,
    models::{JwtAuthResponse, LoginDto, NewUser, RegisterDto, User},
    password::{hash_password, verify_password},
    repository::RepositoryState,
};

const BAD_CREDENTIALS: &str = "Bad credentials";

/// AuthService
///
/// Account sign-up and credential exchange. Tokens are issued by the shared
/// `TokenProvider`, so anything it signs is accepted by the `authenticate` layer.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    tokens: TokenProvider,
}

impl AuthService {
    pub fn new(repo: RepositoryState, tokens: TokenProvider) -> Self {
        Self { repo, tokens }
    }

    pub async fn login(&self, dto: LoginDto) -> Result<JwtAuthResponse, ApiError> {
        let user = self
            .repo
            .find_user_by_username_or_email(&dto.username_or_email, &dto.username_or_email)
            .await?;

        // Unknown account and wrong password are indistinguishable to the caller.
        let Some(user) = user else {
            tracing::debug!(login = %dto.username_or_email, "login for unknown account");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        if !verify_blocking(dto.password, user.password.clone()).await? {
            tracing::debug!(username = %user.username, "login with wrong password");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let token = self.tokens.generate_token(&user.username)?;
        tracing::info!(username = %user.username, "login succeeded");
        Ok(JwtAuthResponse::bearer(token))
    }

    /// register
    ///
    /// Creates a `ROLE_USER` account. Username and email must both be unused, in
    /// either column: login accepts one field for both, so a username equal to
    /// someone's email would make that login ambiguous.
    pub async fn register(&self, dto: RegisterDto) -> Result<String, ApiError> {
        self.ensure_identity_free(&dto.username, &dto.email).await?;

        self.create_account(dto.name, dto.username, dto.email, &dto.password, &[ROLE_USER])
            .await?;
        Ok("User registered successfully!".to_string())
    }

    /// bootstrap_admin
    ///
    /// Startup hook: ensures the configured administrator exists. An existing
    /// account with the same username is left untouched.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<(), ApiError> {
        if self.repo.exists_by_username(&admin.username).await? {
            tracing::info!(username = %admin.username, "admin account already present");
            return Ok(());
        }
        if let Err(e) = self.ensure_identity_free(&admin.username, &admin.email).await {
            tracing::error!(username = %admin.username, error = %e, "admin bootstrap refused");
            return Err(e);
        }

        let user = self
            .create_account(
                admin.username.clone(),
                admin.username.clone(),
                admin.email.clone(),
                &admin.password,
                &[ROLE_ADMIN, ROLE_USER],
            )
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "admin account created");
        Ok(())
    }

    async fn ensure_identity_free(&self, username: &str, email: &str) -> Result<(), ApiError> {
        if self.repo.exists_by_username(username).await?
            || self.repo.exists_by_email(username).await?
        {
            return Err(ApiError::Conflict("Username already exists!".to_string()));
        }
        if self.repo.exists_by_email(email).await? || self.repo.exists_by_username(email).await?
        {
            return Err(ApiError::Conflict("Email already exists!".to_string()));
        }
        Ok(())
    }

    async fn create_account(
        &self,
        name: String,
        username: String,
        email: String,
        password: &str,
        roles: &[&str],
    ) -> Result<User, ApiError> {
        let mut role_ids = Vec::with_capacity(roles.len());
        for role in roles {
            let found = self
                .repo
                .find_role_by_name(role)
                .await?
                .ok_or_else(|| ApiError::Unexpected(format!("role {role} is not seeded")))?;
            role_ids.push(found.id);
        }

        let user = NewUser {
            name,
            username,
            email,
            password: hash_blocking(password.to_string()).await?,
        };
        Ok(self.repo.create_user(user, &role_ids).await?)
    }
}

// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Unexpected(format!("Password hashing task failed: {e}")))?
}

async fn verify_blocking(password: String, password_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| ApiError::Unexpected(format!("Password verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::{InMemoryRepository, Repository};

    fn service() -> (Arc<InMemoryRepository>, AuthService) {
        let repo = Arc::new(InMemoryRepository::new());
        let svc = AuthService::new(repo.clone(), TokenProvider::new("auth-service-test", 60_000));
        (repo, svc)
    }

    fn register_dto(username: &str, email: &str) -> RegisterDto {
        RegisterDto {
            name: "Jane".into(),
            username: username.into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_by_username_or_email() {
        let (repo, svc) = service();
        let message = svc.register(register_dto("jane", "jane@example.com")).await.unwrap();
        assert_eq!(message, "User registered successfully!");

        let stored = repo
            .find_user_by_username_or_email("jane", "jane")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.has_role(ROLE_USER));
        assert!(!stored.has_role(ROLE_ADMIN));
        assert_ne!(stored.password, "password123");

        for login in ["jane", "jane@example.com"] {
            let response = svc
                .login(LoginDto {
                    username_or_email: login.into(),
                    password: "password123".into(),
                })
                .await
                .unwrap();
            assert_eq!(response.token_type, "Bearer");
            assert!(!response.access_token.is_empty());
        }
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let (_, svc) = service();
        svc.register(register_dto("jane", "jane@example.com")).await.unwrap();

        let err = svc.register(register_dto("jane", "other@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already exists!");
        let err = svc.register(register_dto("janet", "jane@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already exists!");
    }

    #[tokio::test]
    async fn username_and_email_columns_cannot_collide() {
        let (_, svc) = service();
        svc.register(register_dto("jane", "jane@example.com")).await.unwrap();

        let err = svc
            .register(register_dto("jane@example.com", "mallory@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username already exists!");
        let err = svc.register(register_dto("mallory", "jane")).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already exists!");
    }

    #[tokio::test]
    async fn bootstrap_admin_refuses_email_owned_by_another_user() {
        let (repo, svc) = service();
        svc.register(register_dto("jane", "admin@example.com")).await.unwrap();

        let admin = AdminBootstrap {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "admin-password".into(),
        };
        assert!(svc.bootstrap_admin(&admin).await.is_err());
        assert!(!repo.exists_by_username("admin").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (_, svc) = service();
        svc.register(register_dto("jane", "jane@example.com")).await.unwrap();

        let err = svc
            .login(LoginDto {
                username_or_email: "jane".into(),
                password: "not-the-password".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let (repo, svc) = service();
        let admin = AdminBootstrap {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "admin-password".into(),
        };
        svc.bootstrap_admin(&admin).await.unwrap();
        svc.bootstrap_admin(&admin).await.unwrap();

        let user = repo
            .find_user_by_username_or_email("admin", "admin")
            .await
            .unwrap()
            .unwrap();
        assert!(user.has_role(ROLE_ADMIN));
        assert!(user.has_role(ROLE_USER));
    }
}
