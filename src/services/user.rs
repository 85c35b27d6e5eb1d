//! User use case
//!
//! Registration, login, email availability, avatar updates and session
//! validation. Every public operation except the two lookups
//! (`get_user_by_email`, `validate_session`) answers with an [`Envelope`].
//!
//! Registration does not check email uniqueness itself. Callers run
//! `get_user_by_email` first; a duplicate that slips through is rejected by
//! the unique index and reported as an internal failure.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{
    normalize_email, CheckEmailInput, Envelope, FailureKind, LoginInput, RegisterUserInput,
    Session, User, UserResponse,
};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use axum::http::StatusCode;
use chrono::Duration;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown email or wrong password
    #[error("Email or password is incorrect")]
    InvalidCredentials,

    /// User does not exist
    #[error("User not found: {0}")]
    NotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl UserServiceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UserServiceError::InvalidCredentials => FailureKind::Unauthorized,
            UserServiceError::NotFound(_) => FailureKind::NotFound,
            UserServiceError::InternalError(_) => FailureKind::Internal,
        }
    }

    /// Convert into a FAILED envelope, logging internal causes
    fn into_envelope(self, message: &str) -> Envelope {
        let kind = self.kind();
        if kind == FailureKind::Internal {
            tracing::error!(error = ?self, "{}", message);
        }
        Envelope::failure(message, kind, [self.to_string()])
    }
}

/// User service for registration and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new account.
    ///
    /// 201 with the public projection, or 500 when hashing or persistence fails.
    pub async fn register_user(&self, input: RegisterUserInput) -> Envelope {
        match self.try_register(input).await {
            Ok(user) => Envelope::success(
                "Account has been registered",
                StatusCode::CREATED,
                UserResponse::from_user(&user),
            ),
            Err(e) => e.into_envelope("Register account failed"),
        }
    }

    async fn try_register(&self, input: RegisterUserInput) -> Result<User, UserServiceError> {
        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(
            input.name,
            input.occupation,
            normalize_email(&input.email),
            password_hash,
        );

        let created = self.user_repo.create(&user).await?;
        tracing::info!(user_id = created.id, "user registered");
        Ok(created)
    }

    /// Authenticate by email and password.
    ///
    /// 200 with the projection plus a session token, 401 on unknown email or
    /// wrong password, 500 on repository failure.
    pub async fn login_user(&self, input: LoginInput) -> Envelope {
        match self.try_login(input).await {
            Ok((user, session)) => Envelope::success(
                "Successfully logged in",
                StatusCode::OK,
                UserResponse::from_user(&user).with_token(session.id),
            ),
            Err(e) => e.into_envelope("Login failed"),
        }
    }

    async fn try_login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(&input.email))
            .await?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }

        let session = Session::issue(user.id, Duration::days(self.session_expiration_days));
        self.session_repo
            .create(&session)
            .await
            .context("Failed to store session")?;

        Ok((user, session))
    }

    /// Whether an account with this email exists.
    ///
    /// Repository failures surface as `Err`, never as `false`.
    pub async fn get_user_by_email(&self, input: &CheckEmailInput) -> Result<bool, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(&input.email))
            .await
            .context("Failed to look up email")?;
        Ok(user.is_some())
    }

    /// Record the stored avatar path of a user.
    ///
    /// The file at `path` must already be written.
    pub async fn save_user_avatar(&self, user_id: i64, path: &str) -> Envelope {
        match self.try_save_avatar(user_id, path).await {
            Ok(user) => Envelope::success(
                "Avatar successfully uploaded",
                StatusCode::OK,
                UserResponse::from_user(&user),
            ),
            Err(e) => e.into_envelope("Avatar upload failed"),
        }
    }

    async fn try_save_avatar(&self, user_id: i64, path: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(UserServiceError::NotFound(user_id))?;

        Ok(self.user_repo.update_avatar(user_id, path).await?)
    }

    /// Fetch the public projection of one user
    pub async fn get_user_by_id(&self, user_id: i64) -> Envelope {
        let result = match self.user_repo.get_by_id(user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(UserServiceError::NotFound(user_id)),
            Err(e) => Err(UserServiceError::InternalError(e)),
        };

        match result {
            Ok(user) => Envelope::success(
                "Successfully fetched user data",
                StatusCode::OK,
                UserResponse::from_user(&user),
            ),
            Err(e) => e.into_envelope("Failed to fetch user data"),
        }
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens yield `Ok(None)`; expired sessions are deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self.session_repo.get_by_id(token).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            tracing::debug!(user_id = session.user_id, "expired session removed");
            return Ok(None);
        }

        Ok(self.user_repo.get_by_id(session.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::ResponseStatus;

    async fn setup_test_service() -> UserService {
        setup_test_service_with_pool().await.0
    }

    async fn setup_test_service_with_pool() -> (UserService, DynDatabasePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        (UserService::new(user_repo, session_repo), pool)
    }

    /// Service whose database has gone away after one registered account
    async fn setup_failing_service() -> UserService {
        let (service, pool) = setup_test_service_with_pool().await;
        service.register_user(register_input("gone@x.com", "p")).await;
        pool.sqlite().unwrap().close().await;
        service
    }

    fn register_input(email: &str, password: &str) -> RegisterUserInput {
        RegisterUserInput::new("Ada", "Engineer", email, password)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    #[tokio::test]
    async fn test_register_then_email_exists() {
        let service = setup_test_service().await;

        let envelope = service.register_user(register_input("a@x.com", "p")).await;

        assert_eq!(envelope.meta.code, 201);
        assert_eq!(envelope.meta.status, ResponseStatus::Success);
        assert_eq!(envelope.data["email"], "a@x.com");
        assert!(envelope.data.get("password").is_none());
        assert!(envelope.data.get("password_hash").is_none());

        let exists = service
            .get_user_by_email(&CheckEmailInput { email: "a@x.com".to_string() })
            .await
            .expect("Email lookup should succeed");
        assert!(exists);
    }

    #[tokio::test]
    async fn test_email_lookup_for_unknown_email() {
        let service = setup_test_service().await;

        let exists = service
            .get_user_by_email(&CheckEmailInput { email: "nobody@x.com".to_string() })
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_internal_failure() {
        let service = setup_test_service().await;
        service.register_user(register_input("dup@x.com", "p")).await;

        let envelope = service.register_user(register_input("dup@x.com", "p")).await;

        assert_eq!(envelope.meta.code, 500);
        assert_eq!(envelope.meta.status, ResponseStatus::Failed);
    }

    // ========================================================================
    // Login
    // ========================================================================

    #[tokio::test]
    async fn test_login_success_issues_valid_token() {
        let service = setup_test_service().await;
        service.register_user(register_input("login@x.com", "secret")).await;

        let envelope = service.login_user(LoginInput::new("login@x.com", "secret")).await;

        assert_eq!(envelope.meta.code, 200);
        let token = envelope.data["token"].as_str().expect("token present").to_string();

        let user = service
            .validate_session(&token)
            .await
            .unwrap()
            .expect("Session should resolve");
        assert_eq!(user.email, "login@x.com");
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let service = setup_test_service().await;
        service.register_user(register_input("login@x.com", "secret")).await;

        let envelope = service.login_user(LoginInput::new("login@x.com", "nope")).await;

        assert_eq!(envelope.meta.code, 401);
        assert!(envelope.data.get("token").is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_email_is_unauthorized() {
        let service = setup_test_service().await;

        let envelope = service.login_user(LoginInput::new("ghost@x.com", "secret")).await;

        assert_eq!(envelope.meta.code, 401);
    }

    // ========================================================================
    // Avatar and lookup
    // ========================================================================

    #[tokio::test]
    async fn test_save_avatar() {
        let service = setup_test_service().await;
        let registered = service.register_user(register_input("pic@x.com", "p")).await;
        let user_id = registered.data["id"].as_i64().unwrap();

        let envelope = service.save_user_avatar(user_id, "images/1-face.png").await;

        assert_eq!(envelope.meta.code, 200);
        assert_eq!(envelope.data["image_url"], "images/1-face.png");
    }

    #[tokio::test]
    async fn test_save_avatar_unknown_user() {
        let service = setup_test_service().await;

        let envelope = service.save_user_avatar(999, "images/999-face.png").await;

        assert_eq!(envelope.meta.code, 404);
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let service = setup_test_service().await;
        let registered = service.register_user(register_input("me@x.com", "p")).await;
        let user_id = registered.data["id"].as_i64().unwrap();

        assert_eq!(service.get_user_by_id(user_id).await.meta.code, 200);
        assert_eq!(service.get_user_by_id(user_id + 100).await.meta.code, 404);
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let service = setup_test_service().await;

        let envelope = service
            .register_user(register_input(" Ada@Example.COM ", "secret"))
            .await;
        assert_eq!(envelope.meta.code, 201);
        assert_eq!(envelope.data["email"], "ada@example.com");

        let exists = service
            .get_user_by_email(&CheckEmailInput { email: "ADA@example.com".to_string() })
            .await
            .unwrap();
        assert!(exists);

        let login = service.login_user(LoginInput::new("ada@EXAMPLE.com", "secret")).await;
        assert_eq!(login.meta.code, 200);

        let duplicate = service.register_user(register_input("ada@example.com", "other")).await;
        assert_eq!(duplicate.meta.code, 500);
    }

    // ========================================================================
    // Repository failures
    // ========================================================================

    #[tokio::test]
    async fn test_email_lookup_surfaces_repository_error() {
        let service = setup_failing_service().await;

        let result = service
            .get_user_by_email(&CheckEmailInput { email: "gone@x.com".to_string() })
            .await;

        assert!(matches!(result, Err(UserServiceError::InternalError(_))));
    }

    #[tokio::test]
    async fn test_login_with_repository_error_is_internal() {
        let service = setup_failing_service().await;

        let envelope = service.login_user(LoginInput::new("gone@x.com", "p")).await;

        assert_eq!(envelope.meta.code, 500);
        assert_eq!(envelope.meta.status, ResponseStatus::Failed);
        assert!(envelope.data.get("token").is_none());
    }

    #[tokio::test]
    async fn test_register_and_lookups_with_repository_error_are_internal() {
        let service = setup_failing_service().await;

        let register = service.register_user(register_input("new@x.com", "p")).await;
        assert_eq!(register.meta.code, 500);

        assert_eq!(service.get_user_by_id(1).await.meta.code, 500);
        assert_eq!(service.save_user_avatar(1, "images/a.png").await.meta.code, 500);
        assert!(service.validate_session("any-token").await.is_err());
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    #[tokio::test]
    async fn test_validate_unknown_token() {
        let service = setup_test_service().await;

        assert!(service.validate_session("not-a-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service =
            UserService::with_session_expiration(user_repo, session_repo.clone(), -1);

        service.register_user(register_input("old@x.com", "p")).await;
        let envelope = service.login_user(LoginInput::new("old@x.com", "p")).await;
        let token = envelope.data["token"].as_str().unwrap().to_string();

        assert!(service.validate_session(&token).await.unwrap().is_none());
        assert!(session_repo.get_by_id(&token).await.unwrap().is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_property_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        UserService::new(user_repo, session_repo)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// Any registration with a fresh email succeeds and never exposes the password.
        #[test]
        fn property_register_hides_password(
            name in "[A-Za-z ]{1,20}",
            occupation in "[A-Za-z ]{0,20}",
            local in "[a-z]{1,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{1,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_property_test_service().await;
                let email = format!("{}@example.com", local);

                let envelope = service
                    .register_user(RegisterUserInput::new(name, occupation, email.clone(), password.clone()))
                    .await;

                prop_assert_eq!(envelope.meta.code, 201);
                prop_assert_eq!(envelope.data["email"].as_str(), Some(email.as_str()));
                prop_assert!(envelope.data.get("password").is_none());
                prop_assert!(envelope.data.get("password_hash").is_none());
                let serialized = serde_json::to_string(&envelope).unwrap();
                prop_assert!(!serialized.contains("$argon2"));
                Ok(())
            });
            result?;
        }

        /// A wrong password against an existing email is always 401, never 500.
        #[test]
        fn property_wrong_password_is_unauthorized(
            password in "[a-z0-9]{1,16}",
            wrong in "[A-Z]{1,16}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_property_test_service().await;
                service
                    .register_user(RegisterUserInput::new("P", "Q", "prop@example.com", password))
                    .await;

                let envelope = service.login_user(LoginInput::new("prop@example.com", wrong)).await;

                prop_assert_eq!(envelope.meta.code, 401);
                Ok(())
            });
            result?;
        }
    }
}
