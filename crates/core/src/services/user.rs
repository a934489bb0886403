//! User service: registration, login and session tokens.

use std::{borrow::Cow, sync::LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use cinelog_common::{AppError, AppResult, IdGenerator};
use cinelog_db::{entities::user, repositories::UserRepository};
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

/// Letters, digits and `@ . + - _`.
#[allow(clippy::unwrap_used)]
static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,

    /// May be left blank.
    #[serde(default)]
    #[validate(custom(function = "optional_email"))]
    pub email: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub password2: String,
}

fn optional_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    Err(ValidationError::new("email").with_message(Cow::Borrowed("Enter a valid email address.")))
}

fn username_taken() -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(
        "username",
        ValidationError::new("unique")
            .with_message(Cow::Borrowed("A user with that username already exists.")),
    );
    AppError::InvalidForm(errors)
}

/// Login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user.
    ///
    /// The returned user carries a fresh session token, so the caller can
    /// log them in straight away.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.username_exists(&input.username).await? {
            return Err(username_taken());
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(input.email),
            password: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            is_admin: Set(false),
            is_moderator: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        // A concurrent registration of the same name loses on the unique index
        let user = match self.user_repo.create(model).await {
            Err(AppError::Conflict(_)) => return Err(username_taken()),
            result => result?,
        };
        tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    /// Authenticate a user by session token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate a user by username and password.
    ///
    /// Issues a session token if the user has none (after a logout).
    pub async fn authenticate(&self, input: LoginInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password)? {
            tracing::debug!(username = %input.username, "Password mismatch");
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        self.set_token(user, Some(self.id_gen.generate_token())).await
    }

    /// End every session of a user by replacing their token.
    pub async fn logout(&self, user: user::Model) -> AppResult<user::Model> {
        let user_id = user.id.clone();
        let user = self
            .set_token(user, Some(self.id_gen.generate_token()))
            .await?;
        tracing::info!(user_id = %user_id, "Rotated session token");
        Ok(user)
    }

    async fn set_token(&self, user: user::Model, token: Option<String>) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = user.into();
        active.token = Set(token);
        active.updated_at = Set(Some(Utc::now().into()));
        self.user_repo.update(active).await
    }
}

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::sync::Arc;

    fn create_test_user(username: &str, password: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: "u1".to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: "alice@example.com".to_string(),
            password: hash_password(password).unwrap(),
            token: token.map(ToString::to_string),
            is_admin: false,
            is_moderator: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn register_input(password: &str, password2: &str) -> RegisterInput {
        RegisterInput {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: password.to_string(),
            password2: password2.to_string(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_register_input_password_mismatch() {
        let errors = register_input("secret123", "secret124").validate().unwrap_err();
        let fields = cinelog_common::field_errors(&errors);

        assert_eq!(fields["password2"], vec!["Passwords do not match."]);
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_register_input_allows_blank_email_and_short_password() {
        let mut input = register_input("abc", "abc");
        input.email = String::new();

        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_register_input_checks_email_when_given() {
        let mut input = register_input("abc", "abc");
        input.email = "not-an-email".to_string();

        let errors = input.validate().unwrap_err();
        assert_eq!(
            cinelog_common::field_errors(&errors)["email"],
            vec!["Enter a valid email address."]
        );
    }

    #[test]
    fn test_register_input_requires_password() {
        let errors = register_input("", "").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_username_taken_is_a_username_field_error() {
        assert_eq!(
            username_taken().field_errors()["username"],
            vec!["A user with that username already exists."]
        );
    }

    #[test]
    fn test_register_input_rejects_bad_username() {
        let mut input = register_input("secret123", "secret123");
        input.username = "no spaces".to_string();

        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[tokio::test]
    async fn test_register_mismatch_creates_no_user() {
        // No query results queued: any database access would fail the test
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = UserService::new(UserRepository::new(db.clone()));

        let result = service
            .register(register_input("secret123", "different1"))
            .await;

        assert!(matches!(result, Err(AppError::InvalidForm(_))));
        drop(service);
        assert!(Arc::try_unwrap(db).unwrap().into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let err = service
            .register(register_input("secret123", "secret123"))
            .await
            .unwrap_err();

        assert_eq!(
            err.field_errors()["username"],
            vec!["A user with that username already exists."]
        );
    }

    #[tokio::test]
    async fn test_register_success_issues_token() {
        let created = create_test_user("alice", "secret123", Some("tok"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[created.clone()]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let user = service
            .register(register_input("secret123", "secret123"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(user.token.is_some());
    }

    #[tokio::test]
    async fn test_register_without_email() {
        let mut created = create_test_user("bob", "abc", Some("tok"));
        created.email = String::new();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[created]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let mut input = register_input("abc", "abc");
        input.username = "bob".to_string();
        input.email = String::new();
        let user = service.register(input).await.unwrap();

        assert_eq!(user.username, "bob");
        assert!(user.email.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let user = create_test_user("alice", "secret123", Some("tok"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service
            .authenticate(LoginInput {
                username: "alice".to_string(),
                password: "nope".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service
            .authenticate(LoginInput {
                username: "ghost".to_string(),
                password: "secret123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_keeps_existing_token() {
        let user = create_test_user("alice", "secret123", Some("tok"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let user = service
            .authenticate(LoginInput {
                username: "Alice".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_logout_rotates_token() {
        let user = create_test_user("alice", "secret123", Some("old"));
        let mut rotated = user.clone();
        rotated.token = Some("new".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[rotated]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let user = service.logout(user).await.unwrap();

        assert_ne!(user.token.as_deref(), Some("old"));
    }
}
