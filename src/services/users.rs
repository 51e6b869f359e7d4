use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{Role, User};
use crate::error::{
    InternalError, Result, ResultExt, PASSWORD_NOT_CORRECT, PASSWORD_NO_LETTER, PASSWORD_NO_LOWER_CASE,
    PASSWORD_NO_NUMBER, PASSWORD_NO_UPPER_CASE, PASSWORD_TOO_SHORT, USER_ROLE_HAS_NO_ACCESS,
};
use crate::services::token::TokenProvider;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[async_trait]
pub trait UsersStorage: Send + Sync {
    /// Creates the user, its credentials and the default role grant in one
    /// transaction. Fails `USER_ALREADY_EXISTS` for a taken email.
    async fn create_user_by_email(&self, email: &str, pass_hash: &str) -> Result<Uuid>;
    /// Fails `USER_NOT_EXISTS` when no credentials are stored for the email.
    async fn get_id_and_pass_hash(&self, email: &str) -> Result<(Uuid, String)>;
    async fn create_anonymous_user(&self) -> Result<Uuid>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<User>;
    async fn get_user_roles_by_id(&self, id: Uuid) -> Result<Vec<Role>>;
}

pub struct UsersService {
    storage: Arc<dyn UsersStorage>,
    tokens: Arc<dyn TokenProvider>,
    hash_cost: u32,
}

impl UsersService {
    pub fn new(storage: Arc<dyn UsersStorage>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            storage,
            tokens,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn register_by_email(&self, email: &str, password: &str) -> Result<Uuid> {
        validate_password(password)?;

        let password = password.to_string();
        let cost = self.hash_cost;
        let pass_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await?
            .context("failed to hash password")?;

        self.storage
            .create_user_by_email(email.trim(), &pass_hash)
            .await
            .context("failed to create user in storage")
    }

    /// Returns a fresh token when the password matches the stored hash.
    pub async fn authenticate_by_email(&self, email: &str, password: &str) -> Result<String> {
        let (user_id, pass_hash) = self
            .storage
            .get_id_and_pass_hash(email.trim())
            .await
            .context("failed to get credentials from storage")?;

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &pass_hash))
            .await?
            .context("failed to verify password")?;
        if !matches {
            return Err(PASSWORD_NOT_CORRECT.into());
        }

        self.tokens
            .generate_user_token(user_id)
            .context("failed to generate user token")
    }

    pub async fn get_user_info(&self, id: Uuid) -> Result<User> {
        self.storage
            .get_user_by_id(id)
            .await
            .context("failed to get user from storage")
    }

    /// Creates a user without credentials or roles and returns its token.
    pub async fn create_anonymous_user(&self) -> Result<String> {
        let user_id = self
            .storage
            .create_anonymous_user()
            .await
            .context("failed to create anonymous user in storage")?;
        self.tokens
            .generate_user_token(user_id)
            .context("failed to generate user token")
    }

    /// Succeeds when the user holds at least one of `needed`.
    pub async fn check_user_any_role(&self, user_id: Uuid, needed: &[Role]) -> Result<()> {
        let granted = self
            .storage
            .get_user_roles_by_id(user_id)
            .await
            .with_context(|| format!("failed to get roles of user {user_id}"))?;

        if needed.iter().any(|role| granted.contains(role)) {
            Ok(())
        } else {
            Err(USER_ROLE_HAS_NO_ACCESS.into())
        }
    }
}

/// Password policy. Checks run in a fixed order and the first failure wins.
pub fn validate_password(password: &str) -> Result<(), InternalError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PASSWORD_TOO_SHORT);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PASSWORD_NO_UPPER_CASE);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PASSWORD_NO_LOWER_CASE);
    }
    if !password.chars().any(char::is_numeric) {
        return Err(PASSWORD_NO_NUMBER);
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(PASSWORD_NO_LETTER);
    }
    Ok(())
}
