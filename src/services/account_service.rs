//! Domain service for user accounts.
//!
//! Covers the identity lookups an authentication layer needs, credential
//! handling, the password-reset and email-confirmation token flows, and the
//! operator workflows built on top of them.

use thiserror::Error;

use crate::models::account::{Account, AccountStatus, ValidationErrors, ValidationMode};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("Not supported: {0}")]
    Unsupported(&'static str),

    /// The reset token is expired or malformed. Callers should tell the
    /// user the reset window has passed rather than report a missing record.
    #[error("Password reset token is expired or invalid")]
    TokenExpired,

    #[error("Account not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for AccountError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    // ========================================================================
    // Persistence
    // ========================================================================

    /// Runs the rules selected by `mode`, including uniqueness of username
    /// and email against every other stored account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::ValidationFailed`] with every failing field.
    async fn validate(&self, account: &Account, mode: ValidationMode) -> Result<(), AccountError>;

    /// Generates the auth key, validates, and inserts a new account.
    async fn insert(&self, account: Account) -> Result<Account, AccountError>;

    /// Validates with `mode` and writes an existing account. The auth key is
    /// left as it is.
    async fn save(&self, account: Account, mode: ValidationMode) -> Result<Account, AccountError>;

    // ========================================================================
    // Identity
    // ========================================================================

    /// Finds an account by id, only if it is active.
    async fn find_identity(&self, id: i32) -> Result<Option<Account>, AccountError>;

    /// Token based identity is not offered by this service.
    ///
    /// # Errors
    ///
    /// Always returns [`AccountError::Unsupported`].
    async fn find_identity_by_access_token(
        &self,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Account>, AccountError>;

    /// Exact username match, any status.
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError>;

    // ========================================================================
    // Credentials
    // ========================================================================

    async fn set_password(&self, account: &mut Account, password: &str) -> Result<(), AccountError>;

    async fn validate_password(&self, account: &Account, password: &str) -> Result<bool, AccountError>;

    fn generate_auth_key(&self, account: &mut Account);

    // ========================================================================
    // Password reset
    // ========================================================================

    fn generate_password_reset_token(&self, account: &mut Account);

    /// Whether `token` was issued within the last `timeout` seconds.
    fn is_password_reset_token_valid(&self, token: &str, timeout: i64) -> bool;

    /// Like [`Self::find_by_password_reset_token_with_timeout`] using the
    /// configured expiry.
    async fn find_by_password_reset_token(&self, token: &str)
    -> Result<Option<Account>, AccountError>;

    /// Finds the active account holding `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::TokenExpired`] if the token is empty,
    /// malformed, or older than `timeout` seconds.
    async fn find_by_password_reset_token_with_timeout(
        &self,
        token: &str,
        timeout: i64,
    ) -> Result<Option<Account>, AccountError>;

    // ========================================================================
    // Email confirmation
    // ========================================================================

    fn generate_email_confirm_token(&self, account: &mut Account);

    /// Finds the account awaiting confirmation that holds `token`.
    async fn find_by_email_confirm_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountError>;

    // ========================================================================
    // Workflows
    // ========================================================================

    /// Registers a new account. With `require_confirmation` the account
    /// starts in [`AccountStatus::WaitingConfirmation`] and carries a
    /// confirm token.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        require_confirmation: bool,
    ) -> Result<Account, AccountError>;

    /// Checks a username/password pair for an active account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for unknown users,
    /// inactive accounts, and wrong passwords alike.
    async fn login(&self, username: &str, password: &str) -> Result<Account, AccountError>;

    /// Issues a password reset token for an active account and returns it.
    async fn request_password_reset(&self, username: &str) -> Result<String, AccountError>;

    /// Redeems a reset token: sets the new password and clears the token.
    async fn reset_password(&self, token: &str, new_password: &str)
    -> Result<Account, AccountError>;

    /// Redeems a confirm token: activates the account and clears the token.
    async fn confirm_email(&self, token: &str) -> Result<Account, AccountError>;

    /// Administrative status change.
    async fn change_status(
        &self,
        username: &str,
        status: AccountStatus,
    ) -> Result<Account, AccountError>;

    /// Profile update touching only the email address.
    async fn update_email(&self, username: &str, email: &str) -> Result<Account, AccountError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::Field;

    #[test]
    fn error_conversions_work() {
        let db_err = sea_orm::DbErr::Custom("test".to_string());
        let err: AccountError = db_err.into();
        assert!(matches!(err, AccountError::Database(_)));

        let err: AccountError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AccountError::Internal(_)));

        let err: AccountError = ValidationErrors::single(Field::Email, "Email cannot be blank.").into();
        assert_eq!(err.to_string(), "Validation failed: Email cannot be blank.");
    }
}
