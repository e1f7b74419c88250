//! Default implementation of the `AccountService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::db::{AccountCriteria, AccountStore};
use crate::models::account::{
    Account, AccountStatus, Field, ValidationErrors, ValidationMode,
};
use crate::services::account_service::{AccountError, AccountService};
use crate::services::clock::{Clock, SystemClock};
use crate::services::credentials::{Argon2Credentials, CredentialService};

pub struct DefaultAccountService {
    store: Arc<dyn AccountStore>,
    credentials: Arc<dyn CredentialService>,
    clock: Arc<dyn Clock>,
    security: SecurityConfig,
}

impl DefaultAccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        credentials: Arc<dyn CredentialService>,
        clock: Arc<dyn Clock>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            credentials,
            clock,
            security,
        }
    }

    /// Argon2 credentials and the system clock, configured from `security`.
    pub fn from_config(
        store: Arc<dyn AccountStore>,
        security: &SecurityConfig,
    ) -> anyhow::Result<Self> {
        let credentials = Argon2Credentials::new(security)?;

        Ok(Self::new(
            store,
            Arc::new(credentials),
            Arc::new(SystemClock),
            security.clone(),
        ))
    }

    fn check_password_length(&self, password: &str) -> Result<(), AccountError> {
        let min = self.security.min_password_length;
        if password.chars().count() < min {
            return Err(ValidationErrors::single(
                Field::Password,
                format!("Password should contain at least {min} characters."),
            )
            .into());
        }
        Ok(())
    }

    async fn require_by_username(&self, username: &str) -> Result<Account, AccountError> {
        self.find_by_username(username)
            .await?
            .ok_or(AccountError::NotFound)
    }
}

fn transition_allowed(from: AccountStatus, to: AccountStatus) -> bool {
    from == to || to != AccountStatus::WaitingConfirmation
}

#[async_trait]
impl AccountService for DefaultAccountService {
    async fn validate(&self, account: &Account, mode: ValidationMode) -> Result<(), AccountError> {
        let mut errors = account.validate(mode).err().unwrap_or_default();

        // Uniqueness is only checked for fields whose format already passed.
        if mode.covers(Field::Username)
            && !errors.has(Field::Username)
            && self
                .store
                .exists(AccountCriteria::username(&account.username), account.id)
                .await?
        {
            errors.add(Field::Username, "This username has already been taken.");
        }

        if mode.covers(Field::Email)
            && !errors.has(Field::Email)
            && self
                .store
                .exists(AccountCriteria::email(&account.email), account.id)
                .await?
        {
            errors.add(Field::Email, "This email address has already been taken.");
        }

        errors.into_result()?;
        Ok(())
    }

    async fn insert(&self, mut account: Account) -> Result<Account, AccountError> {
        self.validate(&account, ValidationMode::Full).await?;
        self.generate_auth_key(&mut account);

        let account = self.store.insert(account).await?;
        info!(
            "Account created: {} (id {:?}, status {})",
            account.username, account.id, account.status
        );
        Ok(account)
    }

    async fn save(&self, account: Account, mode: ValidationMode) -> Result<Account, AccountError> {
        if account.is_new() {
            return self.insert(account).await;
        }

        self.validate(&account, mode).await?;
        self.store.update(account).await
    }

    async fn find_identity(&self, id: i32) -> Result<Option<Account>, AccountError> {
        self.store
            .find_one(AccountCriteria::id(id).with_status(AccountStatus::Active))
            .await
    }

    async fn find_identity_by_access_token(
        &self,
        _token: &str,
        _token_type: Option<&str>,
    ) -> Result<Option<Account>, AccountError> {
        Err(AccountError::Unsupported(
            "find_identity_by_access_token is not implemented",
        ))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        self.store.find_one(AccountCriteria::username(username)).await
    }

    async fn set_password(&self, account: &mut Account, password: &str) -> Result<(), AccountError> {
        let credentials = Arc::clone(&self.credentials);
        let password = password.to_string();
        let mut updated = account.clone();

        // Argon2 is CPU-intensive; keep it off the async workers
        let updated = task::spawn_blocking(move || {
            updated
                .set_password(credentials.as_ref(), &password)
                .map(|()| updated)
        })
        .await
        .map_err(|e| AccountError::Internal(format!("Password hashing task panicked: {e}")))??;

        *account = updated;
        Ok(())
    }

    async fn validate_password(&self, account: &Account, password: &str) -> Result<bool, AccountError> {
        let credentials = Arc::clone(&self.credentials);
        let password = password.to_string();
        let account = account.clone();

        task::spawn_blocking(move || account.validate_password(credentials.as_ref(), &password))
            .await
            .map_err(|e| {
                AccountError::Internal(format!("Password verification task panicked: {e}"))
            })
    }

    fn generate_auth_key(&self, account: &mut Account) {
        account.generate_auth_key(self.credentials.as_ref());
    }

    fn generate_password_reset_token(&self, account: &mut Account) {
        account.generate_password_reset_token(self.credentials.as_ref(), self.clock.as_ref());
    }

    fn is_password_reset_token_valid(&self, token: &str, timeout: i64) -> bool {
        Account::is_password_reset_token_valid(token, timeout, self.clock.now())
    }

    async fn find_by_password_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        self.find_by_password_reset_token_with_timeout(
            token,
            self.security.password_reset_token_expire_seconds,
        )
        .await
    }

    async fn find_by_password_reset_token_with_timeout(
        &self,
        token: &str,
        timeout: i64,
    ) -> Result<Option<Account>, AccountError> {
        if !self.is_password_reset_token_valid(token, timeout) {
            debug!("Rejected expired or malformed password reset token");
            return Err(AccountError::TokenExpired);
        }

        self.store
            .find_one(AccountCriteria::password_reset_token(token).with_status(AccountStatus::Active))
            .await
    }

    fn generate_email_confirm_token(&self, account: &mut Account) {
        account.generate_email_confirm_token(self.credentials.as_ref());
    }

    async fn find_by_email_confirm_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountError> {
        self.store
            .find_one(
                AccountCriteria::email_confirm_token(token)
                    .with_status(AccountStatus::WaitingConfirmation),
            )
            .await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        require_confirmation: bool,
    ) -> Result<Account, AccountError> {
        self.check_password_length(password)?;

        let mut account = Account::new(username, email);
        if require_confirmation {
            account.status = AccountStatus::WaitingConfirmation;
            self.generate_email_confirm_token(&mut account);
        }

        self.set_password(&mut account, password).await?;
        self.insert(account).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        let Some(account) = self.find_by_username(username).await? else {
            debug!("Login failed for {username}: unknown user");
            return Err(AccountError::InvalidCredentials);
        };

        if account.status != AccountStatus::Active {
            debug!("Login failed for {username}: account is {}", account.status);
            return Err(AccountError::InvalidCredentials);
        }

        if !self.validate_password(&account, password).await? {
            debug!("Login failed for {username}: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(account)
    }

    async fn request_password_reset(&self, username: &str) -> Result<String, AccountError> {
        let mut account = self
            .store
            .find_one(AccountCriteria::username(username).with_status(AccountStatus::Active))
            .await?
            .ok_or(AccountError::NotFound)?;

        self.generate_password_reset_token(&mut account);
        let account = self.save(account, ValidationMode::Full).await?;

        info!("Password reset token issued for {}", account.username);
        account
            .password_reset_token
            .ok_or_else(|| AccountError::Internal("Reset token was not persisted".to_string()))
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Account, AccountError> {
        self.check_password_length(new_password)?;

        let mut account = self
            .find_by_password_reset_token(token)
            .await?
            .ok_or(AccountError::NotFound)?;

        self.set_password(&mut account, new_password).await?;
        account.remove_password_reset_token();

        let account = self.save(account, ValidationMode::Full).await?;
        info!("Password reset for {}", account.username);
        Ok(account)
    }

    async fn confirm_email(&self, token: &str) -> Result<Account, AccountError> {
        if token.trim().is_empty() {
            return Err(AccountError::NotFound);
        }

        let mut account = self
            .find_by_email_confirm_token(token)
            .await?
            .ok_or(AccountError::NotFound)?;

        account.remove_email_confirm_token();
        account.status = AccountStatus::Active;

        let account = self.save(account, ValidationMode::Full).await?;
        info!("Email confirmed for {}", account.username);
        Ok(account)
    }

    async fn change_status(
        &self,
        username: &str,
        status: AccountStatus,
    ) -> Result<Account, AccountError> {
        let mut account = self.require_by_username(username).await?;

        if !transition_allowed(account.status, status) {
            warn!(
                "Refused status change for {username}: {} -> {status}",
                account.status
            );
            return Err(ValidationErrors::single(
                Field::Status,
                format!("Status cannot change from {} to {status}.", account.status),
            )
            .into());
        }

        let previous = account.status;
        account.status = status;

        let account = self.save(account, ValidationMode::Full).await?;
        info!("Status changed for {username}: {previous} -> {status}");
        Ok(account)
    }

    async fn update_email(&self, username: &str, email: &str) -> Result<Account, AccountError> {
        let mut account = self.require_by_username(username).await?;
        account.email = email.to_string();

        let account = self.save(account, ValidationMode::Profile).await?;
        info!("Email updated for {username}");
        Ok(account)
    }
}
