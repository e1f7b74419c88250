use crate::entities::{prelude::*, users};
use crate::models::account::{Account, AccountStatus, Field, ValidationErrors};
use crate::services::account_service::AccountError;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, SqlErr,
    ActiveValue::{NotSet, Set, Unchanged},
};
use tracing::debug;

/// Exact-match lookup criteria. Unset fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCriteria {
    pub id: Option<i32>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_reset_token: Option<String>,
    pub email_confirm_token: Option<String>,
    pub status: Option<AccountStatus>,
}

impl AccountCriteria {
    #[must_use]
    pub fn id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn password_reset_token(token: impl Into<String>) -> Self {
        Self {
            password_reset_token: Some(token.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn email_confirm_token(token: impl Into<String>) -> Self {
        Self {
            email_confirm_token: Some(token.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn into_condition(self) -> Condition {
        let mut condition = Condition::all();

        if let Some(id) = self.id {
            condition = condition.add(users::Column::Id.eq(id));
        }
        if let Some(username) = self.username {
            condition = condition.add(users::Column::Username.eq(username));
        }
        if let Some(email) = self.email {
            condition = condition.add(users::Column::Email.eq(email));
        }
        if let Some(token) = self.password_reset_token {
            condition = condition.add(users::Column::PasswordResetToken.eq(token));
        }
        if let Some(token) = self.email_confirm_token {
            condition = condition.add(users::Column::EmailConfirmToken.eq(token));
        }
        if let Some(status) = self.status {
            condition = condition.add(users::Column::Status.eq(status));
        }

        condition
    }
}

/// Persistence operations the account service depends on.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_one(&self, criteria: AccountCriteria) -> Result<Option<Account>, AccountError>;

    /// Whether any account other than `exclude_id` matches.
    async fn exists(
        &self,
        criteria: AccountCriteria,
        exclude_id: Option<i32>,
    ) -> Result<bool, AccountError>;

    /// Inserts a new row; the store assigns the id and both timestamps.
    async fn insert(&self, account: Account) -> Result<Account, AccountError>;

    /// Writes every mutable column of an existing row and refreshes `updated_at`.
    async fn update(&self, account: Account) -> Result<Account, AccountError>;
}

/// Repository for the `users` table
pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_write_error(err: DbErr) -> AccountError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                debug!("Unique constraint violation: {message}");
                AccountError::ValidationFailed(unique_violation_errors(&message))
            }
            _ => match err {
                DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => AccountError::NotFound,
                other => AccountError::from(other),
            },
        }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_one(&self, criteria: AccountCriteria) -> Result<Option<Account>, AccountError> {
        let user = Users::find()
            .filter(criteria.into_condition())
            .one(&self.conn)
            .await?;

        Ok(user.map(Account::from))
    }

    async fn exists(
        &self,
        criteria: AccountCriteria,
        exclude_id: Option<i32>,
    ) -> Result<bool, AccountError> {
        let mut condition = criteria.into_condition();
        if let Some(id) = exclude_id {
            condition = condition.add(users::Column::Id.ne(id));
        }

        let count = Users::find().filter(condition).count(&self.conn).await?;

        Ok(count > 0)
    }

    async fn insert(&self, account: Account) -> Result<Account, AccountError> {
        let active = users::ActiveModel {
            id: NotSet,
            created_at: NotSet,
            updated_at: NotSet,
            username: Set(account.username),
            auth_key: Set(account.auth_key),
            email_confirm_token: Set(account.email_confirm_token),
            password_hash: Set(account.password_hash),
            password_reset_token: Set(account.password_reset_token),
            email: Set(account.email),
            status: Set(account.status),
        };

        let model = active
            .insert(&self.conn)
            .await
            .map_err(Self::map_write_error)?;

        Ok(Account::from(model))
    }

    async fn update(&self, account: Account) -> Result<Account, AccountError> {
        let Some(id) = account.id else {
            return Err(AccountError::NotFound);
        };

        let active = users::ActiveModel {
            id: Unchanged(id),
            created_at: NotSet,
            updated_at: NotSet,
            username: Set(account.username),
            auth_key: Set(account.auth_key),
            email_confirm_token: Set(account.email_confirm_token),
            password_hash: Set(account.password_hash),
            password_reset_token: Set(account.password_reset_token),
            email: Set(account.email),
            status: Set(account.status),
        };

        let model = active
            .update(&self.conn)
            .await
            .map_err(Self::map_write_error)?;

        Ok(Account::from(model))
    }
}

/// Turns a driver message such as `UNIQUE constraint failed: users.email`
/// into the matching field error.
fn unique_violation_errors(message: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if message.contains("username") {
        errors.add(Field::Username, "This username has already been taken.");
    }
    if message.contains("email") {
        errors.add(Field::Email, "This email address has already been taken.");
    }
    if errors.is_empty() {
        errors.add(Field::Id, format!("Duplicate record: {message}"));
    }

    errors
}
