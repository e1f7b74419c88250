use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unix timestamp (seconds).
    pub created_at: i64,

    /// Unix timestamp (seconds).
    pub updated_at: i64,

    #[sea_orm(unique)]
    pub username: String,

    /// Key backing "remember me" logins, generated once on insert.
    pub auth_key: String,

    #[sea_orm(nullable)]
    pub email_confirm_token: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// `<random>_<issued unix timestamp>` while a reset is pending.
    #[sea_orm(nullable)]
    pub password_reset_token: Option<String>,

    #[sea_orm(unique)]
    pub email: String,

    pub status: AccountStatus,
}

/// Account status, stored as an integer column.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum AccountStatus {
    #[sea_orm(num_value = 0)]
    Blocked,
    #[default]
    #[sea_orm(num_value = 1)]
    Active,
    #[sea_orm(num_value = 2)]
    WaitingConfirmation,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Stamps `created_at` on insert and `updated_at` on every save.
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();
        if insert {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
