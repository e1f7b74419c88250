use crate::models::account::Account;
use crate::services::account_service::AccountError;
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{AccountCriteria, AccountRepository, AccountStore};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> AccountRepository {
        AccountRepository::new(self.conn.clone())
    }
}

#[async_trait]
impl AccountStore for Store {
    async fn find_one(&self, criteria: AccountCriteria) -> Result<Option<Account>, AccountError> {
        self.account_repo().find_one(criteria).await
    }

    async fn exists(
        &self,
        criteria: AccountCriteria,
        exclude_id: Option<i32>,
    ) -> Result<bool, AccountError> {
        self.account_repo().exists(criteria, exclude_id).await
    }

    async fn insert(&self, account: Account) -> Result<Account, AccountError> {
        self.account_repo().insert(account).await
    }

    async fn update(&self, account: Account) -> Result<Account, AccountError> {
        self.account_repo().update(account).await
    }
}
