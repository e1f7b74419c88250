use crate::config::Config;
use crate::models::account::AccountStatus;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_set_status(
    config: &Config,
    username: &str,
    status: AccountStatus,
) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.change_status(username, status).await {
        Ok(account) => {
            println!("✓ {} is now {}", account.username, account.status);
            Ok(())
        }
        Err(e) => report(e),
    }
}
