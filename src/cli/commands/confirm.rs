use crate::config::Config;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_confirm_email(config: &Config, token: &str) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.confirm_email(token).await {
        Ok(account) => {
            println!("✓ Email confirmed, {} is now {}", account.username, account.status);
            Ok(())
        }
        Err(e) => report(e),
    }
}
