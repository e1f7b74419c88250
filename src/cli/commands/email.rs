use crate::config::Config;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_set_email(config: &Config, username: &str, email: &str) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.update_email(username, email).await {
        Ok(account) => {
            println!("✓ Email for {} set to {}", account.username, account.email);
            Ok(())
        }
        Err(e) => report(e),
    }
}
