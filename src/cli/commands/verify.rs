use crate::config::Config;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_verify(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.login(username, password).await {
        Ok(account) => {
            println!("✓ Credentials valid for {}", account.username);
            Ok(())
        }
        Err(e) => report(e),
    }
}
