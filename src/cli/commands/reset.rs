use crate::config::Config;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_reset_token(config: &Config, username: &str) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.request_password_reset(username).await {
        Ok(token) => {
            let minutes = config.security.password_reset_token_expire_seconds / 60;
            println!("✓ Reset token for {username} (valid for {minutes} min):");
            println!("{token}");
            Ok(())
        }
        Err(e) => report(e),
    }
}

pub async fn cmd_reset_password(
    config: &Config,
    token: &str,
    new_password: &str,
) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service.reset_password(token, new_password).await {
        Ok(account) => {
            println!("✓ Password changed for {}", account.username);
            Ok(())
        }
        Err(e) => report(e),
    }
}
