use crate::config::Config;
use crate::services::AccountService;

use super::{account_service, report};

pub async fn cmd_create_account(
    config: &Config,
    username: &str,
    email: &str,
    password: &str,
    wait_confirmation: bool,
) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    match service
        .register(username, email, password, wait_confirmation)
        .await
    {
        Ok(account) => {
            println!(
                "✓ Created account '{}' (ID: {})",
                account.username,
                account.id.unwrap_or_default()
            );
            println!("  Status: {}", account.status);
            if let Some(token) = &account.email_confirm_token {
                println!("  Email confirm token: {token}");
            }
            Ok(())
        }
        Err(e) => report(e),
    }
}
