use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::services::AccountService;

use super::account_service;

pub async fn cmd_show_account(config: &Config, username: &str) -> anyhow::Result<()> {
    let service = account_service(config).await?;

    let Some(account) = service.find_by_username(username).await? else {
        println!("Account '{username}' not found.");
        return Ok(());
    };

    println!("Account Info");
    println!("{:-<60}", "");
    println!("ID:       {}", account.id.unwrap_or_default());
    println!("Username: {}", account.username);
    println!("Email:    {}", account.email);
    println!("Status:   {}", account.status);
    println!("Created:  {}", format_timestamp(account.created_at));
    println!("Updated:  {}", format_timestamp(account.updated_at));

    if let Some(token) = &account.password_reset_token {
        let issued = token
            .rsplit_once('_')
            .and_then(|(_, ts)| ts.parse::<i64>().ok());
        let valid = service.is_password_reset_token_valid(
            token,
            config.security.password_reset_token_expire_seconds,
        );
        println!(
            "Reset:    pending since {} ({})",
            format_timestamp(issued),
            if valid { "valid" } else { "expired" }
        );
    }

    if account.email_confirm_token.is_some() {
        println!("Confirm:  awaiting email confirmation");
    }

    println!();
    Ok(())
}

fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map_or_else(|| "-".to_string(), |dt| dt.to_rfc3339())
}
