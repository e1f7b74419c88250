mod confirm;
mod create;
mod email;
mod reset;
mod show;
mod status;
mod verify;

pub use confirm::cmd_confirm_email;
pub use create::cmd_create_account;
pub use email::cmd_set_email;
pub use reset::{cmd_reset_password, cmd_reset_token};
pub use show::cmd_show_account;
pub use status::cmd_set_status;
pub use verify::cmd_verify;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AccountError, DefaultAccountService};

async fn account_service(config: &Config) -> anyhow::Result<DefaultAccountService> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    DefaultAccountService::from_config(Arc::new(store), &config.security)
}

/// Prints user-facing failures; store and internal errors are returned.
fn report(err: AccountError) -> anyhow::Result<()> {
    match err {
        AccountError::ValidationFailed(errors) => {
            println!("Validation failed:");
            for error in errors.errors() {
                println!("  {}: {}", error.field.label(), error.message);
            }
        }
        AccountError::TokenExpired => {
            println!("The password reset window has expired. Request a new token.");
        }
        AccountError::NotFound => println!("Account not found."),
        AccountError::InvalidCredentials => println!("✗ Invalid username or password."),
        AccountError::Unsupported(what) => println!("Not supported: {what}"),
        err @ (AccountError::Database(_) | AccountError::Internal(_)) => return Err(err.into()),
    }

    Ok(())
}
