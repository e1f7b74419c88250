pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;

use clap::Parser;
pub use config::Config;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config);

    let args = Cli::parse();

    let Some(command) = args.command else {
        print_help();
        return Ok(());
    };

    match command {
        Commands::Create {
            username,
            email,
            password,
            wait_confirmation,
        } => {
            cli::cmd_create_account(&config, &username, &email, &password, wait_confirmation)
                .await
        }

        Commands::Show { username } => cli::cmd_show_account(&config, &username).await,

        Commands::Status { username, status } => {
            cli::cmd_set_status(&config, &username, status.into()).await
        }

        Commands::SetEmail { username, email } => {
            cli::cmd_set_email(&config, &username, &email).await
        }

        Commands::Verify { username, password } => {
            cli::cmd_verify(&config, &username, &password).await
        }

        Commands::ResetToken { username } => cli::cmd_reset_token(&config, &username).await,

        Commands::ResetPassword {
            token,
            new_password,
        } => cli::cmd_reset_password(&config, &token, &new_password).await,

        Commands::Confirm { token } => cli::cmd_confirm_email(&config, &token).await,

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("Created config.toml");
            } else {
                println!("config.toml already exists");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_help() {
    println!("Keystead - user account and credential management");
    println!();
    println!("Usage: keystead <command> [args]");
    println!();
    println!("Commands:");
    println!("  create <username> <email> --password <p> [--wait-confirmation]");
    println!("  show <username>                    Show an account");
    println!("  status <username> <active|blocked|waiting>");
    println!("  set-email <username> <email>       Change an account's email");
    println!("  verify <username> <password>       Check credentials");
    println!("  reset-token <username>             Issue a password reset token");
    println!("  reset-password <token> <password>  Redeem a reset token");
    println!("  confirm <token>                    Confirm an email address");
    println!("  init                               Create default config file");
    println!();
    println!("Run 'keystead <command> --help' for details.");
}
