//! CLI module - Command-line interface for Keystead
//!
//! Operator commands for creating and maintaining user accounts.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::account::AccountStatus;

/// Keystead - user account and credential management
#[derive(Parser)]
#[command(name = "keystead")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new account
    #[command(alias = "add")]
    Create {
        username: String,
        email: String,
        /// Initial password
        #[arg(long)]
        password: String,
        /// Leave the account waiting for email confirmation
        #[arg(long)]
        wait_confirmation: bool,
    },

    /// Show an account
    #[command(alias = "info")]
    Show { username: String },

    /// Change the status of an account
    Status {
        username: String,
        status: StatusArg,
    },

    /// Change the email address of an account
    SetEmail { username: String, email: String },

    /// Check a username and password
    Verify { username: String, password: String },

    /// Issue a password reset token
    ResetToken { username: String },

    /// Set a new password using a reset token
    ResetPassword { token: String, new_password: String },

    /// Confirm an email address using a confirm token
    Confirm { token: String },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Active,
    Blocked,
    Waiting,
}

impl From<StatusArg> for AccountStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::Blocked => Self::Blocked,
            StatusArg::Waiting => Self::WaitingConfirmation,
        }
    }
}

pub use commands::*;
