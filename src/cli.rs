//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};
use enwis_id::build_info;
use std::path::PathBuf;

/// Enwis ID account client: sign in, manage your profile and sessions, and
/// approve third-party applications.
#[derive(Debug, Parser)]
#[command(
    name = "enwis",
    version,
    long_version = build_info::LONG_VERSION,
    after_help = build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Path to config file (default: ./enwis.toml or ~/.config/enwis/enwis.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override identity API base URL.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with a username, email, or phone number and a password.
    Login {
        /// Login name; prompted when omitted.
        #[arg(long)]
        login: Option<String>,
        /// Continue to the consent screen for this authorization URL or query.
        #[arg(long, value_name = "URL")]
        authorize: Option<String>,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, value_name = "URL")]
        authorize: Option<String>,
    },
    /// Sign in with a one-time code sent to a phone number.
    Phone {
        number: String,
        #[arg(long, value_name = "URL")]
        authorize: Option<String>,
    },
    /// Sign in with a payload produced by the Telegram login widget.
    Telegram {
        /// Widget payload as JSON (`id`, `first_name`, `auth_date`, `hash`, ...).
        #[arg(long)]
        payload: String,
        #[arg(long, value_name = "URL")]
        authorize: Option<String>,
    },
    /// Show the signed-in account.
    Whoami,
    /// Show or update profile fields.
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Birth date as YYYY-MM-DD.
        #[arg(long)]
        birth_date: Option<String>,
    },
    /// Upload a new avatar image.
    Avatar { file: PathBuf },
    /// Change the account password.
    Password,
    /// List or terminate signed-in devices.
    Sessions {
        #[command(subcommand)]
        action: SessionsCommand,
    },
    /// Review and approve a third-party authorization request.
    Authorize {
        /// Authorization URL or query string carrying `client_id`.
        request: String,
        /// Approve without asking.
        #[arg(long)]
        yes: bool,
    },
    /// Forget the stored session.
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    List,
    Terminate { id: String },
}
