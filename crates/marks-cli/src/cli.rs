use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "marks")]
#[command(about = "Keep your bookmarks in sync from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name for backend and auth configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a bookmark
    #[command(alias = "new")]
    Add {
        /// Bookmark title
        title: String,
        /// Bookmark URL
        url: String,
    },
    /// List bookmarks, newest first
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search bookmark titles (case-insensitive)
    Search {
        /// Text the title must contain
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a bookmark
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID or unique ID prefix
        id: String,
    },
    /// Follow bookmark changes from other sessions until interrupted
    Watch {
        /// Only show bookmarks whose title contains this text
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate CLI profile with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Bookmark table name
        #[arg(long, value_name = "NAME")]
        table: Option<String>,
        /// Seconds between polls while watching
        #[arg(long, value_name = "SECONDS")]
        poll_interval_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase account email
        #[arg(long, value_name = "EMAIL", requires = "password", conflicts_with = "refresh_token")]
        email: Option<String>,
        /// Supabase account password
        #[arg(long, value_name = "PASSWORD", requires = "email")]
        password: Option<String>,
        /// Refresh token, e.g. from an OAuth sign-in redirect
        #[arg(long, value_name = "TOKEN")]
        refresh_token: Option<String>,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Logout profile and clear stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Print the browser URL that starts an OAuth sign-in
    OauthUrl {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// OAuth provider
        #[arg(long, default_value = "google")]
        provider: String,
        /// Where the provider should redirect after sign-in
        #[arg(long, value_name = "URL")]
        redirect_to: Option<String>,
    },
}
