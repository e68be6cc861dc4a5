use std::path::PathBuf;

use clap::{ArgAction, Args};

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Organization slug (or via SENTRY_ORG)
    #[arg(short = 'o', long, env = "SENTRY_ORG", global = true)]
    pub org: Option<String>,

    /// Auth token for the events API (or via SENTRY_AUTH_TOKEN)
    #[arg(
        long,
        env = "SENTRY_AUTH_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub auth_token: Option<String>,

    /// Override API URL (or via SENTRY_URL)
    #[arg(long, env = "SENTRY_URL", hide_env_values = true, global = true)]
    pub api_url: Option<String>,

    /// Override the URL links point at (or via SENTRY_APP_URL)
    #[arg(long, env = "SENTRY_APP_URL", hide_env_values = true, global = true)]
    pub app_url: Option<String>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "RELATED_EVENTS_ENV_FILE", hide_env_values = true)]
    pub env_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
