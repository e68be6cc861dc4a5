use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;

mod api;
mod args;
mod config;
mod env;
mod error;
mod http;
mod links;
mod location;
mod logging;
mod model;
mod panel;
mod query;
mod related;
mod render;
mod rows;
mod source;
mod ui;
mod utils;

use crate::args::CLIArgs;

#[derive(Debug, Parser)]
#[command(
    name = "related-events",
    about = "List the events that share a trace with a given event",
    version,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // `list` arguments, used when no subcommand is given
    #[command(flatten)]
    list: CLIArgs<related::ListArgs>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List related events with links into issues, performance, or Discover
    List(CLIArgs<related::ListArgs>),
    /// Show the events query built for an event without running it
    Query(CLIArgs<related::QueryArgs>),
    /// Manage configuration
    Config(CLIArgs<config::ConfigArgs>),
}

impl Commands {
    fn verbose(&self) -> u8 {
        match self {
            Commands::List(cmd) => cmd.base.verbose,
            Commands::Query(cmd) => cmd.base.verbose,
            Commands::Config(cmd) => cmd.base.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    let cli = Cli::parse_from(argv);
    let command = cli.command.unwrap_or(Commands::List(cli.list));
    logging::init(command.verbose());

    match command {
        Commands::List(cmd) => related::run_list(cmd.base, cmd.args).await?,
        Commands::Query(cmd) => related::run_query(cmd.base, cmd.args).await?,
        Commands::Config(cmd) => config::run(cmd.base, cmd.args)?,
    }

    Ok(())
}
