//! CLI argument definitions using clap's derive API.
//!
//! ## Commands
//!
//! - `sync`: scan the source tree and reconcile catalog, module files, remote
//! - `push`: push the persisted catalog to the remote sheet, no scanning
//! - `init`: write a default `.lexsyncrc.json` configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Sync(cmd)) => cmd.common.verbose,
            Some(Command::Push(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Project directory to operate in (defaults to the current directory)
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Skip remote pull and push even when a remote is configured
    #[arg(long)]
    pub no_remote: bool,

    /// Offer unused catalog entries for deletion
    #[arg(long)]
    pub prune: bool,

    /// Answer yes to every prompt (with --prune, deletes all unused entries)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Bearer token for the remote sheet (overrides the configured env var)
    #[arg(long, env = "LEXSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Args)]
pub struct PushCommand {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Answer yes to every prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Bearer token for the remote sheet (overrides the configured env var)
    #[arg(long, env = "LEXSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the source tree and reconcile catalog, module files, and remote
    Sync(SyncCommand),
    /// Push the persisted catalog to the remote sheet without scanning
    Push(PushCommand),
    /// Initialize a new .lexsyncrc.json configuration file
    Init,
}
