//! Command dispatch: wire real collaborators into the runners.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::Result;

use super::args::{Arguments, Command, CommonArgs, PushCommand, SyncCommand};
use super::exit_status::ExitStatus;
use crate::collab::{EchoTranslator, Interaction};
use crate::commands::{PushRunner, SyncFlags, SyncRunner};
use crate::config::{CONFIG_FILE_NAME, Config, default_config_json, load_config};
use crate::errors::SyncError;
use crate::extract::RegexExtractor;
use crate::prompt::ConsoleInteraction;
use crate::remote::{HttpSheetClient, SheetClient};
use crate::reporter::Reporter;

/// Interaction used under `--yes`: select everything, confirm everything.
struct AssumeYes;

impl Interaction for AssumeYes {
    fn select_keys_for_deletion(&self, compound_keys: &[String]) -> Result<Vec<String>> {
        Ok(compound_keys.to_vec())
    }

    fn confirm_deletion(&self, _compound_keys: &[String], _preview_path: &Path) -> Result<bool> {
        Ok(true)
    }

    fn confirm_remote_sync(&self) -> Result<bool> {
        Ok(true)
    }
}

pub fn run(Arguments { command }: Arguments, reporter: Reporter) -> Result<ExitStatus> {
    match command {
        Some(Command::Sync(cmd)) => sync(cmd, reporter),
        Some(Command::Push(cmd)) => push(cmd, reporter),
        Some(Command::Init) => init(reporter),
        None => anyhow::bail!("No command provided. Use --help to see available commands."),
    }
}

fn sync(cmd: SyncCommand, reporter: Reporter) -> Result<ExitStatus> {
    let config = load(&cmd.common, reporter)?;

    let client = if cmd.no_remote {
        None
    } else {
        sheet_client(&config, cmd.token.as_deref())?
    };

    let extractor = RegexExtractor::from_config(&config, reporter);
    let interaction: Box<dyn Interaction> = if cmd.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(ConsoleInteraction)
    };

    let runner = SyncRunner::new(&config, reporter);
    let report = runner.run(
        SyncFlags { prune: cmd.prune },
        &extractor,
        interaction.as_ref(),
        &EchoTranslator,
        client.as_ref().map(|c| c as &dyn SheetClient),
    )?;
    report.print(&reporter);
    Ok(ExitStatus::Success)
}

fn push(cmd: PushCommand, reporter: Reporter) -> Result<ExitStatus> {
    let config = load(&cmd.common, reporter)?;

    let Some(client) = sheet_client(&config, cmd.token.as_deref())? else {
        return Err(SyncError::Configuration(
            "No 'remote' section configured; nothing to push to.".to_string(),
        )
        .into());
    };

    let interaction: Box<dyn Interaction> = if cmd.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(ConsoleInteraction)
    };

    let runner = PushRunner::new(&config, reporter);
    runner.run(interaction.as_ref(), &client)?;
    Ok(ExitStatus::Success)
}

fn init(reporter: Reporter) -> Result<ExitStatus> {
    let config_path = Path::new(CONFIG_FILE_NAME);
    if config_path.exists() {
        anyhow::bail!("{} already exists", CONFIG_FILE_NAME);
    }
    fs::write(config_path, default_config_json()?)?;
    reporter.success(&format!("Created {}", CONFIG_FILE_NAME));
    Ok(ExitStatus::Success)
}

fn load(common: &CommonArgs, reporter: Reporter) -> Result<Config> {
    let root = common
        .project_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let result = load_config(&root)?;
    if !result.from_file {
        reporter.detail("No config file found; using defaults");
    }
    Ok(result.config)
}

/// Build the HTTP sheet client when a remote is configured. The token comes
/// from `--token`/`LEXSYNC_TOKEN` or from the env var the config names.
fn sheet_client(config: &Config, token_override: Option<&str>) -> Result<Option<HttpSheetClient>> {
    let Some(remote) = &config.remote else {
        return Ok(None);
    };
    let token = match token_override {
        Some(token) => token.to_string(),
        None => env::var(&remote.token_env).map_err(|_| {
            SyncError::Configuration(format!(
                "Remote token not set; export {} or pass --token",
                remote.token_env
            ))
        })?,
    };
    let client = HttpSheetClient::new(&remote.endpoint, &remote.sheet_id, &token)?;
    Ok(Some(client))
}
