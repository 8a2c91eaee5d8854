use crate::errors::SyncError;
use crate::reporter::Reporter;

pub mod args;
mod exit_status;
mod run;

pub use args::{Arguments, Command};
pub use exit_status::ExitStatus;

pub fn run_cli(args: Arguments) -> ExitStatus {
    let reporter = Reporter::new(args.verbose());

    let Some(args) = args.with_command_or_help() else {
        return ExitStatus::Success;
    };

    match run::run(args, reporter) {
        Ok(status) => status,
        Err(err) => {
            let suggestion = err
                .downcast_ref::<SyncError>()
                .and_then(SyncError::suggestion);
            reporter.error_with_suggestion(&format!("{:#}", err), suggestion);
            ExitStatus::Error
        }
    }
}
