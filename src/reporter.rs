//! Progress and result reporting.
//!
//! This module is separate from the core library logic so lexsync can be used
//! as a library without printing side effects. There is no global logger: a
//! `Reporter` is constructed once and passed into the components that need to
//! talk to the user.

use colored::Colorize;

/// Success mark for consistent output formatting
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓
/// Failure mark for consistent output formatting
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Injected output capability used by runners and workflows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Plain informational line.
    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    /// Only printed with --verbose.
    pub fn detail(&self, message: &str) {
        if self.verbose {
            println!("  {}", message.dimmed());
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", SUCCESS_MARK.green(), message.green());
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "warning:".bold().yellow(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!(
            "{} {} {}",
            FAILURE_MARK.red(),
            "error:".bold().red(),
            message
        );
    }

    /// Print an error together with its remediation hint, if any.
    pub fn error_with_suggestion(&self, message: &str, suggestion: Option<&str>) {
        self.error(message);
        if let Some(hint) = suggestion {
            eprintln!("  {} {}", "hint:".bold().cyan(), hint);
        }
    }
}
