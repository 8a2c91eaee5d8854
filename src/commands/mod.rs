//! Command runners and their run summaries.

pub mod push;
pub mod sync;

pub use push::PushRunner;
pub use sync::{SyncFlags, SyncRunner};

use crate::deletion::DeletionOutcome;
use crate::reporter::Reporter;

/// Counters gathered over one sync run, printed at the end.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub references: usize,
    pub new_keys: usize,
    pub renames: usize,
    pub entries: usize,
    pub modules: usize,
    pub unused: usize,
    pub outcome: DeletionOutcome,
    pub files_written: usize,
    /// (added, modified, deleted) row counts when a push happened.
    pub pushed: Option<(usize, usize, usize)>,
}

impl SyncReport {
    pub fn print(&self, reporter: &Reporter) {
        reporter.success(&format!(
            "Catalog synced: {} entr(ies) across {} module(s)",
            self.entries, self.modules
        ));
        reporter.info(&format!(
            "  {} reference(s) scanned, {} distinct key(s), {} rename(s) migrated",
            self.references, self.new_keys, self.renames
        ));
        match self.outcome {
            DeletionOutcome::Deleted { deleted } => {
                reporter.info(&format!("  {} unused entr(ies) deleted", deleted));
            }
            DeletionOutcome::PreservedDeclined { selected } => {
                reporter.info(&format!(
                    "  deletion of {} entr(ies) declined; catalog preserved",
                    selected
                ));
            }
            DeletionOutcome::PreservedEmptySelection | DeletionOutcome::NothingToDelete => {
                if self.unused > 0 {
                    reporter.info(&format!("  {} unused entr(ies) kept", self.unused));
                }
            }
        }
        reporter.info(&format!("  {} module file(s) written", self.files_written));
        if let Some((added, modified, deleted)) = self.pushed {
            reporter.info(&format!(
                "  remote: {} added, {} modified, {} deleted",
                added, modified, deleted
            ));
        }
    }
}

/// Counters for a push-only run.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub confirmed: bool,
}
