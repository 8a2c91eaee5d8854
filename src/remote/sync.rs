//! Incremental remote synchronization under optimistic concurrency control.
//!
//! The remote store may have concurrent writers outside this process.
//! Correctness against them rests on two cooperative conventions: the data
//! version recomputed on every attempt, and advisory lock tokens written
//! into the reserved column for every row an attempt will touch. Neither is
//! OS-level mutual exclusion; a non-cooperating client can still interleave.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::errors::{ConflictKind, SyncError};
use crate::remote::changeset::{ChangeSet, calculate_change_set, calculate_data_version};
use crate::remote::rows::{Row, SheetLayout};
use crate::remote::sheet::SheetClient;
use crate::reporter::Reporter;
use crate::utils::now_millis;

/// Retry policy for the incremental apply loop.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

pub struct RemoteSyncEngine<'a, C: SheetClient> {
    client: &'a C,
    layout: SheetLayout,
    reporter: Reporter,
}

impl<'a, C: SheetClient> RemoteSyncEngine<'a, C> {
    pub fn new(client: &'a C, layout: SheetLayout, reporter: Reporter) -> Self {
        Self {
            client,
            layout,
            reporter,
        }
    }

    /// Fetch the remote snapshot as a catalog.
    pub fn fetch_remote(&self) -> Result<Catalog, SyncError> {
        let rows = self.client.fetch_rows()?;
        let (catalog, skipped) = self.layout.rows_to_catalog(&rows);
        if skipped > 0 {
            self.reporter
                .warn(&format!("Skipped {} malformed remote row(s)", skipped));
        }
        Ok(catalog)
    }

    /// Pull with degradation: any remote failure (network, auth) is reported
    /// and the remote is treated as empty so the run can continue on local
    /// data alone.
    pub fn pull(&self) -> Catalog {
        match self.fetch_remote() {
            Ok(catalog) => catalog,
            Err(err) => {
                self.reporter.warn(&format!(
                    "Remote pull failed ({}); treating remote as empty",
                    err
                ));
                Catalog::new()
            }
        }
    }

    /// Fingerprint of a snapshot for the optimistic version check.
    pub fn data_version(&self, catalog: &Catalog) -> String {
        calculate_data_version(catalog, &self.layout)
    }

    /// Diff local desired state against a remote snapshot.
    pub fn diff(&self, remote: &Catalog, local: &Catalog) -> ChangeSet {
        calculate_change_set(remote, local, &self.layout)
    }

    /// Fetch, diff, and apply in one pass. The returned changeset is what
    /// was applied (possibly empty).
    pub fn push(&self, local: &Catalog, options: &SyncOptions) -> Result<ChangeSet, SyncError> {
        let remote = self.fetch_remote()?;
        let expected_version = self.data_version(&remote);
        let change_set = self.diff(&remote, local);
        if change_set.is_empty() {
            return Ok(change_set);
        }
        self.apply_incremental(&change_set, &expected_version, options)?;
        Ok(change_set)
    }

    /// Apply a changeset under the bounded retry loop. Version and lock
    /// conflicts retry with capped exponential backoff; everything else
    /// surfaces immediately.
    pub fn apply_incremental(
        &self,
        change_set: &ChangeSet,
        expected_version: &str,
        options: &SyncOptions,
    ) -> Result<(), SyncError> {
        if change_set.is_empty() {
            return Ok(());
        }

        let mut attempt = 0u32;
        loop {
            match self.try_apply(change_set, expected_version) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt + 1 < options.max_attempts => {
                    let delay = options.retry_base_delay * 2u32.saturating_pow(attempt);
                    self.reporter.warn(&format!(
                        "{}; retrying in {}ms (attempt {}/{})",
                        err,
                        delay.as_millis(),
                        attempt + 2,
                        options.max_attempts
                    ));
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One full attempt: version check, advisory locks, deletions (highest
    /// row first), modifications (batched contiguous ranges), additions
    /// (appended), and lock cleanup in all outcomes.
    fn try_apply(&self, change_set: &ChangeSet, expected_version: &str) -> Result<(), SyncError> {
        let rows = self.client.fetch_rows()?;
        let (remote_catalog, _) = self.layout.rows_to_catalog(&rows);
        let version = calculate_data_version(&remote_catalog, &self.layout);
        if version != expected_version {
            return Err(SyncError::Concurrency {
                kind: ConflictKind::Version,
                message: format!("expected {}, remote is now {}", expected_version, version),
            });
        }

        let index: BTreeMap<&str, usize> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, cells)| cells.first().map(|c| (c.as_str(), i)))
            .collect();

        let mut deletion_rows: Vec<usize> = change_set
            .deleted_keys
            .iter()
            .filter_map(|key| index.get(key.as_str()).copied())
            .collect();
        deletion_rows.sort_unstable();

        let mut modification_rows: Vec<(usize, &Row)> = change_set
            .modified
            .iter()
            .filter_map(|row| index.get(row.compound_key.as_str()).map(|i| (*i, row)))
            .collect();
        modification_rows.sort_by_key(|(i, _)| *i);

        let lock_col = self.layout.lock_column();
        let token = lock_token();

        let mut to_lock: Vec<usize> = deletion_rows
            .iter()
            .copied()
            .chain(modification_rows.iter().map(|(i, _)| *i))
            .collect();
        to_lock.sort_unstable();
        to_lock.dedup();

        // A row already carrying a foreign token belongs to another writer.
        for &row in &to_lock {
            if let Some(existing) = rows.get(row).and_then(|cells| cells.get(lock_col)) {
                if !existing.is_empty() && existing != &token {
                    return Err(SyncError::Concurrency {
                        kind: ConflictKind::Lock,
                        message: format!("row {} locked by {}", row, existing),
                    });
                }
            }
        }

        let mut locked: Vec<usize> = Vec::new();
        let mut lock_result = Ok(());
        for &row in &to_lock {
            match self.client.write_cell(row, lock_col, &token) {
                Ok(()) => locked.push(row),
                Err(err) => {
                    lock_result = Err(err);
                    break;
                }
            }
        }

        let mut deleted_applied: Vec<usize> = Vec::new();
        let result = lock_result.and_then(|()| {
            self.apply_steps(
                change_set,
                &deletion_rows,
                &modification_rows,
                &mut deleted_applied,
            )
        });

        // Locks are cleared whether the attempt succeeded or not.
        self.clear_locks(&locked, &deleted_applied, lock_col);
        result
    }

    fn apply_steps(
        &self,
        change_set: &ChangeSet,
        deletion_rows: &[usize],
        modification_rows: &[(usize, &Row)],
        deleted_applied: &mut Vec<usize>,
    ) -> Result<(), SyncError> {
        // Deletions run highest row first so the indices of the remaining
        // deletions stay valid while rows shift up.
        for &row in deletion_rows.iter().rev() {
            self.client.delete_row(row)?;
            deleted_applied.push(row);
        }

        // Modification indices shift up past the deleted rows.
        let adjusted: Vec<(usize, Vec<String>)> = modification_rows
            .iter()
            .map(|(row, r)| {
                let shift = deletion_rows.iter().filter(|d| **d < *row).count();
                (row - shift, r.cells())
            })
            .collect();
        for (start, run) in contiguous_runs(&adjusted) {
            self.client.update_rows(start, &run)?;
        }

        // Additions appended last so no existing row index moves.
        if !change_set.added.is_empty() {
            let rows: Vec<Vec<String>> = change_set.added.iter().map(Row::cells).collect();
            self.client.append_rows(&rows)?;
        }
        Ok(())
    }

    /// Best-effort lock cleanup: deleted rows are gone, surviving rows are
    /// addressed at their post-deletion index. Cleanup failures are reported
    /// but never override the apply result.
    fn clear_locks(&self, locked: &[usize], deleted_applied: &[usize], lock_col: usize) {
        for &row in locked {
            if deleted_applied.contains(&row) {
                continue;
            }
            let adjusted = row - deleted_applied.iter().filter(|d| **d < row).count();
            if let Err(err) = self.client.write_cell(adjusted, lock_col, "") {
                self.reporter
                    .warn(&format!("Failed to clear lock on row {}: {}", adjusted, err));
            }
        }
    }
}

fn lock_token() -> String {
    format!("lexsync-{}-{}", std::process::id(), now_millis())
}

/// Group (index, cells) pairs, sorted by index, into contiguous runs for
/// batched range updates.
fn contiguous_runs(rows: &[(usize, Vec<String>)]) -> Vec<(usize, Vec<Vec<String>>)> {
    let mut runs: Vec<(usize, Vec<Vec<String>>)> = Vec::new();
    for (idx, cells) in rows {
        match runs.last_mut() {
            Some((start, run)) if *start + run.len() == *idx => run.push(cells.clone()),
            _ => runs.push((*idx, vec![cells.clone()])),
        }
    }
    runs
}
