//! Remote push without scanning: diff the persisted catalog against the
//! remote sheet and apply the difference.

use std::path::Path;

use anyhow::Result;

use crate::catalog::store::RecordStore;
use crate::collab::Interaction;
use crate::commands::PushReport;
use crate::config::Config;
use crate::remote::{RemoteSyncEngine, SheetClient, SheetLayout, SyncOptions};
use crate::reporter::Reporter;

pub struct PushRunner<'a> {
    config: &'a Config,
    reporter: Reporter,
}

impl<'a> PushRunner<'a> {
    pub fn new(config: &'a Config, reporter: Reporter) -> Self {
        Self { config, reporter }
    }

    pub fn run(
        &self,
        interaction: &dyn Interaction,
        sheet: &dyn SheetClient,
    ) -> Result<PushReport> {
        let config = self.config;
        let store = RecordStore::new(
            Path::new(&config.catalog_file),
            Path::new(&config.preview_file),
            &config.languages,
        );
        let catalog = store.load()?;
        if catalog.is_empty() {
            self.reporter
                .warn("Local catalog is empty; nothing to push.");
            return Ok(PushReport::default());
        }

        if !interaction.confirm_remote_sync()? {
            self.reporter.info("Remote push skipped.");
            return Ok(PushReport::default());
        }

        let options = match &config.remote {
            Some(remote) => SyncOptions {
                max_attempts: remote.max_attempts,
                retry_base_delay: std::time::Duration::from_millis(remote.retry_base_delay_ms),
            },
            None => SyncOptions::default(),
        };

        let layout = SheetLayout::new(&config.languages);
        let engine = RemoteSyncEngine::new(&sheet, layout, self.reporter);
        let change_set = engine.push(&catalog, &options)?;

        if change_set.is_empty() {
            self.reporter.info("Remote already up to date.");
        } else {
            self.reporter
                .success(&format!("Pushed to remote: {}", change_set.summary()));
        }

        Ok(PushReport {
            added: change_set.added.len(),
            modified: change_set.modified.len(),
            deleted: change_set.deleted_keys.len(),
            confirmed: true,
        })
    }
}
