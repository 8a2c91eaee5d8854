//! The full sync pipeline.
//!
//! Extractor → PathClassifier → remote pull → rename migration → MergeEngine
//! → UnusedKeyAnalyzer → DeletionWorkflow → persist → ModuleFileEmitter →
//! remote push. Collaborators arrive as trait objects so the whole pipeline
//! runs deterministically under test.

use std::path::Path;

use anyhow::Result;

use crate::catalog::parse_compound_key;
use crate::catalog::store::RecordStore;
use crate::classify::PathClassifier;
use crate::collab::{Extractor, Interaction, Translator};
use crate::commands::SyncReport;
use crate::config::Config;
use crate::deletion::{DeletionOutcome, DeletionWorkflow};
use crate::emit::ModuleFileEmitter;
use crate::merge::MergeEngine;
use crate::remote::{RemoteSyncEngine, SheetClient, SheetLayout, SyncOptions};
use crate::reporter::Reporter;
use crate::unused::UnusedKeyAnalyzer;
use crate::utils::now_millis;

/// Behavior switches for one sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncFlags {
    /// Offer unused entries for deletion. Off by default: a plain sync only
    /// ever adds and updates.
    pub prune: bool,
}

pub struct SyncRunner<'a> {
    config: &'a Config,
    reporter: Reporter,
}

impl<'a> SyncRunner<'a> {
    pub fn new(config: &'a Config, reporter: Reporter) -> Self {
        Self { config, reporter }
    }

    fn retry_options(&self) -> SyncOptions {
        match &self.config.remote {
            Some(remote) => SyncOptions {
                max_attempts: remote.max_attempts,
                retry_base_delay: std::time::Duration::from_millis(remote.retry_base_delay_ms),
            },
            None => SyncOptions::default(),
        }
    }

    /// Run the pipeline. `sheet` is `None` for local-only runs.
    pub fn run(
        &self,
        flags: SyncFlags,
        extractor: &dyn Extractor,
        interaction: &dyn Interaction,
        translator: &dyn Translator,
        sheet: Option<&dyn SheetClient>,
    ) -> Result<SyncReport> {
        let config = self.config;
        let store = RecordStore::new(
            Path::new(&config.catalog_file),
            Path::new(&config.preview_file),
            &config.languages,
        );
        let classifier = PathClassifier::new(Path::new(&config.source_root));
        let engine = MergeEngine::new(&config.languages, config.rename_threshold);
        let layout = SheetLayout::new(&config.languages);
        let now = now_millis();

        let scan = extractor.scan_project()?;
        self.reporter.info(&format!(
            "Scanned {} reference(s), {} distinct key(s)",
            scan.references.len(),
            scan.new_text.len()
        ));

        let classification = classifier.classify(&scan.references);
        let mut existing = store.load()?;

        // Remote values are authoritative for overlapping fields; local-only
        // languages and lastUsed survive.
        if let Some(client) = sheet {
            let remote_engine = RemoteSyncEngine::new(&client, layout.clone(), self.reporter);
            let remote = remote_engine.pull();
            self.reporter
                .detail(&format!("Pulled {} remote entr(ies)", remote.entry_count()));
            existing = engine.merge_remote(&existing, &remote);
        }

        // Migrate entries across detected file moves before anything else
        // looks at module membership.
        let renames = engine.detect_renames(&classification, &existing);
        for rename in &renames {
            self.reporter.detail(&format!(
                "Module {} moved to {} ({:.0}% key overlap)",
                rename.from,
                rename.to,
                rename.overlap * 100.0
            ));
        }
        engine.apply_renames(&mut existing, &renames);

        let new_catalog = engine.build_catalog(&classification, &existing, translator);

        let force_keep: Vec<(String, String)> = config
            .force_keep
            .iter()
            .filter_map(|compound| parse_compound_key(compound).ok())
            .collect();
        let analyzer = UnusedKeyAnalyzer::new(&classifier, config.expiration_days, force_keep);
        let analysis = analyzer.analyze(&existing, &scan.references, now);

        if !analysis.force_kept.is_empty() {
            self.reporter.info(&format!(
                "{} unused entr(ies) kept by forceKeep",
                analysis.force_kept.len()
            ));
        }

        let (mut merged, outcome) = if flags.prune {
            let workflow = DeletionWorkflow::new(&store, &engine, interaction, self.reporter);
            match workflow.run(existing.clone(), &new_catalog, &analysis) {
                Ok(result) => result,
                Err(err) => {
                    // Accepted-risk fallback: when merge or deletion breaks,
                    // rebuild the catalog purely from what the code references
                    // right now rather than leaving a half-written state.
                    self.reporter.error(&format!(
                        "Deletion workflow failed ({}); regenerating catalog from current references",
                        err
                    ));
                    let regenerated = new_catalog.clone();
                    store.save(&regenerated)?;
                    (regenerated, DeletionOutcome::NothingToDelete)
                }
            }
        } else {
            if !analysis.unused.is_empty() {
                self.reporter.info(&format!(
                    "{} unused entr(ies) found; run with --prune to remove them",
                    analysis.unused.len()
                ));
            }
            let merged = engine.merge_local(&new_catalog, &existing);
            store.save(&merged)?;
            (merged, DeletionOutcome::NothingToDelete)
        };

        // Everything referenced in this scan gets a fresh lastUsed stamp:
        // entries the analyzer saw in use, plus entries created this run.
        merged.stamp_last_used(&analysis.used_pairs, now);
        merged.stamp_last_used(&new_catalog.pairs(), now);
        store.save(&merged)?;

        let emitter = ModuleFileEmitter::new(Path::new(&config.output_root), &config.languages);
        let files_written = emitter.emit(&merged)?;

        let mut pushed = None;
        if let Some(client) = sheet {
            if interaction.confirm_remote_sync()? {
                let remote_engine = RemoteSyncEngine::new(&client, layout, self.reporter);
                let change_set = remote_engine.push(&merged, &self.retry_options())?;
                if change_set.is_empty() {
                    self.reporter.info("Remote already up to date.");
                } else {
                    self.reporter
                        .success(&format!("Pushed to remote: {}", change_set.summary()));
                }
                pushed = Some((
                    change_set.added.len(),
                    change_set.modified.len(),
                    change_set.deleted_keys.len(),
                ));
            } else {
                self.reporter.info("Remote push skipped.");
            }
        }

        Ok(SyncReport {
            references: scan.references.len(),
            new_keys: scan.new_text.len(),
            renames: renames.len(),
            entries: merged.entry_count(),
            modules: merged.module_count(),
            unused: analysis.unused.len(),
            outcome,
            files_written,
            pushed,
        })
    }
}
