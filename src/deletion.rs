//! User-gated deletion of unused catalog entries.
//!
//! The workflow walks `Analyzed → Selecting → PreviewGenerated → Confirming`
//! and only ever mutates the catalog after the confirmation gate. Deletion is
//! atomic at workflow level: either the whole confirmed selection is removed
//! and persisted, or none of it is. Newly-scanned references are merged in
//! the same pass, so prune-and-absorb land together.

use anyhow::Result;

use crate::catalog::{Catalog, parse_compound_key};
use crate::catalog::store::RecordStore;
use crate::collab::Interaction;
use crate::merge::MergeEngine;
use crate::reporter::Reporter;
use crate::unused::UnusedAnalysis;

/// Terminal state of a deletion workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Nothing was unused; the catalog only absorbed new references.
    NothingToDelete,
    /// The user selected nothing; everything preserved.
    PreservedEmptySelection,
    /// The user declined at the confirmation gate; everything preserved.
    PreservedDeclined { selected: usize },
    /// The confirmed selection was removed.
    Deleted { deleted: usize },
}

pub struct DeletionWorkflow<'a> {
    store: &'a RecordStore,
    engine: &'a MergeEngine,
    interaction: &'a dyn Interaction,
    reporter: Reporter,
}

impl<'a> DeletionWorkflow<'a> {
    pub fn new(
        store: &'a RecordStore,
        engine: &'a MergeEngine,
        interaction: &'a dyn Interaction,
        reporter: Reporter,
    ) -> Self {
        Self {
            store,
            engine,
            interaction,
            reporter,
        }
    }

    /// Run the workflow over `catalog`, absorbing `new_catalog` (freshly
    /// built from current references) additively in every outcome. Persists
    /// the result and returns it together with the terminal state.
    pub fn run(
        &self,
        catalog: Catalog,
        new_catalog: &Catalog,
        analysis: &UnusedAnalysis,
    ) -> Result<(Catalog, DeletionOutcome)> {
        if analysis.unused.is_empty() {
            let merged = self.absorb_and_persist(&catalog, new_catalog)?;
            return Ok((merged, DeletionOutcome::NothingToDelete));
        }

        let selected = self.interaction.select_keys_for_deletion(&analysis.unused)?;
        // Anything outside the computed unused set cannot be deleted, no
        // matter what the interaction returned.
        let selected: Vec<String> = selected
            .into_iter()
            .filter(|compound| analysis.unused.contains(compound))
            .collect();

        if selected.is_empty() {
            let merged = self.absorb_and_persist(&catalog, new_catalog)?;
            return Ok((merged, DeletionOutcome::PreservedEmptySelection));
        }

        let mut pairs = Vec::with_capacity(selected.len());
        for compound in &selected {
            pairs.push(parse_compound_key(compound)?);
        }

        // Audit artifact, written before any destructive action.
        let preview = catalog.subset(&pairs);
        self.store.save_preview(&preview)?;

        let confirmed = self
            .interaction
            .confirm_deletion(&selected, self.store.preview_path())?;

        if !confirmed {
            self.reporter.detail("Deletion declined; catalog preserved.");
            let merged = self.absorb_and_persist(&catalog, new_catalog)?;
            self.store.remove_preview()?;
            return Ok((
                merged,
                DeletionOutcome::PreservedDeclined {
                    selected: selected.len(),
                },
            ));
        }

        let mut pruned = catalog;
        let mut deleted = 0;
        for (module, key) in &pairs {
            if pruned.remove(module, key).is_some() {
                deleted += 1;
            }
        }

        let merged = self.absorb_and_persist(&pruned, new_catalog)?;
        self.store.remove_preview()?;
        Ok((merged, DeletionOutcome::Deleted { deleted }))
    }

    fn absorb_and_persist(&self, catalog: &Catalog, new_catalog: &Catalog) -> Result<Catalog> {
        let merged = self.engine.merge_local(new_catalog, catalog);
        self.store.save(&merged)?;
        Ok(merged)
    }
}
