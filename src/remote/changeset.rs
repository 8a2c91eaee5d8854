//! Diffing local desired state against the last-known remote snapshot.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::catalog::{Catalog, Entry};
use crate::remote::rows::{Row, SheetLayout};

/// The add/modify/delete diff between local desired state and remote state.
/// Local is authoritative for deletions; content comparison covers every
/// configured language value plus `mark`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<Row>,
    pub modified: Vec<Row>,
    pub deleted_keys: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted_keys.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} deleted",
            self.added.len(),
            self.modified.len(),
            self.deleted_keys.len()
        )
    }
}

/// Compute the changeset that turns `remote` into `local`.
pub fn calculate_change_set(remote: &Catalog, local: &Catalog, layout: &SheetLayout) -> ChangeSet {
    let remote_map = compound_map(remote);
    let local_map = compound_map(local);

    let mut change_set = ChangeSet::default();

    for (compound, (module, key, local_entry)) in &local_map {
        match remote_map.get(compound) {
            None => {
                change_set
                    .added
                    .push(layout.entry_to_row(module, key, local_entry));
            }
            Some((_, _, remote_entry)) => {
                if differs(local_entry, remote_entry, layout) {
                    change_set
                        .modified
                        .push(layout.entry_to_row(module, key, local_entry));
                }
            }
        }
    }

    for compound in remote_map.keys() {
        if !local_map.contains_key(compound) {
            change_set.deleted_keys.push(compound.clone());
        }
    }

    change_set
}

/// Deterministic fingerprint of a remote snapshot: SHA-256 over sorted
/// module/key/language content plus mark. Used for optimistic concurrency —
/// a changeset only applies while the remote still hashes to the version it
/// was computed against.
pub fn calculate_data_version(catalog: &Catalog, layout: &SheetLayout) -> String {
    let mut hasher = Sha256::new();
    for (module, entries) in catalog.modules() {
        for (key, entry) in entries {
            hasher.update(module.as_bytes());
            hasher.update([0x1f]);
            hasher.update(key.as_bytes());
            hasher.update([0x1f]);
            for lang in layout.languages() {
                hasher.update(lang.as_bytes());
                hasher.update([0x1e]);
                hasher.update(entry.value(lang).unwrap_or_default().as_bytes());
                hasher.update([0x1e]);
            }
            hasher.update(entry.mark.to_string().as_bytes());
            hasher.update([0x0a]);
        }
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn differs(local: &Entry, remote: &Entry, layout: &SheetLayout) -> bool {
    if local.mark != remote.mark {
        return true;
    }
    layout
        .languages()
        .iter()
        .any(|lang| local.value(lang).unwrap_or_default() != remote.value(lang).unwrap_or_default())
}

type CompoundMap<'c> = BTreeMap<String, (&'c String, &'c String, &'c Entry)>;

fn compound_map(catalog: &Catalog) -> CompoundMap<'_> {
    catalog
        .modules()
        .flat_map(|(module, entries)| {
            entries.iter().map(move |(key, entry)| {
                (
                    crate::catalog::format_compound_key(module, key),
                    (module, key, entry),
                )
            })
        })
        .collect()
}
