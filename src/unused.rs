//! Unused-entry detection.
//!
//! Path reconstruction between on-disk paths and catalog module keys is
//! lossy, so reference resolution runs a cascading strategy that deliberately
//! favors false negatives (retaining possibly-unused entries) over
//! destructive false positives.

use std::collections::BTreeSet;

use crate::catalog::{Catalog, Reference, format_compound_key};
use crate::classify::{PathClassifier, canonicalize_extension};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Result of an unused-key analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnusedAnalysis {
    /// Compound keys proposed for deletion, sorted.
    pub unused: Vec<String>,
    /// Compound keys that would be unused but sit on the allow-list, sorted.
    pub force_kept: Vec<String>,
    /// (module, key) pairs confirmed used by reference resolution. The sync
    /// run stamps `lastUsed` on these.
    pub used_pairs: Vec<(String, String)>,
}

pub struct UnusedKeyAnalyzer<'a> {
    classifier: &'a PathClassifier,
    expiration_days: Option<u64>,
    force_keep: Vec<(String, String)>,
}

impl<'a> UnusedKeyAnalyzer<'a> {
    pub fn new(
        classifier: &'a PathClassifier,
        expiration_days: Option<u64>,
        force_keep: Vec<(String, String)>,
    ) -> Self {
        Self {
            classifier,
            expiration_days,
            force_keep,
        }
    }

    /// Compute which catalog entries are no longer referenced, by presence
    /// and (when an expiration horizon is configured) by age.
    pub fn analyze(
        &self,
        catalog: &Catalog,
        references: &[Reference],
        now_millis: i64,
    ) -> UnusedAnalysis {
        let mut used: BTreeSet<(String, String)> = BTreeSet::new();

        for reference in references {
            let candidates = catalog.modules_with_key(&reference.key);
            if candidates.is_empty() {
                continue;
            }
            for module in self.resolve(&reference.file_path, &candidates) {
                used.insert((module.to_string(), reference.key.clone()));
            }
        }

        let mut unused = Vec::new();
        let mut force_kept = Vec::new();
        for (module, key) in catalog.pairs() {
            if used.contains(&(module.clone(), key.clone())) {
                continue;
            }
            if let Some(days) = self.expiration_days {
                let entry = catalog.get(&module, &key);
                let expired = match entry.and_then(|e| e.last_used) {
                    // No usable timestamp: treated as expired.
                    None => true,
                    Some(ts) => now_millis - ts > days as i64 * MILLIS_PER_DAY,
                };
                if !expired {
                    // Grace period: unreferenced but recently used.
                    continue;
                }
            }
            let compound = format_compound_key(&module, &key);
            if self
                .force_keep
                .iter()
                .any(|(m, k)| m == &module && k == &key)
            {
                force_kept.push(compound);
            } else {
                unused.push(compound);
            }
        }

        UnusedAnalysis {
            unused,
            force_kept,
            used_pairs: used.into_iter().collect(),
        }
    }

    /// Resolve a reference's file path to candidate modules, in order:
    /// exact normalized match, suffix match, same-basename match, and a
    /// final conservative "all candidates used" fallback.
    fn resolve<'c>(&self, file_path: &str, candidates: &[&'c str]) -> Vec<&'c str> {
        let normalized = self.classifier.normalize(file_path);

        if let Some(ref norm) = normalized {
            if let Some(exact) = candidates.iter().find(|c| *c == norm) {
                return vec![exact];
            }

            let suffix: Vec<&str> = candidates
                .iter()
                .filter(|c| suffix_matches(norm, c))
                .copied()
                .collect();
            if !suffix.is_empty() {
                return suffix;
            }

            let base = basename(norm);
            let same_base: Vec<&str> = candidates
                .iter()
                .filter(|c| basename(c) == base)
                .copied()
                .collect();
            if !same_base.is_empty() {
                return same_base;
            }
        }

        // Unresolvable path but the key exists somewhere: conservatively
        // treat every candidate as used.
        candidates.to_vec()
    }
}

/// Suffix match tolerant of root-dir differences in either direction, with a
/// path-segment boundary so `auth.ts` never matches `oauth.ts`.
fn suffix_matches(path: &str, candidate: &str) -> bool {
    let candidate = canonicalize_extension(candidate);
    path == candidate
        || path.ends_with(&format!("/{}", candidate))
        || candidate.ends_with(&format!("/{}", path))
}

fn basename(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    canonicalize_extension(name)
}
