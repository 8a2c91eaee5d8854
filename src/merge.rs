//! Reconciliation of the existing catalog, newly classified references, and
//! an optional remote snapshot.
//!
//! Policy: remote is content-authoritative, local supplements. No merge pass
//! ever deletes an entry; pruning belongs exclusively to the deletion
//! workflow.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::catalog::{COMMON_MODULE, Catalog, Entry};
use crate::collab::Translator;

/// A detected file-move migration: entries of `from` belong under `to` now.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRename {
    pub from: String,
    pub to: String,
    /// Share of the vanished module's key set found in the new module.
    pub overlap: f64,
}

pub struct MergeEngine {
    languages: Vec<String>,
    rename_threshold: f64,
}

impl MergeEngine {
    pub fn new(languages: &[String], rename_threshold: f64) -> Self {
        Self {
            languages: languages.to_vec(),
            rename_threshold,
        }
    }

    fn source_language(&self) -> &str {
        self.languages
            .first()
            .map(String::as_str)
            .unwrap_or("en")
    }

    /// Build a catalog for the classification result.
    ///
    /// Existing translations and metadata always win over regeneration. The
    /// same module's own entry is preferred; only a pair new to the catalog
    /// borrows the entry from another module holding the key, so per-module
    /// variants of a shared key text survive a re-scan intact. With no
    /// existing entry anywhere the entry is synthesized: source language gets
    /// the literal key text, every other language goes through the
    /// translator, falling back to the key text when translation fails.
    pub fn build_catalog(
        &self,
        classification: &BTreeMap<String, Vec<String>>,
        existing: &Catalog,
        translator: &dyn Translator,
    ) -> Catalog {
        let mut catalog = Catalog::new();
        for (module, keys) in classification {
            for key in keys {
                let entry = match existing
                    .get(module, key)
                    .or_else(|| existing.find_key_anywhere(key))
                {
                    Some(found) => found.clone(),
                    None => self.synthesize(key, translator),
                };
                catalog.insert(module.clone(), key.clone(), entry);
            }
        }
        catalog
    }

    fn synthesize(&self, key: &str, translator: &dyn Translator) -> Entry {
        let source = self.source_language();
        let mut entry = Entry::default();
        for lang in &self.languages {
            let text = if lang == source {
                key.to_string()
            } else {
                translator
                    .translate(key, source, lang)
                    .unwrap_or_else(|_| key.to_string())
            };
            entry.values.insert(lang.clone(), text);
        }
        entry
    }

    /// Merge the freshly built catalog over the existing one.
    ///
    /// Union of modules; for overlapping pairs, fields present in the new
    /// entry override, absent fields (`lastUsed`) are preserved. Never
    /// deletes.
    pub fn merge_local(&self, new: &Catalog, existing: &Catalog) -> Catalog {
        let mut merged = existing.clone();
        for (module, entries) in new.modules() {
            for (key, new_entry) in entries {
                let entry = match existing.get(module, key) {
                    Some(old) => Entry {
                        values: override_values(&old.values, &new_entry.values),
                        mark: new_entry.mark,
                        last_used: new_entry.last_used.or(old.last_used),
                    },
                    None => new_entry.clone(),
                };
                merged.insert(module.clone(), key.clone(), entry);
            }
        }
        merged
    }

    /// Merge a remote snapshot over the local catalog.
    ///
    /// Remote values win for every field it carries (languages, mark), but
    /// local-only fields absent from the remote payload — unsynced languages,
    /// `lastUsed` — are never silently discarded.
    pub fn merge_remote(&self, existing: &Catalog, remote: &Catalog) -> Catalog {
        let mut merged = existing.clone();
        for (module, entries) in remote.modules() {
            for (key, remote_entry) in entries {
                let entry = match existing.get(module, key) {
                    Some(local) => Entry {
                        values: override_values(&local.values, &remote_entry.values),
                        mark: remote_entry.mark,
                        last_used: local.last_used,
                    },
                    None => remote_entry.clone(),
                };
                merged.insert(module.clone(), key.clone(), entry);
            }
        }
        merged
    }

    /// Detect likely file renames: a module present in the classification but
    /// absent from the existing catalog, where some vanished existing module
    /// shares at least the threshold fraction of its key set with the new
    /// module's keys.
    ///
    /// Tie-break: the first vanished module crossing the threshold wins; no
    /// further scoring. Each vanished module migrates at most once.
    pub fn detect_renames(
        &self,
        classification: &BTreeMap<String, Vec<String>>,
        existing: &Catalog,
    ) -> Vec<ModuleRename> {
        let mut vanished: Vec<&String> = existing
            .module_paths()
            .filter(|module| {
                module.as_str() != COMMON_MODULE && !classification.contains_key(*module)
            })
            .collect();

        let mut renames = Vec::new();
        for (new_module, keys) in classification {
            if existing.contains_module(new_module) || new_module == COMMON_MODULE {
                continue;
            }
            let new_keys: BTreeSet<&str> = keys.iter().map(String::as_str).collect();

            let mut matched: Option<usize> = None;
            for (idx, old_module) in vanished.iter().enumerate() {
                let old_keys: Vec<&String> =
                    match existing.module_entries(old_module) {
                        Some(entries) => entries.keys().collect(),
                        None => continue,
                    };
                if old_keys.is_empty() {
                    continue;
                }
                let shared = old_keys
                    .iter()
                    .filter(|key| new_keys.contains(key.as_str()))
                    .count();
                let overlap = shared as f64 / old_keys.len() as f64;
                if overlap >= self.rename_threshold {
                    renames.push(ModuleRename {
                        from: (*old_module).clone(),
                        to: new_module.clone(),
                        overlap,
                    });
                    matched = Some(idx);
                    break;
                }
            }
            if let Some(idx) = matched {
                vanished.remove(idx);
            }
        }
        renames
    }

    /// Apply detected renames to the existing catalog so entries migrate
    /// instead of producing a duplicate-plus-orphan pair.
    pub fn apply_renames(&self, existing: &mut Catalog, renames: &[ModuleRename]) {
        for rename in renames {
            existing.rename_module(&rename.from, &rename.to);
        }
    }
}

fn override_values(
    base: &BTreeMap<String, String>,
    over: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.clone();
    for (lang, text) in over {
        merged.insert(lang.clone(), text.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, Entry};
    use crate::collab::{EchoTranslator, Translator};
    use crate::merge::*;
    use pretty_assertions::assert_eq;

    struct FailingTranslator;

    impl Translator for FailingTranslator {
        fn translate(&self, _text: &str, _from: &str, _to: &str) -> anyhow::Result<String> {
            anyhow::bail!("translation backend down")
        }
    }

    struct UppercaseTranslator;

    impl Translator for UppercaseTranslator {
        fn translate(&self, text: &str, _from: &str, to: &str) -> anyhow::Result<String> {
            Ok(format!("{}:{}", to, text.to_uppercase()))
        }
    }

    fn engine() -> MergeEngine {
        MergeEngine::new(&["en".to_string(), "zh".to_string()], 0.8)
    }

    fn classification(pairs: &[(&str, &[&str])]) -> std::collections::BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(module, keys)| {
                (
                    module.to_string(),
                    keys.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_build_catalog_copies_existing_verbatim() {
        let mut existing = Catalog::new();
        let mut entry = Entry::from_values([("en", "Hello"), ("zh", "你好")]);
        entry.mark = 3;
        entry.last_used = Some(123);
        existing.insert("old/place.ts", "Hello", entry.clone());

        let built = engine().build_catalog(
            &classification(&[("new/place.ts", &["Hello"])]),
            &existing,
            &FailingTranslator,
        );

        // Copied verbatim from another module, translator untouched.
        assert_eq!(built.get("new/place.ts", "Hello"), Some(&entry));
    }

    #[test]
    fn test_build_catalog_prefers_same_module_entry() {
        // The same key text legitimately owns independent entries in two
        // modules; a re-scan must not collapse them into one.
        let mut existing = Catalog::new();
        existing.insert("comp/a.ts", "Save", Entry::from_values([("en", "Save A")]));
        existing.insert("comp/b.ts", "Save", Entry::from_values([("en", "Save B")]));

        let eng = engine();
        let built = eng.build_catalog(
            &classification(&[("comp/a.ts", &["Save"]), ("comp/b.ts", &["Save"])]),
            &existing,
            &FailingTranslator,
        );
        let merged = eng.merge_local(&built, &existing);

        assert_eq!(
            merged.get("comp/a.ts", "Save").unwrap().value("en"),
            Some("Save A")
        );
        assert_eq!(
            merged.get("comp/b.ts", "Save").unwrap().value("en"),
            Some("Save B")
        );
    }

    #[test]
    fn test_build_catalog_synthesizes_with_translator() {
        let built = engine().build_catalog(
            &classification(&[("a.ts", &["Sign in"])]),
            &Catalog::new(),
            &UppercaseTranslator,
        );

        let entry = built.get("a.ts", "Sign in").unwrap();
        assert_eq!(entry.value("en"), Some("Sign in"));
        assert_eq!(entry.value("zh"), Some("zh:SIGN IN"));
        assert_eq!(entry.mark, 0);
        assert_eq!(entry.last_used, None);
    }

    #[test]
    fn test_build_catalog_translator_failure_falls_back_to_key() {
        let built = engine().build_catalog(
            &classification(&[("a.ts", &["Sign in"])]),
            &Catalog::new(),
            &FailingTranslator,
        );

        let entry = built.get("a.ts", "Sign in").unwrap();
        assert_eq!(entry.value("zh"), Some("Sign in"));
    }

    #[test]
    fn test_merge_local_preserves_absent_fields() {
        let mut existing = Catalog::new();
        let mut old = Entry::from_values([("en", "Hello"), ("zh", "你好")]);
        old.last_used = Some(999);
        existing.insert("a.ts", "Hello", old);

        let mut new = Catalog::new();
        new.insert("a.ts", "Hello", Entry::from_values([("en", "Hello")]));

        let merged = engine().merge_local(&new, &existing);
        let entry = merged.get("a.ts", "Hello").unwrap();
        // zh absent from new entry: preserved. lastUsed absent: preserved.
        assert_eq!(entry.value("zh"), Some("你好"));
        assert_eq!(entry.last_used, Some(999));
    }

    #[test]
    fn test_merge_local_never_deletes() {
        let mut existing = Catalog::new();
        existing.insert("a.ts", "Keep me", Entry::from_values([("en", "Keep me")]));

        let mut new = Catalog::new();
        new.insert("b.ts", "Fresh", Entry::from_values([("en", "Fresh")]));

        let merged = engine().merge_local(&new, &existing);
        assert!(merged.get("a.ts", "Keep me").is_some());
        assert!(merged.get("b.ts", "Fresh").is_some());
    }

    #[test]
    fn test_merge_local_idempotent() {
        let mut existing = Catalog::new();
        let mut old = Entry::from_values([("en", "Hello"), ("zh", "你好")]);
        old.last_used = Some(7);
        existing.insert("a.ts", "Hello", old);
        existing.insert("c.ts", "Other", Entry::from_values([("en", "Other")]));

        let mut new = Catalog::new();
        new.insert("a.ts", "Hello", Entry::from_values([("en", "Hello there")]));
        new.insert("b.ts", "Fresh", Entry::from_values([("en", "Fresh")]));

        let eng = engine();
        let once = eng.merge_local(&new, &existing);
        let twice = eng.merge_local(&once, &existing);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_remote_precedence() {
        let mut local = Catalog::new();
        let mut local_entry = Entry::from_values([("en", "Hello"), ("zh", "你好")]);
        local_entry.mark = 1;
        local_entry.last_used = Some(555);
        local.insert("a/b.ts", "Hello", local_entry);

        let mut remote = Catalog::new();
        let mut remote_entry = Entry::from_values([("en", "Hello there"), ("zh", "你好")]);
        remote_entry.mark = 2;
        remote.insert("a/b.ts", "Hello", remote_entry);

        let merged = engine().merge_remote(&local, &remote);
        let entry = merged.get("a/b.ts", "Hello").unwrap();
        // Remote wins on content, local-only lastUsed survives.
        assert_eq!(entry.value("en"), Some("Hello there"));
        assert_eq!(entry.mark, 2);
        assert_eq!(entry.last_used, Some(555));
    }

    #[test]
    fn test_merge_remote_preserves_local_only_language() {
        let mut local = Catalog::new();
        local.insert(
            "a.ts",
            "Hello",
            Entry::from_values([("en", "Hello"), ("ja", "こんにちは")]),
        );

        let mut remote = Catalog::new();
        remote.insert("a.ts", "Hello", Entry::from_values([("en", "Hi")]));

        let merged = engine().merge_remote(&local, &remote);
        let entry = merged.get("a.ts", "Hello").unwrap();
        assert_eq!(entry.value("en"), Some("Hi"));
        assert_eq!(entry.value("ja"), Some("こんにちは"));
    }

    #[test]
    fn test_merge_remote_adds_remote_only_entries() {
        let mut remote = Catalog::new();
        remote.insert("r.ts", "Remote only", Entry::from_values([("en", "Remote only")]));

        let merged = engine().merge_remote(&Catalog::new(), &remote);
        assert!(merged.get("r.ts", "Remote only").is_some());
    }

    #[test]
    fn test_detect_renames_above_threshold() {
        let mut existing = Catalog::new();
        for key in ["a", "b", "c", "d", "e", "f", "g"] {
            existing.insert("old/form.ts", key, Entry::from_values([("en", key)]));
        }

        // 6 of 7 old keys reappear under the new path: ~86% overlap.
        let class = classification(&[("new/form.ts", &["a", "b", "c", "d", "e", "f", "h"])]);
        let renames = engine().detect_renames(&class, &existing);

        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].from, "old/form.ts");
        assert_eq!(renames[0].to, "new/form.ts");
        assert!(renames[0].overlap > 0.85);
    }

    #[test]
    fn test_detect_renames_below_threshold() {
        let mut existing = Catalog::new();
        for key in ["a", "b", "c", "d"] {
            existing.insert("old/form.ts", key, Entry::from_values([("en", key)]));
        }

        // Only half the old keys reappear.
        let class = classification(&[("new/form.ts", &["a", "b", "x", "y"])]);
        assert!(engine().detect_renames(&class, &existing).is_empty());
    }

    #[test]
    fn test_detect_renames_first_candidate_wins() {
        let mut existing = Catalog::new();
        for key in ["a", "b"] {
            existing.insert("old/one.ts", key, Entry::from_values([("en", key)]));
            existing.insert("old/two.ts", key, Entry::from_values([("en", key)]));
        }

        let class = classification(&[("new/one.ts", &["a", "b"])]);
        let renames = engine().detect_renames(&class, &existing);
        assert_eq!(renames.len(), 1);
        // BTreeMap order: old/one.ts comes first and wins the tie.
        assert_eq!(renames[0].from, "old/one.ts");
    }

    #[test]
    fn test_detect_renames_skips_surviving_modules() {
        let mut existing = Catalog::new();
        existing.insert("kept/mod.ts", "a", Entry::from_values([("en", "a")]));

        // kept/mod.ts still appears in the classification: nothing vanished.
        let class = classification(&[("kept/mod.ts", &["a"]), ("new/mod.ts", &["a"])]);
        assert!(engine().detect_renames(&class, &existing).is_empty());
    }

    #[test]
    fn test_apply_renames_migrates_entries() {
        let mut existing = Catalog::new();
        let mut entry = Entry::from_values([("en", "Hello"), ("zh", "你好")]);
        entry.mark = 4;
        existing.insert("old/form.ts", "Hello", entry.clone());

        let eng = engine();
        eng.apply_renames(
            &mut existing,
            &[ModuleRename {
                from: "old/form.ts".to_string(),
                to: "new/form.ts".to_string(),
                overlap: 1.0,
            }],
        );

        assert!(!existing.contains_module("old/form.ts"));
        assert_eq!(existing.get("new/form.ts", "Hello"), Some(&entry));
    }

    #[test]
    fn test_build_then_merge_uses_echo_translator() {
        let built = engine().build_catalog(
            &classification(&[("a.ts", &["Hi"])]),
            &Catalog::new(),
            &EchoTranslator,
        );
        assert_eq!(built.get("a.ts", "Hi").unwrap().value("zh"), Some("Hi"));
    }
}
