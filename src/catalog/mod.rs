//! Catalog data model.
//!
//! The catalog maps module path → translation key → [`Entry`]. The same key
//! text may legitimately own independent entries in several modules: module
//! ownership is folder-scoped, not global, so duplication across modules is
//! intentional rather than a defect.

pub mod store;

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde_json::{Map, Value};

/// Sentinel module for keys whose references carry no usable file path.
pub const COMMON_MODULE: &str = "common";

/// JSON field holding the reviewer annotation. Always serialized last.
pub const MARK_FIELD: &str = "mark";

/// JSON field holding the last-confirmed-reference timestamp (epoch millis).
pub const LAST_USED_FIELD: &str = "lastUsed";

// ============================================================
// Entry
// ============================================================

/// One translation record: language values plus reviewer mark and the
/// optional last-used timestamp driving time-based expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Language code → translated text.
    pub values: BTreeMap<String, String>,
    /// Integer reviewer annotation, passed through untouched by the engine.
    pub mark: i64,
    /// Epoch millis of the last confirmed code reference.
    pub last_used: Option<i64>,
}

impl Entry {
    /// Build an entry with the given language values and mark 0.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            mark: 0,
            last_used: None,
        }
    }

    pub fn value(&self, language: &str) -> Option<&str> {
        self.values.get(language).map(String::as_str)
    }

    /// Serialize with language fields in configured order, any unconfigured
    /// languages after them, then `lastUsed`, then `mark` last.
    pub fn to_json(&self, languages: &[String]) -> Map<String, Value> {
        let mut map = Map::new();
        for lang in languages {
            if let Some(text) = self.values.get(lang) {
                map.insert(lang.clone(), Value::String(text.clone()));
            }
        }
        for (lang, text) in &self.values {
            if !languages.contains(lang) {
                map.insert(lang.clone(), Value::String(text.clone()));
            }
        }
        if let Some(ts) = self.last_used {
            map.insert(LAST_USED_FIELD.to_string(), Value::from(ts));
        }
        map.insert(MARK_FIELD.to_string(), Value::from(self.mark));
        map
    }

    /// Parse an entry from its JSON object form. Unparsable `lastUsed` values
    /// are dropped rather than rejected; the time-based analyzer treats a
    /// missing timestamp as expired, which is the safe direction.
    pub fn from_json(map: &Map<String, Value>) -> Self {
        let mut entry = Entry::default();
        for (field, value) in map {
            match field.as_str() {
                MARK_FIELD => {
                    entry.mark = value.as_i64().unwrap_or(0);
                }
                LAST_USED_FIELD => {
                    entry.last_used = value
                        .as_i64()
                        .or_else(|| value.as_str().and_then(|s| s.parse().ok()));
                }
                _ => {
                    if let Some(text) = value.as_str() {
                        entry.values.insert(field.clone(), text.to_string());
                    }
                }
            }
        }
        entry
    }
}

// ============================================================
// Catalog
// ============================================================

/// The full mapping of module path → key → entry.
///
/// Both levels are `BTreeMap` so persisted output is canonical without an
/// explicit sort pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    modules: BTreeMap<String, BTreeMap<String, Entry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn entry_count(&self) -> usize {
        self.modules.values().map(BTreeMap::len).sum()
    }

    pub fn contains_module(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn get(&self, module: &str, key: &str) -> Option<&Entry> {
        self.modules.get(module).and_then(|m| m.get(key))
    }

    pub fn insert(&mut self, module: impl Into<String>, key: impl Into<String>, entry: Entry) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(key.into(), entry);
    }

    /// Remove one (module, key) pair, dropping the module bucket if it
    /// becomes empty. Returns the removed entry if it existed.
    pub fn remove(&mut self, module: &str, key: &str) -> Option<Entry> {
        let entries = self.modules.get_mut(module)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.modules.remove(module);
        }
        removed
    }

    /// Stamp `lastUsed` on the given pairs. Pairs no longer in the catalog
    /// are ignored.
    pub fn stamp_last_used(&mut self, pairs: &[(String, String)], timestamp: i64) {
        for (module, key) in pairs {
            if let Some(entry) = self.modules.get_mut(module).and_then(|m| m.get_mut(key)) {
                entry.last_used = Some(timestamp);
            }
        }
    }

    /// Rename a module bucket, used by the file-move migration.
    pub fn rename_module(&mut self, from: &str, to: &str) {
        if let Some(entries) = self.modules.remove(from) {
            self.modules.entry(to.to_string()).or_default().extend(entries);
        }
    }

    pub fn modules(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Entry>)> {
        self.modules.iter()
    }

    pub fn module_paths(&self) -> impl Iterator<Item = &String> {
        self.modules.keys()
    }

    pub fn module_entries(&self, module: &str) -> Option<&BTreeMap<String, Entry>> {
        self.modules.get(module)
    }

    /// Find an entry for `key` in any module. Existing translations always
    /// win over regeneration, wherever they live.
    pub fn find_key_anywhere(&self, key: &str) -> Option<&Entry> {
        self.modules.values().find_map(|entries| entries.get(key))
    }

    /// Module paths that hold an entry for `key`.
    pub fn modules_with_key(&self, key: &str) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|(_, entries)| entries.contains_key(key))
            .map(|(module, _)| module.as_str())
            .collect()
    }

    /// Catalog-shaped subset containing exactly the given pairs.
    pub fn subset(&self, pairs: &[(String, String)]) -> Catalog {
        let mut out = Catalog::new();
        for (module, key) in pairs {
            if let Some(entry) = self.get(module, key) {
                out.insert(module.clone(), key.clone(), entry.clone());
            }
        }
        out
    }

    /// All (module, key) pairs, sorted.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .flat_map(|(module, entries)| {
                entries.keys().map(move |key| (module.clone(), key.clone()))
            })
            .collect()
    }

    pub fn to_json(&self, languages: &[String]) -> Value {
        let mut root = Map::new();
        for (module, entries) in &self.modules {
            let mut module_map = Map::new();
            for (key, entry) in entries {
                module_map.insert(key.clone(), Value::Object(entry.to_json(languages)));
            }
            root.insert(module.clone(), Value::Object(module_map));
        }
        Value::Object(root)
    }

    pub fn from_json(value: &Value) -> Result<Catalog> {
        let Some(root) = value.as_object() else {
            bail!("Catalog root must be a JSON object");
        };
        let mut catalog = Catalog::new();
        for (module, module_value) in root {
            let Some(entries) = module_value.as_object() else {
                bail!("Catalog module \"{}\" must be a JSON object", module);
            };
            for (key, entry_value) in entries {
                let Some(entry_map) = entry_value.as_object() else {
                    bail!("Catalog entry \"{}\" in \"{}\" must be a JSON object", key, module);
                };
                catalog.insert(module.clone(), key.clone(), Entry::from_json(entry_map));
            }
        }
        Ok(catalog)
    }
}

// ============================================================
// References and compound keys
// ============================================================

/// One call site referencing a translation key, produced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub key: String,
    /// Source file path, relative to the scan root where possible.
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    /// The call expression text, kept for diagnostics.
    pub call_text: String,
    /// Epoch millis of the scan that produced this reference.
    pub scanned_at: Option<i64>,
}

/// Format the `[modulePath][key]` string addressing a row in the remote store.
pub fn format_compound_key(module: &str, key: &str) -> String {
    format!("[{}][{}]", module, key)
}

/// Parse a compound key back into (module, key).
///
/// The module component never contains `]`, so the first `][` boundary is
/// authoritative; the key component may contain any characters.
pub fn parse_compound_key(compound: &str) -> Result<(String, String)> {
    let inner = compound
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| anyhow::anyhow!("Malformed compound key: \"{}\"", compound))?;
    let Some(split) = inner.find("][") else {
        bail!("Malformed compound key: \"{}\"", compound);
    };
    let module = &inner[..split];
    let key = &inner[split + 2..];
    if module.is_empty() || key.is_empty() {
        bail!("Malformed compound key: \"{}\"", compound);
    }
    Ok((module.to_string(), key.to_string()))
}

// ============================================================
// Tests
// ============================================================
