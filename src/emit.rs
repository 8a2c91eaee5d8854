//! Per-module translation file output.
//!
//! After a sync the merged catalog is flattened into one JSON file per
//! module per language, the shape application code actually loads at
//! runtime. Files live under the configured output root as
//! `<language>/<module-path>.json`, with the module's source extension
//! replaced by `.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::catalog::Catalog;

pub struct ModuleFileEmitter {
    output_root: PathBuf,
    languages: Vec<String>,
}

impl ModuleFileEmitter {
    pub fn new(output_root: &Path, languages: &[String]) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            languages: languages.to_vec(),
        }
    }

    /// Write every module/language file, replacing whatever was there.
    /// Returns the number of files written.
    pub fn emit(&self, catalog: &Catalog) -> Result<usize> {
        let mut written = 0;
        for language in &self.languages {
            for (module, entries) in catalog.modules() {
                let mut map = Map::new();
                for (key, entry) in entries {
                    // Entries with no value in this language fall back to the
                    // key text so the file stays loadable.
                    let text = entry.value(language).unwrap_or(key.as_str());
                    map.insert(key.clone(), Value::String(text.to_string()));
                }
                let path = self.module_file_path(language, module);
                write_module_file(&path, &map)?;
                written += 1;
            }
        }
        Ok(written)
    }

    fn module_file_path(&self, language: &str, module: &str) -> PathBuf {
        let file_name = match module.rsplit_once('.') {
            Some((stem, _ext)) => format!("{}.json", stem),
            None => format!("{}.json", module),
        };
        self.output_root.join(language).join(file_name)
    }
}

fn write_module_file(path: &Path, map: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(&Value::Object(map.clone()))
        .context("Failed to serialize JSON")?;
    fs::write(path, format!("{}\n", content))
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    Ok(())
}

/// Read one emitted module file back as a flat key map. Used by tests and
/// by tooling that inspects the output tree.
pub fn read_module_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let value: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))?;
    Ok(value
        .into_iter()
        .filter_map(|(key, v)| v.as_str().map(|s| (key, s.to_string())))
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, Entry};
    use crate::emit::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn languages() -> Vec<String> {
        vec!["en".to_string(), "zh".to_string()]
    }

    #[test]
    fn test_emit_writes_per_module_per_language() {
        let dir = tempdir().unwrap();
        let emitter = ModuleFileEmitter::new(dir.path(), &languages());

        let mut catalog = Catalog::new();
        catalog.insert(
            "components/Button.ts",
            "Submit",
            Entry::from_values([("en", "Submit"), ("zh", "提交")]),
        );
        catalog.insert(
            "common",
            "Cancel",
            Entry::from_values([("en", "Cancel"), ("zh", "取消")]),
        );

        let written = emitter.emit(&catalog).unwrap();
        assert_eq!(written, 4);

        let en = read_module_file(&dir.path().join("en/components/Button.json")).unwrap();
        assert_eq!(en.get("Submit").map(String::as_str), Some("Submit"));

        let zh = read_module_file(&dir.path().join("zh/components/Button.json")).unwrap();
        assert_eq!(zh.get("Submit").map(String::as_str), Some("提交"));

        let common = read_module_file(&dir.path().join("zh/common.json")).unwrap();
        assert_eq!(common.get("Cancel").map(String::as_str), Some("取消"));
    }

    #[test]
    fn test_emit_falls_back_to_key_for_missing_language() {
        let dir = tempdir().unwrap();
        let emitter = ModuleFileEmitter::new(dir.path(), &languages());

        let mut catalog = Catalog::new();
        catalog.insert("a.ts", "Hello", Entry::from_values([("en", "Hello")]));
        emitter.emit(&catalog).unwrap();

        let zh = read_module_file(&dir.path().join("zh/a.json")).unwrap();
        assert_eq!(zh.get("Hello").map(String::as_str), Some("Hello"));
    }

    #[test]
    fn test_emit_output_is_sorted_and_newline_terminated() {
        let dir = tempdir().unwrap();
        let emitter = ModuleFileEmitter::new(dir.path(), &["en".to_string()]);

        let mut catalog = Catalog::new();
        catalog.insert("a.ts", "Zebra", Entry::from_values([("en", "Zebra")]));
        catalog.insert("a.ts", "Apple", Entry::from_values([("en", "Apple")]));
        emitter.emit(&catalog).unwrap();

        let content = std::fs::read_to_string(dir.path().join("en/a.json")).unwrap();
        assert!(content.ends_with('\n'));
        let apple = content.find("Apple").unwrap();
        let zebra = content.find("Zebra").unwrap();
        assert!(apple < zebra);
    }
}
