//! Mapping source-file references to catalog module buckets.
//!
//! A key is bucketed under every module path its references touch; that is
//! what makes folder-scoped duplication across modules correct rather than
//! accidental.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::catalog::{COMMON_MODULE, Reference};

/// Source extensions that all canonicalize to `ts`, so module paths stay
/// stable when a file migrates between dialects.
const CANONICAL_EXTENSIONS: &[&str] = &["tsx", "jsx", "js", "mts", "cts"];

pub struct PathClassifier {
    source_root: PathBuf,
}

impl PathClassifier {
    pub fn new(source_root: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
        }
    }

    /// Normalize a reference's file path into module-path form: relative to
    /// the project root, forward slashes, canonical extension. Returns `None`
    /// when nothing usable remains.
    pub fn normalize(&self, file_path: &str) -> Option<String> {
        if file_path.is_empty() {
            return None;
        }

        let path = Path::new(file_path);
        let relative = path.strip_prefix(&self.source_root).unwrap_or(path);

        let mut parts: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                // A path escaping the root has no module-path form.
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }

        let joined = parts.join("/");
        Some(canonicalize_extension(&joined))
    }

    /// Bucket every key under each distinct module path its references touch.
    /// Keys whose references carry no usable path land in the sentinel
    /// `common` bucket.
    pub fn classify(&self, references: &[Reference]) -> BTreeMap<String, Vec<String>> {
        let mut buckets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for reference in references {
            let module = self
                .normalize(&reference.file_path)
                .unwrap_or_else(|| COMMON_MODULE.to_string());
            buckets.entry(module).or_default().insert(reference.key.clone());
        }

        buckets
            .into_iter()
            .map(|(module, keys)| (module, keys.into_iter().collect()))
            .collect()
    }
}

/// Rewrite a known source extension to the canonical `ts`.
pub fn canonicalize_extension(path: &str) -> String {
    if let Some(dot) = path.rfind('.') {
        let ext = &path[dot + 1..];
        if CANONICAL_EXTENSIONS.contains(&ext) {
            return format!("{}.ts", &path[..dot]);
        }
    }
    path.to_string()
}
