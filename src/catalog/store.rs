//! Catalog persistence.
//!
//! The catalog lives in a single JSON document. Writes go through a temp file
//! followed by a rename, so a crashed run never leaves a half-written catalog
//! behind. Field ordering is canonicalized on every write: languages in
//! configured order, `mark` last, modules and keys sorted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use crate::catalog::Catalog;
use crate::errors::SyncError;

/// Loads and persists the catalog document and the deletion preview side file.
pub struct RecordStore {
    catalog_path: PathBuf,
    preview_path: PathBuf,
    languages: Vec<String>,
}

impl RecordStore {
    pub fn new(catalog_path: &Path, preview_path: &Path, languages: &[String]) -> Self {
        Self {
            catalog_path: catalog_path.to_path_buf(),
            preview_path: preview_path.to_path_buf(),
            languages: languages.to_vec(),
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn preview_path(&self) -> &Path {
        &self.preview_path
    }

    /// Load the catalog. An absent file is an empty catalog, not an error.
    pub fn load(&self) -> Result<Catalog, SyncError> {
        if !self.catalog_path.exists() {
            return Ok(Catalog::new());
        }
        let content = fs::read_to_string(&self.catalog_path)
            .map_err(|err| classify_io(&self.catalog_path, err))?;
        let value: serde_json::Value = serde_json::from_str(&content).map_err(|err| {
            SyncError::Unknown(anyhow!(
                "Failed to parse catalog {}: {}",
                self.catalog_path.display(),
                err
            ))
        })?;
        Catalog::from_json(&value).map_err(SyncError::Unknown)
    }

    /// Persist the catalog atomically with canonical field ordering.
    pub fn save(&self, catalog: &Catalog) -> Result<(), SyncError> {
        write_document(&self.catalog_path, &catalog.to_json(&self.languages))
    }

    /// Write the deletion preview audit artifact.
    pub fn save_preview(&self, preview: &Catalog) -> Result<(), SyncError> {
        write_document(&self.preview_path, &preview.to_json(&self.languages))
    }

    /// Remove the preview side file once the deletion decision is settled.
    pub fn remove_preview(&self) -> Result<(), SyncError> {
        match fs::remove_file(&self.preview_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(classify_io(&self.preview_path, err)),
        }
    }
}

fn write_document(path: &Path, value: &serde_json::Value) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| classify_io(parent, err))?;
        }
    }

    let content = serde_json::to_string_pretty(value)
        .context("Failed to serialize catalog")
        .map_err(SyncError::Unknown)?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, format!("{}\n", content)).map_err(|err| classify_io(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| classify_io(path, err))?;
    Ok(())
}

fn classify_io(path: &Path, err: io::Error) -> SyncError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        SyncError::Permission {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    } else {
        SyncError::Unknown(anyhow!("I/O error on {}: {}", path.display(), err))
    }
}
