//! Collaborator contracts consumed by the sync core.
//!
//! Scanning, prompting, and machine translation are external concerns. The
//! core only sees these traits, which keeps every workflow deterministic
//! under test: the integration tests drive the full pipeline with scripted
//! implementations.

use std::path::Path;

use anyhow::Result;

use crate::catalog::Reference;

/// Newly-discovered translatable text that has no catalog entry yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewText {
    pub key: String,
    pub source_file: String,
}

/// Everything a project scan yields.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub references: Vec<Reference>,
    pub new_text: Vec<NewText>,
}

/// Yields reference locations and newly-discovered text from the source tree.
pub trait Extractor {
    fn scan_project(&self) -> Result<ScanOutcome>;
}

/// Minimal confirm/select contract for user-gated decisions.
///
/// Implementations must be stateless between calls; all inputs arrive as
/// arguments and all decisions come back as return values.
pub trait Interaction {
    /// Let the user pick which of the unused compound keys to delete.
    fn select_keys_for_deletion(&self, compound_keys: &[String]) -> Result<Vec<String>>;

    /// Final gate before any destructive action. `preview_path` points at the
    /// already-written deletion preview for inspection.
    fn confirm_deletion(&self, compound_keys: &[String], preview_path: &Path) -> Result<bool>;

    /// Gate before pushing the catalog to the remote store.
    fn confirm_remote_sync(&self) -> Result<bool>;
}

/// Machine translation of newly-discovered text.
///
/// Fallible by contract: callers fall back to the source text on error.
pub trait Translator {
    fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;
}

/// Identity translator used when no translation backend is configured.
/// Every target language starts out as the source text.
pub struct EchoTranslator;

impl Translator for EchoTranslator {
    fn translate(&self, text: &str, _from: &str, _to: &str) -> Result<String> {
        Ok(text.to_string())
    }
}
