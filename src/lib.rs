//! Lexsync - versioned translation catalog synchronization
//!
//! Lexsync keeps a catalog of translatable text entries consistent across
//! three sources: freshly scanned source code, a locally persisted JSON
//! snapshot, and an optional remote spreadsheet-backed store. It classifies
//! references into per-file modules, merges with "remote authoritative,
//! local supplements" semantics, detects entries that fell out of use, and
//! prunes them only behind an explicit user confirmation gate.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (argument parsing and dispatch)
//! - `commands`: Pipeline runners behind the CLI commands
//! - `config`: Configuration file loading and parsing
//! - `catalog`: Data model and persisted record store
//! - `classify`: Reference path → module classification
//! - `merge`: Catalog merge semantics and rename migration
//! - `unused`: Unused-entry detection (reference and time based)
//! - `deletion`: User-gated deletion workflow
//! - `remote`: Remote sheet synchronization under optimistic concurrency
//! - `emit`: Per-module translation file output
//! - `extract`: Bundled regex source scanner
//! - `collab`: Collaborator traits (extractor, interaction, translator)

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod collab;
pub mod commands;
pub mod config;
pub mod deletion;
pub mod emit;
pub mod errors;
pub mod extract;
pub mod merge;
pub mod prompt;
pub mod remote;
pub mod reporter;
pub mod unused;
pub mod utils;
