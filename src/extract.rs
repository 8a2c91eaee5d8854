//! Bundled source scanner.
//!
//! A regex-level `Extractor` over `t("...")` / `$t('...')` call sites. It
//! finds reference locations and candidate new text; it never rewrites
//! source. Projects with heavier needs (template literals, aliased helpers)
//! can supply their own `Extractor` implementation instead.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::catalog::Reference;
use crate::collab::{Extractor, NewText, ScanOutcome};
use crate::config::{Config, TEST_FILE_PATTERNS};
use crate::reporter::Reporter;
use crate::utils::now_millis;

/// Patterns without glob wildcards are treated as literal directory paths.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

pub struct RegexExtractor {
    source_root: String,
    includes: Vec<String>,
    ignores: Vec<String>,
    ignore_test_files: bool,
    reporter: Reporter,
}

impl RegexExtractor {
    pub fn from_config(config: &Config, reporter: Reporter) -> Self {
        Self {
            source_root: config.source_root.clone(),
            includes: config.includes.clone(),
            ignores: config.ignores.clone(),
            ignore_test_files: config.ignore_test_files,
            reporter,
        }
    }

    fn scan_files(&self) -> HashSet<String> {
        let mut files: HashSet<String> = HashSet::new();

        let mut literal_ignore_paths: Vec<PathBuf> = Vec::new();
        let mut glob_patterns: Vec<Pattern> = Vec::new();

        for p in &self.ignores {
            if is_glob_pattern(p) {
                match Pattern::new(p) {
                    Ok(pattern) => glob_patterns.push(pattern),
                    Err(e) => self
                        .reporter
                        .warn(&format!("Invalid ignore pattern '{}': {}", p, e)),
                }
            } else {
                literal_ignore_paths.push(Path::new(&self.source_root).join(p));
            }
        }

        if self.ignore_test_files {
            for p in TEST_FILE_PATTERNS {
                if let Ok(pattern) = Pattern::new(p) {
                    glob_patterns.push(pattern);
                }
            }
        }

        let dirs_to_scan: Vec<PathBuf> = if self.includes.is_empty() {
            vec![Path::new(&self.source_root).to_path_buf()]
        } else {
            let mut paths = Vec::new();
            for inc in &self.includes {
                if is_glob_pattern(inc) {
                    // Glob mode: expand the pattern to matching directories.
                    let full_pattern = Path::new(&self.source_root).join(inc);
                    match glob(&full_pattern.to_string_lossy()) {
                        Ok(entries) => {
                            paths.extend(entries.flatten().filter(|e| e.is_dir()));
                        }
                        Err(e) => self
                            .reporter
                            .warn(&format!("Invalid include pattern '{}': {}", inc, e)),
                    }
                } else {
                    let path = Path::new(&self.source_root).join(inc);
                    if path.exists() {
                        paths.push(path);
                    } else {
                        self.reporter.detail(&format!(
                            "Include path does not exist: {}",
                            path.display()
                        ));
                    }
                }
            }
            paths
        };

        for dir in dirs_to_scan {
            for entry in WalkDir::new(dir) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        self.reporter.detail(&format!("Cannot access path: {}", e));
                        continue;
                    }
                };
                let path = entry.path();
                let path_str = path.to_string_lossy();

                if literal_ignore_paths
                    .iter()
                    .any(|ignore_path| path.starts_with(ignore_path))
                {
                    continue;
                }
                if glob_patterns.iter().any(|p| p.matches(&path_str)) {
                    continue;
                }
                if path.is_file() && is_scannable_file(path) {
                    files.insert(path_str.into());
                }
            }
        }

        files
    }
}

impl Extractor for RegexExtractor {
    fn scan_project(&self) -> Result<ScanOutcome> {
        let call_pattern = call_site_regex()?;
        let scanned_at = now_millis();

        let mut files: Vec<String> = self.scan_files().into_iter().collect();
        files.sort();

        let per_file: Vec<Vec<Reference>> = files
            .par_iter()
            .map(|file| match fs::read_to_string(file) {
                Ok(content) => scan_source(&call_pattern, file, &content, scanned_at),
                Err(err) => {
                    self.reporter
                        .detail(&format!("Cannot read {}: {}", file, err));
                    Vec::new()
                }
            })
            .collect();

        let references: Vec<Reference> = per_file.into_iter().flatten().collect();

        // Every scanned key is a potential new entry; the merge engine drops
        // the ones the catalog already knows.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut new_text = Vec::new();
        for reference in &references {
            if seen.insert(&reference.key) {
                new_text.push(NewText {
                    key: reference.key.clone(),
                    source_file: reference.file_path.clone(),
                });
            }
        }

        Ok(ScanOutcome {
            references,
            new_text,
        })
    }
}

fn is_scannable_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("tsx" | "ts" | "jsx" | "js" | "mts" | "cts")
    )
}

/// `t("...")`, `t('...')`, and `$t(...)` call sites. One alternation branch
/// per quote style; group 1 holds a double-quoted key, group 2 a
/// single-quoted one.
fn call_site_regex() -> Result<Regex> {
    Regex::new(r#"\$?\bt\(\s*(?:"((?:\\.|[^"\\])*)"|'((?:\\.|[^'\\])*)')"#)
        .context("Invalid call-site pattern")
}

fn scan_source(
    pattern: &Regex,
    file_path: &str,
    content: &str,
    scanned_at: i64,
) -> Vec<Reference> {
    let mut references = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        for captures in pattern.captures_iter(line) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let Some(key) = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|m| m.as_str())
            else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            references.push(Reference {
                key: unescape(key),
                file_path: file_path.to_string(),
                line: line_idx + 1,
                column: whole.start() + 1,
                call_text: whole.as_str().to_string(),
                scanned_at: Some(scanned_at),
            });
        }
    }
    references
}

/// Undo source-level escaping inside the quoted key.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
