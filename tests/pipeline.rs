//! End-to-end pipeline tests driving `SyncRunner` with fake collaborators.

use std::cell::RefCell;
use std::path::Path;

use anyhow::Result;
use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};

use lexsync::catalog::store::RecordStore;
use lexsync::catalog::{Catalog, Entry, Reference};
use lexsync::collab::{EchoTranslator, Extractor, Interaction, NewText, ScanOutcome};
use lexsync::commands::{SyncFlags, SyncRunner};
use lexsync::config::{Config, RemoteConfig};
use lexsync::deletion::DeletionOutcome;
use lexsync::emit::read_module_file;
use lexsync::errors::SyncError;
use lexsync::remote::SheetClient;
use lexsync::reporter::Reporter;

struct FakeExtractor {
    outcome: ScanOutcome,
}

impl FakeExtractor {
    fn with_keys(keys: &[(&str, &str)]) -> Self {
        let references = keys
            .iter()
            .map(|(key, file)| Reference {
                key: key.to_string(),
                file_path: file.to_string(),
                line: 1,
                column: 1,
                call_text: format!("t(\"{}\")", key),
                scanned_at: Some(1),
            })
            .collect();
        let new_text = keys
            .iter()
            .map(|(key, file)| NewText {
                key: key.to_string(),
                source_file: file.to_string(),
            })
            .collect();
        Self {
            outcome: ScanOutcome {
                references,
                new_text,
            },
        }
    }
}

impl Extractor for FakeExtractor {
    fn scan_project(&self) -> Result<ScanOutcome> {
        Ok(self.outcome.clone())
    }
}

struct ScriptedInteraction {
    select_all: bool,
    confirm_delete: bool,
    confirm_push: bool,
}

impl Interaction for ScriptedInteraction {
    fn select_keys_for_deletion(&self, compound_keys: &[String]) -> Result<Vec<String>> {
        if self.select_all {
            Ok(compound_keys.to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    fn confirm_deletion(&self, _compound_keys: &[String], _preview_path: &Path) -> Result<bool> {
        Ok(self.confirm_delete)
    }

    fn confirm_remote_sync(&self) -> Result<bool> {
        Ok(self.confirm_push)
    }
}

struct FakeSheet {
    rows: RefCell<Vec<Vec<String>>>,
}

impl FakeSheet {
    fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: RefCell::new(rows),
        }
    }

    fn compound_keys(&self) -> Vec<String> {
        self.rows
            .borrow()
            .iter()
            .filter_map(|r| r.first().cloned())
            .collect()
    }
}

impl SheetClient for FakeSheet {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SyncError> {
        Ok(self.rows.borrow().clone())
    }

    fn update_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), SyncError> {
        let mut data = self.rows.borrow_mut();
        for (offset, cells) in rows.iter().enumerate() {
            let target = &mut data[start_row + offset];
            for (col, value) in cells.iter().enumerate() {
                if col < target.len() {
                    target[col] = value.clone();
                } else {
                    target.push(value.clone());
                }
            }
        }
        Ok(())
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), SyncError> {
        self.rows.borrow_mut().extend(rows.iter().cloned());
        Ok(())
    }

    fn delete_row(&self, row: usize) -> Result<(), SyncError> {
        self.rows.borrow_mut().remove(row);
        Ok(())
    }

    fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<(), SyncError> {
        let mut data = self.rows.borrow_mut();
        let target = &mut data[row];
        while target.len() <= col {
            target.push(String::new());
        }
        target[col] = value.to_string();
        Ok(())
    }
}

fn config_in(dir: &TempDir) -> Config {
    let root = dir.path();
    Config {
        catalog_file: root.join("i18n/catalog.json").to_string_lossy().to_string(),
        preview_file: root.join("i18n/.preview.json").to_string_lossy().to_string(),
        output_root: root.join("i18n/modules").to_string_lossy().to_string(),
        ..Default::default()
    }
}

fn store_for(config: &Config) -> RecordStore {
    RecordStore::new(
        Path::new(&config.catalog_file),
        Path::new(&config.preview_file),
        &config.languages,
    )
}

#[test]
fn test_sync_builds_catalog_and_module_files_from_scratch() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);

    let extractor = FakeExtractor::with_keys(&[
        ("Sign in", "src/components/auth.tsx"),
        ("Welcome", "src/app/page.tsx"),
    ]);
    let interaction = ScriptedInteraction {
        select_all: false,
        confirm_delete: false,
        confirm_push: false,
    };

    let runner = SyncRunner::new(&config, Reporter::default());
    let report = runner
        .run(
            SyncFlags::default(),
            &extractor,
            &interaction,
            &EchoTranslator,
            None,
        )
        .unwrap();

    assert_eq!(report.references, 2);
    assert_eq!(report.entries, 2);
    assert_eq!(report.outcome, DeletionOutcome::NothingToDelete);
    // 2 modules x 2 languages
    assert_eq!(report.files_written, 4);
    assert!(report.pushed.is_none());

    let catalog = store_for(&config).load().unwrap();
    let entry = catalog.get("src/components/auth.ts", "Sign in").unwrap();
    assert_eq!(entry.value("en"), Some("Sign in"));
    // EchoTranslator: target language starts as the source text.
    assert_eq!(entry.value("zh"), Some("Sign in"));
    assert!(entry.last_used.is_some());

    let emitted = read_module_file(
        &Path::new(&config.output_root).join("en/src/components/auth.json"),
    )
    .unwrap();
    assert_eq!(emitted.get("Sign in").map(String::as_str), Some("Sign in"));
}

#[test]
fn test_sync_prune_deletes_confirmed_unused_entries() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    let store = store_for(&config);

    let mut seeded = Catalog::new();
    seeded.insert("src/a.ts", "Used", Entry::from_values([("en", "Used")]));
    seeded.insert("src/a.ts", "Old", Entry::from_values([("en", "Old")]));
    store.save(&seeded).unwrap();

    let extractor = FakeExtractor::with_keys(&[("Used", "src/a.tsx")]);
    let interaction = ScriptedInteraction {
        select_all: true,
        confirm_delete: true,
        confirm_push: false,
    };

    let runner = SyncRunner::new(&config, Reporter::default());
    let report = runner
        .run(
            SyncFlags { prune: true },
            &extractor,
            &interaction,
            &EchoTranslator,
            None,
        )
        .unwrap();

    assert_eq!(report.outcome, DeletionOutcome::Deleted { deleted: 1 });

    let catalog = store.load().unwrap();
    assert!(catalog.get("src/a.ts", "Old").is_none());
    let used = catalog.get("src/a.ts", "Used").unwrap();
    assert!(used.last_used.is_some());
    // Preview side file must be gone after a completed workflow.
    assert!(!Path::new(&config.preview_file).exists());
}

#[test]
fn test_sync_prune_declined_preserves_everything() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir);
    let store = store_for(&config);

    let mut seeded = Catalog::new();
    seeded.insert("src/a.ts", "Old", Entry::from_values([("en", "Old")]));
    store.save(&seeded).unwrap();

    let extractor = FakeExtractor::with_keys(&[("Fresh", "src/a.tsx")]);
    let interaction = ScriptedInteraction {
        select_all: true,
        confirm_delete: false,
        confirm_push: false,
    };

    let runner = SyncRunner::new(&config, Reporter::default());
    let report = runner
        .run(
            SyncFlags { prune: true },
            &extractor,
            &interaction,
            &EchoTranslator,
            None,
        )
        .unwrap();

    assert_eq!(
        report.outcome,
        DeletionOutcome::PreservedDeclined { selected: 1 }
    );

    let catalog = store.load().unwrap();
    assert!(catalog.get("src/a.ts", "Old").is_some());
    assert!(catalog.get("src/a.ts", "Fresh").is_some());
}

#[test]
fn test_sync_pulls_remote_values_and_pushes_new_keys() {
    let dir = tempdir().unwrap();
    let mut config = config_in(&dir);
    config.remote = Some(RemoteConfig {
        endpoint: "https://sheets.example.com".to_string(),
        sheet_id: "doc1".to_string(),
        token_env: "LEXSYNC_TOKEN".to_string(),
        max_attempts: 3,
        retry_base_delay_ms: 1,
    });
    let store = store_for(&config);

    let mut seeded = Catalog::new();
    seeded.insert("a.ts", "Hello", Entry::from_values([("en", "Hello")]));
    store.save(&seeded).unwrap();

    // Remote edited the English text and supplied the translation.
    let sheet = FakeSheet::new(vec![
        vec![
            "[a.ts][Hello]".to_string(),
            "Hello there".to_string(),
            "你好".to_string(),
            "1".to_string(),
        ],
    ]);

    let extractor = FakeExtractor::with_keys(&[("Hello", "a.tsx"), ("New key", "a.tsx")]);
    let interaction = ScriptedInteraction {
        select_all: false,
        confirm_delete: false,
        confirm_push: true,
    };

    let runner = SyncRunner::new(&config, Reporter::default());
    let report = runner
        .run(
            SyncFlags::default(),
            &extractor,
            &interaction,
            &EchoTranslator,
            Some(&sheet),
        )
        .unwrap();

    let catalog = store.load().unwrap();
    let hello = catalog.get("a.ts", "Hello").unwrap();
    // Remote is authoritative for overlapping fields.
    assert_eq!(hello.value("en"), Some("Hello there"));
    assert_eq!(hello.value("zh"), Some("你好"));
    assert_eq!(hello.mark, 1);

    // The new key was appended to the sheet.
    let keys = sheet.compound_keys();
    assert!(keys.contains(&"[a.ts][New key]".to_string()));
    let (added, _, deleted) = report.pushed.unwrap();
    assert_eq!(added, 1);
    assert_eq!(deleted, 0);
}

#[test]
fn test_sync_remote_failure_degrades_to_local_run() {
    struct BrokenSheet;

    impl SheetClient for BrokenSheet {
        fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SyncError> {
            Err(SyncError::Api {
                status: 500,
                message: "remote down".to_string(),
            })
        }
        fn update_rows(&self, _: usize, _: &[Vec<String>]) -> Result<(), SyncError> {
            unreachable!("no rows to update")
        }
        fn append_rows(&self, _: &[Vec<String>]) -> Result<(), SyncError> {
            Err(SyncError::Api {
                status: 500,
                message: "remote down".to_string(),
            })
        }
        fn delete_row(&self, _: usize) -> Result<(), SyncError> {
            unreachable!("no rows to delete")
        }
        fn write_cell(&self, _: usize, _: usize, _: &str) -> Result<(), SyncError> {
            unreachable!("no cells to write")
        }
    }

    let dir = tempdir().unwrap();
    let config = config_in(&dir);

    let extractor = FakeExtractor::with_keys(&[("Hello", "a.tsx")]);
    // Declines the push, so only the degraded pull touches the remote.
    let interaction = ScriptedInteraction {
        select_all: false,
        confirm_delete: false,
        confirm_push: false,
    };

    let runner = SyncRunner::new(&config, Reporter::default());
    let report = runner
        .run(
            SyncFlags::default(),
            &extractor,
            &interaction,
            &EchoTranslator,
            Some(&BrokenSheet),
        )
        .unwrap();

    assert!(report.pushed.is_none());
    let catalog = store_for(&config).load().unwrap();
    assert!(catalog.get("a.ts", "Hello").is_some());
}
