use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Ok, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::catalog::parse_compound_key;

pub const CONFIG_FILE_NAME: &str = ".lexsyncrc.json";

pub const TEST_FILE_PATTERNS: &[&str] = &[
    "**/*.test.tsx",
    "**/*.test.ts",
    "**/*.test.jsx",
    "**/*.test.js",
    "**/*.spec.tsx",
    "**/*.spec.ts",
    "**/*.spec.jsx",
    "**/*.spec.js",
    "**/__tests__/**",
];

/// Remote sheet settings. Absent section means the run is local-only.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Base URL of the sheet API.
    pub endpoint: String,
    /// Sheet document identifier.
    pub sheet_id: String,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Attempt bound for the incremental apply loop.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_token_env() -> String {
    "LEXSYNC_TOKEN".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Language codes in serialization order. The first one is the source
    /// language whose value defaults to the literal key text.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default = "default_source_root")]
    pub source_root: String,
    #[serde(default = "default_ignore_test_files")]
    pub ignore_test_files: bool,
    /// Path of the persisted catalog document.
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
    /// Side file holding the deletion preview audit artifact.
    #[serde(default = "default_preview_file")]
    pub preview_file: String,
    /// Directory receiving per-module translation files.
    #[serde(default = "default_output_root")]
    pub output_root: String,
    /// Age horizon in days for time-based unused-entry expiration.
    /// Absent means reference-based detection only.
    #[serde(default)]
    pub expiration_days: Option<u64>,
    /// Compound keys (`[module][key]`) exempt from pruning.
    #[serde(default)]
    pub force_keep: Vec<String>,
    /// Key-set overlap ratio above which a vanished module is treated as a
    /// rename of a new one.
    #[serde(default = "default_rename_threshold")]
    pub rename_threshold: f64,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "zh".to_string()]
}

fn default_includes() -> Vec<String> {
    ["src", "app", "components"].map(String::from).to_vec()
}

fn default_source_root() -> String {
    "./".to_string()
}

fn default_ignore_test_files() -> bool {
    true
}

fn default_catalog_file() -> String {
    "./i18n/catalog.json".to_string()
}

fn default_preview_file() -> String {
    "./i18n/.deletion-preview.json".to_string()
}

fn default_output_root() -> String {
    "./i18n/modules".to_string()
}

fn default_rename_threshold() -> f64 {
    0.8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            ignores: Vec::new(),
            includes: default_includes(),
            source_root: default_source_root(),
            ignore_test_files: default_ignore_test_files(),
            catalog_file: default_catalog_file(),
            preview_file: default_preview_file(),
            output_root: default_output_root(),
            expiration_days: None,
            force_keep: Vec::new(),
            rename_threshold: default_rename_threshold(),
            remote: None,
        }
    }
}

impl Config {
    /// The language whose value defaults to the literal key text.
    pub fn source_language(&self) -> &str {
        self.languages
            .first()
            .map(String::as_str)
            .unwrap_or("en")
    }

    /// Validate configuration values.
    ///
    /// Returns an error on invalid glob patterns, an empty language list, a
    /// rename threshold outside (0, 1], or malformed force-keep entries.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            anyhow::bail!("'languages' must list at least one language code");
        }

        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Include patterns without wildcards are literal directory paths.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        if !(self.rename_threshold > 0.0 && self.rename_threshold <= 1.0) {
            anyhow::bail!(
                "'renameThreshold' must be within (0, 1], got {}",
                self.rename_threshold
            );
        }

        for entry in &self.force_keep {
            parse_compound_key(entry).with_context(|| {
                format!(
                    "Invalid compound key in 'forceKeep': \"{}\" (expected \"[module][key]\")",
                    entry
                )
            })?;
        }

        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.languages, vec!["en", "zh"]);
        assert_eq!(config.source_language(), "en");
        assert!(config.ignores.is_empty());
        assert!(config.expiration_days.is_none());
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
              "languages": ["en", "ja", "zh"],
              "ignores": ["**/dist/**"],
              "includes": ["src/**"],
              "expirationDays": 7
          }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.languages, vec!["en", "ja", "zh"]);
        assert_eq!(config.ignores, vec!["**/dist/**"]);
        assert_eq!(config.includes, vec!["src/**"]);
        assert_eq!(config.expiration_days, Some(7));
    }

    #[test]
    fn test_parse_remote_config_defaults() {
        let json = r#"{
            "remote": {
                "endpoint": "https://sheets.example.com",
                "sheetId": "abc123"
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let remote = config.remote.unwrap();
        assert_eq!(remote.endpoint, "https://sheets.example.com");
        assert_eq!(remote.sheet_id, "abc123");
        assert_eq!(remote.token_env, "LEXSYNC_TOKEN");
        assert_eq!(remote.max_attempts, 3);
        assert_eq!(remote.retry_base_delay_ms, 500);
    }

    #[test]
    fn test_find_config_file() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("src").join("components");
        fs::create_dir_all(&sub_dir).unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        File::create(&config_path).unwrap();

        let found = find_config_file(&sub_dir);
        assert!(found.is_some());
        assert_eq!(found.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let found = find_config_file(dir.path());
        assert!(found.is_none());
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{ "ignores": ["**/dist/**"] }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.ignores, vec!["**/dist/**"]);
        assert_eq!(config.includes, default_includes());
        assert_eq!(config.languages, default_languages());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&config_path, r#"{ "ignores": ["**/test/**"] }"#).unwrap();

        let result = load_config(dir.path()).unwrap();
        assert!(result.from_file);
        assert_eq!(result.config.ignores, vec!["**/test/**"]);
    }

    #[test]
    fn test_load_config_default_when_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let result = load_config(dir.path()).unwrap();
        assert!(!result.from_file);
        assert!(result.config.ignores.is_empty());
    }

    #[test]
    fn test_validate_empty_languages() {
        let config = Config {
            languages: Vec::new(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("languages"));
    }

    #[test]
    fn test_validate_invalid_ignore_pattern() {
        let config = Config {
            ignores: vec!["[invalid".to_string()], // unclosed bracket
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ignores"));
    }

    #[test]
    fn test_validate_rename_threshold_bounds() {
        let mut config = Config {
            rename_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.rename_threshold = 1.2;
        assert!(config.validate().is_err());

        config.rename_threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_force_keep_entries() {
        let config = Config {
            force_keep: vec!["[components/auth.ts][Sign in]".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            force_keep: vec!["not-a-compound-key".to_string()],
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("forceKeep"));
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("catalogFile"));
        assert!(json.contains("expirationDays"));
        assert!(json.contains("renameThreshold"));
    }
}
