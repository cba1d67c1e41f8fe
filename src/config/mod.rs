// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! Configuration management for tidywatch

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Directory to watch
    pub watch_path: String,

    /// Optional rules file; the built-in catalog is used when absent
    #[serde(default)]
    pub rules_file: Option<String>,

    /// Move behavior
    #[serde(default)]
    pub organizer: OrganizerConfig,

    /// Move ledger location
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrganizerConfig {
    /// Base directory target folders are resolved against.
    /// Defaults to the watched directory itself.
    #[serde(default)]
    pub destination_root: Option<String>,

    /// Where unmatched files go; they are left in place when unset
    #[serde(default)]
    pub fallback_folder: Option<String>,

    /// How long to wait for a new file to stop growing before moving it
    #[serde(default = "default_stable_wait_secs")]
    pub stable_wait_secs: u64,

    /// Files the organizer must never touch
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Name patterns excluded from organizing (hidden files are always excluded)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IgnoreConfig {
    /// Filename suffixes of in-progress downloads and editor scratch files
    #[serde(default = "default_ignore_suffixes")]
    pub suffixes: Vec<String>,

    /// Exact filenames of OS junk, matched case-insensitively
    #[serde(default = "default_ignore_names")]
    pub names: Vec<String>,
}

// Default value functions
fn default_history_file() -> String { "tidywatch_history.jsonl".to_string() }
fn default_stable_wait_secs() -> u64 { 10 }

fn default_ignore_suffixes() -> Vec<String> {
    [".tmp", ".part", ".crdownload", ".partial", ".download"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_ignore_names() -> Vec<String> {
    ["desktop.ini", "thumbs.db", ".ds_store"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            watch_path: "./watch".to_string(),
            rules_file: None,
            organizer: OrganizerConfig::default(),
            history_file: default_history_file(),
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            destination_root: None,
            fallback_folder: None,
            stable_wait_secs: default_stable_wait_secs(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            suffixes: default_ignore_suffixes(),
            names: default_ignore_names(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TidywatchError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
