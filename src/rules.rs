// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! Classification rules mapping file extensions to destination folders

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Result;

/// Presentation tag attached to a rule. Closed set; matching never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleIcon {
    Document,
    Media,
    Archive,
    Other,
}

/// One classification entry: a set of extensions and where matches go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Short stable identifier, unique across the catalog
    pub id: String,
    /// Human-readable name, display only
    pub label: String,
    /// Lowercase dot-prefixed extensions handled by this rule
    pub extensions: Vec<String>,
    /// Destination folder, relative path
    pub target_folder: String,
    /// Display icon tag
    pub icon: RuleIcon,
}

/// Ordered, immutable list of classification rules.
///
/// Lookup is first-match-in-order: when two rules claim the same extension,
/// the rule defined earlier wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// Build a catalog from a list of rules, normalizing every extension
    pub fn from_rules(mut rules: Vec<Rule>) -> Self {
        for rule in &mut rules {
            for ext in &mut rule.extensions {
                *ext = normalize_extension(ext);
            }
        }
        Self { rules }
    }

    /// The bundled default catalog
    pub fn builtin() -> Self {
        Self::from_rules(vec![
            Rule {
                id: "admin".to_string(),
                label: "Paperwork".to_string(),
                extensions: [".pdf", ".docx", ".doc", ".xlsx", ".xls", ".pptx", ".txt", ".csv"]
                    .iter().map(|s| s.to_string()).collect(),
                target_folder: "Documents/Admin".to_string(),
                icon: RuleIcon::Document,
            },
            Rule {
                id: "media".to_string(),
                label: "Photos & Video".to_string(),
                extensions: [".jpg", ".jpeg", ".png", ".gif", ".heic", ".svg", ".mov", ".mp4"]
                    .iter().map(|s| s.to_string()).collect(),
                target_folder: "Pictures/Sorted".to_string(),
                icon: RuleIcon::Media,
            },
            Rule {
                id: "misc".to_string(),
                label: "Installers & Archives".to_string(),
                extensions: [".zip", ".rar", ".7z", ".dmg", ".pkg", ".iso"]
                    .iter().map(|s| s.to_string()).collect(),
                target_folder: "Downloads/Installers".to_string(),
                icon: RuleIcon::Archive,
            },
        ])
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Self = serde_json::from_str(&content)
            .map_err(|e| crate::TidywatchError::Config(format!("Failed to parse rules: {}", e)))?;
        Ok(Self::from_rules(catalog.rules))
    }

    /// Save the catalog to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Find the first rule whose extension set contains `ext`.
    ///
    /// The input may be any case and may omit the leading dot.
    pub fn match_extension(&self, ext: &str) -> Option<&Rule> {
        let needle = normalize_extension(ext);
        self.rules
            .iter()
            .find(|r| r.extensions.iter().any(|e| *e == needle))
    }

    /// Find the rule for a file path's extension, if any
    pub fn match_path(&self, path: &Path) -> Option<&Rule> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.match_extension(e))
    }

    /// All rules in catalog order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lower-case an extension string and ensure it carries a leading dot
pub fn normalize_extension(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}
