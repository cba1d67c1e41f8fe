// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! tidywatch: folder watcher and file organizer
//!
//! Watches a directory for newly appearing files, classifies each one by
//! extension against an ordered rule catalog, and moves matches into their
//! target subfolders.

pub mod config;
pub mod error;
pub mod history;
pub mod organizer;
pub mod rules;
pub mod watcher;

pub use config::AppConfig;
pub use error::{Result, TidywatchError};
pub use rules::{Rule, RuleCatalog};
pub use watcher::{FolderWatcher, Notification, NotificationSink};
