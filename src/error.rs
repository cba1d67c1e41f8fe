// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! Error types for tidywatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tidywatch operations
pub type Result<T> = std::result::Result<T, TidywatchError>;

/// tidywatch error types
#[derive(Error, Debug)]
pub enum TidywatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid watch target: {} is missing or not a directory", .0.display())]
    InvalidWatchTarget(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
