// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! Moves classified files into their destination folders

use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::IgnoreConfig;
use crate::history::{History, MoveRecord};
use crate::rules::RuleCatalog;
use crate::Result;

/// Rule id recorded for files routed by the fallback folder
pub const FALLBACK_RULE_ID: &str = "fallback";

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// File was moved to its destination
    Moved { to: PathBuf, rule_id: String },
    /// Dry run: file would have been moved
    WouldMove { to: PathBuf, rule_id: String },
    /// No rule matched and no fallback folder is configured
    NoRule,
    /// Hidden, ignored, or already-moved file; not considered
    Skipped,
}

/// Applies the rule catalog to files and performs the moves
pub struct Organizer {
    catalog: RuleCatalog,
    destination_root: PathBuf,
    fallback_folder: Option<String>,
    ignore: IgnoreConfig,
    dry_run: bool,
    history: History,
}

impl Organizer {
    pub fn new(
        catalog: RuleCatalog,
        destination_root: PathBuf,
        fallback_folder: Option<String>,
        ignore: IgnoreConfig,
        dry_run: bool,
        history: History,
    ) -> Self {
        Self {
            catalog,
            destination_root,
            fallback_folder,
            ignore,
            dry_run,
            history,
        }
    }

    /// The catalog this organizer routes with
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Whether a filename is eligible at all.
    ///
    /// Hidden files are always out; beyond that the configured ignore lists
    /// decide (in-progress download suffixes, OS junk names).
    fn is_candidate(&self, filename: &str) -> bool {
        if filename.starts_with('.') {
            return false;
        }

        let lowered = filename.to_lowercase();
        if self.ignore.suffixes.iter().any(|s| lowered.ends_with(s.as_str())) {
            return false;
        }

        !self.ignore.names.iter().any(|n| filename.eq_ignore_ascii_case(n))
    }

    /// Classify one file and move it into its target folder.
    ///
    /// Unmatched files go to the fallback folder when one is configured and
    /// are otherwise left untouched.
    pub fn organize(&self, path: &Path) -> Result<Outcome> {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return Ok(Outcome::Skipped),
        };

        // Duplicate deliveries for the same creation resolve here: the first
        // move removes the source, later attempts find nothing to do.
        if !path.is_file() {
            debug!("Not a file (already moved?): {:?}", path);
            return Ok(Outcome::Skipped);
        }

        if !self.is_candidate(filename) {
            debug!("Ignored by policy: {:?}", path);
            return Ok(Outcome::Skipped);
        }

        let (rule_id, target_folder) = match self.catalog.match_path(path) {
            Some(rule) => (rule.id.clone(), rule.target_folder.clone()),
            None => match &self.fallback_folder {
                Some(folder) => (FALLBACK_RULE_ID.to_string(), folder.clone()),
                None => {
                    debug!("No rule for: {:?}", path);
                    return Ok(Outcome::NoRule);
                }
            },
        };

        let target_dir = self.destination_root.join(&target_folder);
        let destination = resolve_collision(target_dir.join(filename));

        if self.dry_run {
            info!("DRY RUN: Would move {:?} to {:?}", path, destination);
            return Ok(Outcome::WouldMove {
                to: destination,
                rule_id,
            });
        }

        std::fs::create_dir_all(&target_dir)?;
        std::fs::rename(path, &destination)?;
        info!("Moved {:?} to {:?} (rule: {})", path, destination, rule_id);

        // The move already happened; a ledger failure only costs undo support
        let record = MoveRecord::new(path.to_path_buf(), destination.clone(), rule_id.clone());
        if let Err(e) = self.history.record_move(&record) {
            warn!("Move not recorded in ledger: {}", e);
        }

        Ok(Outcome::Moved {
            to: destination,
            rule_id,
        })
    }

    /// Organize every file currently sitting in `dir` (direct children only).
    ///
    /// Returns how many files were moved (or would be, in dry-run mode).
    pub fn sweep(&self, dir: &Path) -> Result<usize> {
        let mut moved = 0;

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.organize(&path) {
                Ok(Outcome::Moved { .. }) | Ok(Outcome::WouldMove { .. }) => moved += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to organize {:?}: {}", path, e),
            }
        }

        Ok(moved)
    }
}

/// Pick a destination that does not clobber an existing file
fn resolve_collision(destination: PathBuf) -> PathBuf {
    if !destination.exists() {
        return destination;
    }

    let parent = destination.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let timestamp = Local::now().format("%H%M%S").to_string();

    match destination.extension().and_then(|e| e.to_str()) {
        Some(ext) => parent.join(format!("{}_{}.{}", stem, timestamp, ext)),
        None => parent.join(format!("{}_{}", stem, timestamp)),
    }
}

/// Wait until a freshly created file stops changing size.
///
/// Returns false when the file vanishes before settling. A file still
/// growing at `max_wait` counts as settled so the caller is never stuck.
pub async fn wait_until_settled(path: &Path, max_wait: Duration) -> bool {
    const PROBE_INTERVAL: Duration = Duration::from_millis(250);
    let deadline = Instant::now() + max_wait;
    let mut last_seen: Option<u64> = None;

    loop {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => return false,
        };

        if last_seen == Some(size) {
            return true;
        }
        if Instant::now() >= deadline {
            warn!("Gave up waiting for {:?} to settle", path);
            return true;
        }

        last_seen = Some(size);
        tokio::time::sleep(PROBE_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn organizer_in(dir: &Path, fallback: Option<&str>, dry_run: bool) -> Organizer {
        Organizer::new(
            RuleCatalog::builtin(),
            dir.to_path_buf(),
            fallback.map(String::from),
            IgnoreConfig::default(),
            dry_run,
            History::open(dir.join("history.jsonl")),
        )
    }

    #[test]
    fn test_matched_file_lands_in_target_folder() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"pdf").unwrap();

        let organizer = organizer_in(dir.path(), None, false);
        let outcome = organizer.organize(&file).unwrap();

        let expected = dir.path().join("Documents/Admin/invoice.pdf");
        assert_eq!(
            outcome,
            Outcome::Moved {
                to: expected.clone(),
                rule_id: "admin".to_string()
            }
        );
        assert!(expected.is_file());
        assert!(!file.exists());
    }

    #[test]
    fn test_unmatched_file_is_left_untouched_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.xyz");
        fs::write(&file, b"?").unwrap();

        let organizer = organizer_in(dir.path(), None, false);
        assert_eq!(organizer.organize(&file).unwrap(), Outcome::NoRule);
        assert!(file.exists());
    }

    #[test]
    fn test_unmatched_file_goes_to_fallback_folder() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.xyz");
        fs::write(&file, b"?").unwrap();

        let organizer = organizer_in(dir.path(), Some("Unsorted"), false);
        let outcome = organizer.organize(&file).unwrap();

        match outcome {
            Outcome::Moved { to, rule_id } => {
                assert_eq!(rule_id, FALLBACK_RULE_ID);
                assert_eq!(to, dir.path().join("Unsorted/data.xyz"));
                assert!(to.is_file());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_moves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"pdf").unwrap();

        let organizer = organizer_in(dir.path(), None, true);
        let outcome = organizer.organize(&file).unwrap();

        assert!(matches!(outcome, Outcome::WouldMove { .. }));
        assert!(file.exists());
        assert!(!dir.path().join("Documents").exists());
    }

    #[test]
    fn test_collision_gets_suffixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Documents/Admin");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("invoice.pdf"), b"already there").unwrap();

        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"new").unwrap();

        let organizer = organizer_in(dir.path(), None, false);
        match organizer.organize(&file).unwrap() {
            Outcome::Moved { to, .. } => {
                assert_ne!(to, target.join("invoice.pdf"));
                assert!(to.is_file());
                assert_eq!(to.extension().unwrap(), "pdf");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_default_ignore_lists_are_honored() {
        let dir = tempfile::tempdir().unwrap();
        let organizer = organizer_in(dir.path(), None, false);

        for name in ["movie.mp4.part", "setup.crdownload", "Thumbs.db", ".hidden"] {
            let file = dir.path().join(name);
            fs::write(&file, b"x").unwrap();
            assert_eq!(organizer.organize(&file).unwrap(), Outcome::Skipped);
            assert!(file.exists());
        }
    }

    #[test]
    fn test_configured_ignore_suffix_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let organizer = Organizer::new(
            RuleCatalog::builtin(),
            dir.path().to_path_buf(),
            None,
            IgnoreConfig {
                suffixes: vec![".lock".to_string()],
                names: Vec::new(),
            },
            false,
            History::open(dir.path().join("history.jsonl")),
        );

        let locked = dir.path().join("archive.zip.lock");
        fs::write(&locked, b"x").unwrap();
        assert_eq!(organizer.organize(&locked).unwrap(), Outcome::Skipped);

        // With the default suffix list replaced, .part files sort normally
        let partial = dir.path().join("clip.mp4.part");
        fs::write(&partial, b"x").unwrap();
        assert_eq!(organizer.organize(&partial).unwrap(), Outcome::NoRule);
    }

    #[test]
    fn test_move_is_recorded_in_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp4");
        fs::write(&file, b"video").unwrap();

        let organizer = organizer_in(dir.path(), None, false);
        organizer.organize(&file).unwrap();

        let history = History::open(dir.path().join("history.jsonl"));
        let moves = history.replay().unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].record.rule_id, "media");
        assert_eq!(moves[0].record.original_path, file);
    }

    #[test]
    fn test_sweep_organizes_current_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), b"1").unwrap();
        fs::write(dir.path().join("b.png"), b"2").unwrap();
        fs::write(dir.path().join("keep.xyz"), b"3").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let organizer = organizer_in(dir.path(), None, false);
        let moved = organizer.sweep(dir.path()).unwrap();

        assert_eq!(moved, 2);
        assert!(dir.path().join("Documents/Admin/a.pdf").is_file());
        assert!(dir.path().join("Pictures/Sorted/b.png").is_file());
        assert!(dir.path().join("keep.xyz").is_file());
    }

    #[tokio::test]
    async fn test_settled_file_passes_quickly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("done.pdf");
        fs::write(&file, b"complete").unwrap();

        assert!(wait_until_settled(&file, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_missing_file_never_settles() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!wait_until_settled(&dir.path().join("gone.pdf"), Duration::from_secs(1)).await);
    }
}
