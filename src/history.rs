// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 tidywatch contributors

//! Append-only move ledger
//!
//! Every move and every undo is one JSON line. Nothing is ever rewritten in
//! place; whether a move is still in effect falls out of replaying the file,
//! so a crash mid-append can at worst lose the final line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::Result;

/// One completed file move
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Id of the rule that routed the file, or the fallback marker
    pub rule_id: String,
}

impl MoveRecord {
    pub fn new(original_path: PathBuf, new_path: PathBuf, rule_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            rule_id: rule_id.into(),
        }
    }
}

/// A move as reconstructed from the ledger
#[derive(Debug, Clone)]
pub struct ReplayedMove {
    pub record: MoveRecord,
    /// True when a later reversal record cancelled this move
    pub reversed: bool,
}

/// What actually sits on disk, one line per record
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LedgerRecord {
    Moved(MoveRecord),
    Reversed { id: String, timestamp: DateTime<Utc> },
}

/// JSONL ledger of file moves with undo via reversal records
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append_record(&self, record: &LedgerRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(line.as_bytes())?;

        Ok(())
    }

    /// Record a completed move
    pub fn record_move(&self, record: &MoveRecord) -> Result<()> {
        self.append_record(&LedgerRecord::Moved(record.clone()))
    }

    /// Record that the move with this id was undone
    pub fn record_reversal(&self, id: &str) -> Result<()> {
        self.append_record(&LedgerRecord::Reversed {
            id: id.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Reconstruct all moves in ledger order, marking reversed ones.
    ///
    /// Lines that no longer parse are skipped with a warning; a reversal
    /// pointing at an unknown id is ignored.
    pub fn replay(&self) -> Result<Vec<ReplayedMove>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let mut moves: Vec<ReplayedMove> = Vec::new();
        let mut reversed_ids: HashSet<String> = HashSet::new();

        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRecord>(line) {
                Ok(LedgerRecord::Moved(record)) => moves.push(ReplayedMove {
                    record,
                    reversed: false,
                }),
                Ok(LedgerRecord::Reversed { id, .. }) => {
                    reversed_ids.insert(id);
                }
                Err(e) => tracing::warn!("Skipping unreadable ledger line: {}", e),
            }
        }

        for entry in &mut moves {
            entry.reversed = reversed_ids.contains(&entry.record.id);
        }

        Ok(moves)
    }

    /// The most recent moves, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ReplayedMove>> {
        let mut moves = self.replay()?;
        moves.reverse();
        moves.truncate(limit);
        Ok(moves)
    }

    /// Moves still in effect, in ledger order
    pub fn reversible(&self) -> Result<Vec<MoveRecord>> {
        Ok(self
            .replay()?
            .into_iter()
            .filter(|entry| !entry.reversed)
            .map(|entry| entry.record)
            .collect())
    }

    /// Delete the ledger; absent ledger counts as already cleared
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rule_id: &str) -> MoveRecord {
        MoveRecord::new(
            PathBuf::from("/watch/invoice.pdf"),
            PathBuf::from("/watch/Documents/Admin/invoice.pdf"),
            rule_id,
        )
    }

    #[test]
    fn test_moves_replay_in_ledger_order() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("ledger.jsonl"));

        history.record_move(&record("admin")).unwrap();
        history.record_move(&record("media")).unwrap();

        let moves = history.replay().unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].record.rule_id, "admin");
        assert_eq!(moves[1].record.rule_id, "media");
        assert!(moves.iter().all(|m| !m.reversed));
    }

    #[test]
    fn test_missing_ledger_replays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("absent.jsonl"));
        assert!(history.replay().unwrap().is_empty());
    }

    #[test]
    fn test_reversal_record_cancels_a_move() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("ledger.jsonl"));

        let first = record("admin");
        history.record_move(&first).unwrap();
        history.record_move(&record("media")).unwrap();
        history.record_reversal(&first.id).unwrap();

        let still_live = history.reversible().unwrap();
        assert_eq!(still_live.len(), 1);
        assert_eq!(still_live[0].rule_id, "media");

        // The reversed move is still visible in the full replay
        let moves = history.replay().unwrap();
        assert_eq!(moves.len(), 2);
        assert!(moves[0].reversed);
        assert!(!moves[1].reversed);
    }

    #[test]
    fn test_reversal_of_unknown_id_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("ledger.jsonl"));

        history.record_move(&record("admin")).unwrap();
        history.record_reversal("no-such-id").unwrap();

        assert_eq!(history.reversible().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let history = History::open(path.clone());

        history.record_move(&record("admin")).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json at all").unwrap();
        history.record_move(&record("misc")).unwrap();

        assert_eq!(history.replay().unwrap().len(), 2);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("ledger.jsonl"));

        for rule in ["admin", "media", "misc"] {
            history.record_move(&record(rule)).unwrap();
        }

        let recent = history.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].record.rule_id, "misc");
        assert_eq!(recent[1].record.rule_id, "media");
    }

    #[test]
    fn test_clear_tolerates_missing_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::open(dir.path().join("ledger.jsonl"));

        history.clear().unwrap();
        history.record_move(&record("admin")).unwrap();
        history.clear().unwrap();
        assert!(history.replay().unwrap().is_empty());
    }
}
