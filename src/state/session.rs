/// Persisted session document
///
/// One JSON file per culled directory, written through on every mutation
/// so a crash loses at most the in-flight action. Writes go to a temp
/// file first and are renamed into place, so a crash mid-write can never
/// truncate an existing session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::data::ActionRecord;

/// Name of the hidden session file inside the culled directory
pub const SESSION_FILE_NAME: &str = ".rawculler_session.json";

/// Errors raised while reading or writing the session file
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// The persisted aggregate: directory, cursor, and action history.
///
/// Forward-readable: unknown fields in a newer file are ignored, and every
/// field except `directory_path` has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub directory_path: PathBuf,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default = "now")]
    pub created: DateTime<Utc>,
    #[serde(default = "now")]
    pub last_updated: DateTime<Utc>,
    /// Action history keyed by pair base name
    #[serde(default)]
    pub records: BTreeMap<String, ActionRecord>,
}

impl Session {
    /// Fresh session for a directory with no history
    pub fn new(directory: &Path) -> Self {
        let stamp = Utc::now();
        Session {
            directory_path: directory.to_path_buf(),
            current_index: 0,
            created: stamp,
            last_updated: stamp,
            records: BTreeMap::new(),
        }
    }

    /// Where the session file for a directory lives
    pub fn file_path(directory: &Path) -> PathBuf {
        directory.join(SESSION_FILE_NAME)
    }

    /// Load the session persisted for a directory.
    ///
    /// Returns `Ok(None)` when no session file exists. A file that exists
    /// but cannot be parsed is a [`SessionError::Corrupt`]; the caller is
    /// expected to fall back to a fresh session and warn the user.
    pub fn load(directory: &Path) -> Result<Option<Self>, SessionError> {
        let path = Self::file_path(directory);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::Read { path, source: e }),
        };

        let mut session: Session = serde_json::from_str(&contents)
            .map_err(|e| SessionError::Corrupt { path, source: e })?;

        // base_name is the map key on disk; restore it into each record
        for (base_name, record) in &mut session.records {
            record.base_name = base_name.clone();
        }

        Ok(Some(session))
    }

    /// Persist the session atomically (write temp file, rename over).
    pub fn save(&self) -> Result<(), SessionError> {
        let path = Self::file_path(&self.directory_path);
        let tmp_path = self.directory_path.join(".rawculler_session.json.tmp");

        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::Corrupt {
            path: path.clone(),
            source: e,
        })?;

        fs::write(&tmp_path, json).map_err(|e| SessionError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| SessionError::Write { path, source: e })?;

        Ok(())
    }

    /// Bump the last-updated stamp; call before saving a mutation
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// The pair's record, if it still counts as its live decision
    pub fn live_record(&self, base_name: &str) -> Option<&ActionRecord> {
        self.records.get(base_name).filter(|r| r.is_live())
    }

    /// A pair is processed once it carries a live record
    pub fn is_processed(&self, base_name: &str) -> bool {
        self.live_record(base_name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{ActionKind, ActionState};
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_preserves_records() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path());
        session.current_index = 3;
        session.records.insert(
            "IMG_0001".into(),
            ActionRecord::new("IMG_0001", ActionKind::KeepAll, ActionState::Committed),
        );
        session.records.insert(
            "IMG_0002".into(),
            ActionRecord::new(
                "IMG_0002",
                ActionKind::DeleteRawKeepPrimary,
                ActionState::Pending,
            ),
        );
        session.save().unwrap();

        let loaded = Session::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.current_index, 3);
        assert_eq!(loaded.records.len(), 2);
        for (base_name, record) in &session.records {
            let restored = &loaded.records[base_name];
            assert_eq!(restored.base_name, *base_name);
            assert_eq!(restored.kind, record.kind);
            assert_eq!(restored.state, record.state);
            assert_eq!(restored.timestamp, record.timestamp);
        }
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(Session::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        std::fs::write(Session::file_path(dir.path()), "{ not json").unwrap();

        let result = Session::load(dir.path());
        assert!(matches!(result, Err(SessionError::Corrupt { .. })));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let dir = TempDir::new().unwrap();
        let doc = format!(
            r#"{{
                "directory_path": "{}",
                "current_index": 1,
                "some_future_field": {{"nested": true}},
                "records": {{
                    "IMG_0001": {{
                        "kind": "skip",
                        "state": "committed",
                        "timestamp": "2026-08-12T10:15:00Z",
                        "another_future_field": 42
                    }}
                }}
            }}"#,
            dir.path().display()
        );
        std::fs::write(Session::file_path(dir.path()), doc).unwrap();

        let session = Session::load(dir.path()).unwrap().unwrap();
        assert_eq!(session.current_index, 1);
        let record = &session.records["IMG_0001"];
        assert_eq!(record.base_name, "IMG_0001");
        assert_eq!(record.kind, ActionKind::Skip);
        assert_eq!(record.state, ActionState::Committed);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        Session::new(dir.path()).save().unwrap();

        assert!(Session::file_path(dir.path()).exists());
        assert!(!dir.path().join(".rawculler_session.json.tmp").exists());
    }
}
