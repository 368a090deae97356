/// Action/session store
///
/// Single source of truth for what has happened and what the user is
/// looking at. Owns the canonical pair list and the persisted session,
/// and is the only place in the crate that deletes files. Every mutation
/// writes the session through to disk.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pairing::{self, Pair, ScanError};
use crate::state::data::{ActionKind, ActionRecord, ActionState};
use crate::state::session::{Session, SessionError};

/// Errors raised by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown pair: {0}")]
    UnknownPair(String),
    #[error("cannot undo action on {0}: already committed")]
    InvalidUndo(String),
    #[error("pair {0} has a commit in progress")]
    PairBusy(String),
    #[error("pair {0} has no files left on disk")]
    PairGone(String),
    #[error("pair {0} has no pending action to commit")]
    NotPending(String),
    #[error("{0:?} is not a user-issuable action")]
    NotAnAction(ActionKind),
    #[error("failed to delete {path}: {source}")]
    Delete { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The filesystem work one pending record implies.
///
/// Produced by [`SessionStore::begin_commit`] so a worker can run the
/// deletions via [`SessionStore::delete_targets`] without holding any
/// lock on the store, then finalize the bookkeeping afterwards.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub base_name: String,
    pub kind: ActionKind,
    pub targets: Vec<PathBuf>,
}

/// Sidebar-style filter over the pair list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFilter {
    /// Pairs with no live record yet
    Unprocessed,
    /// Pairs whose live record has this kind
    Kind(ActionKind),
}

/// Owns the pair list and session for one open directory.
pub struct SessionStore {
    pairs: Vec<Pair>,
    session: Session,
    /// Pairs with a filesystem commit in flight; new actions are rejected
    committing: HashSet<String>,
    /// Commit failures awaiting user acknowledgment, pair -> reason
    failed: HashMap<String, String>,
}

impl SessionStore {
    /// Scan a directory and resume (or start) its session.
    ///
    /// A missing session file starts fresh silently. A corrupt one also
    /// starts fresh, but the returned warning tells the caller that prior
    /// history was lost; a bad session file must never crash the app.
    /// Pending records found in a loaded session belonged to countdowns
    /// that never fired; they are demoted to Cancelled rather than
    /// silently re-armed.
    pub fn open(
        directory: &Path,
        resume: bool,
    ) -> Result<(Self, Option<String>), ScanError> {
        let pairs = pairing::scan_directory(directory)?;

        let mut warning = None;
        let session = match Session::load(directory) {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(directory),
            Err(e) => {
                warning = Some(format!("Session history could not be read, starting fresh: {e}"));
                Session::new(directory)
            }
        };

        let mut store = SessionStore {
            pairs,
            session,
            committing: HashSet::new(),
            failed: HashMap::new(),
        };

        for record in store.session.records.values_mut() {
            if record.state == ActionState::Pending {
                record.state = ActionState::Cancelled;
            }
        }

        if resume {
            store.session.current_index = store.first_unprocessed_index();
        } else {
            store.session.current_index = 0;
        }
        store.clamp_index();

        println!(
            "📁 Loaded {} pairs from {}",
            store.pairs.len(),
            directory.display()
        );

        Ok((store, warning))
    }

    /// Index of the first pair without a live record, for session resume
    fn first_unprocessed_index(&self) -> usize {
        self.pairs
            .iter()
            .position(|p| !self.session.is_processed(&p.base_name))
            .unwrap_or(0)
    }

    fn clamp_index(&mut self) {
        if !self.pairs.is_empty() && self.session.current_index >= self.pairs.len() {
            self.session.current_index = self.pairs.len() - 1;
        }
        if self.pairs.is_empty() {
            self.session.current_index = 0;
        }
    }

    fn pair_index(&self, base_name: &str) -> Option<usize> {
        self.pairs.iter().position(|p| p.base_name == base_name)
    }

    /// Record the user's disposition for a pair.
    ///
    /// Destructive kinds produce a Pending record (the coordinator runs
    /// the countdown and later calls [`commit`](Self::commit)); KeepAll
    /// and Skip are committed on the spot since they never touch disk.
    /// An existing Pending record on the same pair is superseded. Issuing
    /// a new action over a Committed record is re-culling and is only
    /// valid while the pair still has files.
    pub fn apply(&mut self, base_name: &str, kind: ActionKind) -> Result<ActionRecord, StoreError> {
        if kind == ActionKind::Undone {
            return Err(StoreError::NotAnAction(kind));
        }
        let index = self
            .pair_index(base_name)
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        if self.committing.contains(base_name) {
            return Err(StoreError::PairBusy(base_name.to_string()));
        }
        if self.pairs[index].is_gone() {
            return Err(StoreError::PairGone(base_name.to_string()));
        }

        let state = if kind.is_destructive() {
            ActionState::Pending
        } else {
            ActionState::Committed
        };
        let record = ActionRecord::new(base_name, kind, state);

        // One record slot per pair; inserting supersedes any prior decision
        self.session
            .records
            .insert(base_name.to_string(), record.clone());
        self.failed.remove(base_name);
        self.persist()?;

        Ok(record)
    }

    /// Claim a pair's pending record for commit. Called when its
    /// countdown expires, before the filesystem work is handed to a
    /// worker; blocks further actions on the pair until the commit
    /// resolves. The returned plan carries everything the worker needs
    /// so the deletions can run without holding the store.
    pub fn begin_commit(&mut self, base_name: &str) -> Result<CommitPlan, StoreError> {
        let record = self
            .session
            .records
            .get(base_name)
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        if record.state != ActionState::Pending {
            return Err(StoreError::NotPending(base_name.to_string()));
        }
        let kind = record.kind;
        let targets = self.deletion_targets(base_name, kind);
        self.committing.insert(base_name.to_string());
        Ok(CommitPlan {
            base_name: base_name.to_string(),
            kind,
            targets,
        })
    }

    /// Which files a kind would delete for this pair right now
    fn deletion_targets(&self, base_name: &str, kind: ActionKind) -> Vec<PathBuf> {
        let Some(index) = self.pair_index(base_name) else {
            return Vec::new();
        };
        let pair = &self.pairs[index];
        match kind {
            ActionKind::DeleteRawKeepPrimary => pair.secondary_path.iter().cloned().collect(),
            ActionKind::DeleteAll => pair
                .primary_path
                .iter()
                .chain(pair.secondary_path.iter())
                .cloned()
                .collect(),
            ActionKind::KeepAll | ActionKind::Skip | ActionKind::Undone => Vec::new(),
        }
    }

    /// Delete a commit plan's target files.
    ///
    /// Takes no store access at all, so a worker calls it outside the
    /// state lock and a slow disk cannot stall anyone else. Idempotent:
    /// a target already gone (deleted externally, or a retried partial
    /// commit) is success, not an error.
    pub fn delete_targets(targets: &[PathBuf]) -> Result<(), StoreError> {
        for path in targets {
            remove_file_idempotent(path)?;
        }
        Ok(())
    }

    /// Record that a pair's deletions went through: update the pair
    /// list, mark the record Committed, persist.
    ///
    /// A record that is no longer Pending is left untouched: a repeat
    /// finalize is idempotent, and a Cancelled record means the action
    /// was undone, so it must never be promoted to Committed.
    pub fn finalize_commit(&mut self, base_name: &str) -> Result<ActionRecord, StoreError> {
        self.committing.remove(base_name);
        let record = self
            .session
            .records
            .get(base_name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        if record.state != ActionState::Pending {
            return Ok(record);
        }

        if let Some(index) = self.pair_index(base_name) {
            match record.kind {
                ActionKind::DeleteRawKeepPrimary => {
                    self.pairs[index].secondary_path = None;
                }
                ActionKind::DeleteAll => {
                    // Both files gone; drop the pair and keep the cursor valid
                    self.pairs.remove(index);
                    if self.session.current_index > index {
                        self.session.current_index -= 1;
                    }
                    self.clamp_index();
                }
                ActionKind::KeepAll | ActionKind::Skip | ActionKind::Undone => {}
            }
        }

        let record = self
            .session
            .records
            .get_mut(base_name)
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        record.state = ActionState::Committed;
        let record = record.clone();
        self.persist()?;

        Ok(record)
    }

    /// Perform the filesystem mutation for a pair's pending record,
    /// start to finish.
    ///
    /// Only a Pending record deletes anything: a Committed record is a
    /// repeat commit and a no-op success, and a Cancelled record was
    /// undone, so commit returns it untouched. An undo fully prevents
    /// the mutation. A DeleteAll commit removes the pair from the
    /// active list.
    pub fn commit(&mut self, base_name: &str) -> Result<ActionRecord, StoreError> {
        let record = self
            .session
            .records
            .get(base_name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        if record.state != ActionState::Pending {
            self.committing.remove(base_name);
            return Ok(record);
        }

        let targets = self.deletion_targets(base_name, record.kind);
        // Failure leaves the record Pending and the pair untouched so a
        // retry sees the same plan
        Self::delete_targets(&targets)?;
        self.finalize_commit(base_name)
    }

    /// Record that a commit gave up after its retries. The record is
    /// demoted to Cancelled (the files' true state is unknown, the user
    /// re-culls) and the failure is surfaced until acknowledged.
    pub fn mark_failed(&mut self, base_name: &str, reason: &str) {
        self.committing.remove(base_name);
        if let Some(record) = self.session.records.get_mut(base_name) {
            if record.state == ActionState::Pending {
                record.state = ActionState::Cancelled;
            }
        }
        self.failed.insert(base_name.to_string(), reason.to_string());
        if let Err(e) = self.persist() {
            eprintln!("⚠️  Failed to persist session after commit failure: {e}");
        }
    }

    /// Clear an acknowledged commit failure
    pub fn acknowledge_failure(&mut self, base_name: &str) -> bool {
        self.failed.remove(base_name).is_some()
    }

    /// Cancel a pair's pending action before its countdown fires.
    ///
    /// Fails with [`StoreError::InvalidUndo`] once the record is
    /// Committed: destructive commits are irreversible at this layer.
    /// A pair whose commit is already in flight cannot be undone either;
    /// the deletion runs to completion.
    pub fn undo(&mut self, base_name: &str) -> Result<ActionRecord, StoreError> {
        if self.committing.contains(base_name) {
            return Err(StoreError::PairBusy(base_name.to_string()));
        }
        let record = self
            .session
            .records
            .get_mut(base_name)
            .ok_or_else(|| StoreError::UnknownPair(base_name.to_string()))?;
        match record.state {
            ActionState::Pending => {
                record.state = ActionState::Cancelled;
                let record = record.clone();
                self.persist()?;
                Ok(record)
            }
            ActionState::Committed => Err(StoreError::InvalidUndo(base_name.to_string())),
            ActionState::Cancelled => Err(StoreError::InvalidUndo(base_name.to_string())),
        }
    }

    /// Take back the most recent decision.
    ///
    /// A Pending record is cancelled like [`undo`](Self::undo). A
    /// committed KeepAll/Skip never touched disk, so it may be rewritten
    /// to Undone and the pair counts as unprocessed again. A committed
    /// destructive record cannot be taken back. Returns `None` when
    /// there is nothing to undo.
    pub fn undo_last(&mut self) -> Result<Option<ActionRecord>, StoreError> {
        let latest = self
            .session
            .records
            .values()
            .filter(|r| r.is_live())
            .max_by_key(|r| r.timestamp)
            .map(|r| r.base_name.clone());
        let Some(base_name) = latest else {
            return Ok(None);
        };
        if self.committing.contains(&base_name) {
            return Err(StoreError::PairBusy(base_name));
        }

        let record = self
            .session
            .records
            .get_mut(&base_name)
            .ok_or_else(|| StoreError::UnknownPair(base_name.clone()))?;
        match (record.state, record.kind.is_destructive()) {
            (ActionState::Pending, _) => {
                record.state = ActionState::Cancelled;
            }
            (ActionState::Committed, false) => {
                record.kind = ActionKind::Undone;
                record.state = ActionState::Cancelled;
            }
            (ActionState::Committed, true) => {
                return Err(StoreError::InvalidUndo(base_name));
            }
            (ActionState::Cancelled, _) => return Ok(None),
        }
        let record = record.clone();
        self.persist()?;
        Ok(Some(record))
    }

    /// Move the cursor forward; no-op at the end
    pub fn advance(&mut self) -> bool {
        if self.session.current_index + 1 < self.pairs.len() {
            self.session.current_index += 1;
            self.persist_quietly();
            true
        } else {
            false
        }
    }

    /// Move the cursor back; no-op at the start
    pub fn retreat(&mut self) -> bool {
        if self.session.current_index > 0 {
            self.session.current_index -= 1;
            self.persist_quietly();
            true
        } else {
            false
        }
    }

    /// The pair under the cursor
    pub fn current_pair(&self) -> Option<&Pair> {
        self.pairs.get(self.session.current_index)
    }

    /// (1-based position, total) for display; (0, 0) when empty
    pub fn position(&self) -> (usize, usize) {
        if self.pairs.is_empty() {
            (0, 0)
        } else {
            (self.session.current_index + 1, self.pairs.len())
        }
    }

    /// (processed, total, percent) across the active pair list
    pub fn progress(&self) -> (usize, usize, u8) {
        let total = self.pairs.len();
        let processed = self
            .pairs
            .iter()
            .filter(|p| self.session.is_processed(&p.base_name))
            .count();
        let percent = if total == 0 {
            0
        } else {
            ((processed * 100) / total) as u8
        };
        (processed, total, percent)
    }

    /// Indices of pairs matching a sidebar filter; `None` means all
    pub fn filtered_indices(&self, filter: Option<ActionFilter>) -> Vec<usize> {
        self.pairs
            .iter()
            .enumerate()
            .filter(|(_, pair)| match filter {
                None => true,
                Some(ActionFilter::Unprocessed) => !self.session.is_processed(&pair.base_name),
                Some(ActionFilter::Kind(kind)) => self
                    .session
                    .live_record(&pair.base_name)
                    .is_some_and(|r| r.kind == kind),
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn directory(&self) -> &Path {
        &self.session.directory_path
    }

    pub fn current_index(&self) -> usize {
        self.session.current_index
    }

    /// The pair's record, live or not
    pub fn record(&self, base_name: &str) -> Option<&ActionRecord> {
        self.session.records.get(base_name)
    }

    pub fn failures(&self) -> &HashMap<String, String> {
        &self.failed
    }

    pub fn is_committing(&self, base_name: &str) -> bool {
        self.committing.contains(base_name)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.session.touch();
        self.session.save()?;
        Ok(())
    }

    // Navigation should never fail the caller over a persistence hiccup
    fn persist_quietly(&mut self) {
        if let Err(e) = self.persist() {
            eprintln!("⚠️  Failed to persist session: {e}");
        }
    }
}

fn remove_file_idempotent(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Delete {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn shoot_dir(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"dummy").unwrap();
        }
        dir
    }

    fn open(dir: &TempDir) -> SessionStore {
        SessionStore::open(dir.path(), true).unwrap().0
    }

    #[test]
    fn test_non_destructive_commits_immediately() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        let record = store.apply("A", ActionKind::KeepAll).unwrap();
        assert_eq!(record.state, ActionState::Committed);
        assert!(dir.path().join("A.jpg").exists());
        assert!(dir.path().join("A.cr2").exists());
    }

    #[test]
    fn test_destructive_is_pending_until_committed() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        let record = store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        assert_eq!(record.state, ActionState::Pending);
        assert!(dir.path().join("A.cr2").exists());

        let record = store.commit("A").unwrap();
        assert_eq!(record.state, ActionState::Committed);
        assert!(dir.path().join("A.jpg").exists());
        assert!(!dir.path().join("A.cr2").exists());
    }

    #[test]
    fn test_commit_is_idempotent() {
        let dir = shoot_dir(&["A.jpg", "A.cr2", "B.jpg"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        store.commit("A").unwrap();
        // Second commit: target already gone, still success
        let record = store.commit("A").unwrap();
        assert_eq!(record.state, ActionState::Committed);
        // Other pairs unaffected
        assert!(dir.path().join("B.jpg").exists());
    }

    #[test]
    fn test_commit_tolerates_externally_deleted_file() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        fs::remove_file(dir.path().join("A.cr2")).unwrap();

        let record = store.commit("A").unwrap();
        assert_eq!(record.state, ActionState::Committed);
    }

    #[test]
    fn test_delete_all_removes_pair_from_list() {
        let dir = shoot_dir(&["A.jpg", "A.cr2", "B.jpg"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.commit("A").unwrap();

        assert!(!dir.path().join("A.jpg").exists());
        assert!(!dir.path().join("A.cr2").exists());
        assert_eq!(store.pairs().len(), 1);
        assert_eq!(store.current_pair().unwrap().base_name, "B");
    }

    #[test]
    fn test_undo_pending_prevents_deletion() {
        let dir = shoot_dir(&["B.jpg"]);
        let mut store = open(&dir);

        store.apply("B", ActionKind::DeleteAll).unwrap();
        let record = store.undo("B").unwrap();
        assert_eq!(record.state, ActionState::Cancelled);
        assert!(dir.path().join("B.jpg").exists());
    }

    #[test]
    fn test_undo_after_commit_is_invalid() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        store.commit("A").unwrap();

        let result = store.undo("A");
        assert!(matches!(result, Err(StoreError::InvalidUndo(_))));
        assert!(!dir.path().join("A.cr2").exists());
    }

    #[test]
    fn test_new_action_supersedes_pending() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        let record = store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        assert_eq!(record.kind, ActionKind::DeleteRawKeepPrimary);
        assert_eq!(record.state, ActionState::Pending);

        // Exactly one live record for the pair
        let live = store.record("A").unwrap();
        assert!(live.is_live());
        assert_eq!(live.kind, ActionKind::DeleteRawKeepPrimary);
    }

    #[test]
    fn test_commit_on_cancelled_record_deletes_nothing() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.undo("A").unwrap();

        // However commit is reached afterwards, the undone action must
        // never touch disk
        let record = store.commit("A").unwrap();
        assert_eq!(record.state, ActionState::Cancelled);
        assert!(dir.path().join("A.jpg").exists());
        assert!(dir.path().join("A.cr2").exists());
        assert_eq!(store.pairs().len(), 1);
    }

    #[test]
    fn test_finalize_commit_leaves_cancelled_record_alone() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        store.undo("A").unwrap();

        let record = store.finalize_commit("A").unwrap();
        assert_eq!(record.state, ActionState::Cancelled);
        // The pair still carries its RAW path
        assert!(store.pairs()[0].secondary_path.is_some());
    }

    #[test]
    fn test_begin_commit_requires_pending_record() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        assert!(matches!(
            store.begin_commit("A"),
            Err(StoreError::UnknownPair(_))
        ));

        store.apply("A", ActionKind::KeepAll).unwrap();
        assert!(matches!(
            store.begin_commit("A"),
            Err(StoreError::NotPending(_))
        ));

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.undo("A").unwrap();
        assert!(matches!(
            store.begin_commit("A"),
            Err(StoreError::NotPending(_))
        ));
    }

    #[test]
    fn test_begin_commit_plans_the_right_targets() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        let plan = store.begin_commit("A").unwrap();
        assert_eq!(plan.targets, vec![dir.path().join("A.cr2")]);

        store.finalize_commit("A").unwrap();
        assert!(store.pairs()[0].secondary_path.is_none());

        let dir = shoot_dir(&["B.jpg", "B.cr2"]);
        let mut store = open(&dir);
        store.apply("B", ActionKind::DeleteAll).unwrap();
        let plan = store.begin_commit("B").unwrap();
        assert_eq!(
            plan.targets,
            vec![dir.path().join("B.jpg"), dir.path().join("B.cr2")]
        );
    }

    #[test]
    fn test_undo_rejected_while_committing() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.begin_commit("A").unwrap();

        assert!(matches!(store.undo("A"), Err(StoreError::PairBusy(_))));
        // The deletion runs to completion
        store.commit("A").unwrap();
        assert!(!dir.path().join("A.jpg").exists());
    }

    #[test]
    fn test_apply_rejected_while_committing() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.begin_commit("A").unwrap();

        let result = store.apply("A", ActionKind::KeepAll);
        assert!(matches!(result, Err(StoreError::PairBusy(_))));
    }

    #[test]
    fn test_apply_to_unknown_pair() {
        let dir = shoot_dir(&["A.jpg"]);
        let mut store = open(&dir);
        let result = store.apply("ZZZ", ActionKind::KeepAll);
        assert!(matches!(result, Err(StoreError::UnknownPair(_))));
    }

    #[test]
    fn test_undone_is_not_issuable() {
        let dir = shoot_dir(&["A.jpg"]);
        let mut store = open(&dir);
        let result = store.apply("A", ActionKind::Undone);
        assert!(matches!(result, Err(StoreError::NotAnAction(_))));
    }

    #[test]
    fn test_undo_last_rewrites_committed_skip() {
        let dir = shoot_dir(&["A.jpg", "B.jpg"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::Skip).unwrap();
        let record = store.undo_last().unwrap().unwrap();
        assert_eq!(record.base_name, "A");
        assert_eq!(record.kind, ActionKind::Undone);
        assert_eq!(record.state, ActionState::Cancelled);
        assert!(!store.record("A").unwrap().is_live());

        let (processed, total, _) = store.progress();
        assert_eq!((processed, total), (0, 2));
    }

    #[test]
    fn test_undo_last_refuses_committed_destructive() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
        store.commit("A").unwrap();

        let result = store.undo_last();
        assert!(matches!(result, Err(StoreError::InvalidUndo(_))));
    }

    #[test]
    fn test_navigation_clamps_at_boundaries() {
        let dir = shoot_dir(&["A.jpg", "B.jpg"]);
        let mut store = open(&dir);

        assert!(!store.retreat());
        assert!(store.advance());
        assert!(!store.advance());
        assert_eq!(store.position(), (2, 2));
        assert!(store.retreat());
        assert_eq!(store.position(), (1, 2));
    }

    #[test]
    fn test_resume_lands_on_first_unprocessed() {
        let dir = shoot_dir(&[
            "IMG_001.jpg", "IMG_001.CR2",
            "IMG_002.jpg", "IMG_002.CR2",
            "IMG_003.jpg", "IMG_003.CR2",
            "IMG_004.jpg", "IMG_004.CR2",
        ]);

        {
            let mut store = open(&dir);
            store.apply("IMG_001", ActionKind::KeepAll).unwrap();
            store.apply("IMG_002", ActionKind::Skip).unwrap();
        }

        let store = open(&dir);
        assert_eq!(store.current_pair().unwrap().base_name, "IMG_003");

        // Resume disabled starts at the beginning
        let (store, _) = SessionStore::open(dir.path(), false).unwrap();
        assert_eq!(store.current_pair().unwrap().base_name, "IMG_001");
    }

    #[test]
    fn test_corrupt_session_falls_back_with_warning() {
        let dir = shoot_dir(&["A.jpg"]);
        fs::write(dir.path().join(".rawculler_session.json"), "garbage").unwrap();

        let (store, warning) = SessionStore::open(dir.path(), true).unwrap();
        assert!(warning.is_some());
        assert_eq!(store.pairs().len(), 1);
    }

    #[test]
    fn test_loaded_pending_records_are_demoted() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        {
            let mut store = open(&dir);
            store.apply("A", ActionKind::DeleteAll).unwrap();
            // Process "crashes" with the countdown still running
        }

        let store = open(&dir);
        let record = store.record("A").unwrap();
        assert_eq!(record.state, ActionState::Cancelled);
        assert!(dir.path().join("A.jpg").exists());
    }

    #[test]
    fn test_mark_failed_surfaces_until_acknowledged() {
        let dir = shoot_dir(&["A.jpg", "A.cr2"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::DeleteAll).unwrap();
        store.begin_commit("A").unwrap();
        store.mark_failed("A", "permission denied");

        assert_eq!(store.failures().len(), 1);
        assert!(!store.is_committing("A"));
        // Record demoted so the pair can be re-culled
        assert!(!store.record("A").unwrap().is_live());

        assert!(store.acknowledge_failure("A"));
        assert!(store.failures().is_empty());
        assert!(!store.acknowledge_failure("A"));
    }

    #[test]
    fn test_filtered_indices() {
        let dir = shoot_dir(&["A.jpg", "B.jpg", "C.jpg"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::KeepAll).unwrap();
        store.apply("C", ActionKind::Skip).unwrap();

        assert_eq!(store.filtered_indices(None), vec![0, 1, 2]);
        assert_eq!(
            store.filtered_indices(Some(ActionFilter::Unprocessed)),
            vec![1]
        );
        assert_eq!(
            store.filtered_indices(Some(ActionFilter::Kind(ActionKind::KeepAll))),
            vec![0]
        );
        assert_eq!(
            store.filtered_indices(Some(ActionFilter::Kind(ActionKind::Skip))),
            vec![2]
        );
    }

    #[test]
    fn test_progress_counts_live_records() {
        let dir = shoot_dir(&["A.jpg", "B.jpg", "C.jpg", "D.jpg"]);
        let mut store = open(&dir);

        store.apply("A", ActionKind::KeepAll).unwrap();
        store.apply("B", ActionKind::DeleteAll).unwrap();
        store.undo("B").unwrap();

        let (processed, total, percent) = store.progress();
        assert_eq!((processed, total, percent), (1, 4, 25));
    }

    #[test]
    fn test_session_round_trip_via_store() {
        let dir = shoot_dir(&["A.jpg", "A.cr2", "B.jpg"]);
        let before;
        {
            let mut store = open(&dir);
            store.apply("A", ActionKind::DeleteRawKeepPrimary).unwrap();
            store.commit("A").unwrap();
            store.apply("B", ActionKind::KeepAll).unwrap();
            before = (
                store.record("A").unwrap().clone(),
                store.record("B").unwrap().clone(),
            );
        }

        let store = open(&dir);
        assert_eq!(store.record("A").unwrap(), &before.0);
        assert_eq!(store.record("B").unwrap(), &before.1);
    }
}
