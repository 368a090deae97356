/// Shared data structures for the culling state
///
/// These types represent the per-pair action model that flows between
/// the session store, the commit coordinator, and the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The disposition chosen for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Keep both files; bookkeeping only
    KeepAll,
    /// Delete the RAW sibling, keep the JPEG
    #[serde(rename = "delete_raw")]
    DeleteRawKeepPrimary,
    /// Delete every file of the pair
    DeleteAll,
    /// Decide later; bookkeeping only
    Skip,
    /// A previously committed non-destructive action the user took back
    Undone,
}

impl ActionKind {
    /// Destructive kinds are queued behind a countdown before they touch disk
    pub fn is_destructive(self) -> bool {
        matches!(self, ActionKind::DeleteRawKeepPrimary | ActionKind::DeleteAll)
    }

    /// Label for UI display
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::KeepAll => "Keep All",
            ActionKind::DeleteRawKeepPrimary => "Delete RAW",
            ActionKind::DeleteAll => "Delete All",
            ActionKind::Skip => "Skipped",
            ActionKind::Undone => "Undone",
        }
    }
}

/// Where an action stands relative to the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Queued in the coordinator, countdown running
    Pending,
    /// Filesystem mutation applied (or none was needed)
    Committed,
    /// Undone before the countdown fired
    Cancelled,
}

impl ActionState {
    /// Pending and Committed records count as the pair's one live decision
    pub fn is_live(self) -> bool {
        matches!(self, ActionState::Pending | ActionState::Committed)
    }
}

/// The disposition record for one pair.
///
/// Serialized into the session file keyed by base name, so `base_name`
/// itself is defaulted on read and restored from the map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Identity of the pair this record belongs to
    #[serde(default, skip_serializing)]
    pub base_name: String,
    pub kind: ActionKind,
    pub state: ActionState,
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(base_name: &str, kind: ActionKind, state: ActionState) -> Self {
        ActionRecord {
            base_name: base_name.to_string(),
            kind,
            state,
            timestamp: Utc::now(),
        }
    }

    /// True while this record blocks a new action on the same pair
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }
}
