//! raw-culler - a photo-culling core for JPEG+RAW shoots
//!
//! Steps through a directory of paired captures (full-quality JPEG plus
//! an optional RAW sibling) and applies one disposition per pair: keep
//! both, delete the RAW, delete both, or skip. Destructive actions are
//! queued behind a cancellable countdown before anything touches disk,
//! and progress is persisted per directory so a session survives
//! restarts.
//!
//! The crate is UI-agnostic: a front end drives [`culler::Culler`] and
//! renders the events it emits. No window chrome, decoding, or preview
//! rendering lives here.

use thiserror::Error;

pub mod commit;
pub mod config;
pub mod culler;
pub mod pairing;
pub mod state;

pub use commit::{CommitPhase, Coordinator};
pub use config::Preferences;
pub use culler::{CullEvent, Culler, Direction, DisplayState};
pub use pairing::{scan_directory, Pair, ScanError};
pub use state::data::{ActionKind, ActionRecord, ActionState};
pub use state::store::{ActionFilter, CommitPlan, SessionStore, StoreError};

/// Error enum covering the failure states of the core
#[derive(Debug, Error)]
pub enum CullError {
    /// No directory has been opened yet
    #[error("no directory is open")]
    NoDirectory,
    /// The pair list is empty; there is nothing to act on
    #[error("no pair is selected")]
    NoCurrentPair,
    /// Directory scan failed
    #[error(transparent)]
    Scan(#[from] pairing::ScanError),
    /// Store operation failed
    #[error(transparent)]
    Store(#[from] state::store::StoreError),
    /// Session persistence failed
    #[error(transparent)]
    Session(#[from] state::session::SessionError),
}
