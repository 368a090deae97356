/// Culling facade
///
/// The narrow interface the UI layer drives. Owns the session store and
/// the commit coordinator behind one lock, emits events over a channel
/// for the UI to render, and offloads filesystem commits to blocking
/// workers so they never stall the tick loop or user input.
///
/// `tick` (and therefore `request_action` expiry handling) must run
/// inside a tokio runtime; `run_ticker` is a convenience driver for
/// headless use, while a GUI would call `tick` from its own event loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task;

use crate::commit::Coordinator;
use crate::config::Preferences;
use crate::pairing::{Pair, ScanError};
use crate::state::data::{ActionKind, ActionRecord, ActionState};
use crate::state::store::{CommitPlan, SessionStore};
use crate::CullError;

/// How many times a failed commit is retried before giving up
const COMMIT_ATTEMPTS: u32 = 3;
/// Pause between commit retries, for transient filesystem errors
const COMMIT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Notifications the core emits for the UI to render
#[derive(Debug, Clone, PartialEq)]
pub enum CullEvent {
    /// Pair list, cursor, or per-pair status changed; re-render
    StateChanged,
    /// A countdown is running on a pair
    CountdownTick {
        base_name: String,
        remaining_secs: f32,
    },
    /// A commit gave up; the file the user believes is gone may still
    /// exist, so this stays visible until acknowledged
    ActionFailed { base_name: String, reason: String },
    /// A directory was opened
    SessionLoaded { pair_count: usize },
    /// The prior session file could not be read; history was lost
    SessionLoadWarning { message: String },
}

/// Navigation direction for `navigate`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Per-pair status line for sidebar display
#[derive(Debug, Clone, PartialEq)]
pub struct PairStatus {
    pub base_name: String,
    pub file_status: &'static str,
    pub action: Option<(ActionKind, ActionState)>,
}

/// Everything the UI needs to render one frame
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub directory: Option<PathBuf>,
    /// The pair under the cursor, with its preview-capable paths
    pub current: Option<Pair>,
    /// 1-based position of the cursor; 0 when the list is empty
    pub position: usize,
    pub total: usize,
    pub processed: usize,
    pub percent: u8,
    pub statuses: Vec<PairStatus>,
    /// Active countdowns, pair -> seconds remaining
    pub countdowns: Vec<(String, f32)>,
    /// Commit failures awaiting acknowledgment, pair -> reason
    pub failures: Vec<(String, String)>,
}

struct Inner {
    store: Option<SessionStore>,
    coordinator: Coordinator,
    /// Bumped on every `open_directory`; a commit worker spawned
    /// against one epoch never touches the state of a later one
    epoch: u64,
}

pub struct Culler {
    inner: Arc<Mutex<Inner>>,
    prefs: Preferences,
    events: UnboundedSender<CullEvent>,
}

impl Culler {
    /// Build a culler and the receiving end of its event stream
    pub fn new(prefs: Preferences) -> (Self, UnboundedReceiver<CullEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(prefs.countdown());
        let culler = Culler {
            inner: Arc::new(Mutex::new(Inner {
                store: None,
                coordinator,
                epoch: 0,
            })),
            prefs,
            events,
        };
        (culler, receiver)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("state lock poisoned")
    }

    fn emit(&self, event: CullEvent) {
        // The receiver may be gone in headless/test use; that is fine
        let _ = self.events.send(event);
    }

    /// Open (or resume) a directory. Scan errors propagate to the
    /// caller; a corrupt session file does not, it falls back to a fresh
    /// session and emits a warning event.
    pub fn open_directory(&self, path: &Path) -> Result<(), ScanError> {
        let (store, warning) = SessionStore::open(path, self.prefs.resume_session)?;
        let pair_count = store.pairs().len();
        {
            let mut inner = self.lock();
            inner.store = Some(store);
            inner.coordinator = Coordinator::new(self.prefs.countdown());
            inner.epoch += 1;
        }
        if let Some(message) = warning {
            self.emit(CullEvent::SessionLoadWarning { message });
        }
        self.emit(CullEvent::SessionLoaded { pair_count });
        self.emit(CullEvent::StateChanged);
        Ok(())
    }

    /// Apply an action to the pair under the cursor.
    ///
    /// Non-destructive kinds are committed immediately; destructive
    /// kinds start (or restart, when re-deciding) their countdown. With
    /// `confirm_deletions` off the countdown is zero and the commit runs
    /// on the next tick.
    pub fn request_action(&self, kind: ActionKind) -> Result<ActionRecord, CullError> {
        let record = {
            let mut inner = self.lock();
            let store = inner.store.as_mut().ok_or(CullError::NoDirectory)?;
            let base_name = store
                .current_pair()
                .ok_or(CullError::NoCurrentPair)?
                .base_name
                .clone();
            let record = store.apply(&base_name, kind)?;
            if self.prefs.auto_advance {
                store.advance();
            }
            if record.state == ActionState::Pending {
                let delay = if self.prefs.confirm_deletions {
                    self.prefs.countdown()
                } else {
                    Duration::ZERO
                };
                inner
                    .coordinator
                    .schedule_after(&base_name, kind, Instant::now(), delay);
            }
            record
        };
        self.emit(CullEvent::StateChanged);
        Ok(record)
    }

    /// Move the cursor; clamped at the ends, never wraps
    pub fn navigate(&self, direction: Direction) -> bool {
        let moved = {
            let mut inner = self.lock();
            match inner.store.as_mut() {
                Some(store) => match direction {
                    Direction::Next => store.advance(),
                    Direction::Previous => store.retreat(),
                },
                None => false,
            }
        };
        if moved {
            self.emit(CullEvent::StateChanged);
        }
        moved
    }

    /// Cancel a pair's running countdown. Silently a no-op once the
    /// action has fired.
    pub fn cancel_pending(&self, base_name: &str) -> bool {
        let cancelled = {
            let mut inner = self.lock();
            if !inner.coordinator.cancel(base_name) {
                return false;
            }
            if let Some(store) = inner.store.as_mut() {
                if let Err(e) = store.undo(base_name) {
                    eprintln!("⚠️  Cancelled countdown but could not undo {base_name}: {e}");
                }
            }
            true
        };
        if cancelled {
            self.emit(CullEvent::StateChanged);
        }
        cancelled
    }

    /// Take back the most recent decision (see the store for what
    /// qualifies). Returns the rewritten record, or `None` when there
    /// was nothing to undo.
    pub fn undo(&self) -> Result<Option<ActionRecord>, CullError> {
        let record = {
            let mut inner = self.lock();
            let record = inner
                .store
                .as_mut()
                .ok_or(CullError::NoDirectory)?
                .undo_last()?;
            if let Some(record) = &record {
                inner.coordinator.cancel(&record.base_name);
            }
            record
        };
        if record.is_some() {
            self.emit(CullEvent::StateChanged);
        }
        Ok(record)
    }

    /// Acknowledge a surfaced commit failure for a pair
    pub fn acknowledge_failure(&self, base_name: &str) -> bool {
        let mut inner = self.lock();
        let in_store = inner
            .store
            .as_mut()
            .map(|s| s.acknowledge_failure(base_name))
            .unwrap_or(false);
        let in_coordinator = inner.coordinator.acknowledge_failure(base_name);
        in_store || in_coordinator
    }

    /// Snapshot of everything the UI renders
    pub fn display_state(&self) -> DisplayState {
        let inner = self.lock();
        let now = Instant::now();
        let Some(store) = inner.store.as_ref() else {
            return DisplayState::default();
        };

        let (position, total) = store.position();
        let (processed, _, percent) = store.progress();
        let statuses = store
            .pairs()
            .iter()
            .map(|pair| PairStatus {
                base_name: pair.base_name.clone(),
                file_status: pair.file_status(),
                action: store
                    .record(&pair.base_name)
                    .filter(|r| r.is_live())
                    .map(|r| (r.kind, r.state)),
            })
            .collect();
        let countdowns = store
            .pairs()
            .iter()
            .filter_map(|pair| {
                inner
                    .coordinator
                    .remaining(&pair.base_name, now)
                    .map(|remaining| (pair.base_name.clone(), remaining.as_secs_f32()))
            })
            .collect();
        let failures = store
            .failures()
            .iter()
            .map(|(base, reason)| (base.clone(), reason.clone()))
            .collect();

        DisplayState {
            directory: Some(store.directory().to_path_buf()),
            current: store.current_pair().cloned(),
            position,
            total,
            processed,
            percent,
            statuses,
            countdowns,
            failures,
        }
    }

    /// Advance all countdowns to `now`.
    ///
    /// Emits a tick event per running countdown and hands expired
    /// entries to background commit workers. A UI calls this from its
    /// frame/event loop; `run_ticker` does it on an interval.
    pub fn tick(&self, now: Instant) {
        let (countdowns, ready, epoch) = {
            let mut inner = self.lock();
            let report = inner.coordinator.tick(now);

            let mut ready = Vec::new();
            let mut stale = Vec::new();
            for (base_name, _) in report.due {
                match inner.store.as_mut().map(|s| s.begin_commit(&base_name)) {
                    Some(Ok(plan)) => ready.push(plan),
                    _ => stale.push(base_name),
                }
            }
            // A stale entry means the record was undone or replaced out
            // from under the countdown; drop it rather than commit
            for base_name in &stale {
                inner.coordinator.discard(base_name);
            }
            (report.countdowns, ready, inner.epoch)
        };

        for reading in countdowns {
            self.emit(CullEvent::CountdownTick {
                base_name: reading.base_name,
                remaining_secs: reading.remaining.as_secs_f32(),
            });
        }
        for plan in ready {
            self.spawn_commit(plan, epoch);
        }
    }

    /// Drive `tick` on the configured interval until the task is dropped
    pub async fn run_ticker(&self) {
        let mut interval = tokio::time::interval(self.prefs.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick(Instant::now());
        }
    }

    /// Run one pair's commit on a blocking worker, with bounded retries.
    /// Once this starts there is no cancellation; it runs to completion
    /// or to a terminal Failed state.
    ///
    /// The deletions themselves run against the plan's owned paths with
    /// no lock held, so a slow or hung disk never stalls the tick loop
    /// or user input; the lock is re-taken only to finalize bookkeeping.
    /// The epoch guard keeps a worker from an earlier `open_directory`
    /// out of a later directory's state.
    fn spawn_commit(&self, plan: CommitPlan, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        tokio::spawn(async move {
            let base_name = plan.base_name.clone();
            let mut attempt = 0;
            let error = loop {
                attempt += 1;
                let targets = plan.targets.clone();
                let result =
                    task::spawn_blocking(move || SessionStore::delete_targets(&targets)).await;

                let error = match result {
                    Ok(Ok(())) => {
                        let mut guard = inner.lock().expect("state lock poisoned");
                        if guard.epoch != epoch {
                            // A different session owns the state now
                            return;
                        }
                        let finalized = guard.store.as_mut().map(|s| s.finalize_commit(&base_name));
                        guard.coordinator.mark_committed(&base_name);
                        drop(guard);
                        if let Some(Err(e)) = finalized {
                            eprintln!(
                                "⚠️  Files deleted but session update failed for {base_name}: {e}"
                            );
                        }
                        let _ = events.send(CullEvent::StateChanged);
                        return;
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(join_error) => format!("commit worker panicked: {join_error}"),
                };

                if attempt < COMMIT_ATTEMPTS {
                    tokio::time::sleep(COMMIT_RETRY_BACKOFF).await;
                    continue;
                }
                break error;
            };

            let mut guard = inner.lock().expect("state lock poisoned");
            if guard.epoch != epoch {
                return;
            }
            guard.coordinator.mark_failed(&base_name, &error);
            if let Some(store) = guard.store.as_mut() {
                store.mark_failed(&base_name, &error);
            }
            drop(guard);
            eprintln!("⚠️  Commit failed for {base_name}: {error}");
            let _ = events.send(CullEvent::ActionFailed {
                base_name,
                reason: error,
            });
        });
    }
}
