/// Deferred commit coordinator
///
/// The countdown/undo engine. Every destructive action is queued here
/// with a deadline; the owner drives the coordinator with a periodic
/// `tick`, displays the remaining time it reports, and runs the store
/// commit for entries whose countdown expired. Cancellation is effective
/// at tick granularity and only while an entry is still Scheduled.
///
/// The coordinator is deliberately deterministic: it holds no timers of
/// its own and never touches the filesystem, it just maps pair identity
/// to deadline and phase. That keeps every transition unit-testable
/// without a runtime.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::state::data::ActionKind;

/// Lifecycle of one queued destructive action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitPhase {
    /// Countdown running; cancellable
    Scheduled { deadline: Instant },
    /// Deadline passed, filesystem work handed off; runs to completion
    Committing,
    /// Filesystem mutation applied
    Committed,
    /// Cancelled before the deadline
    Cancelled,
    /// Commit gave up after retries; terminal until acknowledged
    Failed { reason: String },
}

/// One queued action: pair identity and kind only, never pair data
#[derive(Debug, Clone)]
pub struct PendingCommit {
    pub base_name: String,
    pub kind: ActionKind,
    pub phase: CommitPhase,
}

/// Remaining-time reading for a scheduled entry, emitted each tick
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownReading {
    pub base_name: String,
    pub remaining: Duration,
}

/// What one tick produced: countdown readings plus newly due entries
#[derive(Debug, Default)]
pub struct TickReport {
    pub countdowns: Vec<CountdownReading>,
    pub due: Vec<(String, ActionKind)>,
}

pub struct Coordinator {
    delay: Duration,
    entries: HashMap<String, PendingCommit>,
}

impl Coordinator {
    pub fn new(delay: Duration) -> Self {
        Coordinator {
            delay,
            entries: HashMap::new(),
        }
    }

    /// Queue a destructive action with the default countdown.
    ///
    /// A pair re-decided while still Scheduled is superseded: the old
    /// entry is replaced and the countdown starts fresh.
    pub fn schedule(&mut self, base_name: &str, kind: ActionKind, now: Instant) {
        self.schedule_after(base_name, kind, now, self.delay);
    }

    /// Queue with an explicit delay (zero commits on the next tick)
    pub fn schedule_after(
        &mut self,
        base_name: &str,
        kind: ActionKind,
        now: Instant,
        delay: Duration,
    ) {
        self.entries.insert(
            base_name.to_string(),
            PendingCommit {
                base_name: base_name.to_string(),
                kind,
                phase: CommitPhase::Scheduled {
                    deadline: now + delay,
                },
            },
        );
    }

    /// Stop a countdown. Returns false (no-op) if the entry already
    /// fired or never existed; only Scheduled entries can be cancelled.
    pub fn cancel(&mut self, base_name: &str) -> bool {
        match self.entries.get_mut(base_name) {
            Some(entry) if matches!(entry.phase, CommitPhase::Scheduled { .. }) => {
                entry.phase = CommitPhase::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Advance every countdown to `now`.
    ///
    /// Entries whose deadline passed move Scheduled -> Committing and are
    /// returned as due; the caller owns running their commits. Entries
    /// that resolved since the last tick (Committed/Cancelled) are swept
    /// out; Failed entries stay until acknowledged.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.entries.retain(|_, entry| {
            !matches!(entry.phase, CommitPhase::Committed | CommitPhase::Cancelled)
        });

        let mut report = TickReport::default();
        for entry in self.entries.values_mut() {
            if let CommitPhase::Scheduled { deadline } = entry.phase {
                if now >= deadline {
                    entry.phase = CommitPhase::Committing;
                    report.due.push((entry.base_name.clone(), entry.kind));
                } else {
                    report.countdowns.push(CountdownReading {
                        base_name: entry.base_name.clone(),
                        remaining: deadline - now,
                    });
                }
            }
        }
        report
    }

    /// Remaining time for a scheduled entry, if any
    pub fn remaining(&self, base_name: &str, now: Instant) -> Option<Duration> {
        match self.entries.get(base_name)?.phase {
            CommitPhase::Scheduled { deadline } => {
                Some(deadline.saturating_duration_since(now))
            }
            _ => None,
        }
    }

    /// Committing -> Committed; the entry is swept on the next tick
    pub fn mark_committed(&mut self, base_name: &str) {
        if let Some(entry) = self.entries.get_mut(base_name) {
            entry.phase = CommitPhase::Committed;
        }
    }

    /// Committing -> Failed; terminal, no automatic retry
    pub fn mark_failed(&mut self, base_name: &str, reason: &str) {
        if let Some(entry) = self.entries.get_mut(base_name) {
            entry.phase = CommitPhase::Failed {
                reason: reason.to_string(),
            };
        }
    }

    /// Drop an entry outright; for countdowns whose record was undone
    /// or replaced out from under them
    pub fn discard(&mut self, base_name: &str) {
        self.entries.remove(base_name);
    }

    /// Drop an acknowledged Failed entry
    pub fn acknowledge_failure(&mut self, base_name: &str) -> bool {
        match self.entries.get(base_name) {
            Some(entry) if matches!(entry.phase, CommitPhase::Failed { .. }) => {
                self.entries.remove(base_name);
                true
            }
            _ => false,
        }
    }

    pub fn phase(&self, base_name: &str) -> Option<&CommitPhase> {
        self.entries.get(base_name).map(|e| &e.phase)
    }

    /// Scheduled-entry count, for display
    pub fn scheduled_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e.phase, CommitPhase::Scheduled { .. }))
            .count()
    }
}
