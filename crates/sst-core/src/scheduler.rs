//! Debounced, rate-limited sync triggering.
//!
//! Change and foreground signals arm a single [`ScheduledTask`]; every new
//! signal replaces the previous due instant, so a burst of edits collapses
//! into one sync. The wait is
//!
//! ```text
//! wait = max(debounce, min_interval - (now - last_sync_at))
//! ```
//!
//! with `wait = debounce` before the first successful sync. The scheduler
//! never sleeps: the host calls [`SyncScheduler::poll`] and the task fires on
//! the first poll at or after its due instant.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::model::ModifiedAt;
use crate::store::{DocumentStore, LocalStore, StoreError};
use crate::sync::{SyncError, SyncOutcome};

/// Default quiet period after the last signal.
pub const DEFAULT_DEBOUNCE: TimeDelta = TimeDelta::seconds(5);
/// Default minimum spacing between successful syncs.
pub const DEFAULT_MIN_INTERVAL: TimeDelta = TimeDelta::seconds(30);

/// Why a sync was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// A local edit was committed.
    Changed,
    /// The app returned to the foreground or started.
    Foreground,
}

/// One cancellable timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduledTask {
    due: Option<DateTime<Utc>>,
}

impl ScheduledTask {
    /// Arm for `due`, replacing any earlier arming.
    pub const fn arm(&mut self, due: DateTime<Utc>) {
        self.due = Some(due);
    }

    pub const fn cancel(&mut self) {
        self.due = None;
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    #[must_use]
    pub const fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due.is_some_and(|due| now >= due)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub debounce: TimeDelta,
    pub min_interval: TimeDelta,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl From<&SyncConfig> for SchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            debounce: config.debounce(),
            min_interval: config.min_interval(),
        }
    }
}

/// Outcome of the most recent fired cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CycleResult {
    Succeeded {
        last_sync: ModifiedAt,
        pending: usize,
    },
    /// Another cycle held the sync gate; nothing ran.
    Skipped,
    Failed {
        code: &'static str,
        message: String,
    },
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    /// Completion instant of the last successful cycle.
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_result: Option<CycleResult>,
    pub last_trigger: Option<Trigger>,
    pub signals: usize,
    pub runs: usize,
    pub failures: usize,
}

/// Turns signals into at most one pending sync.
#[derive(Debug, Clone)]
pub struct SyncScheduler<C> {
    config: SchedulerConfig,
    clock: C,
    task: ScheduledTask,
    state: SchedulerState,
}

impl<C: Clock> SyncScheduler<C> {
    pub fn new(config: SchedulerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            task: ScheduledTask::default(),
            state: SchedulerState::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SchedulerState {
        &self.state
    }

    #[must_use]
    pub const fn task(&self) -> &ScheduledTask {
        &self.task
    }

    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Delay a signal arriving at `now` would be given.
    #[must_use]
    pub fn wait_for(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.state.last_sync_at {
            None => self.config.debounce,
            Some(last) => self.config.debounce.max(self.config.min_interval - (now - last)),
        }
    }

    /// Record a signal and (re-)arm the task. Returns the new due instant.
    pub fn signal(&mut self, trigger: Trigger) -> DateTime<Utc> {
        let now = self.clock.now();
        let due = now + self.wait_for(now);
        self.task.arm(due);
        self.state.signals += 1;
        self.state.last_trigger = Some(trigger);
        tracing::debug!(?trigger, due = %ModifiedAt::At(due), "sync scheduled");
        due
    }

    /// Fire the task if it is due. Returns the cycle result when it fired.
    pub fn poll<F>(&mut self, run: F) -> Option<&CycleResult>
    where
        F: FnOnce() -> Result<SyncOutcome, SyncError>,
    {
        if !self.task.is_due(self.clock.now()) {
            return None;
        }
        self.task.cancel();
        self.fire(run);
        self.state.last_result.as_ref()
    }

    /// Run a cycle immediately, dropping any armed task.
    pub fn run_now<F>(&mut self, run: F) -> &CycleResult
    where
        F: FnOnce() -> Result<SyncOutcome, SyncError>,
    {
        self.task.cancel();
        self.fire(run)
    }

    fn fire<F>(&mut self, run: F) -> &CycleResult
    where
        F: FnOnce() -> Result<SyncOutcome, SyncError>,
    {
        self.state.runs += 1;
        let result = match run() {
            Ok(outcome) => {
                self.state.last_sync_at = Some(self.clock.now());
                CycleResult::Succeeded {
                    last_sync: outcome.status.last_sync,
                    pending: outcome.status.pending,
                }
            }
            Err(err) if err.is_busy() => {
                tracing::debug!("sync skipped: another cycle is running");
                CycleResult::Skipped
            }
            Err(err) => {
                self.state.failures += 1;
                let code = err.code();
                tracing::warn!(code = code.code(), error = %err, "sync failed");
                CycleResult::Failed {
                    code: code.code(),
                    message: err.to_string(),
                }
            }
        };
        self.state.last_result.insert(result)
    }

    /// Time until the armed task is due, zero if overdue, `None` if idle.
    #[must_use]
    pub fn time_until_due(&self) -> Option<TimeDelta> {
        let due = self.task.due_at()?;
        Some((due - self.clock.now()).max(TimeDelta::zero()))
    }
}

/// Turns commits made by other writers into [`Trigger::Changed`] signals.
///
/// The baseline only moves when a change is observed, never after a cycle,
/// so a commit landing while a sync is in flight still re-arms the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeWatcher {
    seen: u64,
}

impl ChangeWatcher {
    /// Start watching from the store's current change counter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the counter cannot be read.
    pub fn new<S: DocumentStore>(store: &LocalStore<S>) -> Result<Self, StoreError> {
        Ok(Self {
            seen: store.change_counter()?,
        })
    }

    /// Signal `scheduler` if the counter moved since the last observation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the counter cannot be read.
    pub fn observe<S: DocumentStore, C: Clock>(
        &mut self,
        store: &LocalStore<S>,
        scheduler: &mut SyncScheduler<C>,
    ) -> Result<bool, StoreError> {
        let counter = store.change_counter()?;
        if counter == self.seen {
            return Ok(false);
        }
        self.seen = counter;
        scheduler.signal(Trigger::Changed);
        Ok(true)
    }
}

impl CycleResult {
    /// Error code of a failed cycle.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Failed { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}
