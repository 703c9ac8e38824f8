//! Pessimistic edit locks and edit-time accounting for one annotation set.
//!
//! A lock is held by at most one actor until it expires. Expiry is checked
//! lazily against a [`Clock`] whenever the state is queried; nothing sweeps
//! expired locks in the background.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::{LabelError, Result, StaleTimeElapsed};

/// Minimum slack, in seconds, added to the wall time between edits.
pub const ELAPSED_SLACK_SECS: f64 = 60.0;

// ============================================================================
// Clocks
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// A clock starting at the given number of seconds after the Unix epoch.
    pub fn at_secs(secs: u64) -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(secs))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Lock state
// ============================================================================

/// Outcome of an accepted update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Set when the reported elapsed time was rejected and the stored one kept
    pub stale: Option<StaleTimeElapsed>,
}

impl UpdateReport {
    pub fn elapsed_accepted(&self) -> bool {
        self.stale.is_none()
    }
}

/// Lock and modification bookkeeping of one annotation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    pub locked_by: Option<String>,
    #[serde(with = "epoch_secs")]
    pub lock_expiry: SystemTime,
    /// Total reported editing time, in seconds
    pub edit_time_elapsed: f64,
    #[serde(with = "epoch_secs")]
    pub last_modified_at: SystemTime,
    pub last_modified_by: Option<String>,
}

impl LockState {
    /// Unlocked state created at `now`.
    pub fn new(now: SystemTime) -> Self {
        Self {
            locked_by: None,
            lock_expiry: now,
            edit_time_elapsed: 0.0,
            last_modified_at: now,
            last_modified_by: None,
        }
    }

    pub fn is_lock_active(&self, clock: &dyn Clock) -> bool {
        self.locked_by.is_some() && clock.now() < self.lock_expiry
    }

    /// True when an active lock keeps `actor` out.
    ///
    /// Anonymous actors are kept out by any active lock; nobody is kept out by
    /// their own lock.
    pub fn is_locked_to(&self, actor: Option<&str>, clock: &dyn Clock) -> bool {
        if !self.is_lock_active(clock) {
            return false;
        }
        match actor {
            None => true,
            Some(actor) => self.locked_by.as_deref() != Some(actor),
        }
    }

    /// Take the lock for `actor` until `ttl` from now.
    pub fn lock(&mut self, actor: &str, ttl: Duration, clock: &dyn Clock) -> Result<()> {
        if self.is_locked_to(Some(actor), clock) {
            return Err(self.locked_error());
        }
        self.locked_by = Some(actor.to_string());
        self.lock_expiry = clock.now() + ttl;
        log::debug!("Locked to {} for {:?}", actor, ttl);
        Ok(())
    }

    /// Extend `actor`'s lock, or take it if no lock is active.
    pub fn refresh_lock(&mut self, actor: &str, ttl: Duration, clock: &dyn Clock) -> Result<()> {
        if self.is_locked_to(Some(actor), clock) {
            return Err(self.locked_error());
        }
        self.locked_by = Some(actor.to_string());
        self.lock_expiry = clock.now() + ttl;
        log::debug!("Refreshed lock for {}", actor);
        Ok(())
    }

    /// Release `actor`'s lock. Releasing an inactive lock does nothing.
    pub fn unlock(&mut self, actor: &str, clock: &dyn Clock) -> Result<()> {
        if !self.is_lock_active(clock) {
            return Ok(());
        }
        if self.locked_by.as_deref() != Some(actor) {
            return Err(self.locked_error());
        }
        self.locked_by = None;
        self.lock_expiry = clock.now();
        log::debug!("Unlocked by {}", actor);
        Ok(())
    }

    /// Gate and stamp an update by `actor` reporting `elapsed` seconds of editing.
    ///
    /// Fails with [`LabelError::LabelsLocked`] when `enforce_lock` is set and
    /// another actor holds the lock. Otherwise the update is recorded; an
    /// implausible elapsed time is left out and returned in the report.
    pub fn record_update(
        &mut self,
        actor: Option<&str>,
        elapsed: f64,
        enforce_lock: bool,
        clock: &dyn Clock,
    ) -> Result<UpdateReport> {
        if enforce_lock && self.is_locked_to(actor, clock) {
            return Err(self.locked_error());
        }

        let now = clock.now();
        let report = match self.check_elapsed(elapsed, now) {
            Ok(()) => {
                if elapsed >= self.edit_time_elapsed {
                    self.edit_time_elapsed = elapsed;
                }
                UpdateReport::default()
            }
            Err(stale) => {
                log::warn!("{}", stale);
                UpdateReport { stale: Some(stale) }
            }
        };

        self.last_modified_at = now;
        self.last_modified_by = actor.map(str::to_string);
        Ok(report)
    }

    /// Reject elapsed times that grew faster than the wall clock allows.
    ///
    /// The permitted increase is twice the time since the last modification,
    /// or that time plus [`ELAPSED_SLACK_SECS`], whichever is larger.
    pub fn check_elapsed(&self, reported: f64, now: SystemTime) -> std::result::Result<(), StaleTimeElapsed> {
        let dt = now
            .duration_since(self.last_modified_at)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let permitted_increase = (dt * 2.0).max(dt + ELAPSED_SLACK_SECS);
        if reported > self.edit_time_elapsed + permitted_increase {
            Err(StaleTimeElapsed {
                reported,
                previous: self.edit_time_elapsed,
                permitted_increase,
            })
        } else {
            Ok(())
        }
    }

    fn locked_error(&self) -> LabelError {
        LabelError::locked(self.locked_by.as_deref())
    }
}

/// Timestamps as fractional seconds since the Unix epoch.
mod epoch_secs {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        serializer.serialize_f64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        let since_epoch = Duration::try_from_secs_f64(secs.max(0.0))
            .map_err(|e| D::Error::custom(format!("invalid timestamp {secs}: {e}")))?;
        UNIX_EPOCH
            .checked_add(since_epoch)
            .ok_or_else(|| D::Error::custom(format!("timestamp {secs} out of range")))
    }
}
