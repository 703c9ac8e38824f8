//! Annotation records and the payloads exchanged with editing clients.
//!
//! A client opens an image for editing, which hands it the labels and tries
//! to take the lock, then submits replacement labels while holding it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{LabelError, Result};
use crate::lock::{Clock, LockState, SystemClock, UpdateReport};
use crate::model::{LabelCollection, WrappedLabelCollection};

/// Whether the client may edit the labels it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditState {
    Locked,
    Editable,
}

/// Labels sent to a client opening an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsPayload {
    pub image_id: String,
    pub completed_tasks: Vec<String>,
    #[serde(rename = "timeElapsed")]
    pub time_elapsed: f64,
    pub state: EditState,
    pub labels: Value,
    pub session_id: String,
}

/// Labels sent back by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsSubmission {
    pub image_id: String,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
    #[serde(rename = "timeElapsed", default)]
    pub time_elapsed: f64,
    pub labels: Value,
}

/// Error codes reported to a submitting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteError {
    Locked,
}

/// Reply to a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WriteResponse {
    Success { success: bool },
    Failure { error: WriteError },
}

impl WriteResponse {
    pub fn success() -> Self {
        WriteResponse::Success { success: true }
    }

    pub fn locked() -> Self {
        WriteResponse::Failure {
            error: WriteError::Locked,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteResponse::Success { success: true })
    }
}

/// The labels of one image with the lock guarding them.
pub struct AnnotationRecord {
    image_id: String,
    labels: WrappedLabelCollection,
    lock: LockState,
    clock: Arc<dyn Clock>,
}

impl AnnotationRecord {
    /// Create a record timed by the system clock.
    pub fn new(image_id: impl Into<String>, labels: WrappedLabelCollection) -> Self {
        Self::with_clock(image_id, labels, Arc::new(SystemClock))
    }

    pub fn with_clock(image_id: impl Into<String>, labels: WrappedLabelCollection, clock: Arc<dyn Clock>) -> Self {
        let lock = LockState::new(clock.now());
        Self {
            image_id: image_id.into(),
            labels,
            lock,
            clock,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn labels(&self) -> &WrappedLabelCollection {
        &self.labels
    }

    pub fn lock_state(&self) -> &LockState {
        &self.lock
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn is_locked_to(&self, actor: Option<&str>) -> bool {
        self.lock.is_locked_to(actor, self.clock.as_ref())
    }

    pub fn lock(&mut self, actor: &str, ttl: Duration) -> Result<()> {
        self.lock.lock(actor, ttl, self.clock.as_ref())
    }

    pub fn refresh_lock(&mut self, actor: &str, ttl: Duration) -> Result<()> {
        self.lock.refresh_lock(actor, ttl, self.clock.as_ref())
    }

    pub fn unlock(&mut self, actor: &str) -> Result<()> {
        self.lock.unlock(actor, self.clock.as_ref())
    }

    /// Replace the labels and completed tasks.
    ///
    /// With `enforce_lock`, an update from anyone but the lock holder fails
    /// with [`LabelError::LabelsLocked`] and changes nothing.
    pub fn update(
        &mut self,
        labels: LabelCollection,
        completed_tasks: BTreeSet<String>,
        elapsed: f64,
        actor: Option<&str>,
        enforce_lock: bool,
    ) -> Result<UpdateReport> {
        let report = self
            .lock
            .record_update(actor, elapsed, enforce_lock, self.clock.as_ref())?;
        self.labels = self.labels.with_labels(labels);
        self.labels.completed_tasks = completed_tasks;
        log::info!(
            "Updated labels of image {} ({} labels)",
            self.image_id,
            self.labels.labels.len()
        );
        Ok(report)
    }

    /// Hand the labels to a client, locking them to `actor` when possible.
    ///
    /// Anonymous actors never take the lock.
    pub fn open_for_edit(&mut self, actor: Option<&str>, ttl: Duration) -> Result<LabelsPayload> {
        let state = if self.is_locked_to(actor) {
            EditState::Locked
        } else {
            EditState::Editable
        };
        let payload = LabelsPayload {
            image_id: self.image_id.clone(),
            completed_tasks: self.labels.completed_tasks.iter().cloned().collect(),
            time_elapsed: self.lock.edit_time_elapsed,
            state,
            labels: self.labels.labels.to_json()?,
            session_id: Uuid::new_v4().to_string(),
        };
        if let (EditState::Editable, Some(actor)) = (state, actor) {
            self.lock(actor, ttl)?;
        }
        Ok(payload)
    }

    /// Apply a client's submission under the lock and extend the lock.
    ///
    /// A foreign lock is reported in the response; malformed labels are an
    /// error.
    pub fn submit(&mut self, submission: &LabelsSubmission, actor: Option<&str>, ttl: Duration) -> Result<WriteResponse> {
        let labels = LabelCollection::from_json(&submission.labels)?;
        let tasks = submission.completed_tasks.iter().cloned().collect();
        match self.update(labels, tasks, submission.time_elapsed, actor, true) {
            Ok(_) => {}
            Err(LabelError::LabelsLocked { locked_by }) => {
                log::info!(
                    "Refused submission for image {} while locked by {:?}",
                    self.image_id,
                    locked_by
                );
                return Ok(WriteResponse::locked());
            }
            Err(e) => return Err(e),
        }
        if let Some(actor) = actor {
            self.refresh_lock(actor, ttl)?;
        }
        Ok(WriteResponse::success())
    }
}
