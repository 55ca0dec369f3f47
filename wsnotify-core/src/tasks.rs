//! Session/task correlation.
//!
//! Task status events must be scoped to the session that started the task,
//! but the code reporting progress usually has no session at hand.
//! [`TaskCorrelation`] remembers the owner of every live task so status
//! events can be built from the task id alone.
//!
//! A mapping lives from [`TaskCorrelation::task_started`] until the
//! terminal event (`running == false`) for the task has been published.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tracing::{debug, info, warn};
use wsnotify_sdk::objects::{EventError, SessionTaskInfo, SessionTaskInfoEvent};

use crate::events::{Accepted, PublishError, Publisher, Transport};

/// Errors raised by [`TaskCorrelation`].
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task id is still mapped to a live task.
    #[error("task {task_id} is still mapped to session {session_id}")]
    StaleTaskMapping { task_id: String, session_id: String },

    #[error("task {0} is not tracked")]
    UnknownTask(String),

    #[error("session id must not be empty")]
    EmptySessionId,

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// The session (and optionally user) a task belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOwner {
    pub session_id: String,
    pub user_id: Option<String>,
}

/// One registration of a task id. `generation` tells apart two
/// registrations of the same id, even by the same owner.
#[derive(Debug, Clone)]
struct Mapping {
    owner: TaskOwner,
    generation: u64,
}

/// Concurrent map from task id to [`TaskOwner`].
///
/// Owned by the service that runs tasks and shared behind an `Arc`.
/// Operations on different task ids never contend beyond a map shard.
#[derive(Debug, Default)]
pub struct TaskCorrelation {
    tasks: DashMap<String, Mapping>,
    generations: AtomicU64,
}

impl TaskCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `session_id` started the task `task_id`.
    ///
    /// Fails with [`TaskError::StaleTaskMapping`] if the id is still live.
    pub fn task_started(
        &self,
        task_id: impl Into<String>,
        session_id: impl Into<String>,
        user_id: Option<String>,
    ) -> Result<(), TaskError> {
        self.register(task_id.into(), session_id.into(), user_id)
            .map(|_| ())
    }

    fn register(
        &self,
        task_id: String,
        session_id: String,
        user_id: Option<String>,
    ) -> Result<Mapping, TaskError> {
        if task_id.is_empty() {
            return Err(EventError::EmptyTaskId.into());
        }
        if session_id.is_empty() {
            return Err(TaskError::EmptySessionId);
        }

        match self.tasks.entry(task_id) {
            Entry::Occupied(entry) => Err(TaskError::StaleTaskMapping {
                task_id: entry.key().clone(),
                session_id: entry.get().owner.session_id.clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(task_id = %entry.key(), %session_id, "Task started");
                let mapping = Mapping {
                    owner: TaskOwner {
                        session_id,
                        user_id: user_id.filter(|u| !u.is_empty()),
                    },
                    generation: self.generations.fetch_add(1, Ordering::Relaxed),
                };
                entry.insert(mapping.clone());
                Ok(mapping)
            }
        }
    }

    /// Remove `task_id` only while it still holds the given registration.
    fn release(&self, task_id: &str, mapping: &Mapping) -> bool {
        self.tasks
            .remove_if(task_id, |_, current| current.generation == mapping.generation)
            .is_some()
    }

    fn mapping(&self, task_id: &str) -> Result<Mapping, TaskError> {
        self.tasks
            .get(task_id)
            .map(|mapping| mapping.clone())
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_owned()))
    }

    pub fn owner(&self, task_id: &str) -> Option<TaskOwner> {
        self.tasks.get(task_id).map(|mapping| mapping.owner.clone())
    }

    pub fn session_for(&self, task_id: &str) -> Option<String> {
        self.tasks
            .get(task_id)
            .map(|mapping| mapping.owner.session_id.clone())
    }

    /// Build a status event for a tracked task, scoped to its owner.
    pub fn task_info(
        &self,
        task_id: &str,
        status_name: Option<String>,
        running: bool,
    ) -> Result<SessionTaskInfoEvent, TaskError> {
        let mapping = self.mapping(task_id)?;
        build_task_info(task_id, &mapping.owner, status_name, running)
    }

    /// Start tracking a task and publish its first status event.
    ///
    /// If the start event cannot be published the mapping is rolled back, so
    /// the caller may retry with the same task id. A registration made by
    /// someone else in the meantime is left alone.
    pub fn start<T: Transport>(
        &self,
        publisher: &Publisher<T>,
        task_id: &str,
        session_id: impl Into<String>,
        user_id: Option<String>,
        status_name: Option<String>,
    ) -> Result<Accepted, TaskError> {
        let mapping = self.register(task_id.to_owned(), session_id.into(), user_id)?;
        let event = build_task_info(task_id, &mapping.owner, status_name, true)?;
        match publisher.publish(event) {
            Ok(accepted) => Ok(accepted),
            Err(e) => {
                self.release(task_id, &mapping);
                Err(e.into())
            }
        }
    }

    /// Publish a status update for a tracked task.
    ///
    /// For a terminal update (`running == false`) the mapping is removed
    /// only after the event was accepted by the publisher, and only if the
    /// task id was not abandoned and registered again meanwhile. If
    /// publishing fails the mapping stays so the terminal update can be
    /// retried, or dropped with [`TaskCorrelation::abandon`].
    pub fn report<T: Transport>(
        &self,
        publisher: &Publisher<T>,
        task_id: &str,
        status_name: Option<String>,
        running: bool,
    ) -> Result<Accepted, TaskError> {
        let mapping = self.mapping(task_id)?;
        let event = build_task_info(task_id, &mapping.owner, status_name, running)?;
        let accepted = publisher.publish(event).inspect_err(|e| {
            warn!(error = %e, %task_id, running, "Failed to publish task status");
        })?;

        if !running && self.release(task_id, &mapping) {
            info!(%task_id, "Task finished");
        }
        Ok(accepted)
    }

    /// Forget a task without publishing anything.
    pub fn abandon(&self, task_id: &str) -> Option<TaskOwner> {
        let removed = self.tasks.remove(task_id).map(|(_, mapping)| mapping.owner);
        if removed.is_some() {
            info!(%task_id, "Task mapping abandoned");
        }
        removed
    }

    /// Number of live task mappings.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

fn build_task_info(
    task_id: &str,
    owner: &TaskOwner,
    status_name: Option<String>,
    running: bool,
) -> Result<SessionTaskInfoEvent, TaskError> {
    let payload = SessionTaskInfo::new(task_id, status_name, running)?;
    Ok(SessionTaskInfoEvent::scoped(
        payload,
        Some(owner.session_id.clone()),
        owner.user_id.clone(),
    ))
}
