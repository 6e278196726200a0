#![forbid(unsafe_code)]

//! The task collection and its single in-flight edit draft.
//!
//! Every intent returns an [`Outcome`]. Nothing here fails: missing ids, blank
//! text and absent drafts come back as [`Rejection`]s, and a failed save is
//! logged and remembered while the in-memory collection stays authoritative.

use std::fmt;

use crate::task::model::{Priority, Task, is_blank};
use crate::task::storage::{KeyValueStore, TaskStorage};
use crate::task::view::{self, FilterMode, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyText,
    NotFound,
    NoDraft,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::EmptyText => "task text must not be empty",
            Rejection::NotFound => "task not found",
            Rejection::NoDraft => "no edit in progress",
        })
    }
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected(Rejection),
}

impl Outcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied)
    }

    #[must_use]
    pub fn rejection(self) -> Option<Rejection> {
        match self {
            Outcome::Applied => None,
            Outcome::Rejected(r) => Some(r),
        }
    }
}

#[derive(Debug)]
pub struct TaskStore<S> {
    storage: TaskStorage<S>,
    tasks: Vec<Task>,
    draft: Option<Task>,
    filter: FilterMode,
    last_persist_error: Option<String>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Restores the collection from `storage`; unreadable data starts empty.
    #[must_use]
    pub fn open(storage: TaskStorage<S>) -> Self {
        let tasks = storage.load();
        tracing::debug!(key = storage.key(), count = tasks.len(), "task store opened");
        Self {
            storage,
            tasks,
            draft: None,
            filter: FilterMode::default(),
            last_persist_error: None,
        }
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn draft(&self) -> Option<&Task> {
        self.draft.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    #[must_use]
    pub fn view(&self) -> View<'_> {
        view::project(&self.tasks, self.filter)
    }

    #[must_use]
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    pub fn add(&mut self, text: &str) -> Outcome {
        if is_blank(text) {
            return Outcome::Rejected(Rejection::EmptyText);
        }
        let task = Task::new(text);
        tracing::debug!(id = %task.id, "task added");
        self.tasks.push(task);
        self.persist();
        Outcome::Applied
    }

    pub fn toggle(&mut self, id: &str) -> Outcome {
        self.update(id, |t| t.completed = !t.completed)
    }

    pub fn delete(&mut self, id: &str) -> Outcome {
        let Some(idx) = self.position(id) else {
            return Outcome::Rejected(Rejection::NotFound);
        };
        self.tasks.remove(idx);
        if self.draft.as_ref().is_some_and(|d| d.id == id) {
            self.draft = None;
        }
        tracing::debug!(id, "task deleted");
        self.persist();
        Outcome::Applied
    }

    /// Replaces any unsaved draft with a copy of the task.
    pub fn start_edit(&mut self, id: &str) -> Outcome {
        let Some(task) = self.get(id).cloned() else {
            return Outcome::Rejected(Rejection::NotFound);
        };
        self.draft = Some(task);
        Outcome::Applied
    }

    pub fn update_draft_text(&mut self, text: impl Into<String>) -> Outcome {
        let Some(draft) = self.draft.as_mut() else {
            return Outcome::Rejected(Rejection::NoDraft);
        };
        draft.text = text.into();
        Outcome::Applied
    }

    pub fn update_draft_priority(&mut self, priority: Priority) -> Outcome {
        let Some(draft) = self.draft.as_mut() else {
            return Outcome::Rejected(Rejection::NoDraft);
        };
        draft.priority = priority;
        Outcome::Applied
    }

    /// A blank draft is rejected and stays open.
    pub fn commit_edit(&mut self) -> Outcome {
        let Some(draft) = self.draft.as_ref() else {
            return Outcome::Rejected(Rejection::NoDraft);
        };
        if is_blank(&draft.text) {
            return Outcome::Rejected(Rejection::EmptyText);
        }
        let Some(draft) = self.draft.take() else {
            return Outcome::Rejected(Rejection::NoDraft);
        };
        let Some(idx) = self.position(&draft.id) else {
            return Outcome::Rejected(Rejection::NotFound);
        };
        tracing::debug!(id = %draft.id, "edit committed");
        self.tasks[idx] = draft;
        self.persist();
        Outcome::Applied
    }

    pub fn cancel_edit(&mut self) -> Outcome {
        if self.draft.take().is_none() {
            return Outcome::Rejected(Rejection::NoDraft);
        }
        Outcome::Applied
    }

    pub fn set_priority(&mut self, id: &str, priority: Priority) -> Outcome {
        self.update(id, |t| t.priority = priority)
    }

    /// Also applies to completed tasks; hiding the control is the view's job.
    pub fn cycle_priority(&mut self, id: &str) -> Outcome {
        self.update(id, |t| t.priority = t.priority.next())
    }

    pub fn clear_all(&mut self) -> Outcome {
        self.tasks.clear();
        self.draft = None;
        tracing::debug!("all tasks cleared");
        self.persist();
        Outcome::Applied
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn update(&mut self, id: &str, f: impl FnOnce(&mut Task)) -> Outcome {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Outcome::Rejected(Rejection::NotFound);
        };
        f(task);
        tracing::debug!(id, completed = task.completed, priority = %task.priority, "task updated");
        self.persist();
        Outcome::Applied
    }

    fn persist(&mut self) {
        match self.storage.save(&self.tasks) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::warn!(error = %msg, "failed to persist tasks; keeping in-memory state");
                self.last_persist_error = Some(msg);
            }
        }
    }
}
