#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TodoError;
use crate::task::model::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [FilterMode::All, FilterMode::Active, FilterMode::Completed];

    #[must_use]
    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.completed,
            FilterMode::Completed => task.completed,
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Active => "Active",
            FilterMode::Completed => "Completed",
        }
    }

    #[must_use]
    pub fn empty_message(self) -> &'static str {
        match self {
            FilterMode::All => "No tasks yet. Add one above!",
            FilterMode::Active => "No active tasks. All done!",
            FilterMode::Completed => "No completed tasks yet.",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterMode::All => "all",
            FilterMode::Active => "active",
            FilterMode::Completed => "completed",
        })
    }
}

impl FromStr for FilterMode {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "active" => Ok(FilterMode::Active),
            "completed" | "done" => Ok(FilterMode::Completed),
            _ => Err(TodoError::InvalidFilter(s.to_owned())),
        }
    }
}

/// One visible row. Priority and edit controls belong only to editable rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskView<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View<'a> {
    pub filter: FilterMode,
    pub tasks: Vec<TaskView<'a>>,
    pub active_count: usize,
    pub completed_count: usize,
    pub total_count: usize,
}

impl View<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} tasks remaining • {} total tasks",
            self.active_count, self.total_count
        )
    }
}

/// Counts always cover the whole collection, whatever the filter.
#[must_use]
pub fn project(tasks: &[Task], filter: FilterMode) -> View<'_> {
    let active_count = tasks.iter().filter(|t| !t.completed).count();
    View {
        filter,
        tasks: tasks
            .iter()
            .filter(|t| filter.matches(t))
            .map(|task| TaskView {
                task,
                editable: !task.completed,
            })
            .collect(),
        active_count,
        completed_count: tasks.len() - active_count,
        total_count: tasks.len(),
    }
}
