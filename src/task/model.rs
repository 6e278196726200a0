#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TodoError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Pending,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Normal, Priority::Pending, Priority::Urgent];

    /// `normal -> pending -> urgent -> normal`
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Priority::Normal => Priority::Pending,
            Priority::Pending => Priority::Urgent,
            Priority::Urgent => Priority::Normal,
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        match self {
            Priority::Normal => Priority::Urgent,
            Priority::Pending => Priority::Normal,
            Priority::Urgent => Priority::Pending,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Pending => "pending",
            Priority::Urgent => "urgent",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::Pending => "Pending",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "n" => Ok(Priority::Normal),
            "pending" | "p" => Ok(Priority::Pending),
            "urgent" | "u" => Ok(Priority::Urgent),
            _ => Err(TodoError::InvalidPriority(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
}

impl Task {
    /// A fresh active task with normal priority. The text is kept as entered.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Self::new_id(),
            text: text.into(),
            completed: false,
            priority: Priority::Normal,
        }
    }

    #[must_use]
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    #[must_use]
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// First eight characters of an id, as shown in listings.
#[must_use]
pub fn short_id(id: &str) -> &str {
    let end = id.char_indices().nth(8).map_or(id.len(), |(i, _)| i);
    &id[..end]
}

/// Text counts as present only if something other than whitespace remains.
#[must_use]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_cycles_back_to_normal() {
        let p = Priority::Normal;
        assert_eq!(p.next(), Priority::Pending);
        assert_eq!(p.next().next(), Priority::Urgent);
        assert_eq!(p.next().next().next(), Priority::Normal);
        for p in Priority::ALL {
            assert_eq!(p.next().prev(), p);
        }
    }

    #[test]
    fn priority_parses_names_and_initials() {
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!(" Pending ".parse::<Priority>().unwrap(), Priority::Pending);
        assert_eq!("n".parse::<Priority>().unwrap(), Priority::Normal);
        assert!("later".parse::<Priority>().is_err());
    }

    #[test]
    fn new_task_defaults() {
        let t = Task::new("Buy milk");
        assert_eq!(t.text, "Buy milk");
        assert!(!t.completed);
        assert_eq!(t.priority, Priority::Normal);
        assert_eq!(t.short_id().len(), 8);
        assert_ne!(t.id, Task::new("Buy milk").id);
    }

    #[test]
    fn short_id_counts_chars_not_bytes() {
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("ééééééééé"), "éééééééé");
    }

    #[test]
    fn task_serializes_with_lowercase_priority() {
        let t = Task {
            id: "abc".to_owned(),
            text: "X".to_owned(),
            completed: true,
            priority: Priority::Urgent,
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"id": "abc", "text": "X", "completed": true, "priority": "urgent"})
        );
    }

    #[test]
    fn blank_text_detection() {
        assert!(is_blank(""));
        assert!(is_blank("  \t\n"));
        assert!(!is_blank(" a "));
    }
}
