#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TodoError;
use crate::task::storage::KeyValueStore;

pub const THEME_KEY: &str = "todo-theme";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(TodoError::Other(format!(
                "invalid theme '{other}' (expected light or dark)"
            ))),
        }
    }
}

/// Remembers the chosen theme in its own slot, next to the task data.
#[derive(Debug, Clone)]
pub struct ThemeStore<S> {
    store: S,
    fallback: Theme,
}

impl<S: KeyValueStore> ThemeStore<S> {
    #[must_use]
    pub fn new(store: S, fallback: Theme) -> Self {
        Self { store, fallback }
    }

    #[must_use]
    pub fn load(&self) -> Theme {
        let raw = match self.store.get(THEME_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.fallback,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "failed to read theme");
                return self.fallback;
            }
        };
        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring malformed theme");
            self.fallback
        })
    }

    pub fn save(&self, theme: Theme) -> anyhow::Result<()> {
        let data = serde_json::to_vec(&theme)?;
        self.store.set(THEME_KEY, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::storage::MemoryStore;

    #[test]
    fn falls_back_when_absent_or_malformed() {
        let store = MemoryStore::new();
        let themes = ThemeStore::new(store.clone(), Theme::Dark);
        assert_eq!(themes.load(), Theme::Dark);

        store.set(THEME_KEY, b"\"sepia\"").unwrap();
        assert_eq!(themes.load(), Theme::Dark);
    }

    #[test]
    fn saves_and_reloads() {
        let store = MemoryStore::new();
        let themes = ThemeStore::new(store.clone(), Theme::Light);
        themes.save(Theme::Dark).unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some(&b"\"dark\""[..]));
        assert_eq!(ThemeStore::new(store, Theme::Light).load(), Theme::Dark);
    }

    #[test]
    fn toggles_and_parses() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("blue".parse::<Theme>().is_err());
    }
}
