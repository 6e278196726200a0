#![forbid(unsafe_code)]

pub mod model;
pub mod storage;
pub mod store;
pub mod view;

use crate::config::Config;
use crate::task::storage::{KeyValueStore, TaskStorage};
use crate::task::store::TaskStore;

/// Opens the task store over `store` using the configured slot key.
#[must_use]
pub fn open<S: KeyValueStore>(cfg: &Config, store: S) -> TaskStore<S> {
    TaskStore::open(TaskStorage::with_key(store, cfg.storage.key.clone()))
}
