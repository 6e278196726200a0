use proptest::prelude::*;

use simple_todo::task::model::Priority;
use simple_todo::task::storage::{FileStore, KeyValueStore, MemoryStore, TaskStorage};
use simple_todo::task::store::{Rejection, TaskStore};
use simple_todo::task::view::FilterMode;

fn open_dir(dir: &std::path::Path) -> TaskStore<FileStore> {
    TaskStore::open(TaskStorage::new(FileStore::new(dir.to_path_buf())))
}

#[test]
fn file_store_survives_restart() {
    let td = tempfile::tempdir().expect("tempdir");

    let mut store = open_dir(td.path());
    assert!(store.add("Buy milk").is_applied());
    assert!(store.add("Walk dog").is_applied());
    let milk = store.tasks()[0].id.clone();
    assert!(store.toggle(&milk).is_applied());
    assert!(store.cycle_priority(&store.tasks()[1].id.clone()).is_applied());
    assert!(store.last_persist_error().is_none());
    let before = store.tasks().to_vec();
    drop(store);

    let store = open_dir(td.path());
    assert_eq!(store.tasks(), before.as_slice());
    assert!(store.draft().is_none());
    assert_eq!(store.filter(), FilterMode::All);
    assert_eq!(store.view().summary(), "1 tasks remaining • 2 total tasks");
}

#[test]
fn edit_round_trip_through_disk() {
    let td = tempfile::tempdir().expect("tempdir");
    let mut store = open_dir(td.path());
    let _ = store.add("draft me");
    let id = store.tasks()[0].id.clone();

    assert!(store.start_edit(&id).is_applied());
    assert!(store.update_draft_text("   ").is_applied());
    assert_eq!(store.commit_edit().rejection(), Some(Rejection::EmptyText));
    assert!(store.update_draft_text("edited").is_applied());
    assert!(store.update_draft_priority(Priority::Urgent).is_applied());
    assert!(store.commit_edit().is_applied());

    let reopened = open_dir(td.path());
    assert_eq!(reopened.tasks()[0].text, "edited");
    assert_eq!(reopened.tasks()[0].priority, Priority::Urgent);
}

#[test]
fn corrupt_file_starts_empty_and_is_overwritten() {
    let td = tempfile::tempdir().expect("tempdir");
    std::fs::write(td.path().join("todos.json"), "{not json").expect("write");

    let mut store = open_dir(td.path());
    assert!(store.tasks().is_empty());
    let _ = store.add("fresh");

    let raw = std::fs::read_to_string(td.path().join("todos.json")).expect("read");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
}

#[test]
fn clear_all_persists_empty_array() {
    let td = tempfile::tempdir().expect("tempdir");
    let mut store = open_dir(td.path());
    let _ = store.add("X");
    let _ = store.add("Y");
    let _ = store.clear_all();

    let files = FileStore::new(td.path().to_path_buf());
    assert_eq!(files.get("todos").expect("get").as_deref(), Some(&b"[]"[..]));
    assert!(open_dir(td.path()).tasks().is_empty());
}

#[test]
fn unwritable_dir_keeps_memory_state() {
    let td = tempfile::tempdir().expect("tempdir");
    // A regular file where the data directory should be.
    let blocked = td.path().join("blocked");
    std::fs::write(&blocked, "").expect("write");

    let mut store = open_dir(&blocked);
    assert!(store.add("still here").is_applied());
    assert_eq!(store.tasks().len(), 1);
    assert!(store.last_persist_error().is_some());
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Toggle(usize),
    Delete(usize),
    Cycle(usize),
    Edit(usize, String),
    Clear,
    Filter(FilterMode),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[ a-z]{0,6}".prop_map(Op::Add),
        2 => (0usize..8).prop_map(Op::Toggle),
        1 => (0usize..8).prop_map(Op::Delete),
        2 => (0usize..8).prop_map(Op::Cycle),
        1 => ((0usize..8), "[ a-z]{0,6}").prop_map(|(i, s)| Op::Edit(i, s)),
        1 => Just(Op::Clear),
        1 => prop_oneof![
            Just(FilterMode::All),
            Just(FilterMode::Active),
            Just(FilterMode::Completed)
        ]
        .prop_map(Op::Filter),
    ]
}

fn nth_id(store: &TaskStore<MemoryStore>, i: usize) -> String {
    store
        .tasks()
        .get(i)
        .map_or_else(|| "missing".to_owned(), |t| t.id.clone())
}

proptest! {
    #[test]
    fn invariants_hold_after_any_sequence(ops in prop::collection::vec(op(), 0..40)) {
        let files = MemoryStore::new();
        let mut store = TaskStore::open(TaskStorage::new(files.clone()));

        for op in ops {
            let _ = match op {
                Op::Add(text) => store.add(&text),
                Op::Toggle(i) => store.toggle(&nth_id(&store, i)),
                Op::Delete(i) => store.delete(&nth_id(&store, i)),
                Op::Cycle(i) => store.cycle_priority(&nth_id(&store, i)),
                Op::Edit(i, text) => {
                    let _ = store.start_edit(&nth_id(&store, i));
                    let _ = store.update_draft_text(text);
                    store.commit_edit()
                }
                Op::Clear => store.clear_all(),
                Op::Filter(f) => {
                    store.set_filter(f);
                    continue;
                }
            };

            let mut ids: Vec<&str> = store.tasks().iter().map(|t| t.id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), store.tasks().len());
            prop_assert!(store.tasks().iter().all(|t| !t.text.trim().is_empty()));

            let view = store.view();
            prop_assert_eq!(view.active_count + view.completed_count, view.total_count);
            prop_assert_eq!(view.total_count, store.tasks().len());
            prop_assert!(view.tasks.iter().all(|row| store.filter().matches(row.task)));
            prop_assert!(view.tasks.iter().all(|row| row.editable == !row.task.completed));
        }

        let reloaded = TaskStore::open(TaskStorage::new(files));
        prop_assert_eq!(reloaded.tasks(), store.tasks());
    }
}
