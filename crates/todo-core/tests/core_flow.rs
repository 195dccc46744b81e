use std::fs;

use tempfile::tempdir;
use todo_core::filter::FilterMode;
use todo_core::source::{FetchOutcome, FileSource, fetch_once};
use todo_core::store::{ChangeKind, TodoStore};
use todo_core::task::{Task, TaskId};

#[test]
fn seed_from_file_then_filter_toggle_rename_delete() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("todos.jsonl");
    fs::write(
        &path,
        "{\"id\":1,\"title\":\"A\",\"completed\":false}\n\
         {\"id\":2,\"title\":\"B\",\"completed\":true}\n\
         {\"id\":3,\"title\":\"C\",\"completed\":false}\n",
    )
    .expect("write seed file");

    let mut store = TodoStore::new();
    store.seed(fetch_once(&FileSource::new(&path)));
    assert!(!store.load_error());
    assert_eq!(store.filtered_todos().len(), 3);

    let source = store.todos().to_vec();
    store.apply_filter(FilterMode::Completed, &source);
    assert_eq!(store.filtered_todos(), &[Task::new(2, "B", true)]);

    store
        .change_task_state(TaskId(1), ChangeKind::ToggleCompletion)
        .expect("toggle existing task");
    let visible: Vec<u64> = store.filtered_todos().iter().map(|t| t.id.0).collect();
    assert_eq!(visible, vec![1, 2]);

    store.begin_edit(TaskId(3)).expect("edit existing task");
    store.set_edited_title("C, revised");
    store
        .change_task_state(TaskId(3), ChangeKind::TitleEdit)
        .expect("rename existing task");
    assert_eq!(store.todos()[2].title, "C, revised");
    assert_eq!(store.selected_todo_id(), None);

    store
        .change_task_state(TaskId(2), ChangeKind::Delete)
        .expect("delete existing task");
    assert!(store.todos().iter().all(|t| t.id != TaskId(2)));
    assert!(store.filtered_todos().iter().all(|t| t.id != TaskId(2)));
    let remaining: Vec<u64> = store.todos().iter().map(|t| t.id.0).collect();
    assert_eq!(remaining, vec![1, 3]);

    // Nothing is written back to the seed file.
    let on_disk = fs::read_to_string(&path).expect("read seed file");
    assert!(on_disk.contains("\"title\":\"B\""));
}

#[test]
fn unreadable_seed_sets_load_error() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("broken.json");
    fs::write(&path, "[{\"id\":1,").expect("write seed file");

    let mut store = TodoStore::new();
    let outcome = fetch_once(&FileSource::new(&path));
    assert!(matches!(outcome, FetchOutcome::Failed(_)));
    store.seed(outcome);

    assert!(store.load_error());
    assert!(store.error_message().contains("broken.json"));
    assert!(store.todos().is_empty());
    assert!(store.filtered_todos().is_empty());
}

#[test]
fn toggling_an_absent_task_is_an_error() {
    let mut store = TodoStore::new();
    store.seed(FetchOutcome::Loaded(vec![Task::pending(1, "A")]));

    let missing = Task::pending(99, "ghost");
    assert!(
        store
            .change_task(&missing, ChangeKind::ToggleCompletion)
            .is_err()
    );
    assert_eq!(store.todos(), &[Task::pending(1, "A")]);
}
