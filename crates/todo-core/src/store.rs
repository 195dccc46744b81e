use std::fmt;

use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::filter::{self, FilterMode};
use crate::source::FetchOutcome;
use crate::task::{Task, TaskId};

/// Mutation selector for [`TodoStore::change_task_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    TitleEdit,
    ToggleCompletion,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Serializable copy of everything a consumer can read from the store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub todos: Vec<Task>,
    pub filtered_todos: Vec<Task>,
    pub input_value: String,
    pub selected_todo_id: Option<TaskId>,
    pub filter_state: FilterMode,
    pub load_error: bool,
    pub error_message: String,
}

type Listener = Box<dyn FnMut(&StoreSnapshot)>;

/// Single owner of the task collection, its filtered view and the
/// transient UI state around it.
#[derive(Default)]
pub struct TodoStore {
    todos: Vec<Task>,
    filtered_todos: Vec<Task>,
    input_value: String,
    selected_todo_id: Option<TaskId>,
    filter_state: FilterMode,
    load_error: bool,
    error_message: String,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoStore")
            .field("todos", &self.todos)
            .field("filtered_todos", &self.filtered_todos)
            .field("input_value", &self.input_value)
            .field("selected_todo_id", &self.selected_todo_id)
            .field("filter_state", &self.filter_state)
            .field("load_error", &self.load_error)
            .field("error_message", &self.error_message)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mode: FilterMode) -> Self {
        Self {
            filter_state: mode,
            ..Self::default()
        }
    }

    /// Sets the current mode and publishes `source` filtered by it as the
    /// filtered view.
    #[tracing::instrument(skip(self, source), fields(mode = %mode, len = source.len()))]
    pub fn apply_filter(&mut self, mode: FilterMode, source: &[Task]) {
        self.filter_state = mode;
        self.filtered_todos = filter::apply(mode, source);
        debug!(visible = self.filtered_todos.len(), "filtered view published");
        self.notify();
    }

    /// [`Self::apply_filter`] over the live collection.
    pub fn refilter(&mut self, mode: FilterMode) {
        self.filter_state = mode;
        self.publish_view();
        self.notify();
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn change_task_state(&mut self, id: TaskId, kind: ChangeKind) -> anyhow::Result<()> {
        match kind {
            ChangeKind::ToggleCompletion => {
                let task = self.find_mut(id, kind)?;
                task.completed = !task.completed;
                debug!(completed = task.completed, "toggled task");
            }
            ChangeKind::TitleEdit => {
                let title = self.input_value.clone();
                let task = self.find_mut(id, kind)?;
                task.title = title;
                debug!(title = %task.title, "renamed task");
                self.selected_todo_id = None;
            }
            ChangeKind::Delete => {
                let before = self.todos.len();
                self.todos.retain(|task| task.id != id);
                debug!(removed = before - self.todos.len(), "deleted task");
            }
        }

        self.publish_view();
        self.notify();
        Ok(())
    }

    pub fn change_task(&mut self, task: &Task, kind: ChangeKind) -> anyhow::Result<()> {
        self.change_task_state(task.id, kind)
    }

    pub fn set_edited_title(&mut self, text: impl Into<String>) {
        self.input_value = text.into();
        self.notify();
    }

    /// Selects `id` for editing and primes the input buffer with its title.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn begin_edit(&mut self, id: TaskId) -> anyhow::Result<()> {
        let title = self
            .task(id)
            .map(|task| task.title.clone())
            .ok_or_else(|| anyhow!("cannot edit task {id}: no such task"))?;
        self.selected_todo_id = Some(id);
        self.input_value = title;
        self.notify();
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.selected_todo_id = None;
        self.input_value.clear();
        self.notify();
    }

    /// Applies the one-shot result of the fetch collaborator.
    #[tracing::instrument(skip(self, outcome))]
    pub fn seed(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Loaded(tasks) => {
                info!(count = tasks.len(), "seeding task collection");
                self.todos = tasks;
                self.load_error = false;
                self.error_message.clear();
                self.publish_view();
            }
            FetchOutcome::Failed(message) => {
                warn!(error = %message, "task load failed");
                self.load_error = true;
                self.error_message = message;
            }
        }
        self.notify();
    }

    pub fn clear_load_error(&mut self) {
        self.load_error = false;
        self.error_message.clear();
        self.notify();
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.todos.iter().find(|task| task.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|task| task.is_active()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.todos.len() - self.active_count()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreSnapshot) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            todos: self.todos.clone(),
            filtered_todos: self.filtered_todos.clone(),
            input_value: self.input_value.clone(),
            selected_todo_id: self.selected_todo_id,
            filter_state: self.filter_state,
            load_error: self.load_error,
            error_message: self.error_message.clone(),
        }
    }

    pub fn todos(&self) -> &[Task] {
        &self.todos
    }

    /// Replaces the collection without recomputing the filtered view.
    pub fn set_todos(&mut self, todos: Vec<Task>) {
        self.todos = todos;
        self.notify();
    }

    pub fn filtered_todos(&self) -> &[Task] {
        &self.filtered_todos
    }

    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    pub fn set_input_value(&mut self, value: impl Into<String>) {
        self.set_edited_title(value);
    }

    pub fn selected_todo_id(&self) -> Option<TaskId> {
        self.selected_todo_id
    }

    pub fn set_selected_todo_id(&mut self, id: Option<TaskId>) {
        self.selected_todo_id = id;
        self.notify();
    }

    pub fn filter_state(&self) -> FilterMode {
        self.filter_state
    }

    /// Records the mode without recomputing the filtered view.
    pub fn set_filter_state(&mut self, mode: FilterMode) {
        self.filter_state = mode;
        self.notify();
    }

    pub fn load_error(&self) -> bool {
        self.load_error
    }

    pub fn set_load_error(&mut self, value: bool) {
        self.load_error = value;
        self.notify();
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error_message = message.into();
        self.notify();
    }

    fn find_mut(&mut self, id: TaskId, kind: ChangeKind) -> anyhow::Result<&mut Task> {
        match self.todos.iter_mut().find(|task| task.id == id) {
            Some(task) => Ok(task),
            None => {
                warn!(id = %id, ?kind, "change requested for missing task");
                Err(anyhow!("cannot apply {kind:?} to task {id}: no such task"))
            }
        }
    }

    fn publish_view(&mut self) {
        self.filtered_todos = filter::apply(self.filter_state, &self.todos);
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}
