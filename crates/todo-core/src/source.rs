use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use crate::task::Task;

/// Upstream collaborator that supplies the initial task list.
pub trait TaskSource {
    fn fetch(&self) -> anyhow::Result<Vec<Task>>;

    fn describe(&self) -> String;
}

/// Result of the one-shot fetch, delivered to the store as a single update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(Vec<Task>),
    Failed(String),
}

#[tracing::instrument(skip(source), fields(source = %source.describe()))]
pub fn fetch_once(source: &dyn TaskSource) -> FetchOutcome {
    let result = source.fetch().and_then(|tasks| {
        ensure_unique_ids(&tasks)?;
        Ok(tasks)
    });

    match result {
        Ok(tasks) => {
            info!(count = tasks.len(), "fetched tasks");
            FetchOutcome::Loaded(tasks)
        }
        Err(err) => {
            let detail = format!("{err:#}");
            warn!(error = %detail, "fetching tasks failed");
            FetchOutcome::Failed(format!("Unable to load todos: {detail}"))
        }
    }
}

/// Reads tasks from a JSON array or from JSON lines.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for FileSource {
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    fn fetch(&self) -> anyhow::Result<Vec<Task>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        parse_tasks(&text).with_context(|| format!("failed parsing {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tasks: Vec<Task>,
}

impl StaticSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

impl TaskSource for StaticSource {
    fn fetch(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn describe(&self) -> String {
        format!("static ({} tasks)", self.tasks.len())
    }
}

pub fn parse_tasks(text: &str) -> anyhow::Result<Vec<Task>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let tasks: Vec<Task> =
            serde_json::from_str(trimmed).context("invalid task array")?;
        debug!(count = tasks.len(), "parsed task array");
        return Ok(tasks);
    }

    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid task on line {}", idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "parsed task lines");
    Ok(out)
}

fn ensure_unique_ids(tasks: &[Task]) -> anyhow::Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(anyhow!("duplicate task id {}", task.id));
        }
    }
    Ok(())
}
