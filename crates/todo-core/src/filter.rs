use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
  #[default]
  All,
  Active,
  Completed
}

impl FilterMode {
  pub const ALL: [FilterMode; 3] = [
    FilterMode::All,
    FilterMode::Active,
    FilterMode::Completed
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | FilterMode::All => "all",
      | FilterMode::Active => "active",
      | FilterMode::Completed => {
        "completed"
      }
    }
  }

  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | FilterMode::All => true,
      | FilterMode::Active => {
        !task.completed
      }
      | FilterMode::Completed => {
        task.completed
      }
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(FilterMode::All),
      | "active" => {
        Ok(FilterMode::Active)
      }
      | "completed" => {
        Ok(FilterMode::Completed)
      }
      | other => Err(anyhow!(
        "unknown filter mode: {other} \
         (expected all, active or \
         completed)"
      ))
    }
  }
}

/// Order-preserving subsequence of
/// `source` whose tasks satisfy `mode`.
pub fn apply(
  mode: FilterMode,
  source: &[Task]
) -> Vec<Task> {
  if mode == FilterMode::All {
    return source.to_vec();
  }

  let out: Vec<Task> = source
    .iter()
    .filter(|task| mode.matches(task))
    .cloned()
    .collect();

  trace!(
    mode = %mode,
    input = source.len(),
    output = out.len(),
    "filtered tasks"
  );
  out
}
