use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::filter::FilterMode;
use crate::render::Renderer;
use crate::store::{ChangeKind, TodoStore};
use crate::task::TaskId;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list", "toggle", "edit", "type", "save", "cancel", "rename", "delete", "show", "json",
        "help", "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(Option<FilterMode>),
    Toggle(TaskId),
    Edit(TaskId),
    Type(String),
    Save,
    Cancel,
    Rename(TaskId, String),
    Delete(TaskId),
    Show,
    Json,
    Help,
    Quit,
}

impl Command {
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let Some((head, args)) = tokens.split_first() else {
            return Ok(Command::Show);
        };

        let lowered = head.to_ascii_lowercase();
        let known = known_command_names();
        let name = expand_command_abbrev(&lowered, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;

        let command = match name {
            "list" => match args.first() {
                Some(mode) => Command::List(Some(mode.parse()?)),
                None => Command::List(None),
            },
            "toggle" => Command::Toggle(require_id(name, args)?),
            "edit" => Command::Edit(require_id(name, args)?),
            "type" => Command::Type(args.join(" ")),
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "rename" => {
                let id = require_id(name, args)?;
                Command::Rename(id, args[1..].join(" "))
            }
            "delete" => Command::Delete(require_id(name, args)?),
            "show" => Command::Show,
            "json" => Command::Json,
            "help" => Command::Help,
            _ => Command::Quit,
        };

        debug!(?command, "parsed command");
        Ok(command)
    }
}

fn require_id(name: &str, args: &[String]) -> anyhow::Result<TaskId> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{name} requires a task id"))?;
    raw.parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Presentation-side driver: turns commands into store calls and renders
/// the result.
#[derive(Debug)]
pub struct Session {
    store: TodoStore,
    renderer: Renderer,
}

impl Session {
    pub fn new(store: TodoStore, renderer: Renderer) -> Self {
        Self { store, renderer }
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    pub fn into_store(self) -> TodoStore {
        self.store
    }

    #[instrument(skip(self, out))]
    pub fn execute<W: Write>(&mut self, command: Command, mut out: W) -> anyhow::Result<Flow> {
        match command {
            Command::List(mode) => {
                let mode = mode.unwrap_or(self.store.filter_state());
                self.store.refilter(mode);
            }
            Command::Toggle(id) => {
                self.store
                    .change_task_state(id, ChangeKind::ToggleCompletion)?;
            }
            Command::Edit(id) => self.store.begin_edit(id)?,
            Command::Type(text) => self.store.set_edited_title(text),
            Command::Save => {
                let id = self
                    .store
                    .selected_todo_id()
                    .ok_or_else(|| anyhow!("no task is being edited"))?;
                self.store.change_task_state(id, ChangeKind::TitleEdit)?;
            }
            Command::Cancel => self.store.cancel_edit(),
            Command::Rename(id, title) => {
                if self.store.task(id).is_none() {
                    return Err(anyhow!("cannot rename task {id}: no such task"));
                }
                self.store.set_edited_title(title);
                self.store.change_task_state(id, ChangeKind::TitleEdit)?;
            }
            Command::Delete(id) => self.store.change_task_state(id, ChangeKind::Delete)?,
            Command::Show => {}
            Command::Json => {
                self.renderer.write_json(&mut out, &self.store)?;
                return Ok(Flow::Continue);
            }
            Command::Help => {
                write_help(&mut out)?;
                return Ok(Flow::Continue);
            }
            Command::Quit => return Ok(Flow::Stop),
        }

        self.render(&mut out)?;
        Ok(Flow::Continue)
    }

    pub fn render<W: Write>(&self, out: W) -> anyhow::Result<()> {
        if self.renderer.json() {
            self.renderer.write_json(out, &self.store)
        } else {
            self.renderer.write_view(out, &self.store)
        }
    }

    /// Reads one command per line until EOF or `quit`. Command failures are
    /// reported and the loop keeps going.
    #[instrument(skip_all)]
    pub fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut out: W,
    ) -> anyhow::Result<()> {
        self.render(&mut out)?;

        for line in input.lines() {
            let line = line.context("failed to read command line")?;
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if tokens.is_empty() {
                continue;
            }

            let outcome = Command::parse(&tokens).and_then(|cmd| self.execute(cmd, &mut out));
            match outcome {
                Ok(Flow::Stop) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    warn!(error = %err, "command failed");
                    writeln!(out, "error: {err:#}")?;
                }
            }
        }

        info!("session finished");
        Ok(())
    }
}

fn write_help<W: Write>(mut out: W) -> anyhow::Result<()> {
    writeln!(out, "list [all|active|completed]  filter the list")?;
    writeln!(out, "toggle <id>                  flip completion")?;
    writeln!(out, "edit <id>                    start editing a title")?;
    writeln!(out, "type <text>                  set the edited title")?;
    writeln!(out, "save | cancel                finish or abandon the edit")?;
    writeln!(out, "rename <id> <text>           set a title directly")?;
    writeln!(out, "delete <id>                  remove a task")?;
    writeln!(out, "show | json | help | quit")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Command, Flow, Session, expand_command_abbrev, known_command_names};
    use crate::filter::FilterMode;
    use crate::render::Renderer;
    use crate::source::FetchOutcome;
    use crate::store::TodoStore;
    use crate::task::{Task, TaskId};

    fn tokens(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn session() -> Session {
        let mut store = TodoStore::new();
        store.seed(FetchOutcome::Loaded(vec![
            Task::new(1, "A", false),
            Task::new(2, "B", true),
        ]));
        Session::new(store, Renderer::plain())
    }

    #[test]
    fn abbreviations_expand_only_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("tog", &known), Some("toggle"));
        assert_eq!(expand_command_abbrev("s", &known), None);
        assert_eq!(expand_command_abbrev("sa", &known), Some("save"));
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse(&tokens("list completed")).unwrap(),
            Command::List(Some(FilterMode::Completed))
        );
        assert_eq!(
            Command::parse(&tokens("ren 3 new title")).unwrap(),
            Command::Rename(TaskId(3), "new title".to_string())
        );
        assert_eq!(Command::parse(&[]).unwrap(), Command::Show);
        assert!(Command::parse(&tokens("toggle")).is_err());
        assert!(Command::parse(&tokens("list someday")).is_err());
        assert!(Command::parse(&tokens("frobnicate")).is_err());
    }

    #[test]
    fn edit_type_save_renames_selected_task() {
        let mut session = session();
        let mut sink = Vec::new();
        for line in ["edit 1", "type Z", "save"] {
            let cmd = Command::parse(&tokens(line)).unwrap();
            session.execute(cmd, &mut sink).unwrap();
        }

        let store = session.store();
        assert_eq!(store.todos()[0].title, "Z");
        assert_eq!(store.selected_todo_id(), None);
    }

    #[test]
    fn save_without_selection_fails() {
        let mut session = session();
        assert!(session.execute(Command::Save, Vec::new()).is_err());
    }

    #[test]
    fn rename_of_missing_task_leaves_buffer_alone() {
        let mut session = session();
        let err = session
            .execute(Command::Rename(TaskId(9), "x".to_string()), Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("no such task"));
        assert_eq!(session.store().input_value(), "");
    }

    #[test]
    fn interactive_loop_reports_errors_and_stops_on_quit() {
        let mut session = session();
        let script = "list active\ntoggle 99\ntoggle 1\nquit\ndelete 2\n";
        let mut out = Vec::new();
        session.run_interactive(script.as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("error: cannot apply ToggleCompletion to task 99"));

        let store = session.into_store();
        assert!(store.todos()[0].completed);
        assert_eq!(store.todos().len(), 2);
        assert_eq!(store.filter_state(), FilterMode::Active);
        assert!(store.filtered_todos().is_empty());
    }

    #[test]
    fn quit_stops_without_rendering() {
        let mut session = session();
        let mut out = Vec::new();
        assert_eq!(session.execute(Command::Quit, &mut out).unwrap(), Flow::Stop);
        assert!(out.is_empty());
    }
}
