use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::store::TodoStore;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    json: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            json: cfg.json_output(),
        })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            json: false,
        }
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn write_json<W: Write>(&self, mut out: W, store: &TodoStore) -> anyhow::Result<()> {
        let serialized = serde_json::to_string_pretty(&store.snapshot())?;
        writeln!(out, "{serialized}")?;
        Ok(())
    }

    /// Error banner, filtered table, edit line and footer.
    pub fn write_view<W: Write>(&self, mut out: W, store: &TodoStore) -> anyhow::Result<()> {
        if store.load_error() {
            let banner = format!("error: {}", store.error_message());
            writeln!(out, "{}", self.paint(&banner, "31"))?;
        }

        let headers = vec!["ID".to_string(), "Done".to_string(), "Title".to_string()];
        let mut rows = Vec::with_capacity(store.filtered_todos().len());
        for task in store.filtered_todos() {
            let done = if task.completed {
                self.paint("[x]", "32")
            } else {
                "[ ]".to_string()
            };
            let id = self.paint(&task.id.to_string(), "33");
            let marker = if store.selected_todo_id() == Some(task.id) {
                "*"
            } else {
                ""
            };
            rows.push(vec![format!("{id}{marker}"), done, task.title.clone()]);
        }

        write_table(&mut out, headers, rows)?;

        if let Some(id) = store.selected_todo_id() {
            writeln!(out, "editing {id}: {}", store.input_value())?;
        }

        let left = store.active_count();
        let noun = if left == 1 { "item" } else { "items" };
        writeln!(out, "{left} {noun} left (filter: {})", store.filter_state())?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Renderer, strip_ansi};
    use crate::filter::FilterMode;
    use crate::source::FetchOutcome;
    use crate::store::TodoStore;
    use crate::task::{Task, TaskId};

    fn render(store: &TodoStore) -> String {
        let mut buf = Vec::new();
        Renderer::plain().write_view(&mut buf, store).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn view_lists_filtered_tasks_with_footer() {
        let mut store = TodoStore::with_filter(FilterMode::Active);
        store.seed(FetchOutcome::Loaded(vec![
            Task::new(1, "buy milk", false),
            Task::new(2, "file taxes", true),
        ]));

        let text = render(&store);
        assert!(text.contains("buy milk"));
        assert!(!text.contains("file taxes"));
        assert!(text.ends_with("1 item left (filter: active)\n"));
    }

    #[test]
    fn view_shows_banner_and_edit_line() {
        let mut store = TodoStore::new();
        store.seed(FetchOutcome::Loaded(vec![Task::pending(4, "draft")]));
        store.begin_edit(TaskId(4)).unwrap();
        store.set_edited_title("final");
        store.seed(FetchOutcome::Failed("Unable to load todos".to_string()));

        let text = render(&store);
        assert!(text.starts_with("error: Unable to load todos\n"));
        assert!(text.contains("4*"));
        assert!(text.contains("editing 4: final"));
    }

    #[test]
    fn wide_titles_align_by_display_width() {
        let mut store = TodoStore::new();
        store.seed(FetchOutcome::Loaded(vec![
            Task::pending(1, "日本語"),
            Task::pending(22, "x"),
        ]));

        let text = render(&store);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID Done Title  ");
        assert_eq!(lines[2], "1  [ ]  日本語 ");
        assert_eq!(lines[3], "22 [ ]  x      ");
    }

    #[test]
    fn json_output_is_the_snapshot() {
        let mut store = TodoStore::new();
        store.seed(FetchOutcome::Loaded(vec![Task::pending(1, "A")]));
        let mut buf = Vec::new();
        Renderer::plain().write_json(&mut buf, &store).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["filtered_todos"][0]["title"], "A");
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
