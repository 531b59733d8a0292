use std::fmt::Write as _;

use tasklist_core::{Counts, FilterMode, Task, TaskError, TaskEvent};

/// Make user text safe to print: control characters (ESC above all, which
/// starts terminal escape sequences) are shown as `\u{..}` / `\n` literals.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// `all` decides between "nothing at all" and "nothing in this filter".
pub fn render_list(all: &[Task], visible: &[Task], mode: FilterMode) -> String {
    if all.is_empty() {
        return "No tasks yet\n  Add your first task with `tasklist add <text>`\n".to_string();
    }
    if visible.is_empty() {
        return match mode {
            FilterMode::Active => "No active tasks\n".to_string(),
            FilterMode::Completed => "No completed tasks\n".to_string(),
            FilterMode::All => String::new(),
        };
    }

    let width = visible.iter().map(|t| t.id.to_string().len()).max().unwrap_or(0);
    let mut out = String::new();
    for t in visible {
        let mark = if t.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "[{mark}] {:<width$}  {}", t.id.to_string(), escape(&t.text));
    }
    out
}

pub fn render_counts(c: Counts) -> String {
    format!("All: {}  Active: {}  Completed: {}", c.total, c.active, c.completed)
}

/// Validation problems are input feedback; backend failures are errors.
pub fn render_error(err: &TaskError) -> String {
    match err {
        TaskError::Validation => "Please enter a task (text cannot be empty)".to_string(),
        TaskError::BackendUnavailable { .. } => format!("error: {err}. Check your connection."),
    }
}

/// One-line feedback for an event, if the renderer shows anything for it.
pub fn render_event(event: &TaskEvent) -> Option<String> {
    match event {
        TaskEvent::TaskAdded { task } => Some(format!("Added! ({})", task.id)),
        TaskEvent::CompletedCleared { ids } => Some(format!("Cleared {} completed task(s)", ids.len())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklist_core::{BackendKind, TaskId};

    fn task(id: i64, text: &str, completed: bool) -> Task {
        Task {
            id: TaskId::Int(id),
            text: text.to_string(),
            completed,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn escape_neutralizes_control_sequences() {
        assert_eq!(escape("plain <b>text</b>"), "plain <b>text</b>");
        assert_eq!(escape("\u{1b}[31mred"), "\\u{1b}[31mred");
        assert_eq!(escape("a\nb"), "a\\nb");
    }

    #[test]
    fn empty_list_and_empty_filter_messages_differ() {
        assert!(render_list(&[], &[], FilterMode::All).starts_with("No tasks yet"));

        let all = vec![task(1, "a", false)];
        assert_eq!(render_list(&all, &[], FilterMode::Completed), "No completed tasks\n");
        assert_eq!(render_list(&all, &[], FilterMode::Active), "No active tasks\n");
    }

    #[test]
    fn rows_show_checkbox_id_and_escaped_text() {
        let all = vec![task(12, "done", true), task(3, "to\u{7}do", false)];
        let out = render_list(&all, &all, FilterMode::All);
        assert_eq!(out, "[x] 12  done\n[ ] 3   to\\u{7}do\n");
    }

    #[test]
    fn counts_line() {
        let c = Counts { total: 3, active: 2, completed: 1 };
        assert_eq!(render_counts(c), "All: 3  Active: 2  Completed: 1");
    }

    #[test]
    fn errors_are_worded_for_the_user() {
        assert!(render_error(&TaskError::Validation).starts_with("Please enter a task"));
        let err = TaskError::unavailable(BackendKind::Remote, "connection refused");
        assert_eq!(
            render_error(&err),
            "error: remote backend unavailable: connection refused. Check your connection."
        );
    }
}
