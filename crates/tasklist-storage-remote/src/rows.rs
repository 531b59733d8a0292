use serde::{Deserialize, Serialize};
use tasklist_core::{Task, TaskId};

/// Row shape of the remote `tasks` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            text: row.text,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

/// Insert payload; the table assigns `id`.
#[derive(Debug, Serialize)]
pub(crate) struct NewRow<'a> {
    pub text: &'a str,
    pub completed: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletedPatch {
    pub completed: bool,
}

/// `eq.` takes everything after the operator as the value, so the id goes out
/// bare. Quoting would become part of the compared literal.
pub(crate) fn eq_filter(id: &TaskId) -> String {
    format!("eq.{id}")
}

/// Opaque ids are double-quoted inside `in.(...)` so commas or parentheses
/// cannot break the list.
pub(crate) fn in_filter<'a>(ids: impl IntoIterator<Item = &'a TaskId>) -> String {
    let list: Vec<String> = ids.into_iter().map(list_literal).collect();
    format!("in.({})", list.join(","))
}

fn list_literal(id: &TaskId) -> String {
    match id {
        TaskId::Int(n) => n.to_string(),
        TaskId::Opaque(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_is_bare_and_in_lists_quote_opaque_ids() {
        assert_eq!(eq_filter(&TaskId::Int(12)), "eq.12");
        assert_eq!(
            eq_filter(&TaskId::from("3f1c9a2e-1111-2222-3333-444455556666")),
            "eq.3f1c9a2e-1111-2222-3333-444455556666"
        );
        assert_eq!(eq_filter(&TaskId::from("a,b")), "eq.a,b");
        assert_eq!(in_filter(&[TaskId::Int(1), TaskId::Int(2)]), "in.(1,2)");
        assert_eq!(in_filter(&[TaskId::from("x\"y")]), "in.(\"x\\\"y\")");
    }

    #[test]
    fn row_decodes_numeric_and_uuid_ids() {
        let rows: Vec<TaskRow> = serde_json::from_str(
            r#"[
                {"id": 5, "text": "a", "completed": false, "created_at": "2024-01-02T00:00:00+00:00"},
                {"id": "9b2e", "text": "b", "completed": true, "created_at": "2024-01-01T00:00:00+00:00"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows[0].id, TaskId::Int(5));
        assert_eq!(rows[1].id, TaskId::from("9b2e"));

        let task: Task = rows[1].clone().into();
        assert!(task.completed);
        assert_eq!(task.created_at, "2024-01-01T00:00:00+00:00");
    }
}
