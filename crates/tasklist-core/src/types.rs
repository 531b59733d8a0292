use serde::{Deserialize, Serialize};

use crate::ids::TaskId;

/// A single to-do entry. Only `completed` changes after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created_at: created_at.into(),
        }
    }
}

/// Trim user input; `None` when nothing is left.
pub fn normalize_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
