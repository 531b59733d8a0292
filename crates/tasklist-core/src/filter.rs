use serde::Serialize;

use crate::{FilterMode, Task};

/// Tally shown next to the filter buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// Pure view over a task list:
/// - `All` returns the list unchanged
/// - `Active` keeps tasks with `completed == false`
/// - `Completed` keeps tasks with `completed == true`
///
/// Order is preserved in every mode.
pub fn filter(tasks: &[Task], mode: FilterMode) -> Vec<Task> {
    tasks.iter().filter(|t| matches_mode(t, mode)).cloned().collect()
}

pub fn matches_mode(task: &Task, mode: FilterMode) -> bool {
    match mode {
        FilterMode::All => true,
        FilterMode::Active => !task.completed,
        FilterMode::Completed => task.completed,
    }
}

pub fn counts(tasks: &[Task]) -> Counts {
    let completed = tasks.iter().filter(|t| t.completed).count();
    Counts {
        total: tasks.len(),
        active: tasks.len() - completed,
        completed,
    }
}
