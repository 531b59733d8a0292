use crate::{ids::*, model::*, types::*};

/// Notifications emitted by the task store after a change has been committed
/// to both the backend and memory. Renderers subscribe to drive feedback such
/// as the "Added!" flash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskEvent {
    Loaded { backend: BackendKind, count: usize },
    TaskAdded { task: Task },
    TaskToggled { id: TaskId, completed: bool },
    TaskDeleted { id: TaskId },
    CompletedCleared { ids: Vec<TaskId> },
}
