use crate::model::{Status, Task};

/// Emitted once per board mutation with a snapshot of every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasksChanged {
    pub tasks: Vec<Task>,
}

/// Requests raised by key handling and consumed by the app loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NewTask { status: Status },
    EditTask(Task),
    PromptDeleteTask(Task),
    SaveTask(Task),
    CancelEdit,
    TasksModified(TasksChanged),
}
