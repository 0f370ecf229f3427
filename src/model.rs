use crate::codec::serialize_time;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TaskId = String;

const ID_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    Doing,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::Doing, Status::Done];

    pub fn index(self) -> usize {
        match self {
            Status::Todo => 0,
            Status::Doing => 1,
            Status::Done => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Status> {
        Status::ALL.get(index).copied()
    }

    pub fn prev(self) -> Option<Status> {
        self.index().checked_sub(1).and_then(Status::from_index)
    }

    pub fn next(self) -> Option<Status> {
        Status::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::Doing => "Doing",
            Status::Done => "Done",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::Doing => "doing",
            Status::Done => "done",
        }
    }

    pub fn parse(input: &str) -> Option<Status> {
        Status::ALL
            .into_iter()
            .find(|s| s.id().eq_ignore_ascii_case(input.trim()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub status: Status,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(serialize_with = "serialize_time")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_time")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, status: Status, summary: String, notes: Option<String>) -> Self {
        let now = Utc::now();
        Task {
            id,
            status,
            summary,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    /// Stamps `updated_at`, never moving it backwards or leaving it unchanged.
    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at + Duration::nanoseconds(1);
        self.updated_at = now.max(floor);
    }
}

/// A work session: optional start/end plus the tasks tracked during it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
}

impl Session {
    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn start_now(&mut self) {
        self.start = Some(Utc::now());
        self.end = None;
    }

    /// Ends a running session. Returns false if nothing was running.
    pub fn end_now(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.end = Some(Utc::now());
        true
    }
}

pub fn generate_id(existing: &[Task]) -> TaskId {
    loop {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        if !existing.iter().any(|t| t.id == id) {
            return id;
        }
    }
}
