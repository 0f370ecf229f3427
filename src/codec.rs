//! YAML encoding of a [`Session`].
//!
//! Timestamps are written as RFC 3339 with fixed nanosecond precision in UTC.
//! An unset session timestamp is omitted from the document, and a missing or
//! empty field reads back as unset.

use crate::model::{Session, Status, Task, TaskId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid {field} timestamp {value:?}")]
    Format {
        field: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("malformed session document: {0}")]
    Structure(#[from] serde_yaml::Error),
}

#[derive(Serialize)]
struct EncodedSession<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    #[serde(skip_serializing_if = "<[Task]>::is_empty")]
    tasks: &'a [Task],
}

#[derive(Deserialize)]
struct DecodedSession {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    tasks: Option<Vec<DecodedTask>>,
}

#[derive(Deserialize)]
struct DecodedTask {
    id: TaskId,
    status: Status,
    summary: String,
    #[serde(default)]
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DecodedTask {
    fn into_task(self, index: usize) -> Result<Task, CodecError> {
        Ok(Task {
            created_at: parse_required(format!("tasks[{}].created_at", index), &self.created_at)?,
            updated_at: parse_required(format!("tasks[{}].updated_at", index), &self.updated_at)?,
            id: self.id,
            status: self.status,
            summary: self.summary,
            notes: self.notes,
        })
    }
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, CodecError> {
    match raw {
        Some(r) if !r.is_empty() => parse_required(field.to_string(), r).map(Some),
        _ => Ok(None),
    }
}

fn parse_required(field: String, raw: &str) -> Result<DateTime<Utc>, CodecError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| CodecError::Format {
            field,
            value: raw.to_string(),
            source,
        })
}

pub fn encode(session: &Session) -> Result<String, CodecError> {
    let doc = EncodedSession {
        start: session.start.as_ref().map(format_time),
        end: session.end.as_ref().map(format_time),
        tasks: &session.tasks,
    };
    Ok(serde_yaml::to_string(&doc)?)
}

pub fn decode(text: &str) -> Result<Session, CodecError> {
    if text.trim().is_empty() {
        return Ok(Session::default());
    }
    // A bare `~` or `---` document is null, same as an empty file.
    let doc: DecodedSession = match serde_yaml::from_str::<Option<DecodedSession>>(text)? {
        Some(doc) => doc,
        None => return Ok(Session::default()),
    };
    let tasks = doc
        .tasks
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, task)| task.into_task(index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Session {
        start: parse_time("start", doc.start.as_deref())?,
        end: parse_time("end", doc.end.as_deref())?,
        tasks,
    })
}

/// Writes a task timestamp in the same format as the session's.
pub fn serialize_time<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time(time))
}
