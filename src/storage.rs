use crate::codec;
use crate::model::Session;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROJECT_DIR: &str = ".pomo";
const SESSION_FILE: &str = "session.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    Project,
    Global,
    Explicit,
}

impl SessionScope {
    pub fn label(self) -> &'static str {
        match self {
            SessionScope::Project => "project",
            SessionScope::Global => "global",
            SessionScope::Explicit => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionLocation {
    pub path: PathBuf,
    pub scope: SessionScope,
}

impl SessionLocation {
    pub fn explicit(path: PathBuf) -> Self {
        SessionLocation {
            path,
            scope: SessionScope::Explicit,
        }
    }
}

pub fn init_project_session() -> Result<SessionLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).context("failed to create .pomo directory")?;
    let location = SessionLocation {
        path: dir.join(SESSION_FILE),
        scope: SessionScope::Project,
    };
    if !location.path.exists() {
        save_session(&location, &Session::default())?;
    }
    Ok(location)
}

pub fn locate_session(start: &Path) -> Result<SessionLocation> {
    if let Some(project_path) = find_project_session(start) {
        return Ok(SessionLocation {
            path: project_path,
            scope: SessionScope::Project,
        });
    }
    Ok(SessionLocation {
        path: data_dir()?.join(SESSION_FILE),
        scope: SessionScope::Global,
    })
}

/// Reads the session file; a missing file is an empty session.
pub fn load_session(location: &SessionLocation) -> Result<Session> {
    if !location.path.exists() {
        debug!(path = %location.path.display(), "no session file yet");
        return Ok(Session::default());
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    let session = codec::decode(&data)
        .with_context(|| format!("parsing session file {:?}", location.path))?;
    info!(
        path = %location.path.display(),
        tasks = session.tasks.len(),
        "loaded session"
    );
    Ok(session)
}

pub fn save_session(location: &SessionLocation, session: &Session) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = codec::encode(session).context("serializing session")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    debug!(
        path = %location.path.display(),
        tasks = session.tasks.len(),
        "saved session"
    );
    Ok(())
}

fn find_project_session(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(SESSION_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "pomo").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Status, Task};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_loads_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let location = SessionLocation::explicit(dir.path().join("none.yml"));
        assert_eq!(load_session(&location).unwrap(), Session::default());
    }

    #[test]
    fn save_then_load_preserves_session() {
        let dir = tempfile::tempdir().unwrap();
        let location = SessionLocation::explicit(dir.path().join("nested/session.yml"));
        let mut session = Session {
            tasks: vec![
                Task::new("a1".into(), Status::Doing, "write".into(), None),
                Task::new("b2".into(), Status::Todo, "plan".into(), Some("notes".into())),
            ],
            ..Session::default()
        };
        session.start_now();
        save_session(&location, &session).unwrap();
        assert_eq!(load_session(&location).unwrap(), session);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let location = SessionLocation::explicit(dir.path().join("session.yml"));
        fs::write(&location.path, "start: not-a-time\n").unwrap();
        let err = load_session(&location).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid start timestamp"));
    }

    #[test]
    fn project_session_found_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(PROJECT_DIR);
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join(SESSION_FILE), "").unwrap();
        let nested = dir.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let location = locate_session(&nested).unwrap();
        assert_eq!(location.scope, SessionScope::Project);
        assert_eq!(location.path, project.join(SESSION_FILE));
    }
}
