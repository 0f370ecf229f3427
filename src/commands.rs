use crate::board::Board;
use crate::codec::format_time;
use crate::model::{generate_id, Session, Status, Task};
use crate::storage::{
    init_project_session, load_session, locate_session, save_session, SessionLocation,
};
use crate::ui;
use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::PathBuf;

pub fn init() -> Result<()> {
    let location = init_project_session()?;
    println!("Initialized session at {}", location.path.display());
    Ok(())
}

pub fn list(file: Option<PathBuf>, status: Option<String>) -> Result<()> {
    let (session, location) = load_current_session(file)?;
    let filter = status.as_deref().map(parse_status).transpose()?;
    println!("Session: {} ({})", location.path.display(), location.scope.label());
    if let Some(start) = &session.start {
        println!("started {}", format_time(start));
    }
    if let Some(end) = &session.end {
        println!("ended   {}", format_time(end));
    }
    println!();

    let board = Board::new(session.tasks);
    for status in Status::ALL {
        if filter.is_some_and(|f| f != status) {
            continue;
        }
        let column = board.column(status);
        println!("{}", status.label());
        if column.is_empty() {
            println!("  (empty)");
        }
        for task in column.tasks() {
            print_task(task);
        }
        println!();
    }
    Ok(())
}

pub fn add(
    file: Option<PathBuf>,
    summary: String,
    notes: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let (mut session, location) = load_current_session(file)?;
    let status = match status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => Status::Todo,
    };
    let summary = summary.trim().to_string();
    if summary.is_empty() {
        bail!("summary must not be empty");
    }

    let id = generate_id(&session.tasks);
    let mut board = Board::new(std::mem::take(&mut session.tasks));
    board.set_status(status);
    let change = board.insert_task(Task::new(id.clone(), status, summary, notes));
    session.tasks = change.map(|c| c.tasks).unwrap_or_else(|| board.tasks());
    save_session(&location, &session)?;
    println!("Added task {} to {}", id, status.id());
    Ok(())
}

pub fn start(file: Option<PathBuf>) -> Result<()> {
    let (mut session, location) = load_current_session(file)?;
    session.start_now();
    save_session(&location, &session)?;
    println!("Session started");
    Ok(())
}

pub fn stop(file: Option<PathBuf>) -> Result<()> {
    let (mut session, location) = load_current_session(file)?;
    if !session.end_now() {
        bail!("no running session");
    }
    save_session(&location, &session)?;
    println!("Session ended");
    Ok(())
}

pub fn tui(file: Option<PathBuf>) -> Result<()> {
    let (session, location) = load_current_session(file)?;
    ui::run(session, location)
}

fn load_current_session(file: Option<PathBuf>) -> Result<(Session, SessionLocation)> {
    let location = match file {
        Some(path) => SessionLocation::explicit(path),
        None => locate_session(&env::current_dir()?)?,
    };
    let session = load_session(&location)?;
    Ok((session, location))
}

fn parse_status(raw: &str) -> Result<Status> {
    Status::parse(raw).ok_or_else(|| anyhow!("unknown status {:?} (use todo, doing or done)", raw))
}

fn print_task(task: &Task) {
    println!("  - {}: {}", task.id, task.summary);
    if let Some(notes) = &task.notes {
        for line in notes.lines() {
            println!("    {}", line);
        }
    }
    println!("    updated {}", format_time(&task.updated_at));
}
