mod board;
mod cli;
mod codec;
mod commands;
mod layout;
mod message;
mod model;
mod storage;
mod tasklist;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();
    let args = cli::Cli::parse();
    let file = args.file;
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { status } => commands::list(file, status),
        cli::Command::Add {
            summary,
            notes,
            status,
        } => commands::add(file, summary, notes, status),
        cli::Command::Start => commands::start(file),
        cli::Command::Stop => commands::stop(file),
        cli::Command::Tui => commands::tui(file),
    }
}

/// Logs go to `pomo.log` in the data directory since the TUI owns the terminal.
fn init_logging() {
    let filter = EnvFilter::try_from_env("POMO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let log_file = storage::data_dir().ok().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("pomo.log"))
            .ok()
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);
    let result = match log_file {
        Some(file) => builder.with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(io::sink).try_init(),
    };
    if let Err(err) = result {
        eprintln!("pomo: logging disabled: {}", err);
    }
}
