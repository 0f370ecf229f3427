use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pomo", version, about = "Terminal kanban board for a work session")]
pub struct Cli {
    /// Session file to use instead of the discovered one
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project session file in the current directory
    Init,
    /// List tasks by column
    List {
        /// Only show one column (todo, doing, done)
        #[arg(long)]
        status: Option<String>,
    },
    /// Add a task
    Add {
        /// Short description shown on the board
        summary: String,
        /// Optional longer notes
        #[arg(long)]
        notes: Option<String>,
        /// Column to add to (defaults to todo)
        #[arg(long)]
        status: Option<String>,
    },
    /// Start a new session
    Start,
    /// End the running session
    Stop,
    /// Launch the interactive board
    Tui,
}
