use crate::board::{Affordances, Board};
use crate::message::{Message, TasksChanged};
use crate::model::{generate_id, Session, Status, Task};
use crate::storage::{load_session, save_session, SessionLocation};
use crate::tasklist::truncate_text;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub fn run(session: Session, location: SessionLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    board: Board,
    session: Session,
    location: SessionLocation,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(TaskForm),
    Editing(TaskForm),
    ConfirmDelete(Task),
}

struct TaskForm {
    base: Option<Task>,
    status: Status,
    summary: FieldValue,
    notes: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Summary,
    Notes,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx - 1], col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        self.cursor = index_at_col(&self.value, line_starts[line_idx + 1], col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl TaskForm {
    fn new(status: Status) -> Self {
        TaskForm {
            base: None,
            status,
            summary: FieldValue::new(""),
            notes: FieldValue::new(""),
            field: FormField::Summary,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            base: Some(task.clone()),
            status: task.status,
            summary: FieldValue::new(&task.summary),
            notes: FieldValue::new(task.notes.as_deref().unwrap_or_default()),
            field: FormField::Summary,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            FormField::Summary => FormField::Notes,
            FormField::Notes => FormField::Summary,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Summary => &mut self.summary,
            FormField::Notes => &mut self.notes,
        }
    }

    /// Builds the task described by the form, keeping identity when editing.
    fn to_task(&self, existing: &[Task]) -> Result<Task> {
        let summary = self.summary.value.trim();
        if summary.is_empty() {
            return Err(anyhow!("summary is required"));
        }
        let notes = if self.notes.value.trim().is_empty() {
            None
        } else {
            Some(self.notes.value.clone())
        };
        Ok(match &self.base {
            Some(base) => Task {
                summary: summary.to_string(),
                notes,
                ..base.clone()
            },
            None => Task::new(generate_id(existing), self.status, summary.to_string(), notes),
        })
    }
}

impl App {
    fn new(session: Session, location: SessionLocation) -> Self {
        let (tx, rx) = mpsc::channel();
        let status = format!("Loaded session from {}", location.path.display());
        App {
            board: Board::new(session.tasks.clone()),
            session,
            location,
            tx,
            rx,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            let mut quit = false;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        quit = self.handle_key(key);
                    }
                }
            }
            self.process_messages();
            if quit {
                info!("quitting");
                return Ok(());
            }
        }
    }

    fn dispatch(&self, message: Message) {
        if self.tx.send(message).is_err() {
            warn!("message channel closed");
        }
    }

    fn notify(&self, change: Option<TasksChanged>) {
        if let Some(change) = change {
            self.dispatch(Message::TasksModified(change));
        }
    }

    fn process_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.update(message);
        }
    }

    fn update(&mut self, message: Message) {
        match message {
            Message::NewTask { status } => {
                self.board.set_status(status);
                self.mode = Mode::Creating(TaskForm::new(status));
                self.status = format!(
                    "New task in {} (Tab switch field, Enter/Ctrl+S save, Esc cancel)",
                    status
                );
            }
            Message::EditTask(task) => {
                self.status = format!("Editing {}", task.id);
                self.mode = Mode::Editing(TaskForm::from_task(&task));
            }
            Message::PromptDeleteTask(task) => {
                self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", task.id);
                self.mode = Mode::ConfirmDelete(task);
            }
            Message::SaveTask(task) => {
                self.mode = Mode::Normal;
                let editing = self.board.current_task().map(|t| t.id == task.id) == Some(true);
                let id = task.id.clone();
                let change = if editing {
                    self.status = format!("Updated {}", id);
                    self.board.set_current_task(task)
                } else {
                    self.status = format!("Created {}", id);
                    self.board.insert_task(task)
                };
                self.notify(change);
            }
            Message::CancelEdit => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            Message::TasksModified(change) => {
                self.session.tasks = change.tasks;
                self.persist(None);
            }
        }
    }

    /// Routes a key press. Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Normal);
        match mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Creating(mut form) => {
                self.handle_form_key(&mut form, key);
                self.mode = Mode::Creating(form);
            }
            Mode::Editing(mut form) => {
                self.handle_form_key(&mut form, key);
                self.mode = Mode::Editing(form);
            }
            Mode::ConfirmDelete(task) => {
                self.handle_confirm_key(task, key);
            }
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let change = match key.code {
            KeyCode::Up if shift => self.board.move_up(),
            KeyCode::Down if shift => self.board.move_down(),
            KeyCode::Left if shift => self.board.transfer_left(),
            KeyCode::Right if shift => self.board.transfer_right(),
            KeyCode::Char('K') => self.board.move_up(),
            KeyCode::Char('J') => self.board.move_down(),
            KeyCode::Char('H') | KeyCode::Char('<') => self.board.transfer_left(),
            KeyCode::Char('L') | KeyCode::Char('>') => self.board.transfer_right(),
            _ => return self.handle_command_key(key),
        };
        self.notify(change);
        false
    }

    fn handle_command_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('n') => self.dispatch(Message::NewTask {
                status: self.board.status(),
            }),
            KeyCode::Char('e') | KeyCode::Enter => match self.board.current_task() {
                Some(task) => self.dispatch(Message::EditTask(task.clone())),
                None => self.status = "No task selected to edit".into(),
            },
            KeyCode::Char('d') | KeyCode::Delete => match self.board.current_task() {
                Some(task) => self.dispatch(Message::PromptDeleteTask(task.clone())),
                None => self.status = "No task selected to delete".into(),
            },
            KeyCode::Char('s') => {
                self.session.start_now();
                self.persist(Some("Session started".into()));
            }
            KeyCode::Char('x') => {
                if self.session.end_now() {
                    self.persist(Some("Session ended".into()));
                } else {
                    self.status = "No running session".into();
                }
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Up | KeyCode::Char('k') => self.board.focus_up(),
            KeyCode::Down | KeyCode::Char('j') => self.board.focus_down(),
            KeyCode::Left | KeyCode::Char('h') => self.board.focus_left(),
            KeyCode::Right | KeyCode::Char('l') => self.board.focus_right(),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, form: &mut TaskForm, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.dispatch(Message::CancelEdit),
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Enter if form.field == FormField::Notes && !control => {
                form.active_field_mut().insert_char('\n')
            }
            KeyCode::Enter => self.submit(form),
            KeyCode::Char('s') if control => self.submit(form),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) if !control && !key.modifiers.contains(KeyModifiers::ALT) => {
                form.active_field_mut().insert_char(c)
            }
            _ => {}
        }
    }

    fn submit(&mut self, form: &TaskForm) {
        match form.to_task(&self.board.tasks()) {
            Ok(task) => self.dispatch(Message::SaveTask(task)),
            Err(err) => self.status = format!("Could not save: {}", err),
        }
    }

    fn handle_confirm_key(&mut self, task: Task, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let change = self.board.remove_selected();
                self.notify(change);
                self.status = format!("Deleted {}", task.id);
            }
            KeyCode::Char('n') | KeyCode::Esc => self.status = "Delete canceled".into(),
            _ => self.mode = Mode::ConfirmDelete(task),
        }
    }

    fn reload(&mut self) {
        match load_session(&self.location) {
            Ok(session) => {
                self.board.set_tasks(session.tasks.clone());
                self.session = session;
                self.status = format!("Reloaded {}", self.location.path.display());
            }
            Err(err) => {
                error!("failed to reload session: {:#}", err);
                self.status = format!("Reload failed: {:#}", err);
            }
        }
    }

    /// Saves the session; failures stay in the status line.
    fn persist(&mut self, message: Option<String>) {
        match save_session(&self.location, &self.session) {
            Ok(()) => {
                self.last_save = Instant::now();
                if let Some(message) = message {
                    self.status = message;
                }
            }
            Err(err) => {
                error!("failed to save session: {:#}", err);
                self.status = format!("Save failed: {:#}", err);
            }
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.board.render(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => draw_form(f, "New Task", form),
            Mode::Editing(form) => draw_form(f, "Edit Task", form),
            Mode::ConfirmDelete(task) => draw_confirm(f, task),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "pomo ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                session_label(&self.session),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(help_line(self.board.affordances()))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone()).wrap(Wrap { trim: true });
        f.render_widget(status, bottom[0]);

        let detail = self
            .board
            .current_task()
            .map(selected_task_detail)
            .unwrap_or_else(|| {
                Line::from(Span::styled(
                    "No selection",
                    Style::default().fg(Color::DarkGray),
                ))
            });
        f.render_widget(Paragraph::new(detail).wrap(Wrap { trim: true }), bottom[1]);
    }
}

fn session_label(session: &Session) -> String {
    match (session.start, session.end) {
        (None, _) => "session not started".to_string(),
        (Some(start), None) => format!("session running since {}", format_local(&start)),
        (Some(start), Some(end)) => format!(
            "session {} - {}",
            format_local(&start),
            format_local(&end)
        ),
    }
}

fn format_local(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%H:%M").to_string()
}

fn key_hint(
    key: &'static str,
    label: &'static str,
    color: Color,
    enabled: bool,
) -> [Span<'static>; 2] {
    let (key_style, label_style) = if enabled {
        (Style::default().fg(color), Style::default())
    } else {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    };
    [
        Span::styled(key, key_style),
        Span::styled(format!(" {}  ", label), label_style),
    ]
}

fn help_line(a: Affordances) -> Line<'static> {
    let mut spans = Vec::new();
    spans.extend(key_hint("↑↓ / k j", "select", Color::LightCyan, a.up || a.down));
    spans.extend(key_hint("←→ / h l", "column", Color::LightCyan, a.left || a.right));
    spans.extend(key_hint("K J", "reorder", Color::LightGreen, a.move_up || a.move_down));
    spans.extend(key_hint("H L", "move", Color::LightGreen, a.move_left || a.move_right));
    spans.extend(key_hint("n", "new", Color::LightMagenta, true));
    spans.extend(key_hint("e", "edit", Color::LightYellow, a.selection));
    spans.extend(key_hint("d", "delete", Color::LightRed, a.selection));
    spans.extend(key_hint("s/x", "start/stop", Color::LightBlue, true));
    spans.extend(key_hint("r", "reload", Color::LightBlue, true));
    spans.extend(key_hint("q", "quit", Color::LightRed, true));
    Line::from(spans)
}

fn draw_form(f: &mut ratatui::Frame<'_>, title: &str, form: &TaskForm) {
    let area = centered_rect(70, 50, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Summary",
        &form.summary,
        form.field == FormField::Summary,
    ));
    fields.extend(field_lines("Notes", &form.notes, form.field == FormField::Notes));
    fields.push(Line::from(""));
    fields.push(Line::from(Span::styled(
        format!(
            "Column: {} • Enter/Ctrl+S to save • Esc to cancel • Tab to switch • Enter adds newline in Notes",
            form.status
        ),
        Style::default().fg(Color::Gray),
    )));
    let dialog = Paragraph::new(fields)
        .block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_confirm(f: &mut ratatui::Frame<'_>, task: &Task) {
    let area = centered_rect(50, 30, f.size());
    let body = vec![
        Line::from(Span::styled(
            format!("Delete \"{}\"?", truncate_text(&task.summary, 40)),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
        Block::default()
            .title(Span::styled(
                "Confirm Delete",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightRed)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn prev_char(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts.iter().rposition(|start| *start <= cursor).unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn selected_task_detail(task: &Task) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("[{}] ", task.id), Style::default().fg(Color::DarkGray)),
        Span::styled(
            task.summary.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("updated {}", format_local(&task.updated_at)),
            Style::default().fg(Color::Gray),
        ),
    ];
    if let Some(notes) = &task.notes {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            notes.replace('\n', " "),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ));
    }
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
