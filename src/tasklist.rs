use crate::model::{Status, Task};
use ratatui::prelude::{Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use ratatui::Frame;

/// One kanban column: an ordered run of tasks plus a cursor.
///
/// The cursor is `None` only while the column is empty or has never been
/// focused; otherwise it always points at a task.
#[derive(Debug, Clone)]
pub struct TaskList {
    status: Status,
    tasks: Vec<Task>,
    cursor: Option<usize>,
    offset: usize,
}

impl TaskList {
    pub fn new(status: Status, tasks: Vec<Task>) -> Self {
        TaskList {
            status,
            tasks,
            cursor: None,
            offset: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn selection(&self) -> Option<&Task> {
        self.cursor.and_then(|i| self.tasks.get(i))
    }

    pub fn focus(&mut self) {
        self.cursor = match self.cursor {
            Some(i) if i < self.tasks.len() => Some(i),
            _ if self.tasks.is_empty() => None,
            _ => Some(0),
        };
    }

    pub fn up(&mut self) -> bool {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    pub fn down(&mut self) -> bool {
        match self.cursor {
            Some(i) if i + 1 < self.tasks.len() => {
                self.cursor = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn move_up(&mut self) -> bool {
        match self.cursor {
            Some(i) if i > 0 && i < self.tasks.len() => {
                self.tasks.swap(i, i - 1);
                self.cursor = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    pub fn move_down(&mut self) -> bool {
        match self.cursor {
            Some(i) if i + 1 < self.tasks.len() => {
                self.tasks.swap(i, i + 1);
                self.cursor = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    pub fn insert_select(&mut self, index: usize, task: Task) {
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);
        self.cursor = Some(index);
    }

    pub fn append_select(&mut self, task: Task) {
        self.tasks.push(task);
        self.cursor = Some(self.tasks.len() - 1);
    }

    /// Removes the selected task. The cursor stays put, clamped to the
    /// shorter list.
    pub fn remove(&mut self) -> Option<Task> {
        let index = self.cursor.filter(|&i| i < self.tasks.len())?;
        let task = self.tasks.remove(index);
        self.cursor = if self.tasks.is_empty() {
            None
        } else {
            Some(index.min(self.tasks.len() - 1))
        };
        Some(task)
    }

    pub fn set_selection(&mut self, task: Task) -> bool {
        match self.cursor.and_then(|i| self.tasks.get_mut(i)) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.cursor = None;
        self.offset = 0;
    }

    pub fn render(&mut self, f: &mut Frame<'_>, area: Rect, focused: bool) {
        let accent = color_for_status(self.status);
        let item_width = area.width.saturating_sub(2) as usize;
        let items = self
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| task_item(task, item_width, focused && Some(idx) == self.cursor))
            .collect::<Vec<_>>();

        let viewport = area.height.saturating_sub(2) as usize / ITEM_HEIGHT;
        let mut state = ListState::default();
        if focused {
            if let Some(sel) = self.cursor {
                self.offset = adjust_offset(sel, self.offset, viewport, self.tasks.len());
                state.select(Some(sel));
            }
        }
        *state.offset_mut() = self.offset.min(self.tasks.len().saturating_sub(1));

        let title = format!("{} ({})", self.status.label(), self.tasks.len());
        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(accent).add_modifier(if focused {
                    Modifier::BOLD | Modifier::UNDERLINED
                } else {
                    Modifier::BOLD
                }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if focused { accent } else { Color::DarkGray }));

        f.render_stateful_widget(List::new(items).block(block), area, &mut state);
    }
}

const ITEM_HEIGHT: usize = 2;

fn color_for_status(status: Status) -> Color {
    match status {
        Status::Todo => Color::Cyan,
        Status::Doing => Color::LightYellow,
        Status::Done => Color::LightGreen,
    }
}

fn task_item(task: &Task, width: usize, selected: bool) -> ListItem<'static> {
    let marker = if selected { "▌" } else { " " };
    let summary = truncate_text(&task.summary, width.saturating_sub(2));
    let detail = task
        .notes
        .as_deref()
        .and_then(|n| n.lines().next())
        .map(|n| truncate_text(n, width.saturating_sub(2)))
        .unwrap_or_default();
    let lines = vec![
        Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::LightYellow)),
            Span::raw(" "),
            Span::styled(summary, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(detail, Style::default().fg(Color::DarkGray)),
        ]),
    ];
    let style = if selected {
        Style::default().bg(Color::Rgb(40, 44, 56)).fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    };
    ListItem::new(lines).style(style)
}

fn adjust_offset(selected: usize, current_offset: usize, viewport: usize, len: usize) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let mut offset = current_offset.min(max_offset);
    if selected < offset {
        offset = selected;
    } else if selected >= offset + viewport {
        offset = selected + 1 - viewport;
    }
    offset
}

pub fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&".".repeat(max - keep));
    out
}
