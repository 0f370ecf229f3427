use crate::layout::{self, MIN_COLUMN_WIDTH};
use crate::message::TasksChanged;
use crate::model::{Status, Task};
use crate::tasklist::TaskList;
use ratatui::prelude::Rect;
use ratatui::Frame;
use tracing::{debug, info};

/// The three-column kanban board.
///
/// Every task lives in the column matching its `status`; only the board moves
/// tasks between columns. Exactly one column is active, and only it receives
/// navigation.
#[derive(Debug, Clone)]
pub struct Board {
    active: Status,
    columns: [TaskList; 3],
    width: u16,
    height: u16,
}

/// Which navigation and move keys currently do something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub selection: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
}

enum Placement {
    Front,
    Back,
}

impl Board {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut board = Board {
            active: Status::Todo,
            columns: Status::ALL.map(|status| TaskList::new(status, Vec::new())),
            width: 0,
            height: 0,
        };
        board.partition(tasks);
        board
    }

    fn partition(&mut self, tasks: Vec<Task>) {
        let mut by_status: [Vec<Task>; 3] = Default::default();
        for task in tasks {
            by_status[task.status.index()].push(task);
        }
        for (column, tasks) in self.columns.iter_mut().zip(by_status) {
            column.set_tasks(tasks);
        }
        self.active_mut().focus();
    }

    fn active_mut(&mut self) -> &mut TaskList {
        &mut self.columns[self.active.index()]
    }

    fn active_column(&self) -> &TaskList {
        &self.columns[self.active.index()]
    }

    fn changed(&self) -> TasksChanged {
        TasksChanged {
            tasks: self.tasks(),
        }
    }

    pub fn status(&self) -> Status {
        self.active
    }

    pub fn column(&self, status: Status) -> &TaskList {
        &self.columns[status.index()]
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn visible_columns(&self) -> Vec<(Status, u16)> {
        layout::columns(self.width, self.active, MIN_COLUMN_WIDTH)
    }

    pub fn set_status(&mut self, status: Status) {
        if status == self.active {
            return;
        }
        self.active = status;
        self.active_mut().focus();
    }

    pub fn focus_up(&mut self) {
        self.active_mut().up();
    }

    pub fn focus_down(&mut self) {
        self.active_mut().down();
    }

    pub fn focus_left(&mut self) {
        if let Some(status) = self.active.prev() {
            self.set_status(status);
        }
    }

    pub fn focus_right(&mut self) {
        if let Some(status) = self.active.next() {
            self.set_status(status);
        }
    }

    #[must_use]
    pub fn move_up(&mut self) -> Option<TasksChanged> {
        self.active_mut().move_up().then(|| self.changed())
    }

    #[must_use]
    pub fn move_down(&mut self) -> Option<TasksChanged> {
        self.active_mut().move_down().then(|| self.changed())
    }

    /// Sends the selected task one column toward `Todo`, to the front.
    #[must_use]
    pub fn transfer_left(&mut self) -> Option<TasksChanged> {
        let dest = self.active.prev()?;
        self.transfer(dest, Placement::Front)
    }

    /// Sends the selected task one column toward `Done`, to the back.
    #[must_use]
    pub fn transfer_right(&mut self) -> Option<TasksChanged> {
        let dest = self.active.next()?;
        self.transfer(dest, Placement::Back)
    }

    fn transfer(&mut self, dest: Status, placement: Placement) -> Option<TasksChanged> {
        let mut task = self.active_mut().remove()?;
        let from = self.active;
        self.set_status(dest);
        task.status = dest;
        task.touch();
        info!(task = %task.id, from = from.id(), to = dest.id(), "task transferred");
        match placement {
            Placement::Front => self.active_mut().insert_select(0, task),
            Placement::Back => self.active_mut().append_select(task),
        }
        Some(self.changed())
    }

    #[must_use]
    pub fn insert_task(&mut self, mut task: Task) -> Option<TasksChanged> {
        task.status = self.active;
        debug!(task = %task.id, status = task.status.id(), "task inserted");
        self.active_mut().append_select(task);
        Some(self.changed())
    }

    /// Replaces the selected task with an edited copy.
    #[must_use]
    pub fn set_current_task(&mut self, mut task: Task) -> Option<TasksChanged> {
        self.current_task()?;
        task.status = self.active;
        task.touch();
        debug!(task = %task.id, "task updated");
        self.active_mut().set_selection(task).then(|| self.changed())
    }

    #[must_use]
    pub fn remove_selected(&mut self) -> Option<TasksChanged> {
        let task = self.active_mut().remove()?;
        info!(task = %task.id, "task removed");
        Some(self.changed())
    }

    /// Replaces every column's contents, keeping the active status.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.partition(tasks);
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.active_column().selection()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks().iter().cloned())
            .collect()
    }

    pub fn affordances(&self) -> Affordances {
        let column = self.active_column();
        let index = column.index();
        let selection = column.selection().is_some();
        let up = matches!(index, Some(i) if i > 0);
        let down = matches!(index, Some(i) if i + 1 < column.len());
        let left = self.active.prev().is_some();
        let right = self.active.next().is_some();
        Affordances {
            up,
            down,
            left,
            right,
            selection,
            move_up: selection && up,
            move_down: selection && down,
            move_left: selection && left,
            move_right: selection && right,
        }
    }

    pub fn render(&mut self, f: &mut Frame<'_>, area: Rect) {
        self.set_size(area.width, area.height);
        let mut x = area.x;
        for (status, width) in self.visible_columns() {
            let rect = Rect::new(x, area.y, width, self.height);
            x += width;
            self.columns[status.index()].render(f, rect, status == self.active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn task(id: &str, status: Status) -> Task {
        Task::new(id.into(), status, format!("task {}", id), None)
    }

    fn sample() -> Vec<Task> {
        vec![
            task("d1", Status::Done),
            task("t1", Status::Todo),
            task("g1", Status::Doing),
            task("t2", Status::Todo),
            task("d2", Status::Done),
            task("t3", Status::Todo),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn column_ids(board: &Board, status: Status) -> Vec<&str> {
        ids(board.column(status).tasks())
    }

    fn selected(board: &Board) -> Option<&str> {
        board.current_task().map(|t| t.id.as_str())
    }

    fn assert_ownership(board: &Board) {
        for status in Status::ALL {
            assert!(board
                .column(status)
                .tasks()
                .iter()
                .all(|t| t.status == status));
        }
    }

    #[test]
    fn construction_partitions_by_status() {
        let board = Board::new(sample());
        assert_eq!(board.status(), Status::Todo);
        assert_eq!(column_ids(&board, Status::Todo), vec!["t1", "t2", "t3"]);
        assert_eq!(column_ids(&board, Status::Doing), vec!["g1"]);
        assert_eq!(column_ids(&board, Status::Done), vec!["d1", "d2"]);
        assert_eq!(ids(&board.tasks()), vec!["t1", "t2", "t3", "g1", "d1", "d2"]);
        assert_eq!(selected(&board), Some("t1"));
        assert_eq!(board.column(Status::Doing).index(), None);
        assert_ownership(&board);
    }

    #[test]
    fn empty_board_has_no_selection() {
        let mut board = Board::new(Vec::new());
        assert_eq!(board.current_task(), None);
        board.focus_down();
        board.focus_up();
        assert!(board.move_up().is_none());
        assert!(board.transfer_right().is_none());
        assert!(board.remove_selected().is_none());
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn vertical_focus_stops_at_edges() {
        let mut board = Board::new(sample());
        board.focus_up();
        assert_eq!(selected(&board), Some("t1"));
        board.focus_down();
        board.focus_down();
        board.focus_down();
        assert_eq!(selected(&board), Some("t3"));
    }

    #[test]
    fn horizontal_focus_is_clamped_and_keeps_cursor() {
        let mut board = Board::new(sample());
        board.focus_left();
        assert_eq!(board.status(), Status::Todo);
        board.focus_down();
        board.focus_right();
        board.focus_right();
        assert_eq!(board.status(), Status::Done);
        assert_eq!(selected(&board), Some("d1"));
        board.focus_down();
        board.focus_right();
        assert_eq!(board.status(), Status::Done);
        assert_eq!(selected(&board), Some("d2"));
        board.focus_left();
        board.focus_left();
        assert_eq!(selected(&board), Some("t2"));
    }

    #[test]
    fn navigation_never_leaves_bounds() {
        let mut board = Board::new(sample());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            match rng.gen_range(0..4) {
                0 => board.focus_up(),
                1 => board.focus_down(),
                2 => board.focus_left(),
                _ => board.focus_right(),
            }
            let column = board.column(board.status());
            match column.index() {
                Some(i) => assert!(i < column.len()),
                None => assert!(column.is_empty()),
            }
        }
        assert_eq!(board.tasks().len(), 6);
    }

    #[test]
    fn move_within_column_reorders_and_notifies() {
        let mut board = Board::new(sample());
        assert!(board.move_up().is_none());
        let change = board.move_down().expect("moved");
        assert_eq!(ids(&change.tasks)[..3].to_vec(), vec!["t2", "t1", "t3"]);
        assert_eq!(selected(&board), Some("t1"));
        board.focus_down();
        assert!(board.move_down().is_none());
    }

    #[test]
    fn transfer_right_appends_and_selects() {
        let mut board = Board::new(sample());
        let change = board.transfer_right().expect("transferred");
        assert_eq!(board.status(), Status::Doing);
        assert_eq!(column_ids(&board, Status::Doing), vec!["g1", "t1"]);
        assert_eq!(selected(&board), Some("t1"));
        assert_eq!(board.current_task().map(|t| t.status), Some(Status::Doing));
        assert_eq!(change.tasks, board.tasks());
        assert_ownership(&board);
    }

    #[test]
    fn transfer_right_then_left_lands_at_front() {
        let mut board = Board::new(sample());
        board.focus_down();
        let before = board.current_task().unwrap().updated_at;
        board.transfer_right().unwrap();
        let middle = board.current_task().unwrap().updated_at;
        board.transfer_left().unwrap();
        let after = board.current_task().unwrap().updated_at;

        assert_eq!(board.status(), Status::Todo);
        assert_eq!(column_ids(&board, Status::Todo), vec!["t2", "t1", "t3"]);
        assert_eq!(selected(&board), Some("t2"));
        assert!(middle > before);
        assert!(after > middle);
        assert_ownership(&board);
    }

    #[test]
    fn transfer_past_edges_keeps_task() {
        let mut board = Board::new(sample());
        assert!(board.transfer_left().is_none());
        board.set_status(Status::Done);
        assert!(board.transfer_right().is_none());
        assert_eq!(column_ids(&board, Status::Done), vec!["d1", "d2"]);
        assert_eq!(selected(&board), Some("d1"));
        assert_eq!(board.tasks().len(), 6);
    }

    #[test]
    fn insert_task_uses_active_status() {
        let mut board = Board::new(sample());
        board.focus_right();
        let change = board.insert_task(task("n1", Status::Done)).expect("inserted");
        assert_eq!(column_ids(&board, Status::Doing), vec!["g1", "n1"]);
        assert_eq!(selected(&board), Some("n1"));
        assert_eq!(board.current_task().map(|t| t.status), Some(Status::Doing));
        assert_eq!(change.tasks.len(), 7);
    }

    #[test]
    fn set_current_task_replaces_selection() {
        let mut board = Board::new(sample());
        let mut edited = board.current_task().cloned().unwrap();
        let stamp = edited.updated_at;
        edited.summary = "renamed".into();
        edited.status = Status::Done;
        let change = board.set_current_task(edited).expect("updated");
        let current = board.current_task().unwrap();
        assert_eq!(current.summary, "renamed");
        assert_eq!(current.status, Status::Todo);
        assert!(current.updated_at > stamp);
        assert_eq!(change.tasks.len(), 6);

        let mut empty = Board::new(Vec::new());
        assert!(empty.set_current_task(task("x", Status::Todo)).is_none());
        assert!(empty.tasks().is_empty());
    }

    #[test]
    fn remove_selected_moves_cursor_to_neighbour() {
        let mut board = Board::new(sample());
        board.focus_down();
        let change = board.remove_selected().expect("removed");
        assert_eq!(change.tasks.len(), 5);
        assert_eq!(column_ids(&board, Status::Todo), vec!["t1", "t3"]);
        assert_eq!(selected(&board), Some("t3"));
    }

    #[test]
    fn remove_on_empty_column_is_noop() {
        let mut board = Board::new(vec![task("t1", Status::Todo)]);
        board.focus_right();
        assert!(board.remove_selected().is_none());
        assert_eq!(board.tasks().len(), 1);
    }

    #[test]
    fn set_tasks_keeps_active_status() {
        let mut board = Board::new(sample());
        board.focus_right();
        board.focus_right();
        board.focus_down();
        board.set_tasks(vec![task("a", Status::Done), task("b", Status::Done)]);
        assert_eq!(board.status(), Status::Done);
        assert_eq!(selected(&board), Some("a"));
        assert!(board.column(Status::Todo).is_empty());
        assert_eq!(board.column(Status::Todo).index(), None);
    }

    #[test]
    fn affordances_follow_state() {
        let mut board = Board::new(sample());
        let a = board.affordances();
        assert!(!a.up && a.down && !a.left && a.right);
        assert!(a.selection && !a.move_up && a.move_down && !a.move_left && a.move_right);

        board.set_tasks(vec![task("d", Status::Done)]);
        let a = board.affordances();
        assert!(!a.selection && !a.move_right && a.right);
    }

    fn render(board: &mut Board, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| {
                let area = f.size();
                board.render(f, area);
            })
            .unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn render_shows_visible_columns_only() {
        let mut board = Board::new(sample());
        let wide = render(&mut board, 90, 10);
        assert!(wide.contains("To Do (3)"));
        assert!(wide.contains("Doing (1)"));
        assert!(wide.contains("Done (2)"));
        assert_eq!(board.visible_columns().len(), 3);

        let narrow = render(&mut board, 40, 10);
        assert!(narrow.contains("To Do (3)"));
        assert!(!narrow.contains("Doing"));
        assert!(narrow.contains("task t1"));
        assert_eq!(board.visible_columns(), vec![(Status::Todo, 40)]);
    }
}
