use crate::model::Status;

pub const MIN_COLUMN_WIDTH: u16 = 30;

/// Picks the visible columns for `width` and splits the width between them.
///
/// The active column is always visible. Widths are handed out left to right as
/// `remaining / columns_left`, so they always sum to `width`.
pub fn columns(width: u16, active: Status, min_width: u16) -> Vec<(Status, u16)> {
    let total = Status::ALL.len();
    let visible = (width / min_width.max(1)).clamp(1, total as u16) as usize;

    let first = active.index().saturating_sub(visible - 1);
    let last = (first + visible - 1).min(total - 1);

    let mut remaining_width = width;
    let mut remaining_columns = (last - first + 1) as u16;
    let mut out = Vec::with_capacity(remaining_columns as usize);
    for status in &Status::ALL[first..=last] {
        let column_width = remaining_width / remaining_columns;
        remaining_width -= column_width;
        remaining_columns -= 1;
        out.push((*status, column_width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wide_terminal_shows_all_columns() {
        assert_eq!(
            columns(90, Status::Doing, MIN_COLUMN_WIDTH),
            vec![(Status::Todo, 30), (Status::Doing, 30), (Status::Done, 30)]
        );
    }

    #[test]
    fn narrow_terminal_shows_active_column_only() {
        assert_eq!(columns(40, Status::Doing, MIN_COLUMN_WIDTH), vec![(Status::Doing, 40)]);
        assert_eq!(columns(10, Status::Done, MIN_COLUMN_WIDTH), vec![(Status::Done, 10)]);
        assert_eq!(columns(0, Status::Todo, MIN_COLUMN_WIDTH), vec![(Status::Todo, 0)]);
    }

    #[test]
    fn two_columns_end_at_active() {
        assert_eq!(
            columns(61, Status::Done, MIN_COLUMN_WIDTH),
            vec![(Status::Doing, 30), (Status::Done, 31)]
        );
        assert_eq!(
            columns(61, Status::Todo, MIN_COLUMN_WIDTH),
            vec![(Status::Todo, 30), (Status::Doing, 31)]
        );
        assert_eq!(
            columns(60, Status::Doing, MIN_COLUMN_WIDTH),
            vec![(Status::Todo, 30), (Status::Doing, 30)]
        );
    }

    #[test]
    fn widths_always_sum_to_total() {
        for width in 0..200u16 {
            for active in Status::ALL {
                let cols = columns(width, active, MIN_COLUMN_WIDTH);
                assert_eq!(cols.iter().map(|(_, w)| *w).sum::<u16>(), width);
                assert!(cols.iter().any(|(s, _)| *s == active));
            }
        }
    }

    #[test]
    fn very_wide_terminal_caps_at_three() {
        let cols = columns(100, Status::Todo, MIN_COLUMN_WIDTH);
        assert_eq!(
            cols,
            vec![(Status::Todo, 33), (Status::Doing, 33), (Status::Done, 34)]
        );
    }
}
