use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelLayout {
    pub status: Rect,
    pub panel: Rect,
    /// Key hints, or the error banner after a failed turn.
    pub hint: Rect,
    pub input: Rect,
}

pub fn split_panel_layout(area: Rect, hint_rows: u16) -> PanelLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(hint_rows),
            Constraint::Length(1),
        ])
        .split(area);

    PanelLayout {
        status: chunks[0],
        panel: chunks[1],
        hint: chunks[2],
        input: chunks[3],
    }
}
