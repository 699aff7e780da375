use crate::state::SessionStatus;
use crate::ui::input_metrics::{prompt_window, truncate_to_display_width};
use crate::ui::theme::Theme;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

pub const IDLE_HINT: &str =
    "enter send/activate · tab focus · pgup/pgdn scroll · esc cancel · ctrl-c ×2 quit";

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let width = area.width.saturating_sub(2).max(1) as usize;
    let (visible, cursor_col) = prompt_window(input, cursor_byte, width);

    frame.render_widget(
        Paragraph::new(Line::from(format!("> {visible}"))).style(
            Style::default()
                .fg(Color::Gray)
                .bg(Color::Rgb(24, 24, 24)),
        ),
        area,
    );
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, area.y));
}

pub fn render_panel(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>, scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll.min(u16::MAX as usize) as u16, 0)),
        area,
    );
}

pub fn status_text(status: SessionStatus, focus: Option<(usize, usize)>, notice: Option<&str>) -> String {
    let mut text = format!("panelstream · {}", status.label());
    if let Some((index, total)) = focus {
        text.push_str(&format!(" · control {}/{}", index + 1, total));
    }
    if let Some(notice) = notice {
        text.push_str(" · ");
        text.push_str(notice);
    }
    text
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(truncate_to_display_width(status, area.width as usize))
            .style(theme.muted_style()),
        area,
    );
}

/// Error banner with the retry affordance, or the key hints when there is
/// no error.
pub fn render_hint(frame: &mut Frame<'_>, area: Rect, error: Option<&str>, theme: &Theme) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let lines = match error {
        Some(message) => vec![
            Line::from(Span::styled(
                truncate_to_display_width(&format!("✖ {message}"), width),
                Style::default()
                    .fg(theme.negative)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "press r on an empty prompt to retry",
                theme.muted_style(),
            )),
        ],
        None => vec![Line::from(Span::styled(
            truncate_to_display_width(IDLE_HINT, width),
            theme.muted_style(),
        ))],
    };
    frame.render_widget(Paragraph::new(lines), area);
}
