use ratatui::text::Line;
use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Longest prefix of `text` that fits in `max_width` cells, with `...` when
/// something was cut and there is room for it.
pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }
    let budget = if max_width >= 4 { max_width - 3 } else { max_width };
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let width = char_display_width(ch);
        if used + width > budget {
            break;
        }
        out.push(ch);
        used += width;
    }
    if max_width >= 4 {
        out.push_str("...");
    }
    out
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

/// Horizontal window over a single-line prompt so the cursor stays visible.
/// Returns the visible slice and the cursor column inside it.
pub fn prompt_window(input: &str, cursor_byte: usize, width: usize) -> (String, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);
    let cursor_col = display_width(&input[..cursor_byte]);
    let skip = (cursor_col + 1).saturating_sub(width);

    let mut visible = String::new();
    let mut col = 0usize;
    let mut used = 0usize;
    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if col < skip {
            col += ch_width;
            continue;
        }
        if used + ch_width > width {
            break;
        }
        visible.push(ch);
        used += ch_width;
    }
    (visible, cursor_col.saturating_sub(skip).min(width - 1))
}

/// Rows `lines` occupy once wrapped at `width` cells.
pub fn wrapped_rows(lines: &[Line<'_>], width: usize) -> usize {
    let width = width.max(1);
    lines
        .iter()
        .map(|line| {
            let cells: usize = line
                .spans
                .iter()
                .map(|span| display_width(&span.content))
                .sum();
            cells.div_ceil(width).max(1)
        })
        .sum()
}
