use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use panelstream::api::logging::init_logging;
use panelstream::app::{build_runtime, PanelMode};
use panelstream::config::Config;
use panelstream::runtime::frontend::{FrontendAdapter, ScrollAction, UserInputEvent};
use panelstream::runtime::mode::RuntimeMode;
use panelstream::terminal::TerminalGuard;
use panelstream::ui::input_metrics::{clamp_to_char_boundary_left, wrapped_rows};
use panelstream::ui::layout::split_panel_layout;
use panelstream::ui::render::{render_hint, render_input, render_panel, render_status_line};
use ratatui::widgets::Clear;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Single-line prompt editor.
#[derive(Debug, Default)]
struct PromptLine {
    buffer: String,
    cursor: usize,
}

impl PromptLine {
    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn prev_boundary(&self, idx: usize) -> usize {
        let idx = clamp_to_char_boundary_left(&self.buffer, idx);
        self.buffer[..idx]
            .char_indices()
            .next_back()
            .map(|(start, _)| start)
            .unwrap_or(0)
    }

    fn next_boundary(&self, idx: usize) -> usize {
        let idx = clamp_to_char_boundary_left(&self.buffer, idx);
        self.buffer[idx..]
            .chars()
            .next()
            .map(|ch| idx + ch.len_utf8())
            .unwrap_or(self.buffer.len())
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        // The prompt is a single line; pasted newlines become spaces.
        let value = value.replace(['\r', '\n'], " ");
        self.buffer.insert_str(cursor, &value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_boundary(end);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete(&mut self) {
        let start = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        let end = self.next_boundary(start);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.buffer).trim().to_string()
    }
}

/// Translates one key press. Editing keys update `prompt` and yield nothing.
fn map_key(
    prompt: &mut PromptLine,
    key: KeyEvent,
    retry_available: bool,
    page_rows: usize,
) -> Option<UserInputEvent> {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if control => Some(UserInputEvent::Interrupt),
        KeyCode::Esc => Some(UserInputEvent::Cancel),
        KeyCode::Tab => Some(UserInputEvent::FocusNext),
        KeyCode::BackTab => Some(UserInputEvent::FocusPrev),
        KeyCode::PageUp => Some(UserInputEvent::Scroll(ScrollAction::PageUp(page_rows))),
        KeyCode::PageDown => Some(UserInputEvent::Scroll(ScrollAction::PageDown(page_rows))),
        KeyCode::Up => Some(UserInputEvent::Scroll(ScrollAction::LineUp)),
        KeyCode::Down => Some(UserInputEvent::Scroll(ScrollAction::LineDown)),
        KeyCode::Home if control => Some(UserInputEvent::Scroll(ScrollAction::Home)),
        KeyCode::End if control => Some(UserInputEvent::Scroll(ScrollAction::End)),
        KeyCode::Home => {
            prompt.cursor = 0;
            None
        }
        KeyCode::End => {
            prompt.cursor = prompt.buffer.len();
            None
        }
        KeyCode::Left => {
            prompt.cursor = prompt.prev_boundary(prompt.cursor);
            None
        }
        KeyCode::Right => {
            prompt.cursor = prompt.next_boundary(prompt.cursor);
            None
        }
        KeyCode::Backspace => {
            prompt.backspace();
            None
        }
        KeyCode::Delete => {
            prompt.delete();
            None
        }
        KeyCode::Enter => {
            let query = prompt.take();
            if query.is_empty() {
                Some(UserInputEvent::Activate)
            } else {
                Some(UserInputEvent::Text(query))
            }
        }
        KeyCode::Char('r') if prompt.is_empty() && retry_available => Some(UserInputEvent::Retry),
        KeyCode::Char(ch) if !control && !key.modifiers.contains(KeyModifiers::ALT) => {
            prompt.insert_str(ch.encode_utf8(&mut [0; 4]));
            None
        }
        _ => None,
    }
}

struct ManagedTuiFrontend {
    guard: TerminalGuard,
    quit: bool,
    prompt: PromptLine,
    page_rows: usize,
}

impl ManagedTuiFrontend {
    fn new() -> Result<Self> {
        let guard = TerminalGuard::enter().context("failed to set up terminal")?;
        Ok(Self {
            guard,
            quit: false,
            prompt: PromptLine::default(),
            page_rows: 10,
        })
    }
}

impl FrontendAdapter<PanelMode> for ManagedTuiFrontend {
    fn poll_user_input(&mut self, mode: &PanelMode) -> Option<UserInputEvent> {
        if mode.quit_requested() {
            self.quit = true;
            return None;
        }

        let Ok(has_event) = event::poll(POLL_INTERVAL) else {
            self.quit = true;
            return None;
        };
        if !has_event {
            return None;
        }
        let Ok(ev) = event::read() else {
            self.quit = true;
            return None;
        };

        match ev {
            Event::Key(key) if key.kind != KeyEventKind::Release => map_key(
                &mut self.prompt,
                key,
                mode.retry_available(),
                self.page_rows,
            ),
            Event::Paste(text) => {
                self.prompt.insert_str(&text);
                None
            }
            _ => None,
        }
    }

    fn render(&mut self, mode: &PanelMode) {
        let panel = mode.panel();
        let status = mode.status_line(&panel);
        let error = mode.error();
        let theme = mode.theme();
        let input = self.prompt.buffer.as_str();
        let cursor = self.prompt.cursor;
        let mut page_rows = self.page_rows;

        let _ = self.guard.terminal_mut().draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let hint_rows = if error.is_some() { 2 } else { 1 };
            let panes = split_panel_layout(area, hint_rows);
            page_rows = panes.panel.height.max(1) as usize;

            let total_rows = wrapped_rows(&panel.lines, panes.panel.width as usize);
            let scroll = mode.scroll().min(total_rows.saturating_sub(page_rows));

            render_status_line(frame, panes.status, &status, theme);
            render_panel(frame, panes.panel, panel.lines, scroll);
            render_hint(frame, panes.hint, error, theme);
            render_input(frame, panes.input, input, cursor);
        });
        self.page_rows = page_rows;
    }

    fn should_quit(&self) -> bool {
        self.quit
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let config = Config::load()?;

    let (mut runtime, mut ctx) = build_runtime(config)?;
    let mut frontend = ManagedTuiFrontend::new()?;
    tracing::info!("panel ready");
    runtime.run(&mut frontend, &mut ctx).await;
    Ok(())
}
