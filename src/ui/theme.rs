use ratatui::style::{Color, Modifier, Style};

/// Visual configuration handed to the tree renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub positive: Color,
    pub negative: Color,
    pub warning: Color,
    pub info: Color,
    pub focus: Color,
    /// Cells used by bar and progress tracks.
    pub bar_width: usize,
    pub indent_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            text: Color::White,
            muted: Color::DarkGray,
            positive: Color::Green,
            negative: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            focus: Color::Magenta,
            bar_width: 20,
            indent_width: 2,
        }
    }
}

impl Theme {
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn control_style(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(Color::Black)
                .bg(self.focus)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::UNDERLINED)
        }
    }

    /// Color for a semantic variant name (`success`, `warning`, ...).
    pub fn variant_color(&self, variant: &str) -> Color {
        match variant.trim().to_ascii_lowercase().as_str() {
            "success" | "positive" | "good" => self.positive,
            "error" | "danger" | "destructive" | "negative" => self.negative,
            "warning" | "warn" | "caution" => self.warning,
            "info" | "information" | "note" => self.info,
            "muted" | "secondary" | "outline" => self.muted,
            _ => self.accent,
        }
    }
}
