use crate::error::RenderError;
use crate::state::InteractionState;
use crate::types::panel::value_as_f64;
use crate::types::{Feedback, UiAction, UiSpec, UiSpecNode};
use crate::ui::input_metrics::display_width;
use crate::ui::theme::Theme;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use serde_json::{json, Map, Value};

const DEFAULT_FEEDBACK_PROMPT: &str = "Was this helpful?";
const MISSING_VALUE: &str = "—";

/// Focusable element of a rendered panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub node_id: String,
    pub label: String,
    pub action: UiAction,
    /// Index into `RenderedPanel::lines`.
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct RenderedPanel {
    pub lines: Vec<Line<'static>>,
    pub controls: Vec<Control>,
    pub issues: Vec<RenderError>,
}

impl RenderedPanel {
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    pub fn plain_text(&self) -> String {
        self.plain_lines().join("\n")
    }

    pub fn control(&self, index: usize) -> Option<&Control> {
        self.controls.get(index)
    }
}

/// Renders `spec` against the current interaction state. `focus` is the
/// index of the highlighted control, if any.
pub fn render_spec(
    spec: &UiSpec,
    state: &InteractionState,
    theme: &Theme,
    focus: Option<usize>,
) -> RenderedPanel {
    let mut renderer = TreeRenderer::new(state, theme, focus);
    if let Some(title) = spec.title.as_deref().filter(|title| !title.trim().is_empty()) {
        renderer.push(0, vec![Span::styled(title.to_string(), renderer.theme.title_style())]);
    }
    if let Some(description) = spec.description.as_deref() {
        renderer.push_text(0, description, renderer.theme.muted_style());
    }
    if spec.title.is_some() || spec.description.is_some() {
        renderer.blank();
    }
    if spec.components.is_empty() {
        renderer.push_text(0, "(empty panel)", renderer.theme.muted_style());
    }
    for node in &spec.components {
        renderer.render_node(node, 0);
    }
    renderer.out
}

/// Panel shown before any spec has parsed: a placeholder plus the raw
/// renderable text received so far.
pub fn render_pending(renderable: &str, streaming: bool, theme: &Theme) -> RenderedPanel {
    let state = InteractionState::new();
    let mut renderer = TreeRenderer::new(&state, theme, None);
    let headline = if streaming {
        "Generating panel..."
    } else {
        "No panel to display"
    };
    renderer.push_text(0, headline, theme.muted_style().add_modifier(Modifier::ITALIC));
    if !renderable.trim().is_empty() {
        renderer.blank();
        renderer.push_text(0, renderable, theme.muted_style());
    }
    renderer.out
}

struct TreeRenderer<'a> {
    state: &'a InteractionState,
    theme: &'a Theme,
    focus: Option<usize>,
    out: RenderedPanel,
}

impl<'a> TreeRenderer<'a> {
    fn new(state: &'a InteractionState, theme: &'a Theme, focus: Option<usize>) -> Self {
        Self {
            state,
            theme,
            focus,
            out: RenderedPanel::default(),
        }
    }

    fn render_node(&mut self, node: &UiSpecNode, depth: usize) {
        match node.node_type.as_str() {
            "text" => self.text(node, depth),
            "heading" => self.heading(node, depth),
            "paragraph" => self.paragraph(node, depth),
            "list" => self.list(node, depth),
            "alert" => self.alert(node, depth),
            "card" => self.collapsible(node, depth, "Card"),
            "section" => self.collapsible(node, depth, "Section"),
            "grid" => self.grid(node, depth),
            "badge" => self.badge(node, depth),
            "progress" => self.progress(node, depth),
            "chart" => self.chart(node, depth),
            "button" => self.button(node, depth),
            "metric" => self.metric(node, depth),
            "feedback" => self.feedback(node, depth),
            "insight" => self.insight(node, depth),
            "recommendation" => self.recommendation(node, depth),
            "comparison" => self.comparison(node, depth),
            "table" => self.table(node, depth),
            "divider" => self.divider(depth),
            _ => self.unknown(node, depth),
        }
    }

    fn render_children(&mut self, node: &UiSpecNode, depth: usize) {
        for child in &node.children {
            self.render_node(child, depth);
        }
    }

    fn indent(&self, depth: usize) -> Span<'static> {
        Span::raw(" ".repeat(depth * self.theme.indent_width))
    }

    fn push(&mut self, depth: usize, spans: Vec<Span<'static>>) {
        let mut line = Vec::with_capacity(spans.len() + 1);
        if depth > 0 {
            line.push(self.indent(depth));
        }
        line.extend(spans);
        self.out.lines.push(Line::from(line));
    }

    fn push_text(&mut self, depth: usize, text: &str, style: Style) {
        for row in text.lines() {
            self.push(depth, vec![Span::styled(row.to_string(), style)]);
        }
    }

    fn blank(&mut self) {
        self.out.lines.push(Line::default());
    }

    /// Registers a control on the line about to be pushed.
    fn control(&mut self, node: &UiSpecNode, label: String, action: UiAction) -> Span<'static> {
        let index = self.out.controls.len();
        let focused = self.focus == Some(index);
        let text = format!("[{label}]");
        self.out.controls.push(Control {
            node_id: node.id().to_string(),
            label,
            action,
            line: self.out.lines.len(),
        });
        Span::styled(text, self.theme.control_style(focused))
    }

    fn text(&mut self, node: &UiSpecNode, depth: usize) {
        let content = node
            .prop_str_any(&["content", "text", "value"])
            .unwrap_or_default();
        let mut style = self.theme.text_style();
        if node.prop_bool("bold") == Some(true) {
            style = style.add_modifier(Modifier::BOLD);
        }
        if node.prop_bool("muted") == Some(true) {
            style = self.theme.muted_style();
        }
        self.push_text(depth, &content, style);
        self.render_children(node, depth);
    }

    fn heading(&mut self, node: &UiSpecNode, depth: usize) {
        let content = node
            .prop_str_any(&["content", "text", "title"])
            .unwrap_or_default();
        let level = node.prop_f64("level").unwrap_or(2.0);
        let style = if level <= 1.0 {
            self.theme
                .title_style()
                .add_modifier(Modifier::UNDERLINED)
        } else if level <= 2.0 {
            self.theme.title_style()
        } else {
            self.theme.text_style().add_modifier(Modifier::BOLD)
        };
        self.push_text(depth, &content, style);
        self.render_children(node, depth);
    }

    fn paragraph(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(content) = node.prop_str_any(&["content", "text"]) {
            self.push_text(depth, &content, self.theme.text_style());
        }
        self.render_children(node, depth);
        self.blank();
    }

    fn list(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(title) = node.prop_str("title") {
            self.push(depth, vec![Span::styled(title, self.theme.text_style().add_modifier(Modifier::BOLD))]);
        }
        let ordered = node.prop_bool("ordered") == Some(true);
        let items = node.prop_array("items").cloned().unwrap_or_default();
        for (index, item) in items.iter().enumerate() {
            let marker = if ordered {
                format!("{}. ", index + 1)
            } else {
                "• ".to_string()
            };
            let (text, detail) = list_item_text(item);
            self.push(
                depth,
                vec![
                    Span::styled(marker, self.theme.muted_style()),
                    Span::styled(text, self.theme.text_style()),
                ],
            );
            if let Some(detail) = detail {
                self.push_text(depth + 1, &detail, self.theme.muted_style());
            }
        }
        self.render_children(node, depth + 1);
    }

    fn alert(&mut self, node: &UiSpecNode, depth: usize) {
        let variant = node
            .prop_str_any(&["variant", "severity", "level"])
            .unwrap_or_else(|| "info".to_string());
        let color = self.theme.variant_color(&variant);
        let icon = match variant.to_ascii_lowercase().as_str() {
            "success" | "positive" => "✔",
            "warning" | "warn" | "caution" => "⚠",
            "error" | "danger" | "destructive" => "✖",
            _ => "ℹ",
        };
        let mut spans = vec![Span::styled(
            format!("{icon} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        if let Some(title) = node.prop_str("title") {
            spans.push(Span::styled(
                title,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
            self.push(depth, spans);
            if let Some(content) = node.prop_str_any(&["content", "message", "description"]) {
                self.push_text(depth + 1, &content, Style::default().fg(color));
            }
        } else {
            let content = node
                .prop_str_any(&["content", "message", "description"])
                .unwrap_or_default();
            spans.push(Span::styled(content, Style::default().fg(color)));
            self.push(depth, spans);
        }
        self.render_children(node, depth + 1);
    }

    fn collapsible(&mut self, node: &UiSpecNode, depth: usize, fallback_title: &str) {
        let default_expanded = node.prop_bool("defaultExpanded") != Some(false);
        let expanded = self.state.is_expanded(node.id(), default_expanded);
        let title = node
            .prop_str_any(&["title", "label", "heading"])
            .unwrap_or_else(|| fallback_title.to_string());
        let marker = if expanded { "−" } else { "+" };
        let toggle = self.control(
            node,
            marker.to_string(),
            UiAction::expand(node.id(), !expanded).with_label(title.clone()),
        );
        let title_style = if node.node_type == "section" {
            self.theme.title_style().add_modifier(Modifier::UNDERLINED)
        } else {
            self.theme.text_style().add_modifier(Modifier::BOLD)
        };
        let mut header = vec![toggle, Span::raw(" "), Span::styled(title, title_style)];
        if !expanded && !node.children.is_empty() {
            header.push(Span::styled(
                format!(" ({} hidden)", node.children.len()),
                self.theme.muted_style(),
            ));
        }
        self.push(depth, header);

        if !expanded {
            return;
        }
        if let Some(description) = node.prop_str_any(&["description", "subtitle"]) {
            self.push_text(depth + 1, &description, self.theme.muted_style());
        }
        if let Some(content) = node.prop_str("content") {
            self.push_text(depth + 1, &content, self.theme.text_style());
        }
        self.render_children(node, depth + 1);
    }

    fn grid(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(title) = node.prop_str("title") {
            self.push(depth, vec![Span::styled(title, self.theme.title_style())]);
        }
        self.render_children(node, depth);
    }

    fn badge(&mut self, node: &UiSpecNode, depth: usize) {
        let label = node
            .prop_str_any(&["label", "text", "content"])
            .unwrap_or_default();
        let color = self
            .theme
            .variant_color(&node.prop_str("variant").unwrap_or_default());
        self.push(
            depth,
            vec![Span::styled(
                format!(" {label} "),
                Style::default()
                    .fg(ratatui::style::Color::Black)
                    .bg(color)
                    .add_modifier(Modifier::BOLD),
            )],
        );
        self.render_children(node, depth + 1);
    }

    fn progress(&mut self, node: &UiSpecNode, depth: usize) {
        let value = node.prop_f64("value").unwrap_or(0.0);
        let max = node.prop_f64("max").unwrap_or(100.0);
        let label = node.prop_str_any(&["label", "title"]);
        let line = self.progress_line(label.as_deref(), value, max);
        self.push(depth, line);
        self.render_children(node, depth + 1);
    }

    fn progress_line(&self, label: Option<&str>, value: f64, max: f64) -> Vec<Span<'static>> {
        let percent = if max > 0.0 { value / max * 100.0 } else { 0.0 };
        let percent = clamp_percent(percent);
        let mut spans = Vec::new();
        if let Some(label) = label {
            spans.push(Span::styled(format!("{label} "), self.theme.text_style()));
        }
        spans.push(Span::styled(
            bar_track(percent, self.theme.bar_width),
            Style::default().fg(self.theme.accent),
        ));
        spans.push(Span::styled(
            format!(" {percent:.0}%"),
            self.theme.muted_style(),
        ));
        spans
    }

    fn chart(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(title) = node.prop_str("title") {
            self.push(depth, vec![Span::styled(title, self.theme.title_style())]);
        }
        let points = chart_points(node);
        if points.is_empty() {
            self.push_text(depth, "(no data)", self.theme.muted_style());
            return;
        }
        let chart_type = node
            .prop_str_any(&["chartType", "variant", "kind"])
            .unwrap_or_else(|| "bar".to_string())
            .to_ascii_lowercase();
        match chart_type.as_str() {
            "progress" => {
                for point in &points {
                    let line =
                        self.progress_line(
                        Some(point.label.as_str()),
                        point.value,
                        point.max.unwrap_or(100.0),
                    );
                    self.push(depth, line);
                }
            }
            "metric" => {
                for point in &points {
                    self.push(
                        depth,
                        vec![
                            Span::styled(format!("{}: ", point.label), self.theme.muted_style()),
                            Span::styled(
                                format_number(point.value),
                                self.theme.text_style().add_modifier(Modifier::BOLD),
                            ),
                        ],
                    );
                }
            }
            // line, pie and other series shapes fall back to bars.
            _ => self.bar_chart(&points, depth),
        }
    }

    fn bar_chart(&mut self, points: &[ChartPoint], depth: usize) {
        let max = points.iter().map(|point| point.value).fold(0.0_f64, f64::max);
        let label_width = points
            .iter()
            .map(|point| display_width(&point.label))
            .max()
            .unwrap_or(0);
        for point in points {
            let percent = bar_percent(point.value, max);
            let padding = label_width.saturating_sub(display_width(&point.label));
            self.push(
                depth,
                vec![
                    Span::styled(
                        format!("{}{} ", point.label, " ".repeat(padding)),
                        self.theme.text_style(),
                    ),
                    Span::styled(
                        bar_track(percent, self.theme.bar_width),
                        Style::default().fg(self.theme.accent),
                    ),
                    Span::styled(format!(" {}", format_number(point.value)), self.theme.muted_style()),
                ],
            );
        }
    }

    fn button(&mut self, node: &UiSpecNode, depth: usize) {
        let label = node
            .prop_str_any(&["label", "text", "title"])
            .unwrap_or_else(|| "Open".to_string());
        let action = node_action(node, &label);
        let span = self.control(node, label, action);
        self.push(depth, vec![span]);
    }

    fn metric(&mut self, node: &UiSpecNode, depth: usize) {
        let label = node.prop_str_any(&["label", "title"]).unwrap_or_default();
        let value = node.prop_str("value").unwrap_or_else(|| MISSING_VALUE.to_string());
        let mut spans = vec![
            Span::styled(format!("{label}: "), self.theme.muted_style()),
            Span::styled(value, self.theme.text_style().add_modifier(Modifier::BOLD)),
        ];
        if let Some(unit) = node.prop_str("unit") {
            spans.push(Span::styled(format!(" {unit}"), self.theme.text_style()));
        }
        if let Some(change) = node.prop_str_any(&["change", "delta", "trend"]) {
            let negative = change.trim_start().starts_with('-')
                || matches!(change.as_str(), "down" | "decrease");
            let (arrow, color) = if negative {
                ("▼", self.theme.negative)
            } else {
                ("▲", self.theme.positive)
            };
            spans.push(Span::styled(format!("  {arrow} {change}"), Style::default().fg(color)));
        }
        self.push(depth, spans);
        self.render_children(node, depth + 1);
    }

    fn feedback_row(&mut self, node: &UiSpecNode, depth: usize, prompt: &str) {
        let current = self.state.feedback(node.id());
        let mark = |value: Feedback| if current == Some(value) { "✓ " } else { "" };
        let up_label = format!("{}helpful", mark(Feedback::Positive));
        let down_label = format!("{}not helpful", mark(Feedback::Negative));
        let up = self.control(node, up_label, UiAction::feedback(node.id(), Feedback::Positive));
        let down = self.control(
            node,
            down_label,
            UiAction::feedback(node.id(), Feedback::Negative),
        );
        self.push(
            depth,
            vec![
                Span::styled(format!("{prompt} "), self.theme.muted_style()),
                up,
                Span::raw(" "),
                down,
            ],
        );
    }

    fn feedback(&mut self, node: &UiSpecNode, depth: usize) {
        let prompt = node
            .prop_str_any(&["prompt", "question", "label"])
            .unwrap_or_else(|| DEFAULT_FEEDBACK_PROMPT.to_string());
        self.feedback_row(node, depth, &prompt);
    }

    fn insight(&mut self, node: &UiSpecNode, depth: usize) {
        let title = node.prop_str("title").unwrap_or_else(|| "Insight".to_string());
        let mut header = vec![
            Span::styled("◆ ", Style::default().fg(self.theme.info)),
            Span::styled(title, self.theme.text_style().add_modifier(Modifier::BOLD)),
        ];
        if let Some(confidence) = node.prop_f64("confidence") {
            let percent = if confidence <= 1.0 { confidence * 100.0 } else { confidence };
            header.push(Span::styled(
                format!(" (confidence {:.0}%)", clamp_percent(percent)),
                self.theme.muted_style(),
            ));
        }
        self.push(depth, header);
        if let Some(content) = node.prop_str_any(&["content", "description", "text"]) {
            self.push_text(depth + 1, &content, self.theme.text_style());
        }
        self.render_children(node, depth + 1);
        self.feedback_row(node, depth + 1, DEFAULT_FEEDBACK_PROMPT);
    }

    fn recommendation(&mut self, node: &UiSpecNode, depth: usize) {
        let title = node
            .prop_str("title")
            .unwrap_or_else(|| "Recommendation".to_string());
        self.push(
            depth,
            vec![
                Span::styled("★ ", Style::default().fg(self.theme.warning)),
                Span::styled(title, self.theme.text_style().add_modifier(Modifier::BOLD)),
            ],
        );
        if let Some(description) = node.prop_str_any(&["description", "content", "text"]) {
            self.push_text(depth + 1, &description, self.theme.text_style());
        }
        if let Some(reason) = node.prop_str_any(&["reason", "rationale"]) {
            self.push_text(depth + 1, &format!("Why: {reason}"), self.theme.muted_style());
        }
        self.render_children(node, depth + 1);
        if node.prop("action").is_some() || node.prop("actionLabel").is_some() {
            let label = node
                .prop_str("actionLabel")
                .unwrap_or_else(|| "View".to_string());
            let action = node_action(node, &label);
            let span = self.control(node, label, action);
            self.push(depth + 1, vec![span]);
        }
        self.feedback_row(node, depth + 1, DEFAULT_FEEDBACK_PROMPT);
    }

    fn comparison(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(title) = node.prop_str("title") {
            self.push(depth, vec![Span::styled(title, self.theme.title_style())]);
        }
        let items = node
            .prop_array("items")
            .or_else(|| node.prop_array("options"))
            .cloned()
            .unwrap_or_default();
        let columns: Vec<(String, Map<String, Value>)> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| comparison_column(index, item))
            .collect();
        if columns.is_empty() {
            self.push_text(depth, "(nothing to compare)", self.theme.muted_style());
            self.render_children(node, depth + 1);
            return;
        }

        let mut attributes: Vec<String> = Vec::new();
        for (_, values) in &columns {
            for key in values.keys() {
                if !attributes.contains(key) {
                    attributes.push(key.clone());
                }
            }
        }

        let header: Vec<String> = std::iter::once(String::new())
            .chain(columns.iter().map(|(title, _)| title.clone()))
            .collect();
        let rows: Vec<Vec<String>> = attributes
            .iter()
            .map(|attribute| {
                std::iter::once(attribute.clone())
                    .chain(columns.iter().map(|(_, values)| {
                        values
                            .get(attribute)
                            .map(display_value)
                            .unwrap_or_else(|| MISSING_VALUE.to_string())
                    }))
                    .collect()
            })
            .collect();
        self.grid_rows(depth, &header, &rows);
        self.render_children(node, depth + 1);
    }

    fn table(&mut self, node: &UiSpecNode, depth: usize) {
        if let Some(title) = node.prop_str("title") {
            self.push(depth, vec![Span::styled(title, self.theme.title_style())]);
        }
        let headers: Vec<String> = node
            .prop_array("headers")
            .or_else(|| node.prop_array("columns"))
            .map(|values| values.iter().map(display_value).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = node
            .prop_array("rows")
            .map(|rows| rows.iter().map(|row| table_row(row, &headers)).collect())
            .unwrap_or_default();
        if headers.is_empty() && rows.is_empty() {
            self.push_text(depth, "(empty table)", self.theme.muted_style());
            return;
        }
        self.grid_rows(depth, &headers, &rows);
    }

    fn grid_rows(&mut self, depth: usize, header: &[String], rows: &[Vec<String>]) {
        let column_count = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; column_count];
        for row in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
            for (column, cell) in row.iter().enumerate() {
                widths[column] = widths[column].max(display_width(cell));
            }
        }
        let format_row = |row: &[String]| -> String {
            (0..column_count)
                .map(|column| {
                    let cell = row.get(column).map(String::as_str).unwrap_or("");
                    let padding = widths[column].saturating_sub(display_width(cell));
                    format!("{cell}{}", " ".repeat(padding))
                })
                .collect::<Vec<_>>()
                .join(" │ ")
                .trim_end()
                .to_string()
        };

        if !header.is_empty() {
            self.push(
                depth,
                vec![Span::styled(
                    format_row(header),
                    self.theme.text_style().add_modifier(Modifier::BOLD),
                )],
            );
            let rule = widths
                .iter()
                .map(|width| "─".repeat(*width))
                .collect::<Vec<_>>()
                .join("─┼─");
            self.push(depth, vec![Span::styled(rule, self.theme.muted_style())]);
        }
        for row in rows {
            self.push(depth, vec![Span::styled(format_row(row), self.theme.text_style())]);
        }
    }

    fn divider(&mut self, depth: usize) {
        self.push(
            depth,
            vec![Span::styled(
                "─".repeat(self.theme.bar_width * 2),
                self.theme.muted_style(),
            )],
        );
    }

    fn unknown(&mut self, node: &UiSpecNode, depth: usize) {
        let error = RenderError::UnknownNodeType {
            node_id: node.id().to_string(),
            node_type: node.node_type.clone(),
        };
        tracing::debug!(%error, "rendering placeholder");
        let shown = if node.node_type.trim().is_empty() {
            "(missing type)".to_string()
        } else {
            format!("\"{}\"", node.node_type)
        };
        self.push(
            depth,
            vec![Span::styled(
                format!("⚠ unsupported component {shown}"),
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::ITALIC),
            )],
        );
        self.out.issues.push(error);
        self.render_children(node, depth + 1);
    }
}

/// Action declared by a node (`action` property), a follow-up built from a
/// `query`/`message` property, or a generic click carrying the node id.
fn node_action(node: &UiSpecNode, label: &str) -> UiAction {
    let action = node
        .prop("action")
        .and_then(UiAction::from_value)
        .or_else(|| {
            node.prop_str_any(&["query", "message", "prompt"])
                .map(|query| UiAction::follow_up(&query))
        })
        .unwrap_or_else(|| UiAction::new("click").with_payload(json!({ "id": node.id() })));
    if action.label.is_some() {
        action
    } else {
        action.with_label(label)
    }
}

fn list_item_text(item: &Value) -> (String, Option<String>) {
    match item {
        Value::Object(fields) => {
            let text = ["text", "label", "title", "content", "name"]
                .iter()
                .find_map(|key| fields.get(*key).map(display_value))
                .unwrap_or_default();
            let detail = fields.get("description").map(display_value);
            (text, detail)
        }
        other => (display_value(other), None),
    }
}

fn comparison_column(index: usize, item: &Value) -> Option<(String, Map<String, Value>)> {
    const TITLE_KEYS: [&str; 4] = ["title", "name", "label", "id"];
    let fields = item.as_object()?;
    let title = TITLE_KEYS
        .iter()
        .find_map(|key| fields.get(*key).map(display_value))
        .unwrap_or_else(|| format!("Option {}", index + 1));
    let values = ["attributes", "features", "values", "specs"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_object).cloned())
        .unwrap_or_else(|| {
            fields
                .iter()
                .filter(|(key, _)| !TITLE_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        });
    Some((title, values))
}

fn table_row(row: &Value, headers: &[String]) -> Vec<String> {
    match row {
        Value::Array(cells) => cells.iter().map(display_value).collect(),
        Value::Object(fields) => headers
            .iter()
            .map(|header| {
                fields
                    .get(header)
                    .map(display_value)
                    .unwrap_or_else(|| MISSING_VALUE.to_string())
            })
            .collect(),
        other => vec![display_value(other)],
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(values) => values.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ChartPoint {
    label: String,
    value: f64,
    max: Option<f64>,
}

fn chart_points(node: &UiSpecNode) -> Vec<ChartPoint> {
    let Some(data) = node.prop_array("data").or_else(|| node.prop_array("values")) else {
        return Vec::new();
    };
    data.iter()
        .enumerate()
        .filter_map(|(index, datum)| match datum {
            Value::Object(fields) => {
                let value = ["value", "y", "count", "amount"]
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(value_as_f64))?;
                let label = ["label", "name", "x", "category"]
                    .iter()
                    .find_map(|key| fields.get(*key).map(display_value))
                    .unwrap_or_else(|| format!("#{}", index + 1));
                let max = fields.get("max").and_then(value_as_f64);
                Some(ChartPoint { label, value, max })
            }
            other => value_as_f64(other).map(|value| ChartPoint {
                label: format!("#{}", index + 1),
                value,
                max: None,
            }),
        })
        .collect()
}

/// Share of `max` in percent; a non-positive maximum yields 0 for every bar.
fn bar_percent(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    clamp_percent(value / max * 100.0)
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

fn bar_track(percent: f64, width: usize) -> String {
    let filled = ((clamp_percent(percent) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
