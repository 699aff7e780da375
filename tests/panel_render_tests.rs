use panelstream::error::RenderError;
use panelstream::state::accumulator::renderable_text;
use panelstream::state::{ActionDispatcher, Dispatch, InteractionState, SpecParser};
use panelstream::types::{Feedback, UiAction, UiSpec, UiSpecNode};
use panelstream::ui::layout::split_panel_layout;
use panelstream::ui::render::{render_hint, render_panel};
use panelstream::ui::{render_spec, Theme};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use serde_json::json;

const LISTING_PANEL: &str = r#"{
    "title": "Lisbon rentals",
    "components": [
        {"id": "summary", "type": "card", "properties": {"title": "Summary"}, "children": [
            {"type": "metric", "properties": {"label": "Occupancy", "value": 82, "unit": "%", "change": "+4%"}},
            {"type": "chart", "properties": {"chartType": "bar", "data": [
                {"label": "Alfama", "value": 12}, {"label": "Baixa", "value": 6}
            ]}}
        ]},
        {"id": "rec-1", "type": "recommendation", "properties": {"title": "Raise weekend rates"}},
        {"type": "sparkline", "properties": {"values": [1, 2, 3]}},
        {"type": "button", "properties": {"label": "Show vacancies", "query": "show vacancies"}}
    ]
}"#;

fn parse(text: &str) -> UiSpec {
    let mut parser = SpecParser::new();
    let outcome = parser.parse(text);
    assert!(outcome.changed);
    outcome.spec.expect("panel parses").as_ref().clone()
}

fn screen_text(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let area = buffer.area;
    let mut rows = Vec::new();
    for y in 0..area.height {
        let row: String = (0..area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect();
        rows.push(row.trim_end().to_string());
    }
    rows.join("\n")
}

#[test]
fn test_escaped_payload_renders_single_text_node() {
    let buffer = "<content>{&quot;components&quot;:[{&quot;type&quot;:&quot;text&quot;,&quot;properties&quot;:{&quot;content&quot;:&quot;Hi&quot;}}]}</content>";
    let spec = parse(&renderable_text(buffer));

    let panel = render_spec(&spec, &InteractionState::new(), &Theme::default(), None);

    assert_eq!(panel.plain_lines(), vec!["Hi"]);
}

#[test]
fn test_unknown_component_degrades_without_hiding_siblings() {
    let spec = parse(LISTING_PANEL);
    let panel = render_spec(&spec, &InteractionState::new(), &Theme::default(), None);
    let text = panel.plain_text();

    assert!(text.contains("Occupancy: 82 %"));
    assert!(text.contains("Raise weekend rates"));
    assert!(text.contains("unsupported component \"sparkline\""));
    assert!(text.contains("[Show vacancies]"));
    assert_eq!(
        panel.issues,
        vec![RenderError::UnknownNodeType {
            node_id: "node-2".to_string(),
            node_type: "sparkline".to_string()
        }]
    );
}

#[test]
fn test_controls_follow_document_order() {
    let spec = parse(LISTING_PANEL);
    let panel = render_spec(&spec, &InteractionState::new(), &Theme::default(), None);
    let kinds: Vec<&str> = panel
        .controls
        .iter()
        .map(|control| control.action.action_type.as_str())
        .collect();

    assert_eq!(kinds, vec!["expand", "feedback", "feedback", "followUpQuery"]);
    assert_eq!(
        panel.controls[3].action.follow_up_message().as_deref(),
        Some("show vacancies")
    );
}

#[test]
fn test_dispatching_controls_updates_local_state_only() {
    let spec = parse(LISTING_PANEL);
    let mut state = InteractionState::new();
    let mut host_calls = Vec::new();
    let panel = render_spec(&spec, &state, &Theme::default(), None);

    {
        let mut dispatcher = ActionDispatcher::new(|action: UiAction| host_calls.push(action));
        assert_eq!(
            dispatcher.dispatch(panel.controls[0].action.clone(), &mut state),
            Dispatch::Local
        );
        assert_eq!(
            dispatcher.dispatch(panel.controls[1].action.clone(), &mut state),
            Dispatch::Local
        );
        assert_eq!(
            dispatcher.dispatch(panel.controls[3].action.clone(), &mut state),
            Dispatch::Forwarded
        );
    }

    assert_eq!(state.feedback("rec-1"), Some(Feedback::Positive));
    assert!(!state.is_expanded("summary", true));
    assert_eq!(host_calls.len(), 1);

    let collapsed = render_spec(&spec, &state, &Theme::default(), None);
    assert!(!collapsed.plain_text().contains("Occupancy"));
}

#[test]
fn test_rescoping_drops_state_for_removed_nodes() {
    let mut state = InteractionState::new();
    state.set_feedback("rec-1", Feedback::Negative);
    state.set_expanded("gone", false);

    let spec = UiSpec {
        title: None,
        description: None,
        components: vec![UiSpecNode::new("insight")
            .with_id("rec-1")
            .with_property("content", json!("Demand peaks in June"))],
    };
    state.retain_nodes_of(&spec);

    assert_eq!(state.feedback("rec-1"), Some(Feedback::Negative));
    assert!(state.get("gone").is_none());
}

#[test]
fn test_panel_draws_to_terminal_buffer() {
    let spec = parse(LISTING_PANEL);
    let theme = Theme::default();
    let panel = render_spec(&spec, &InteractionState::new(), &theme, Some(0));
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).expect("test terminal");

    terminal
        .draw(|frame| {
            let panes = split_panel_layout(frame.area(), 2);
            render_panel(frame, panes.panel, panel.lines, 0);
            render_hint(frame, panes.hint, Some("HTTP 502"), &theme);
        })
        .expect("draw");

    let screen = screen_text(&terminal);
    assert!(screen.contains("Lisbon rentals"));
    assert!(screen.contains("[−] Summary"));
    assert!(screen.contains("✖ HTTP 502"));
    assert!(screen.contains("press r on an empty prompt to retry"));
}
