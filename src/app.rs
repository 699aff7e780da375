use crate::api::{ApiClient, StreamTransport};
use crate::config::Config;
use crate::runtime::context::RuntimeContext;
use crate::runtime::frontend::{ScrollAction, UserInputEvent};
use crate::runtime::mode::RuntimeMode;
use crate::runtime::r#loop::Runtime;
use crate::state::{
    ActionDispatcher, Dispatch, InteractionState, ResponseAccumulator, SessionId, SessionStatus,
    SessionUpdate, SpecParser,
};
use crate::types::panel::FOLLOW_UP_ACTION;
use crate::types::{UiAction, UiSpec};
use crate::ui::render::status_text;
use crate::ui::{render_pending, render_spec, RenderedPanel, Theme};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

const DEFAULT_PAGE_ROWS: usize = 10;

/// Query and continuation text of the last turn, kept for retry.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TurnRequest {
    query: String,
    previous_response: Option<String>,
}

/// Rendering state of the session currently on screen.
#[derive(Debug, Default)]
struct StreamState {
    session: Option<SessionId>,
    accumulator: ResponseAccumulator,
    parser: SpecParser,
    /// Renderable text of the current session, kept after it ends for the
    /// no-spec view.
    renderable: String,
    /// Set once this session has produced its first spec.
    has_spec: bool,
    turn_in_progress: bool,
}

/// Host mode for the generative panel: owns the displayed spec, its
/// interaction state and focus, and turns panel actions into new turns.
pub struct PanelMode {
    stream: StreamState,
    status: SessionStatus,
    spec: Option<Arc<UiSpec>>,
    /// True while `spec` still belongs to an earlier session.
    spec_is_stale: bool,
    interaction: InteractionState,
    last_response_text: Option<String>,
    last_request: Option<TurnRequest>,
    error: Option<String>,
    notice: Option<String>,
    forwarded: Vec<UiAction>,
    focus: Option<usize>,
    scroll: usize,
    page_rows: usize,
    theme: Theme,
    pending_quit: bool,
    quit_requested: bool,
}

impl Default for PanelMode {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl PanelMode {
    pub fn new(theme: Theme) -> Self {
        Self {
            stream: StreamState::default(),
            status: SessionStatus::Idle,
            spec: None,
            spec_is_stale: false,
            interaction: InteractionState::new(),
            last_response_text: None,
            last_request: None,
            error: None,
            notice: None,
            forwarded: Vec::new(),
            focus: None,
            scroll: 0,
            page_rows: DEFAULT_PAGE_ROWS,
            theme,
            pending_quit: false,
            quit_requested: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn spec(&self) -> Option<&Arc<UiSpec>> {
        self.spec.as_ref()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Renderable text of the last session that completed.
    pub fn last_response_text(&self) -> Option<&str> {
        self.last_response_text.as_deref()
    }

    /// Actions handed to the host rather than applied locally.
    pub fn forwarded_actions(&self) -> &[UiAction] {
        &self.forwarded
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn retry_available(&self) -> bool {
        self.error.is_some() && self.last_request.is_some() && !self.stream.turn_in_progress
    }

    pub fn panel(&self) -> RenderedPanel {
        match &self.spec {
            Some(spec) => render_spec(spec, &self.interaction, &self.theme, self.focus),
            None => render_pending(
                &self.stream.renderable,
                self.stream.turn_in_progress,
                &self.theme,
            ),
        }
    }

    pub fn status_line(&self, panel: &RenderedPanel) -> String {
        let focus = self
            .focus
            .filter(|index| *index < panel.controls.len())
            .map(|index| (index, panel.controls.len()));
        status_text(self.status, focus, self.notice.as_deref())
    }

    fn begin_turn(&mut self, request: TurnRequest, ctx: &mut RuntimeContext) {
        self.pending_quit = false;
        self.error = None;
        self.notice = None;
        let handle = ctx.start_turn(request.query.clone(), request.previous_response.clone());
        tracing::info!(session = handle.id(), query = handle.query(), "turn started");
        self.stream = StreamState {
            session: Some(handle.id()),
            turn_in_progress: true,
            ..StreamState::default()
        };
        self.status = handle.status();
        self.spec_is_stale = self.spec.is_some();
        self.last_request = Some(request);
    }

    fn apply_token(&mut self, text: &str) {
        self.stream.accumulator.push(text);
        let renderable = self.stream.accumulator.renderable_text().into_owned();
        let outcome = self.stream.parser.parse(&renderable);
        self.stream.renderable = renderable;
        if !outcome.changed {
            return;
        }
        let Some(spec) = outcome.spec else {
            return;
        };
        if self.stream.has_spec {
            self.interaction.retain_nodes_of(&spec);
        } else {
            // Path ids repeat across unrelated specs, so a new turn starts clean.
            self.interaction = InteractionState::new();
            self.stream.has_spec = true;
        }
        if self.spec_is_stale {
            self.scroll = 0;
            self.focus = None;
            self.spec_is_stale = false;
        }
        self.spec = Some(spec);
        self.clamp_focus();
    }

    /// Ends the session on screen; the buffer is reset and its text kept.
    fn end_turn(&mut self, status: SessionStatus) {
        let text = self.stream.accumulator.reset();
        self.stream.renderable = crate::state::accumulator::renderable_text(&text).into_owned();
        self.stream.turn_in_progress = false;
        self.status = status;
        if status == SessionStatus::Done {
            self.last_response_text = Some(self.stream.renderable.clone());
            if self.spec_is_stale {
                // Completed without a panel; show its raw text instead.
                self.spec = None;
                self.spec_is_stale = false;
                self.interaction = InteractionState::new();
                self.focus = None;
                self.scroll = 0;
            }
        }
    }

    fn control_count(&self) -> usize {
        self.panel().controls.len()
    }

    fn clamp_focus(&mut self) {
        let count = self.control_count();
        self.focus = match self.focus {
            Some(_) if count == 0 => None,
            Some(index) => Some(index.min(count - 1)),
            None => None,
        };
    }

    fn move_focus(&mut self, forward: bool) {
        let panel = self.panel();
        let count = panel.controls.len();
        if count == 0 {
            self.focus = None;
            return;
        }
        let next = match (self.focus, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(index), true) => (index + 1) % count,
            (Some(index), false) => (index + count - 1) % count,
        };
        self.focus = Some(next);
        if let Some(control) = panel.controls.get(next) {
            if control.line < self.scroll || control.line >= self.scroll + self.page_rows {
                self.scroll = control.line.saturating_sub(2);
            }
        }
    }

    fn scroll_by(&mut self, action: ScrollAction) {
        let max = self.panel().lines.len().saturating_sub(1);
        self.scroll = match action {
            ScrollAction::LineUp => self.scroll.saturating_sub(1),
            ScrollAction::LineDown => self.scroll + 1,
            ScrollAction::PageUp(rows) => {
                self.page_rows = rows.max(1);
                self.scroll.saturating_sub(self.page_rows)
            }
            ScrollAction::PageDown(rows) => {
                self.page_rows = rows.max(1);
                self.scroll + self.page_rows
            }
            ScrollAction::Home => 0,
            ScrollAction::End => max,
        }
        .min(max);
    }

    fn activate_focused(&mut self, ctx: &mut RuntimeContext) {
        let Some(index) = self.focus else {
            return;
        };
        let Some(control) = self.panel().controls.into_iter().nth(index) else {
            self.focus = None;
            return;
        };
        self.dispatch_action(control.action, ctx);
    }

    /// Routes a panel action. Local actions update interaction state; the
    /// rest reach the host side of this mode.
    pub fn dispatch_action(&mut self, action: UiAction, ctx: &mut RuntimeContext) -> Dispatch {
        let mut forwarded = Vec::new();
        let outcome = ActionDispatcher::new(|action: UiAction| forwarded.push(action))
            .dispatch(action, &mut self.interaction);
        if outcome == Dispatch::Local {
            self.clamp_focus();
        }
        for action in forwarded {
            self.on_host_action(action, ctx);
        }
        outcome
    }

    fn on_host_action(&mut self, action: UiAction, ctx: &mut RuntimeContext) {
        self.forwarded.push(action.clone());
        if action.action_type != FOLLOW_UP_ACTION {
            tracing::info!(action = %action.action_type, payload = ?action.payload, "panel action");
            let label = action.label.as_deref().unwrap_or(&action.action_type);
            self.notice = Some(format!("action \"{label}\" sent"));
            return;
        }
        let Some(message) = action.follow_up_message() else {
            tracing::warn!("follow-up action without a message");
            self.notice = Some("follow-up without a message".to_string());
            return;
        };
        let request = TurnRequest {
            query: message,
            previous_response: self.last_response_text.clone(),
        };
        self.begin_turn(request, ctx);
    }

    fn retry(&mut self, ctx: &mut RuntimeContext) {
        if !self.retry_available() {
            return;
        }
        if let Some(request) = self.last_request.clone() {
            tracing::info!(query = %request.query, "retrying failed turn");
            self.begin_turn(request, ctx);
        }
    }

    fn cancel(&mut self, ctx: &mut RuntimeContext) {
        if !self.stream.turn_in_progress {
            self.notice = None;
            return;
        }
        if ctx.cancel_turn() {
            self.notice = Some("turn cancelled".to_string());
        }
        self.end_turn(SessionStatus::Cancelled);
    }
}

impl RuntimeMode for PanelMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext) {
        let query = input.trim();
        if query.is_empty() {
            return;
        }
        let request = TurnRequest {
            query: query.to_string(),
            previous_response: self.last_response_text.clone(),
        };
        self.begin_turn(request, ctx);
    }

    fn on_model_update(&mut self, update: SessionUpdate, _ctx: &mut RuntimeContext) {
        if self.stream.session != Some(update.session()) {
            tracing::trace!(session = update.session(), "dropping update from superseded session");
            return;
        }
        match update {
            SessionUpdate::Started { .. } => {
                self.status = SessionStatus::Streaming;
            }
            SessionUpdate::Token { text, .. } => {
                if self.stream.turn_in_progress {
                    self.apply_token(&text);
                }
            }
            SessionUpdate::Completed { .. } => {
                self.end_turn(SessionStatus::Done);
            }
            SessionUpdate::Failed { message, .. } => {
                self.end_turn(SessionStatus::Error);
                self.error = Some(message);
            }
            SessionUpdate::Cancelled { .. } => {
                if self.stream.turn_in_progress {
                    self.end_turn(SessionStatus::Cancelled);
                }
            }
        }
    }

    fn on_interrupt(&mut self, ctx: &mut RuntimeContext) {
        if self.stream.turn_in_progress {
            self.cancel(ctx);
            self.pending_quit = false;
            return;
        }
        if self.pending_quit {
            self.quit_requested = true;
        } else {
            self.pending_quit = true;
            self.notice = Some("press Ctrl+C again to exit".to_string());
        }
    }

    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext) {
        if !matches!(event, UserInputEvent::Interrupt) {
            self.pending_quit = false;
        }
        match event {
            UserInputEvent::Text(input) => self.on_user_input(input, ctx),
            UserInputEvent::Activate => self.activate_focused(ctx),
            UserInputEvent::FocusNext => self.move_focus(true),
            UserInputEvent::FocusPrev => self.move_focus(false),
            UserInputEvent::Retry => self.retry(ctx),
            UserInputEvent::Cancel => self.cancel(ctx),
            UserInputEvent::Interrupt => self.on_interrupt(ctx),
            UserInputEvent::Scroll(action) => self.scroll_by(action),
        }
    }

    fn is_turn_in_progress(&self) -> bool {
        self.stream.turn_in_progress
    }

    fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

pub fn build_runtime(config: Config) -> Result<(Runtime<PanelMode>, RuntimeContext)> {
    config.validate()?;
    let client = ApiClient::new(&config);
    if !client.is_local_endpoint() {
        tracing::info!(url = client.api_url(), "using remote generation endpoint");
    }

    let (update_tx, update_rx) = mpsc::unbounded_channel::<SessionUpdate>();
    let transport =
        StreamTransport::new(Arc::new(client), update_tx).with_system_prompt(config.system_prompt);
    let ctx = RuntimeContext::new(transport, config.context);

    let runtime = Runtime::new(PanelMode::default(), update_rx);
    Ok((runtime, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{sse_frame, MockApiClient, MockResponse};
    use crate::types::Feedback;
    use serde_json::json;
    use tokio::sync::Notify;

    fn runtime_with(mock: &MockApiClient) -> (Runtime<PanelMode>, RuntimeContext) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = StreamTransport::new(Arc::new(mock.clone()), tx);
        let ctx = RuntimeContext::new(transport, Some(json!({ "listings": [] })));
        (Runtime::new(PanelMode::default(), rx), ctx)
    }

    async fn settle(runtime: &mut Runtime<PanelMode>, ctx: &mut RuntimeContext) {
        while runtime.mode.is_turn_in_progress() {
            if !runtime.next_update(ctx).await {
                break;
            }
        }
    }

    fn escaped_spec(json: &str) -> String {
        format!(
            "<content>{}</content>",
            json.replace('&', "&amp;").replace('"', "&quot;")
        )
    }

    #[tokio::test]
    async fn test_plain_text_turn_shows_placeholder() {
        let mock = MockApiClient::new(vec![MockResponse::tokens(&["He", "llo"])]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("hello".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;

        assert_eq!(runtime.mode.status(), SessionStatus::Done);
        assert!(runtime.mode.spec().is_none());
        assert_eq!(runtime.mode.last_response_text(), Some("Hello"));
        let panel = runtime.mode.panel();
        assert_eq!(panel.plain_lines()[0], "No panel to display");
        assert!(panel.plain_text().contains("Hello"));
    }

    #[tokio::test]
    async fn test_embedded_spec_renders_text_node() {
        let body = escaped_spec(r#"{"components":[{"type":"text","properties":{"content":"Hi"}}]}"#);
        let (head, tail) = body.split_at(body.len() / 2);
        let mock = MockApiClient::new(vec![MockResponse::tokens(&[head, tail])]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("show".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;

        assert_eq!(runtime.mode.panel().plain_lines(), vec!["Hi"]);
        assert_eq!(
            runtime.mode.last_response_text(),
            Some(r#"{"components":[{"type":"text","properties":{"content":"Hi"}}]}"#)
        );
    }

    #[tokio::test]
    async fn test_feedback_click_stays_local() {
        let spec = r#"{"components":[{"id":"rec-1","type":"recommendation","properties":{"title":"Alfama loft"}}]}"#;
        let mock = MockApiClient::new(vec![MockResponse::tokens(&[escaped_spec(spec).as_str()])]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("recommend".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;
        assert_eq!(mock.requests().len(), 1);

        runtime.mode.on_frontend_event(UserInputEvent::FocusNext, &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Activate, &mut ctx);

        assert_eq!(
            runtime.mode.interaction().feedback("rec-1"),
            Some(Feedback::Positive)
        );
        assert!(runtime.mode.forwarded_actions().is_empty());
        assert_eq!(mock.requests().len(), 1);
        assert!(!runtime.mode.is_turn_in_progress());
    }

    #[tokio::test]
    async fn test_follow_up_starts_continuation_turn() {
        let spec = r#"{"components":[{"type":"button","properties":{"label":"More","action":{"type":"followUpQuery","payload":{"message":"tell me more"}}}}]}"#;
        let mock = MockApiClient::new(vec![
            MockResponse::tokens(&[escaped_spec(spec).as_str()]),
            MockResponse::tokens(&["more ", "details"]),
        ]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("listings".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;
        let first = ctx.active_session().cloned().expect("first session");
        let first_text = runtime.mode.last_response_text().map(str::to_string);
        assert_eq!(first_text.as_deref(), Some(spec));

        runtime.mode.on_frontend_event(UserInputEvent::FocusNext, &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Activate, &mut ctx);
        assert_eq!(first.cancel_requests(), 1);
        assert_eq!(runtime.mode.forwarded_actions().len(), 1);

        settle(&mut runtime, &mut ctx).await;
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].prompt, "tell me more");
        assert_eq!(requests[1].previous_response, first_text);
        assert_eq!(requests[1].context, Some(json!({ "listings": [] })));
        assert_eq!(first.cancel_requests(), 1);
        assert_eq!(runtime.mode.last_response_text(), Some("more details"));
    }

    #[tokio::test]
    async fn test_superseded_tokens_never_reach_the_panel() {
        let gate = Arc::new(Notify::new());
        let mock = MockApiClient::new(vec![
            MockResponse::Gated {
                before: vec!["data: {\"choices\":[{\"delta\":{\"content\":\"old\"}}]}\n".to_string()],
                gate: Arc::clone(&gate),
                after: vec!["data: {\"choices\":[{\"delta\":{\"content\":\" stale\"}}]}\n".to_string()],
            },
            MockResponse::tokens(&["new"]),
        ]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("first".to_string(), &mut ctx);
        runtime.next_update(&mut ctx).await;
        runtime.next_update(&mut ctx).await;
        runtime.mode.on_user_input("second".to_string(), &mut ctx);
        gate.notify_one();
        settle(&mut runtime, &mut ctx).await;

        assert_eq!(runtime.mode.last_response_text(), Some("new"));
        assert!(!runtime.mode.panel().plain_text().contains("stale"));
    }

    #[tokio::test]
    async fn test_failed_turn_offers_retry() {
        let mock = MockApiClient::new(vec![MockResponse::Status(503), MockResponse::tokens(&["ok"])]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("flaky".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;
        assert_eq!(runtime.mode.status(), SessionStatus::Error);
        assert!(runtime.mode.error().is_some_and(|message| message.contains("503")));
        assert!(runtime.mode.retry_available());

        runtime.mode.on_frontend_event(UserInputEvent::Retry, &mut ctx);
        assert!(runtime.mode.error().is_none());
        settle(&mut runtime, &mut ctx).await;

        assert_eq!(runtime.mode.status(), SessionStatus::Done);
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].prompt, "flaky");
    }

    #[tokio::test]
    async fn test_collapse_toggle_and_focus_clamp() {
        let spec = r#"{"components":[{"id":"c","type":"card","properties":{"title":"Loft"},
            "children":[{"type":"button","properties":{"label":"Book","query":"book it"}}]}]}"#;
        let mock = MockApiClient::new(vec![MockResponse::tokens(&[escaped_spec(spec).as_str()])]);
        let (mut runtime, mut ctx) = runtime_with(&mock);
        runtime.mode.on_user_input("card".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;
        assert_eq!(runtime.mode.panel().controls.len(), 2);

        runtime.mode.on_frontend_event(UserInputEvent::FocusPrev, &mut ctx);
        assert_eq!(runtime.mode.focus(), Some(1));
        runtime.mode.on_frontend_event(UserInputEvent::FocusNext, &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Activate, &mut ctx);

        assert!(!runtime.mode.interaction().is_expanded("c", true));
        assert_eq!(runtime.mode.panel().controls.len(), 1);
        assert_eq!(runtime.mode.focus(), Some(0));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_cancels_then_quits_on_second_press() {
        let gate = Arc::new(Notify::new());
        let mock = MockApiClient::new(vec![MockResponse::Gated {
            before: Vec::new(),
            gate: Arc::clone(&gate),
            after: Vec::new(),
        }]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("slow".to_string(), &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Interrupt, &mut ctx);
        assert_eq!(runtime.mode.status(), SessionStatus::Cancelled);
        assert!(!runtime.mode.quit_requested());

        runtime.mode.on_frontend_event(UserInputEvent::Interrupt, &mut ctx);
        assert!(!runtime.mode.quit_requested());
        runtime.mode.on_frontend_event(UserInputEvent::Interrupt, &mut ctx);
        assert!(runtime.mode.quit_requested());
    }

    #[tokio::test]
    async fn test_non_follow_up_actions_become_notices() {
        let (_runtime, mut ctx) = runtime_with(&MockApiClient::new(Vec::new()));
        let mut mode = PanelMode::default();

        let outcome = mode.dispatch_action(
            UiAction::new("share").with_label("Share listing"),
            &mut ctx,
        );

        assert_eq!(outcome, Dispatch::Forwarded);
        assert_eq!(mode.notice(), Some("action \"Share listing\" sent"));
        assert!(!mode.is_turn_in_progress());
    }

    #[tokio::test]
    async fn test_unrelated_spec_starts_with_fresh_interaction_state() {
        let first = r#"{"components":[{"type":"card","properties":{"title":"Loft"},
            "children":[{"type":"text","properties":{"content":"2 rooms"}}]}]}"#;
        let second = r#"{"components":[{"type":"card","properties":{"title":"Office park"},
            "children":[{"type":"text","properties":{"content":"Open plan"}}]}]}"#;
        let mock = MockApiClient::new(vec![
            MockResponse::tokens(&[escaped_spec(first).as_str()]),
            MockResponse::tokens(&[escaped_spec(second).as_str()]),
        ]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("lofts".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;
        runtime.mode.on_frontend_event(UserInputEvent::FocusNext, &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Activate, &mut ctx);
        assert!(runtime.mode.panel().plain_text().contains("(1 hidden)"));
        assert_eq!(runtime.mode.interaction().len(), 1);

        runtime.mode.on_user_input("offices".to_string(), &mut ctx);
        settle(&mut runtime, &mut ctx).await;

        let text = runtime.mode.panel().plain_text();
        assert!(text.contains("Office park"));
        assert!(text.contains("Open plan"));
        assert!(!text.contains("hidden"));
        assert!(runtime.mode.interaction().is_empty());
    }

    #[tokio::test]
    async fn test_reparse_within_turn_keeps_interaction_state() {
        let draft = r#"{"components":[{"type":"card","properties":{"title":"Loft"},
            "children":[{"type":"text","properties":{"content":"2 rooms"}}]}]}"#;
        let revised = r#"{"components":[{"type":"card","properties":{"title":"Loft"},
            "children":[{"type":"text","properties":{"content":"2 rooms"}}]},
            {"type":"text","properties":{"content":"Updated today"}}]}"#;
        let gate = Arc::new(Notify::new());
        let mock = MockApiClient::new(vec![MockResponse::Gated {
            before: vec![sse_frame(draft)],
            gate: Arc::clone(&gate),
            after: vec![sse_frame(&escaped_spec(revised)), "data: [DONE]\n\n".to_string()],
        }]);
        let (mut runtime, mut ctx) = runtime_with(&mock);

        runtime.mode.on_user_input("lofts".to_string(), &mut ctx);
        runtime.next_update(&mut ctx).await;
        runtime.next_update(&mut ctx).await;
        assert!(runtime.mode.spec().is_some());
        runtime.mode.on_frontend_event(UserInputEvent::FocusNext, &mut ctx);
        runtime.mode.on_frontend_event(UserInputEvent::Activate, &mut ctx);

        gate.notify_one();
        settle(&mut runtime, &mut ctx).await;

        let text = runtime.mode.panel().plain_text();
        assert_eq!(runtime.mode.status(), SessionStatus::Done);
        assert!(text.contains("Updated today"));
        assert!(text.contains("(1 hidden)"));
    }
}
