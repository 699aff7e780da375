use super::client::StreamProducer;
use super::stream::decode_stream;
use crate::error::TransportError;
use crate::state::accumulator::ResponseAccumulator;
use crate::state::session::{SessionHandle, SessionId, SessionStatus, SessionUpdate};
use crate::types::GenerationRequest;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

/// Owns the single in-flight streaming session of an assistant.
pub struct StreamTransport {
    producer: Arc<dyn StreamProducer>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    system_prompt: Option<String>,
    next_id: SessionId,
    active: Option<ActiveSession>,
}

impl StreamTransport {
    pub fn new(
        producer: Arc<dyn StreamProducer>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        Self {
            producer,
            updates,
            system_prompt: None,
            next_id: 1,
            active: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Starts a new turn. Any previous session is cancelled, and the new
    /// request is only sent after the previous reader has been dropped.
    pub fn start(
        &mut self,
        query: String,
        context: Option<Value>,
        previous_response: Option<String>,
    ) -> SessionHandle {
        let previous_task = self.active.take().map(|previous| {
            if previous.handle.cancel() {
                tracing::debug!(session = previous.handle.id(), "superseded by new session");
            }
            previous.task
        });

        let id = self.next_id;
        self.next_id += 1;
        let handle = SessionHandle::new(id, query.clone(), previous_response.clone());
        let request = GenerationRequest {
            prompt: query,
            previous_response,
            context,
            system_prompt: self.system_prompt.clone(),
            stream: true,
        };

        let task = tokio::spawn(run_session(
            Arc::clone(&self.producer),
            request,
            handle.clone(),
            self.updates.clone(),
            previous_task,
        ));
        self.active = Some(ActiveSession {
            handle: handle.clone(),
            task,
        });
        handle
    }

    /// Cancels the active session. Returns true if a live session was ended.
    pub fn cancel(&mut self) -> bool {
        self.active
            .as_ref()
            .map(|active| active.handle.cancel())
            .unwrap_or(false)
    }

    pub fn status(&self) -> SessionStatus {
        self.active
            .as_ref()
            .map(|active| active.handle.status())
            .unwrap_or(SessionStatus::Idle)
    }

    pub fn active_session(&self) -> Option<&SessionHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.cancel();
        }
    }
}

async fn run_session(
    producer: Arc<dyn StreamProducer>,
    request: GenerationRequest,
    handle: SessionHandle,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    previous_task: Option<JoinHandle<()>>,
) {
    if let Some(previous_task) = previous_task {
        // The previous session drops its reader when its task returns.
        let _ = previous_task.await;
    }

    let session = handle.id();
    if !handle.begin_streaming() {
        let _ = updates.send(SessionUpdate::Cancelled { session });
        return;
    }
    tracing::debug!(session, query = %request.prompt, "session streaming");
    let _ = updates.send(SessionUpdate::Started {
        session,
        query: request.prompt.clone(),
    });

    let cancel = handle.cancellation();
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        outcome = stream_content(producer.as_ref(), request, session, &updates) => Some(outcome),
    };

    match outcome {
        None => {
            handle.finish(SessionStatus::Cancelled);
            tracing::debug!(session, "session cancelled");
            let _ = updates.send(SessionUpdate::Cancelled { session });
        }
        Some(Ok(content)) => {
            if handle.finish(SessionStatus::Done) {
                tracing::debug!(session, bytes = content.len(), "session complete");
                let _ = updates.send(SessionUpdate::Completed { session, content });
            } else {
                let _ = updates.send(SessionUpdate::Cancelled { session });
            }
        }
        Some(Err(error)) => {
            if handle.finish(SessionStatus::Error) {
                tracing::warn!(session, %error, "session failed");
                let _ = updates.send(SessionUpdate::Failed {
                    session,
                    message: error.to_string(),
                });
            } else {
                let _ = updates.send(SessionUpdate::Cancelled { session });
            }
        }
    }
}

async fn stream_content(
    producer: &dyn StreamProducer,
    request: GenerationRequest,
    session: SessionId,
    updates: &mpsc::UnboundedSender<SessionUpdate>,
) -> Result<String, TransportError> {
    let bytes = producer.open_stream(request).await?;
    let tokens = decode_stream(bytes);
    futures::pin_mut!(tokens);

    let mut accumulator = ResponseAccumulator::new();
    while let Some(token) = tokens.next().await {
        let token = token?;
        accumulator.push(&token);
        let _ = updates.send(SessionUpdate::Token {
            session,
            text: token,
        });
    }
    accumulator.into_content()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_client::{sse_frame, MockApiClient, MockResponse};
    use tokio::sync::Notify;

    fn transport(mock: &MockApiClient) -> (StreamTransport, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StreamTransport::new(Arc::new(mock.clone()), tx), rx)
    }

    async fn drain_until_terminal(
        rx: &mut mpsc::UnboundedReceiver<SessionUpdate>,
        session: SessionId,
    ) -> Vec<SessionUpdate> {
        let mut seen = Vec::new();
        while let Some(update) = rx.recv().await {
            let done = update.session() == session
                && matches!(
                    update,
                    SessionUpdate::Completed { .. }
                        | SessionUpdate::Failed { .. }
                        | SessionUpdate::Cancelled { .. }
                );
            seen.push(update);
            if done {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_session_streams_tokens_and_completes() {
        let mock = MockApiClient::new(vec![MockResponse::tokens(&["He", "llo"])]);
        let (mut transport, mut rx) = transport(&mock);

        let handle = transport.start("hi".to_string(), None, None);
        let updates = drain_until_terminal(&mut rx, handle.id()).await;

        assert_eq!(
            updates,
            vec![
                SessionUpdate::Started { session: 1, query: "hi".to_string() },
                SessionUpdate::Token { session: 1, text: "He".to_string() },
                SessionUpdate::Token { session: 1, text: "llo".to_string() },
                SessionUpdate::Completed { session: 1, content: "Hello".to_string() },
            ]
        );
        assert_eq!(handle.status(), SessionStatus::Done);
        assert_eq!(mock.events(), vec!["open:hi", "release:hi"]);
    }

    #[tokio::test]
    async fn test_request_carries_context_and_previous_response() {
        let mock = MockApiClient::new(vec![MockResponse::tokens(&["x"])]);
        let (transport, mut rx) = transport(&mock);
        let mut transport = transport.with_system_prompt(Some("panels only".to_string()));

        let handle = transport.start(
            "more".to_string(),
            Some(serde_json::json!({"city": "Lisbon"})),
            Some("{\"components\":[]}".to_string()),
        );
        drain_until_terminal(&mut rx, handle.id()).await;

        let request = &mock.requests()[0];
        assert_eq!(request.prompt, "more");
        assert_eq!(request.previous_response.as_deref(), Some("{\"components\":[]}"));
        assert_eq!(request.context.as_ref().unwrap()["city"], "Lisbon");
        assert_eq!(request.system_prompt.as_deref(), Some("panels only"));
        assert!(request.stream);
    }

    #[tokio::test]
    async fn test_http_status_failure_is_error() {
        let mock = MockApiClient::new(vec![MockResponse::Status(502)]);
        let (mut transport, mut rx) = transport(&mock);

        let handle = transport.start("hi".to_string(), None, None);
        let updates = drain_until_terminal(&mut rx, handle.id()).await;

        assert!(matches!(
            updates.last(),
            Some(SessionUpdate::Failed { message, .. }) if message.contains("502")
        ));
        assert_eq!(handle.status(), SessionStatus::Error);
    }

    #[tokio::test]
    async fn test_empty_stream_is_no_content_error() {
        let mock = MockApiClient::new(vec![MockResponse::tokens(&[])]);
        let (mut transport, mut rx) = transport(&mock);

        let handle = transport.start("hi".to_string(), None, None);
        let updates = drain_until_terminal(&mut rx, handle.id()).await;

        assert_eq!(
            updates.last(),
            Some(&SessionUpdate::Failed {
                session: handle.id(),
                message: "no content received".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_releases_reader_and_is_silent() {
        let gate = Arc::new(Notify::new());
        let mock = MockApiClient::new(vec![MockResponse::Gated {
            before: vec![sse_frame("partial")],
            gate,
            after: vec![sse_frame("never")],
        }]);
        let (mut transport, mut rx) = transport(&mock);

        let handle = transport.start("slow".to_string(), None, None);
        loop {
            if let Some(SessionUpdate::Token { .. }) = rx.recv().await {
                break;
            }
        }
        assert!(transport.cancel());
        assert_eq!(handle.wait_terminal().await, SessionStatus::Cancelled);

        let rest = drain_until_terminal(&mut rx, handle.id()).await;
        assert_eq!(rest, vec![SessionUpdate::Cancelled { session: handle.id() }]);
        assert_eq!(mock.events(), vec!["open:slow", "release:slow"]);
        assert!(!transport.cancel());
    }

    #[tokio::test]
    async fn test_new_session_supersedes_streaming_one() {
        let gate = Arc::new(Notify::new());
        let mock = MockApiClient::new(vec![
            MockResponse::Gated {
                before: vec![sse_frame("a1")],
                gate: Arc::clone(&gate),
                after: vec![sse_frame("a2"), "data: [DONE]\n\n".to_string()],
            },
            MockResponse::tokens(&["b1"]),
        ]);
        let (mut transport, mut rx) = transport(&mock);

        let first = transport.start("A".to_string(), None, None);
        loop {
            if let Some(SessionUpdate::Token { .. }) = rx.recv().await {
                break;
            }
        }
        let second = transport.start("B".to_string(), None, None);
        gate.notify_one();
        let updates = drain_until_terminal(&mut rx, second.id()).await;

        assert_eq!(first.status(), SessionStatus::Cancelled);
        assert_eq!(first.cancel_requests(), 1);
        assert_eq!(second.status(), SessionStatus::Done);
        assert_eq!(mock.events(), vec!["open:A", "release:A", "open:B", "release:B"]);

        let second_started = updates
            .iter()
            .position(|update| matches!(update, SessionUpdate::Started { session, .. } if *session == second.id()))
            .expect("second session started");
        assert!(updates[second_started..]
            .iter()
            .all(|update| update.session() == second.id()));
        assert!(!updates
            .iter()
            .any(|update| matches!(update, SessionUpdate::Token { text, .. } if text == "a2")));
    }
}
