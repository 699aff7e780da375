use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Progress of a session, tagged with its id so consumers can drop updates
/// from superseded sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Started { session: SessionId, query: String },
    Token { session: SessionId, text: String },
    Completed { session: SessionId, content: String },
    Failed { session: SessionId, message: String },
    Cancelled { session: SessionId },
}

impl SessionUpdate {
    pub fn session(&self) -> SessionId {
        match self {
            Self::Started { session, .. }
            | Self::Token { session, .. }
            | Self::Completed { session, .. }
            | Self::Failed { session, .. }
            | Self::Cancelled { session } => *session,
        }
    }
}

struct SessionShared {
    id: SessionId,
    query: String,
    previous_response: Option<String>,
    status: watch::Sender<SessionStatus>,
    cancel: CancellationToken,
    cancel_requests: AtomicUsize,
}

/// Shared view of one conversational turn. Handles are never restarted; a
/// new turn always gets a new session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .finish()
    }
}

impl SessionHandle {
    pub fn new(id: SessionId, query: String, previous_response: Option<String>) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        Self {
            shared: Arc::new(SessionShared {
                id,
                query,
                previous_response,
                status,
                cancel: CancellationToken::new(),
                cancel_requests: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn query(&self) -> &str {
        &self.shared.query
    }

    pub fn previous_response(&self) -> Option<&str> {
        self.shared.previous_response.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Requests cancellation. Returns true if this call ended the session.
    pub fn cancel(&self) -> bool {
        self.shared.cancel_requests.fetch_add(1, Ordering::SeqCst);
        let ended = self.finish(SessionStatus::Cancelled);
        self.shared.cancel.cancel();
        ended
    }

    pub fn cancel_requests(&self) -> usize {
        self.shared.cancel_requests.load(Ordering::SeqCst)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// `Idle -> Streaming`. Fails once the session was cancelled.
    pub fn begin_streaming(&self) -> bool {
        self.shared.status.send_if_modified(|status| {
            if *status == SessionStatus::Idle {
                *status = SessionStatus::Streaming;
                true
            } else {
                false
            }
        })
    }

    /// Moves to a terminal status. Only the first terminal transition wins.
    pub fn finish(&self, terminal: SessionStatus) -> bool {
        debug_assert!(terminal.is_terminal());
        self.shared.status.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = terminal;
                true
            }
        })
    }

    pub async fn wait_terminal(&self) -> SessionStatus {
        let mut rx = self.shared.status.subscribe();
        // The watch::Ref must drop before `rx` does.
        let terminal = rx
            .wait_for(|status| status.is_terminal())
            .await
            .map(|status| *status);
        terminal.unwrap_or_else(|_| self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_idle_streaming_done() {
        let handle = SessionHandle::new(1, "q".to_string(), None);
        assert_eq!(handle.status(), SessionStatus::Idle);
        assert!(handle.begin_streaming());
        assert!(!handle.begin_streaming());
        assert!(handle.finish(SessionStatus::Done));
        assert_eq!(handle.status(), SessionStatus::Done);
    }

    #[test]
    fn test_only_one_terminal_transition() {
        let handle = SessionHandle::new(2, "q".to_string(), None);
        handle.begin_streaming();
        assert!(handle.finish(SessionStatus::Error));
        assert!(!handle.cancel());
        assert!(!handle.finish(SessionStatus::Done));
        assert_eq!(handle.status(), SessionStatus::Error);
        assert_eq!(handle.cancel_requests(), 1);
    }

    #[test]
    fn test_cancel_before_start_blocks_streaming() {
        let handle = SessionHandle::new(3, "q".to_string(), Some("prev".to_string()));
        assert!(handle.cancel());
        assert!(handle.cancellation().is_cancelled());
        assert!(!handle.begin_streaming());
        assert_eq!(handle.status(), SessionStatus::Cancelled);
        assert_eq!(handle.previous_response(), Some("prev"));
    }

    #[tokio::test]
    async fn test_wait_terminal_observes_finish() {
        let handle = SessionHandle::new(4, "q".to_string(), None);
        let waiter = handle.clone();
        let join = tokio::spawn(async move { waiter.wait_terminal().await });
        handle.begin_streaming();
        handle.finish(SessionStatus::Done);
        assert_eq!(join.await.unwrap(), SessionStatus::Done);
    }

    #[tokio::test]
    async fn test_wait_terminal_returns_immediately_when_already_finished() {
        let handle = SessionHandle::new(5, "q".to_string(), None);
        handle.finish(SessionStatus::Error);
        assert_eq!(handle.wait_terminal().await, SessionStatus::Error);
    }
}
