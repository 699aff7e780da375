use crate::api::StreamTransport;
use crate::state::SessionHandle;
use serde_json::Value;

/// Per-tick context handed to every `RuntimeMode` callback.
pub struct RuntimeContext {
    transport: StreamTransport,
    /// Host data sent with every turn.
    request_context: Option<Value>,
}

impl RuntimeContext {
    pub fn new(transport: StreamTransport, request_context: Option<Value>) -> Self {
        Self {
            transport,
            request_context,
        }
    }

    /// Starts a turn, superseding any session still streaming.
    pub fn start_turn(&mut self, query: String, previous_response: Option<String>) -> SessionHandle {
        self.transport
            .start(query, self.request_context.clone(), previous_response)
    }

    pub fn cancel_turn(&mut self) -> bool {
        self.transport.cancel()
    }

    pub fn active_session(&self) -> Option<&SessionHandle> {
        self.transport.active_session()
    }
}
