use super::client::{ByteStream, StreamProducer};
use crate::error::TransportError;
use crate::types::GenerationRequest;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One scripted response body.
pub enum MockResponse {
    /// Raw body chunks, delivered as-is.
    Chunks(Vec<String>),
    /// `before` is delivered immediately, `after` once the gate is notified.
    Gated {
        before: Vec<String>,
        gate: Arc<Notify>,
        after: Vec<String>,
    },
    /// The request itself fails with this HTTP status.
    Status(u16),
}

impl MockResponse {
    /// One `data:` frame per token followed by `data: [DONE]`.
    pub fn tokens(tokens: &[&str]) -> Self {
        let mut chunks: Vec<String> = tokens.iter().map(|token| sse_frame(token)).collect();
        chunks.push("data: [DONE]\n\n".to_string());
        Self::Chunks(chunks)
    }
}

pub fn sse_frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

/// Scripted stream producer that records requests and reader lifetimes.
#[derive(Clone, Default)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    /// `open:<prompt>` and `release:<prompt>` in the order they happened.
    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ReleaseGuard {
    events: Arc<Mutex<Vec<String>>>,
    prompt: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        lock(&self.events).push(format!("release:{}", self.prompt));
    }
}

fn into_items(chunks: Vec<String>) -> Vec<Result<Bytes, TransportError>> {
    chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))).collect()
}

impl StreamProducer for MockApiClient {
    fn open_stream(
        &self,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<ByteStream, TransportError>> {
        let prompt = request.prompt.clone();
        lock(&self.requests).push(request);
        let next = {
            let mut responses = lock(&self.responses);
            (!responses.is_empty()).then(|| responses.remove(0))
        };
        let events = Arc::clone(&self.events);

        Box::pin(async move {
            let body: ByteStream = match next {
                None => return Err(TransportError::NoBody { url: "mock://".to_string() }),
                Some(MockResponse::Status(status)) => {
                    return Err(TransportError::Status {
                        url: "mock://".to_string(),
                        status,
                    })
                }
                Some(MockResponse::Chunks(chunks)) => Box::pin(stream::iter(into_items(chunks))),
                Some(MockResponse::Gated { before, gate, after }) => {
                    let rest = stream::once(async move { gate.notified().await })
                        .flat_map(move |_| stream::iter(into_items(after.clone())));
                    Box::pin(stream::iter(into_items(before)).chain(rest))
                }
            };

            lock(&events).push(format!("open:{prompt}"));
            let guard = ReleaseGuard { events, prompt };
            let tracked = body.map(move |item| {
                let _held = &guard;
                item
            });
            Ok(Box::pin(tracked) as ByteStream)
        })
    }
}
