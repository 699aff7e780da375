use super::client::ByteStream;
use super::logging::emit_frame_decode_error;
use crate::error::{FrameDecodeError, TransportError};
use crate::types::CompletionChunk;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

const FRAME_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental decoder for `data: <json>` event streams.
///
/// Bytes are buffered until a full line is available, so lines and UTF-8
/// sequences split across chunks decode the same as unsplit input.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    done: bool,
    skipped_frames: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the tokens of every completed frame.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut tokens = Vec::new();
        if self.done {
            return tokens;
        }

        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            start = end + 1;
            self.decode_line(&line, &mut tokens);
            if self.done {
                break;
            }
        }

        if self.done {
            self.pending.clear();
        } else if start > 0 {
            self.pending.drain(..start);
        }
        tokens
    }

    /// Decodes a trailing line left without a newline when the body ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        let rest = std::mem::take(&mut self.pending);
        if !self.done && !rest.is_empty() {
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.decode_line(&line, &mut tokens);
        }
        tokens
    }

    /// True once `data: [DONE]` was seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    fn decode_line(&mut self, line: &str, tokens: &mut Vec<String>) {
        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix(FRAME_PREFIX) else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }
        if payload == DONE_SENTINEL {
            self.done = true;
            return;
        }

        match decode_frame(payload) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {}
            Err(error) => {
                emit_frame_decode_error(&error);
                self.skipped_frames += 1;
            }
        }
    }
}

/// Token carried by one frame payload. Empty content yields `Ok(None)`.
pub fn decode_frame(payload: &str) -> Result<Option<String>, FrameDecodeError> {
    let chunk: CompletionChunk =
        serde_json::from_str(payload).map_err(|source| FrameDecodeError::InvalidJson {
            payload: payload.to_string(),
            source,
        })?;
    match chunk.content() {
        Some("") => Ok(None),
        Some(content) => Ok(Some(content.to_string())),
        None => Err(FrameDecodeError::MissingContent {
            payload: payload.to_string(),
        }),
    }
}

struct DecodeState {
    bytes: ByteStream,
    decoder: FrameDecoder,
    ready: VecDeque<String>,
    exhausted: bool,
}

/// Lazily turns a byte stream into content tokens. Ends at `[DONE]`, at the
/// end of the body, or after yielding a read error.
pub fn decode_stream(bytes: ByteStream) -> impl Stream<Item = Result<String, TransportError>> + Send {
    let state = DecodeState {
        bytes,
        decoder: FrameDecoder::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.ready.pop_front() {
                return Some((Ok(token), state));
            }
            if state.exhausted || state.decoder.is_done() {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.process(&chunk)),
                Some(Err(error)) => {
                    state.exhausted = true;
                    return Some((Err(error), state));
                }
                None => {
                    state.exhausted = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}
