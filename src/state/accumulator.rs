use crate::error::TransportError;
use std::borrow::Cow;

const CONTENT_OPEN: &str = "<content>";
const CONTENT_CLOSE: &str = "</content>";

/// Returns `buffer` with `token` appended.
pub fn append(buffer: &str, token: &str) -> String {
    let mut next = String::with_capacity(buffer.len() + token.len());
    next.push_str(buffer);
    next.push_str(token);
    next
}

/// Best-effort display text for a (possibly incomplete) response buffer.
///
/// When the buffer holds a complete `<content>...</content>` block the inner
/// text is returned with XML entities decoded; the block runs from the first
/// opening tag to the last closing tag after it. Otherwise the raw buffer is
/// returned unchanged.
pub fn renderable_text(buffer: &str) -> Cow<'_, str> {
    match extract_content_block(buffer) {
        Some(inner) => Cow::Owned(decode_xml_entities(inner)),
        None => Cow::Borrowed(buffer),
    }
}

fn extract_content_block(buffer: &str) -> Option<&str> {
    let start = buffer.find(CONTENT_OPEN)? + CONTENT_OPEN.len();
    let end = buffer.rfind(CONTENT_CLOSE)?;
    (end >= start).then(|| &buffer[start..end])
}

/// `&amp;` is decoded last so escaped entities are not decoded twice.
pub fn decode_xml_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Append-only response buffer for one session.
#[derive(Debug, Default, Clone)]
pub struct ResponseAccumulator {
    buffer: String,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: &str) {
        self.buffer.push_str(token);
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn renderable_text(&self) -> Cow<'_, str> {
        renderable_text(&self.buffer)
    }

    /// Ends the session's buffer, returning its contents.
    pub fn reset(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// Final buffer of a completed stream; an empty buffer is a transport failure.
    pub fn into_content(self) -> Result<String, TransportError> {
        if self.buffer.is_empty() {
            return Err(TransportError::EmptyContent);
        }
        Ok(self.buffer)
    }
}
