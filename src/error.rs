use thiserror::Error;

/// Terminal failure of a streaming session. Surfaced to the host.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot reach generation endpoint '{url}': {message}")]
    Connect { url: String, message: String },
    #[error("generation endpoint '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("generation endpoint '{url}' returned no readable body")]
    NoBody { url: String },
    #[error("stream read from '{url}' failed: {message}")]
    Read { url: String, message: String },
    #[error("no content received")]
    EmptyContent,
}

/// A single frame that could not yield a token. Recovered by skipping it.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("frame payload is not valid JSON: {source}")]
    InvalidJson {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("frame payload has no choices[0].delta.content")]
    MissingContent { payload: String },
}

impl FrameDecodeError {
    pub fn payload(&self) -> &str {
        match self {
            Self::InvalidJson { payload, .. } | Self::MissingContent { payload } => payload,
        }
    }
}

/// Renderable text that does not (yet) parse as a panel spec.
#[derive(Debug, Error)]
#[error("renderable text is not a complete panel spec: {0}")]
pub struct SpecParseError(#[from] pub serde_json::Error);

/// A node the renderer has no case for. Rendered as a placeholder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unsupported component type '{node_type}' (node {node_id})")]
    UnknownNodeType { node_id: String, node_type: String },
}
