use crate::error::SpecParseError;
use crate::types::UiSpec;
use std::sync::Arc;

/// Result of one tolerant parse attempt.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub spec: Option<Arc<UiSpec>>,
    /// True when `spec` replaced the previously known spec.
    pub changed: bool,
}

/// Strict parse of renderable text into a spec with ids assigned.
pub fn parse_spec(text: &str) -> Result<UiSpec, SpecParseError> {
    let mut spec: UiSpec = serde_json::from_str(text.trim())?;
    spec.assign_ids();
    Ok(spec)
}

/// Parses `text`, falling back to `last_known` on any failure. A result equal
/// to `last_known` keeps the existing `Arc`.
pub fn parse_or_keep(text: &str, last_known: Option<Arc<UiSpec>>) -> ParseOutcome {
    resolve(parse_spec(text), last_known)
}

fn resolve(parsed: Result<UiSpec, SpecParseError>, last_known: Option<Arc<UiSpec>>) -> ParseOutcome {
    match parsed {
        Ok(spec) if last_known.as_deref() == Some(&spec) => ParseOutcome {
            spec: last_known,
            changed: false,
        },
        Ok(spec) => ParseOutcome {
            spec: Some(Arc::new(spec)),
            changed: true,
        },
        Err(error) => {
            tracing::trace!(%error, "keeping last panel spec");
            ParseOutcome {
                spec: last_known,
                changed: false,
            }
        }
    }
}

/// Holds the last valid spec of one session.
#[derive(Debug, Default)]
pub struct SpecParser {
    last: Option<Arc<UiSpec>>,
    failed_attempts: usize,
}

impl SpecParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, text: &str) -> ParseOutcome {
        let parsed = parse_spec(text);
        if parsed.is_err() {
            self.failed_attempts += 1;
        }
        let outcome = resolve(parsed, self.last.take());
        self.last = outcome.spec.clone();
        outcome
    }

    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts
    }
}
