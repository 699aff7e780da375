use crate::state::interaction::InteractionState;
use crate::types::panel::{EXPAND_ACTION, FEEDBACK_ACTION};
use crate::types::{Feedback, UiAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Applied to interaction state; nothing left the panel.
    Local,
    /// Handed to the host callback.
    Forwarded,
    /// Built-in action with an unusable payload.
    Ignored,
}

/// Routes panel actions: `expand` and `feedback` stay local, everything else
/// goes to the host verbatim.
pub struct ActionDispatcher<H> {
    host: H,
}

impl<H: FnMut(UiAction)> ActionDispatcher<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn dispatch(&mut self, action: UiAction, state: &mut InteractionState) -> Dispatch {
        match action.action_type.as_str() {
            EXPAND_ACTION => apply_expand(&action, state),
            FEEDBACK_ACTION => apply_feedback(&action, state),
            _ => {
                tracing::debug!(action = %action.action_type, "forwarding panel action to host");
                (self.host)(action);
                Dispatch::Forwarded
            }
        }
    }
}

fn apply_expand(action: &UiAction, state: &mut InteractionState) -> Dispatch {
    let Some(node_id) = action.payload_str("id") else {
        tracing::warn!("expand action without node id");
        return Dispatch::Ignored;
    };
    let Some(expanded) = action
        .payload
        .as_ref()
        .and_then(|payload| payload.get("expanded"))
        .and_then(|value| value.as_bool())
    else {
        tracing::warn!(node = node_id, "expand action without an expanded value");
        return Dispatch::Ignored;
    };
    state.set_expanded(node_id, expanded);
    Dispatch::Local
}

fn apply_feedback(action: &UiAction, state: &mut InteractionState) -> Dispatch {
    let node_id = action.payload_str("id");
    let value = action.payload_str("value").and_then(Feedback::parse);
    match (node_id, value) {
        (Some(node_id), Some(value)) => {
            state.set_feedback(node_id, value);
            Dispatch::Local
        }
        _ => {
            tracing::warn!(payload = ?action.payload, "feedback action without node id or value");
            Dispatch::Ignored
        }
    }
}
