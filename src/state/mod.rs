pub mod accumulator;
pub mod dispatcher;
pub mod interaction;
pub mod session;
pub mod spec_parser;

pub use accumulator::ResponseAccumulator;
pub use dispatcher::{ActionDispatcher, Dispatch};
pub use interaction::{InteractionState, NodeInteraction};
pub use session::{SessionHandle, SessionId, SessionStatus, SessionUpdate};
pub use spec_parser::{ParseOutcome, SpecParser};
