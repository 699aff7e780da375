use super::mode::RuntimeMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    LineUp,
    LineDown,
    PageUp(usize),
    PageDown(usize),
    Home,
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInputEvent {
    /// A submitted query.
    Text(String),
    /// Activate the focused panel control.
    Activate,
    FocusNext,
    FocusPrev,
    /// Re-run the last failed query.
    Retry,
    /// Stop the streaming turn without quitting.
    Cancel,
    Interrupt,
    Scroll(ScrollAction),
}

pub trait FrontendAdapter<M: RuntimeMode> {
    fn poll_user_input(&mut self, mode: &M) -> Option<UserInputEvent>;
    fn render(&mut self, mode: &M);
    fn should_quit(&self) -> bool;
}
