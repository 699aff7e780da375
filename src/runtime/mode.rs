use super::context::RuntimeContext;
use super::frontend::UserInputEvent;
use crate::state::SessionUpdate;

pub trait RuntimeMode {
    fn on_user_input(&mut self, input: String, ctx: &mut RuntimeContext);
    fn on_model_update(&mut self, update: SessionUpdate, ctx: &mut RuntimeContext);
    fn on_interrupt(&mut self, _ctx: &mut RuntimeContext) {}
    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext);
    fn is_turn_in_progress(&self) -> bool;
    fn quit_requested(&self) -> bool {
        false
    }
}
