use crate::state::SessionUpdate;
use tokio::sync::mpsc;

use super::{context::RuntimeContext, frontend::FrontendAdapter, mode::RuntimeMode};

pub struct Runtime<M: RuntimeMode> {
    pub mode: M,
    update_rx: mpsc::UnboundedReceiver<SessionUpdate>,
}

impl<M: RuntimeMode> Runtime<M> {
    pub fn new(mode: M, update_rx: mpsc::UnboundedReceiver<SessionUpdate>) -> Self {
        Self { mode, update_rx }
    }

    /// Applies every queued session update to the mode.
    pub fn drain_updates(&mut self, ctx: &mut RuntimeContext) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.update_rx.try_recv() {
            self.mode.on_model_update(update, ctx);
            applied += 1;
        }
        applied
    }

    /// Waits for the next session update and applies it.
    pub async fn next_update(&mut self, ctx: &mut RuntimeContext) -> bool {
        match self.update_rx.recv().await {
            Some(update) => {
                self.mode.on_model_update(update, ctx);
                true
            }
            None => false,
        }
    }

    pub async fn run<F: FrontendAdapter<M>>(&mut self, frontend: &mut F, ctx: &mut RuntimeContext) {
        loop {
            self.drain_updates(ctx);
            frontend.render(&self.mode);

            if let Some(event) = frontend.poll_user_input(&self.mode) {
                self.mode.on_frontend_event(event, ctx);
            }
            if frontend.should_quit() || self.mode.quit_requested() {
                ctx.cancel_turn();
                break;
            }
            tokio::task::yield_now().await;
        }
    }
}
