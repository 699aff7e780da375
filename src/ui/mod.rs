pub mod input_metrics;
pub mod layout;
pub mod render;
pub mod theme;
pub mod tree;

pub use theme::Theme;
pub use tree::{render_pending, render_spec, Control, RenderedPanel};
