//! Demo components. Each exposes its state as reactive cells or plain values
//! and renders its bindings as text lines.

mod control_flow;
mod http;
mod signals;

pub use control_flow::ControlFlowExample;
pub use http::{HttpExample, POSTS_PATH};
pub use signals::SignalsExample;
