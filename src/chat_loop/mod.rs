//! Chat loop: multi-round tool execution
//!
//! Streams a conversation turn, runs client-side tool callbacks the server
//! asks for, feeds their outputs back as a new turn and repeats until the
//! server stops asking or the round cap is hit.

mod chat_loop;
pub mod constants;
mod deferred;
mod lifecycle;
mod loop_state;

// Re-export public API
pub use chat_loop::ChatLoop;
pub use constants::{DEFAULT_MAX_ROUNDS, DEFAULT_TOOL_FINISH_REASONS};
pub use deferred::{ChatStream, DeferredResponse};
pub use lifecycle::{LifecycleEvent, LifecycleKind};
pub use loop_state::RoundState;
