//! Stream events
//!
//! Typed events derived from raw frames, and the interpreter producing them.

pub mod interpreter;
pub mod metadata;
pub mod stream_event;
pub mod text_join;

pub use interpreter::{interpret_all, EventInterpreter};
pub use metadata::{dispatch_metadata, MetadataType};
pub use stream_event::{
    FinishInfo, StreamEvent, StreamEventKind, ToolCall, ToolResult, ToolsExhausted,
};
pub use text_join::{TextJoinState, JOIN_WINDOW_CHARS};
