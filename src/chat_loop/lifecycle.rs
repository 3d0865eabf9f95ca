//! Lifecycle events
//!
//! Emitted to subscribed listeners while a run progresses, independent of
//! whether anyone consumes the event stream.

use crate::aggregate::AggregatedResponse;
use crate::events::{ToolCall, ToolResult, ToolsExhausted};
use crate::observer::Observable;

/// Lifecycle event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    StreamStart,
    ToolStart,
    ToolEnd,
    StreamEnd,
    Timeout,
    MaxToolsReached,
}

/// Lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Before the first round
    StreamStart { run_id: String, messages: usize },
    /// Before a client tool callback runs
    ToolStart { round: u32, call: ToolCall },
    /// After a client tool callback finished or failed
    ToolEnd {
        round: u32,
        result: ToolResult,
        elapsed_ms: u64,
        ok: bool,
    },
    /// Run finished; carries the final response
    StreamEnd { response: Box<AggregatedResponse> },
    /// Transport timed out
    Timeout { round: u32, message: String },
    /// Consolidated tools-exhausted report, once per run
    MaxToolsReached(ToolsExhausted),
}

impl Observable for LifecycleEvent {
    type Kind = LifecycleKind;

    fn kind(&self) -> LifecycleKind {
        match self {
            LifecycleEvent::StreamStart { .. } => LifecycleKind::StreamStart,
            LifecycleEvent::ToolStart { .. } => LifecycleKind::ToolStart,
            LifecycleEvent::ToolEnd { .. } => LifecycleKind::ToolEnd,
            LifecycleEvent::StreamEnd { .. } => LifecycleKind::StreamEnd,
            LifecycleEvent::Timeout { .. } => LifecycleKind::Timeout,
            LifecycleEvent::MaxToolsReached(_) => LifecycleKind::MaxToolsReached,
        }
    }
}
