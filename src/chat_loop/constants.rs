//! Chat loop constants
//!
//! # Constants
//!
//! - DEFAULT_MAX_ROUNDS: Round cap when none is configured
//! - DEFAULT_TOOL_FINISH_REASONS: Finish reasons that request client tools

/// Maximum streaming rounds per call (0 = unbounded)
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Finish reasons signalling that the server wants tool results
pub const DEFAULT_TOOL_FINISH_REASONS: &[&str] = &["tool-calls", "tool_calls"];
