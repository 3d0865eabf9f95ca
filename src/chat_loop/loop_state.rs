//! Round state for multi-round tool execution
//!
//! # RoundState
//!
//! Owned by one chat loop run and threaded through its rounds:
//! - Message history sent with each request
//! - Round counter and last finish reason
//! - Pending client tool calls of the current round, de-duplicated by id
//! - Call ids already answered during the run, so a call repeated in a later
//!   round is not run again
//! - Tools-exhausted reports, accumulated until the run ends

use std::collections::HashSet;

use crate::events::{ToolCall, ToolsExhausted};
use crate::request::{ChatMessage, ToolInvocation};

/// Transient state of one chat loop run
#[derive(Debug, Clone, Default)]
pub struct RoundState {
    pub messages: Vec<ChatMessage>,
    /// Rounds started so far (1-based once running)
    pub round: u32,
    pub last_finish_reason: Option<String>,
    pending: Vec<ToolCall>,
    pending_ids: HashSet<String>,
    /// Answered locally or by the server; kept across rounds
    executed_ids: HashSet<String>,
    round_text: String,
    exhausted: Option<ToolsExhausted>,
}

impl RoundState {
    /// Create state from the initial history
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Start the next round
    pub fn begin_round(&mut self) {
        self.round += 1;
        self.last_finish_reason = None;
        self.pending.clear();
        self.pending_ids.clear();
        self.round_text.clear();
    }

    /// Record assistant text of this round
    pub fn push_text(&mut self, text: &str) {
        self.round_text.push_str(text);
    }

    /// Queue a client tool call; `false` if its id is already queued or answered
    pub fn add_pending(&mut self, call: &ToolCall) -> bool {
        if self.executed_ids.contains(&call.call_id) {
            return false;
        }
        if !self.pending_ids.insert(call.call_id.clone()) {
            // Same call announced again under another tag; keep the latest arguments
            if let Some(existing) = self.pending.iter_mut().find(|c| c.call_id == call.call_id) {
                existing.arguments = call.arguments.clone();
            }
            return false;
        }
        self.pending.push(call.clone());
        true
    }

    /// Drop a pending call the server already answered
    pub fn resolve(&mut self, call_id: &str) {
        self.executed_ids.insert(call_id.to_string());
        if self.pending_ids.remove(call_id) {
            self.pending.retain(|c| c.call_id != call_id);
        }
    }

    /// Pending calls in detection order
    pub fn pending(&self) -> &[ToolCall] {
        &self.pending
    }

    /// Take pending calls for execution
    pub fn take_pending(&mut self) -> Vec<ToolCall> {
        self.pending_ids.clear();
        self.executed_ids
            .extend(self.pending.iter().map(|c| c.call_id.clone()));
        std::mem::take(&mut self.pending)
    }

    /// Record the round's finish reason
    pub fn record_finish(&mut self, reason: &str) {
        self.last_finish_reason = Some(reason.to_string());
    }

    /// Whether the round finished asking for tool results
    pub fn wants_tools(&self, tool_finish_reasons: &[String]) -> bool {
        self.last_finish_reason
            .as_deref()
            .is_some_and(|r| tool_finish_reasons.iter().any(|t| t == r))
    }

    /// Whether the round cap has been reached (0 = unbounded)
    pub fn cap_reached(&self, max_rounds: u32) -> bool {
        max_rounds != 0 && self.round >= max_rounds
    }

    /// Accumulate a tools-exhausted report
    pub fn record_exhausted(&mut self, report: &ToolsExhausted) {
        match &mut self.exhausted {
            Some(total) => total.absorb(report),
            None => self.exhausted = Some(report.clone()),
        }
    }

    /// Consolidated tools-exhausted report, if any round produced one
    pub fn take_exhausted(&mut self) -> Option<ToolsExhausted> {
        self.exhausted.take()
    }

    /// Append the assistant turn carrying this round's tool outcomes
    pub fn append_tool_turn(&mut self, invocations: Vec<ToolInvocation>) {
        let text = std::mem::take(&mut self.round_text);
        self.messages
            .push(ChatMessage::assistant_with_tools(text, invocations));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "search", Map::new())
    }

    #[test]
    fn test_pending_dedup_by_id() {
        let mut state = RoundState::new(vec![ChatMessage::user("hi")]);
        state.begin_round();
        assert!(state.add_pending(&call("c1")));
        assert!(!state.add_pending(&call("c1")));
        assert!(state.add_pending(&call("c2")));
        assert_eq!(state.pending().len(), 2);
    }

    #[test]
    fn test_executed_call_not_queued_in_later_round() {
        let mut state = RoundState::default();
        state.begin_round();
        assert!(state.add_pending(&call("c1")));
        assert_eq!(state.take_pending().len(), 1);

        state.begin_round();
        assert!(!state.add_pending(&call("c1")));
        assert!(state.add_pending(&call("c2")));
        assert_eq!(state.pending().len(), 1);
    }

    #[test]
    fn test_server_answered_call_not_queued_again() {
        let mut state = RoundState::default();
        state.begin_round();
        state.add_pending(&call("c1"));
        state.resolve("c1");
        state.begin_round();
        assert!(!state.add_pending(&call("c1")));
    }

    #[test]
    fn test_resolve_drops_pending() {
        let mut state = RoundState::default();
        state.add_pending(&call("c1"));
        state.resolve("c1");
        assert!(state.pending().is_empty());
    }

    #[test]
    fn test_begin_round_resets() {
        let mut state = RoundState::default();
        state.begin_round();
        state.add_pending(&call("c1"));
        state.record_finish("tool-calls");
        state.begin_round();
        assert_eq!(state.round, 2);
        assert!(state.pending().is_empty());
        assert!(state.last_finish_reason.is_none());
    }

    #[test]
    fn test_cap_zero_is_unbounded() {
        let mut state = RoundState::default();
        for _ in 0..50 {
            state.begin_round();
        }
        assert!(!state.cap_reached(0));
        assert!(state.cap_reached(50));
    }

    #[test]
    fn test_wants_tools() {
        let mut state = RoundState::default();
        let reasons = vec!["tool-calls".to_string()];
        assert!(!state.wants_tools(&reasons));
        state.record_finish("tool-calls");
        assert!(state.wants_tools(&reasons));
    }

    #[test]
    fn test_exhausted_accumulates() {
        let mut state = RoundState::default();
        let report = ToolsExhausted::from_envelope(&json!({"toolsExecuted": 2}));
        state.record_exhausted(&report);
        state.record_exhausted(&report);
        let total = state.take_exhausted().unwrap();
        assert_eq!(total.tools_executed, 4);
        assert_eq!(total.occurrences, 2);
        assert!(state.take_exhausted().is_none());
    }

    #[test]
    fn test_append_tool_turn_uses_round_text() {
        let mut state = RoundState::default();
        state.push_text("Checking.");
        state.append_tool_turn(Vec::new());
        assert_eq!(state.messages.last().unwrap().content, "Checking.");
    }
}
