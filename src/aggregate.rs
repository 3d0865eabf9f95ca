//! Response aggregation
//!
//! Folds stream events into one [`AggregatedResponse`]. Tool records carry
//! the deprecated `id` / `args` / `result` aliases older consumers read.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::{StreamEvent, ToolCall, ToolResult, ToolsExhausted};

/// Tool call plus deprecated alias fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    #[serde(flatten)]
    pub call: ToolCall,
    /// Alias of `callId`
    pub id: String,
    /// Alias of `arguments`
    pub args: Map<String, Value>,
}

impl From<ToolCall> for ToolCallRecord {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.call_id.clone(),
            args: call.arguments.clone(),
            call,
        }
    }
}

/// Tool result plus deprecated alias fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRecord {
    #[serde(flatten)]
    pub result: ToolResult,
    /// Alias of `callId`
    pub id: String,
    /// Alias of `output`
    #[serde(rename = "result")]
    pub result_alias: Value,
}

impl From<ToolResult> for ToolResultRecord {
    fn from(result: ToolResult) -> Self {
        Self {
            id: result.call_id.clone(),
            result_alias: result.output.clone(),
            result,
        }
    }
}

/// Aggregated result of one top-level call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResponse {
    pub content: String,
    pub message_id: Option<String>,
    pub usage: Option<Value>,
    pub finish_reason: Option<String>,
    pub is_continued: Option<bool>,
    pub path_info: Option<Value>,
    pub reasoning: Option<Value>,
    pub intent_context: Option<Value>,
    pub dev_tools_info: Option<Value>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_results: Vec<ToolResultRecord>,
    /// Consolidated tools-exhausted report, set once the loop finishes
    pub tools_exhausted: Option<ToolsExhausted>,
    /// Streaming rounds run
    pub rounds: u32,
    /// Loop stopped at the round cap with tool calls still pending
    pub round_cap_reached: bool,
}

impl AggregatedResponse {
    /// Create empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the response
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Text(text) => self.content.push_str(text),
            StreamEvent::MessageId(id) => self.message_id = Some(id.clone()),
            StreamEvent::ToolCall(call) => {
                let record = ToolCallRecord::from(call.clone());
                match self
                    .tool_calls
                    .iter_mut()
                    .find(|r| r.call.call_id == call.call_id)
                {
                    Some(existing) => *existing = record,
                    None => self.tool_calls.push(record),
                }
            }
            StreamEvent::ToolResult(result) => {
                self.tool_results.push(ToolResultRecord::from(result.clone()))
            }
            StreamEvent::Finish(info) => {
                if info.usage.is_some() {
                    self.usage = info.usage.clone();
                }
                self.finish_reason = Some(info.reason.clone());
                self.is_continued = info.is_continued;
            }
            StreamEvent::PathInfo(value) => self.path_info = Some(value.clone()),
            StreamEvent::Reasoning(value) => self.reasoning = Some(value.clone()),
            StreamEvent::IntentContext(value) => self.intent_context = Some(value.clone()),
            StreamEvent::DevToolsInfo(value) => self.dev_tools_info = Some(value.clone()),
            StreamEvent::MaxToolsReached(report) => match &mut self.tools_exhausted {
                Some(existing) => existing.absorb(report),
                None => self.tools_exhausted = Some(report.clone()),
            },
            _ => {}
        }
    }

    /// Functional form of [`apply`](Self::apply)
    pub fn fold(mut self, event: &StreamEvent) -> Self {
        self.apply(event);
        self
    }

    /// Aggregate a finished event sequence
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a StreamEvent>) -> Self {
        events.into_iter().fold(Self::new(), Self::fold)
    }

    /// Result recorded for a call id
    pub fn result_for(&self, call_id: &str) -> Option<&ToolResult> {
        self.tool_results
            .iter()
            .map(|r| &r.result)
            .find(|r| r.call_id == call_id)
    }
}
