//! Events emitted by the streaming agent loop.

use bixso_core::Usage;
use serde::{Deserialize, Serialize};

/// An event in a streaming agent run.
///
/// The gateway forwards `Chunk` events to SSE clients; the others are
/// loop progress markers. An `Error` event is always the last event
/// before the channel closes on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// A fragment of assistant text.
    Chunk { content: String },

    /// The model requested a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// A tool finished.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The run completed.
    Done {
        usage: Option<Usage>,
        iterations: usize,
        tool_calls_made: usize,
    },

    /// The run failed; no further events follow.
    Error { message: String },
}

impl AgentStreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentStreamEvent::Chunk { .. } => "chunk",
            AgentStreamEvent::ToolCall { .. } => "tool_call",
            AgentStreamEvent::ToolResult { .. } => "tool_result",
            AgentStreamEvent::Done { .. } => "done",
            AgentStreamEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_serializes_with_type_tag() {
        let event = AgentStreamEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chunk");
        assert_eq!(json["content"], "Hello");
    }

    #[test]
    fn error_event_roundtrip() {
        let event = AgentStreamEvent::Error {
            message: "provider unreachable".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: AgentStreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "error");
    }
}
