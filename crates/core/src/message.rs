//! Message domain types.
//!
//! These are the value objects that flow through one agent turn:
//! the caller supplies a history of `HistoryTurn`s, the pipeline expands
//! them into `Message`s, and the provider responds with a `Message` that
//! may carry tool calls.
//!
//! The service is stateless across requests — there is no server-side
//! conversation store, so `chat_history` arrives with every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (persona, workflow rules)
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// A prior conversation turn as supplied by the HTTP caller.
///
/// Order is preserved and interpreted as chronological. Unknown roles
/// default to `user` so a sloppy client cannot poison the turn mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

impl HistoryTurn {
    /// Expand a caller-supplied turn into a provider message.
    pub fn to_message(&self) -> Message {
        match self.role.as_str() {
            "assistant" | "ai" => Message::assistant(&self.content),
            "system" => Message::system(&self.content),
            _ => Message::user(&self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello!");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_1", "result data");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
    }

    #[test]
    fn history_turn_role_mapping() {
        let turns = vec![
            HistoryTurn { role: "user".into(), content: "hi".into() },
            HistoryTurn { role: "assistant".into(), content: "hello".into() },
            HistoryTurn { role: "robot".into(), content: "???".into() },
        ];
        assert_eq!(turns[0].to_message().role, Role::User);
        assert_eq!(turns[1].to_message().role, Role::Assistant);
        // Unknown roles fall back to user
        assert_eq!(turns[2].to_message().role, Role::User);
    }

    #[test]
    fn history_order_preserved() {
        let turns: Vec<HistoryTurn> = serde_json::from_str(
            r#"[{"role":"user","content":"first"},{"role":"assistant","content":"second"}]"#,
        )
        .unwrap();
        let messages: Vec<Message> = turns.iter().map(HistoryTurn::to_message).collect();
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }
}
