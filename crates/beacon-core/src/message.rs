use serde::{Deserialize, Serialize};

use crate::types::AssistantReply;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation_id: Option<String>,
}

fn new_message_id() -> String {
    format!("msg_{}", ulid::Ulid::new().to_string().to_lowercase())
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: &str) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.to_string(),
            created_at: crate::now_rfc3339(),
            recommendation_id: None,
        }
    }

    /// Assistant message built from a backend reply, keeping the backend's
    /// id and timestamp when it sent them.
    pub fn from_reply(reply: &AssistantReply) -> Self {
        Self {
            id: reply.id.clone().unwrap_or_else(new_message_id),
            role: Role::Assistant,
            content: reply.response.clone(),
            created_at: reply.created_at.clone().unwrap_or_else(crate::now_rfc3339),
            recommendation_id: reply.recommendation_id.clone(),
        }
    }
}

/// Append-only conversation log, in insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("hi");
        let b = Message::user("hi");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("msg_"));
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn reply_keeps_backend_fields() {
        let reply = AssistantReply {
            id: Some("srv-1".into()),
            response: "Tell me more.".into(),
            created_at: Some("2026-03-01T10:00:00Z".into()),
            recommendation_id: Some("rec-9".into()),
        };
        let msg = Message::from_reply(&reply);
        assert_eq!(msg.id, "srv-1");
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.created_at, "2026-03-01T10:00:00Z");
        assert_eq!(msg.recommendation_id.as_deref(), Some("rec-9"));
    }

    #[test]
    fn reply_without_id_gets_one() {
        let msg = Message::from_reply(&AssistantReply {
            response: "ok".into(),
            ..Default::default()
        });
        assert!(msg.id.starts_with("msg_"));
        assert!(!msg.created_at.is_empty());
    }

    #[test]
    fn transcript_preserves_order() {
        let mut t = Transcript::new();
        t.push(Message::user("one"));
        t.push(Message::assistant("two"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].content, "one");
        assert_eq!(t.last().unwrap().content, "two");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
