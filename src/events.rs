//! Socket events exchanged with chat clients.
//!
//! One tagged enum covers both directions; the dispatcher ignores
//! server-only events arriving from a client.

use serde::{Deserialize, Serialize};

use crate::models::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsEvent {
    /// Subscribe the connection to a chat's broadcasts.
    #[serde(rename = "join-chat", rename_all = "camelCase")]
    JoinChat { chat_id: String },

    #[serde(rename = "typing-started", rename_all = "camelCase")]
    TypingStarted { chat_id: String, user_id: String },

    #[serde(rename = "typing-stopped", rename_all = "camelCase")]
    TypingStopped { chat_id: String, user_id: String },

    #[serde(rename = "message-read", rename_all = "camelCase")]
    MessageRead {
        chat_id: String,
        message_id: String,
        user_id: String,
    },

    /// Pass-through notification; the message is persisted via the HTTP path.
    #[serde(rename = "new-message", rename_all = "camelCase")]
    NewMessage { chat_id: String, message: Message },

    // Server -> room broadcasts
    #[serde(rename = "typing-update", rename_all = "camelCase")]
    TypingUpdate {
        chat_id: String,
        typing_users: Vec<String>,
    },

    #[serde(rename = "read-receipt-update", rename_all = "camelCase")]
    ReadReceiptUpdate {
        message_id: String,
        read_by: Vec<String>,
    },

    #[serde(rename = "message-received", rename_all = "camelCase")]
    MessageReceived { message: Message },
}

impl WsEvent {
    /// Wire name of the event, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            WsEvent::JoinChat { .. } => "join-chat",
            WsEvent::TypingStarted { .. } => "typing-started",
            WsEvent::TypingStopped { .. } => "typing-stopped",
            WsEvent::MessageRead { .. } => "message-read",
            WsEvent::NewMessage { .. } => "new-message",
            WsEvent::TypingUpdate { .. } => "typing-update",
            WsEvent::ReadReceiptUpdate { .. } => "read-receipt-update",
            WsEvent::MessageReceived { .. } => "message-received",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_chat_deserialization() {
        let json = r#"{"type":"join-chat","chatId":"c1"}"#;
        let event: WsEvent = serde_json::from_str(json).unwrap();
        if let WsEvent::JoinChat { chat_id } = event {
            assert_eq!(chat_id, "c1");
        } else {
            panic!("Expected JoinChat event");
        }
    }

    #[test]
    fn test_typing_started_deserialization() {
        let json = r#"{"type":"typing-started","chatId":"c1","userId":"u1"}"#;
        let event: WsEvent = serde_json::from_str(json).unwrap();
        if let WsEvent::TypingStarted { chat_id, user_id } = event {
            assert_eq!(chat_id, "c1");
            assert_eq!(user_id, "u1");
        } else {
            panic!("Expected TypingStarted event");
        }
    }

    #[test]
    fn test_typing_update_serialization() {
        let event = WsEvent::TypingUpdate {
            chat_id: "c1".to_string(),
            typing_users: vec!["u1".to_string(), "u2".to_string()],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"typing-update\""));
        assert!(json.contains("\"typingUsers\":[\"u1\",\"u2\"]"));
    }

    #[test]
    fn test_read_receipt_update_serialization() {
        let event = WsEvent::ReadReceiptUpdate {
            message_id: "m1".to_string(),
            read_by: vec!["u2".to_string()],
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"read-receipt-update\""));
        assert!(json.contains("\"messageId\":\"m1\""));
        assert!(json.contains("\"readBy\":[\"u2\"]"));
    }

    #[test]
    fn test_new_message_roundtrip() {
        let json = r#"{
            "type": "new-message",
            "chatId": "c1",
            "message": {
                "id": "m1",
                "chatId": "c1",
                "senderId": "u1",
                "content": "hello",
                "readBy": [],
                "createdAt": 1234567890
            }
        }"#;
        let event: WsEvent = serde_json::from_str(json).unwrap();
        if let WsEvent::NewMessage { chat_id, message } = event {
            assert_eq!(chat_id, "c1");
            assert_eq!(message.id, "m1");
            assert_eq!(message.content, "hello");
        } else {
            panic!("Expected NewMessage event");
        }
    }

    #[test]
    fn test_message_read_by_defaults_to_empty() {
        // Clients may omit readBy on freshly created messages.
        let json = r#"{
            "type": "new-message",
            "chatId": "c1",
            "message": {
                "id": "m1",
                "chatId": "c1",
                "senderId": "u1",
                "content": "hello",
                "createdAt": 1234567890
            }
        }"#;
        let event: WsEvent = serde_json::from_str(json).unwrap();
        if let WsEvent::NewMessage { message, .. } = event {
            assert!(message.read_by.is_empty());
        } else {
            panic!("Expected NewMessage event");
        }
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        let event = WsEvent::TypingStarted {
            chat_id: "c1".to_string(),
            user_id: "u1".to_string(),
        };
        assert_eq!(event.name(), "typing-started");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(&format!("\"type\":\"{}\"", event.name())));
    }
}
