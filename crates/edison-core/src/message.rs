use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server suffix for personal WhatsApp chats.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// An incoming chat message delivered by the protocol session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Platform-specific sender ID (phone number part of the JID).
    pub sender_id: String,
    /// Push name, if the sender has one set.
    pub sender_name: Option<String>,
    /// Message text content (conversation, extended text, or image caption).
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Chat JID replies should be routed to.
    pub chat: String,
    /// Whether the message was sent by the linked account itself.
    #[serde(default)]
    pub from_me: bool,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
}

impl IncomingMessage {
    /// Display name for logs, falling back to `Unknown`.
    pub fn display_name(&self) -> &str {
        match self.sender_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown",
        }
    }
}

/// Normalize a recipient into a JID string.
///
/// Anything that already carries a server part (`@...`) is passed through;
/// bare numbers get the personal-chat server appended.
pub fn normalize_jid(to: &str) -> String {
    let to = to.trim();
    if to.contains('@') {
        to.to_string()
    } else {
        format!("{to}@{USER_SERVER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_number() {
        assert_eq!(normalize_jid("5511999887766"), "5511999887766@s.whatsapp.net");
    }

    #[test]
    fn test_normalize_keeps_existing_server() {
        assert_eq!(
            normalize_jid("120363001234567890@g.us"),
            "120363001234567890@g.us"
        );
        assert_eq!(normalize_jid(" 1555@s.whatsapp.net "), "1555@s.whatsapp.net");
    }

    #[test]
    fn test_display_name_fallback() {
        let mut msg = IncomingMessage {
            id: Uuid::new_v4(),
            sender_id: "1555".into(),
            sender_name: None,
            text: "hi".into(),
            timestamp: Utc::now(),
            chat: "1555@s.whatsapp.net".into(),
            from_me: false,
            is_group: false,
        };
        assert_eq!(msg.display_name(), "Unknown");
        msg.sender_name = Some(String::new());
        assert_eq!(msg.display_name(), "Unknown");
        msg.sender_name = Some("Ana".into());
        assert_eq!(msg.display_name(), "Ana");
    }
}
