//! Conversation log entries

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }

    /// Label shown next to the message in a transcript
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Assistant",
        }
    }
}

/// One turn of the conversation, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("Hello");
        assert_eq!(user.sender, Sender::User);
        assert_eq!(user.text, "Hello");
        assert!(user.timestamp <= Utc::now());

        let assistant = Message::assistant("Hi");
        assert_eq!(assistant.sender, Sender::Assistant);
    }

    #[test]
    fn test_sender_strings() {
        assert_eq!(Sender::User.as_str(), "user");
        assert_eq!(Sender::Assistant.as_str(), "assistant");
        assert_eq!(Sender::User.label(), "You");
        assert_eq!(Sender::Assistant.label(), "Assistant");
    }

    #[test]
    fn test_message_serializes_lowercase_sender() {
        let json = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(json["sender"], "assistant");
        assert_eq!(json["text"], "ok");
    }
}
