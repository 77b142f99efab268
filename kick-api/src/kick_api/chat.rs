//! Kick Chat API types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Longest chat message Kick accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Who a chat message is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageType {
    /// Sent as the authenticated user, to the channel named by `broadcaster_user_id`.
    User,
    /// Sent as the application's bot account, to the channel it is attached to.
    Bot,
}

/// A chat message to post.
///
/// ```
/// use kick_api::ChatMessage;
///
/// let message = ChatMessage::user(1234, "hello chat").reply_to("a1b2c3");
/// assert_eq!(message.broadcaster_user_id, Some(1234));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub message_type: ChatMessageType,
    /// Required for [`ChatMessageType::User`], ignored by Kick for bots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcaster_user_id: Option<u64>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
}

impl ChatMessage {
    pub fn user(broadcaster_user_id: u64, content: impl Into<String>) -> Self {
        Self {
            message_type: ChatMessageType::User,
            broadcaster_user_id: Some(broadcaster_user_id),
            content: content.into(),
            reply_to_message_id: None,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            message_type: ChatMessageType::Bot,
            broadcaster_user_id: None,
            content: content.into(),
            reply_to_message_id: None,
        }
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to_message_id = Some(message_id.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::bad_request("chat message content is required"));
        }
        let length = self.content.chars().count();
        if length > MAX_MESSAGE_LENGTH {
            return Err(Error::bad_request(format!(
                "chat message is {length} characters, the limit is {MAX_MESSAGE_LENGTH}"
            )));
        }
        if self.message_type == ChatMessageType::User && self.broadcaster_user_id.is_none() {
            return Err(Error::bad_request(
                "user chat messages require a broadcaster_user_id",
            ));
        }
        Ok(())
    }
}

/// Kick's acknowledgement of a posted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedChatMessage {
    pub is_sent: bool,
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn length_is_counted_in_characters() {
        assert!(ChatMessage::bot("é".repeat(500)).validate().is_ok());
        let err = ChatMessage::bot("a".repeat(501)).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            ChatMessage::bot("").validate().unwrap_err().kind(),
            ErrorKind::BadRequest
        );
    }

    #[test]
    fn user_messages_need_a_broadcaster() {
        let message = ChatMessage {
            broadcaster_user_id: None,
            ..ChatMessage::user(1, "hi")
        };
        assert_eq!(message.validate().unwrap_err().kind(), ErrorKind::BadRequest);
        assert!(ChatMessage::user(1, "hi").validate().is_ok());
    }

    #[test]
    fn serializes_wire_shape() {
        assert_eq!(
            serde_json::to_value(ChatMessage::bot("hi")).unwrap(),
            serde_json::json!({"type": "bot", "content": "hi"})
        );
        assert_eq!(
            serde_json::to_value(ChatMessage::user(9, "yo").reply_to("m1")).unwrap(),
            serde_json::json!({
                "type": "user",
                "broadcaster_user_id": 9,
                "content": "yo",
                "reply_to_message_id": "m1",
            })
        );
    }
}
