//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::user::UserRef;

/// One recipient's copy of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub id: Uuid,
    pub receiver: UserRef,
    pub readed: bool,
}

/// A message sent by one user to one or more receivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: String,
    /// Client-side hint for icons or links.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sender: UserRef,
    pub receivers: Vec<MessageReceipt>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user_id` is among the receivers.
    pub fn is_received_by(&self, user_id: Uuid) -> bool {
        self.receivers.iter().any(|r| r.receiver.id == user_id)
    }
}

/// Flat row for `user_messages` joined with the sender.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub body: String,
    pub kind: Option<String>,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub sender_nickname: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Flat row for `message_receipts` joined with the receiver.
#[derive(Debug, Clone, FromRow)]
pub struct ReceiptRow {
    pub id: Uuid,
    pub message_id: Uuid,
    pub receiver_id: Uuid,
    pub receiver_username: String,
    pub receiver_nickname: Option<String>,
    pub readed: bool,
}

impl From<ReceiptRow> for MessageReceipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            id: row.id,
            receiver: UserRef {
                id: row.receiver_id,
                username: row.receiver_username,
                nickname: row.receiver_nickname,
            },
            readed: row.readed,
        }
    }
}

impl MessageRow {
    /// Attach the receipts that belong to this message.
    pub fn into_message(self, receipts: Vec<MessageReceipt>) -> Message {
        Message {
            id: self.id,
            title: self.title,
            body: self.body,
            kind: self.kind,
            sender: UserRef {
                id: self.sender_id,
                username: self.sender_username,
                nickname: self.sender_nickname,
            },
            receivers: receipts,
            created_at: self.created_at,
        }
    }
}

/// Data required to send a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    pub title: Option<String>,
    pub body: String,
    pub kind: Option<String>,
    pub sender_id: Uuid,
    pub receivers: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receivers_serialize_as_nested_path() {
        let receiver = Uuid::new_v4();
        let msg = MessageRow {
            id: Uuid::new_v4(),
            title: None,
            body: "hi".into(),
            kind: None,
            sender_id: Uuid::new_v4(),
            sender_username: "a".into(),
            sender_nickname: None,
            created_at: Utc::now(),
        }
        .into_message(vec![MessageReceipt {
            id: Uuid::new_v4(),
            receiver: UserRef::from_id(receiver),
            readed: false,
        }]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["receivers"][0]["receiver"]["id"], receiver.to_string());
        assert!(msg.is_received_by(receiver));
    }
}
