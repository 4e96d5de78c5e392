//! Sending and reading messages.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_database::repositories::{MessageBox, MessageRepository, UserRepository};
use inkwell_entity::message::{CreateMessage, Message};

#[derive(Debug, Clone)]
pub struct MessageService {
    messages: MessageRepository,
    users: UserRepository,
}

impl MessageService {
    pub fn new(messages: MessageRepository, users: UserRepository) -> Self {
        Self { messages, users }
    }

    pub async fn sent(&self, user_id: Uuid, page: &PageRequest) -> AppResult<PageResponse<Message>> {
        self.messages
            .paginate(user_id, MessageBox::Sent, &page.normalized())
            .await
    }

    pub async fn inbox(&self, user_id: Uuid, page: &PageRequest) -> AppResult<PageResponse<Message>> {
        self.messages
            .paginate(user_id, MessageBox::Received, &page.normalized())
            .await
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Message>> {
        self.messages.find_by_ids(ids).await
    }

    pub async fn detail(&self, id: Uuid) -> AppResult<Message> {
        self.messages
            .find_by_ids(&[id])
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("Message not found"))
    }

    /// Send a message. Every receiver must exist; duplicates and the
    /// sender are dropped from the list.
    pub async fn send(&self, mut data: CreateMessage) -> AppResult<Message> {
        if data.body.trim().is_empty() {
            return Err(AppError::validation("Message body cannot be empty"));
        }
        let mut seen = HashSet::new();
        data.receivers
            .retain(|id| *id != data.sender_id && seen.insert(*id));
        if data.receivers.is_empty() {
            return Err(AppError::validation("A message needs at least one receiver"));
        }

        let existing: HashSet<Uuid> = self.users.existing_ids(&data.receivers).await?.into_iter().collect();
        if let Some(missing) = data.receivers.iter().find(|id| !existing.contains(id)) {
            return Err(AppError::validation(format!("Receiver {missing} does not exist")));
        }

        let id = self.messages.create(&data).await?;
        info!(
            message_id = %id,
            sender_id = %data.sender_id,
            receivers = data.receivers.len(),
            "Message sent"
        );
        self.detail(id).await
    }

    /// Delete messages from the sender's side, receipts included.
    pub async fn delete_sent(&self, ids: &[Uuid]) -> AppResult<Vec<Message>> {
        let messages = self.messages.find_by_ids(ids).await?;
        if messages.is_empty() {
            return Err(AppError::not_found("Message not found"));
        }
        let targets: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        self.messages.delete(&targets).await?;
        Ok(messages)
    }

    /// Remove messages from a receiver's inbox.
    pub async fn delete_received(&self, receiver_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        let removed = self.messages.delete_receipts(receiver_id, ids).await?;
        if removed == 0 {
            return Err(AppError::not_found("Message not found"));
        }
        Ok(removed)
    }

    pub async fn mark_read(&self, receiver_id: Uuid, ids: &[Uuid]) -> AppResult<Vec<Message>> {
        self.messages.mark_read(receiver_id, ids).await?;
        self.messages.find_by_ids(ids).await
    }
}
