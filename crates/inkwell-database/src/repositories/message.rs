//! Message repository implementation.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use inkwell_core::error::{AppError, ErrorKind};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageRequest, PageResponse};
use inkwell_entity::message::{CreateMessage, Message, MessageReceipt, MessageRow, ReceiptRow};

const SELECT_MESSAGE: &str = "SELECT m.id, m.title, m.body, m.kind, m.sender_id, \
     u.username AS sender_username, u.nickname AS sender_nickname, m.created_at \
     FROM user_messages m JOIN users u ON u.id = m.sender_id";

/// Which side of a conversation a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageBox {
    Sent,
    Received,
}

/// Repository for `user_messages` and `message_receipts`.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A user's sent or received messages, newest first.
    pub async fn paginate(
        &self,
        user_id: Uuid,
        mailbox: MessageBox,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Message>> {
        let clause = match mailbox {
            MessageBox::Sent => "m.sender_id = $1",
            MessageBox::Received => {
                "EXISTS (SELECT 1 FROM message_receipts r WHERE r.message_id = m.id AND r.receiver_id = $1)"
            }
        };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM user_messages m WHERE {clause}"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count messages", e))?;

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "{SELECT_MESSAGE} WHERE {clause} ORDER BY m.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list messages", e))?;

        let items = self.with_receipts(rows).await?;
        Ok(PageResponse::new(items, page, total as u64))
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!("{SELECT_MESSAGE} WHERE m.id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load messages", e))?;
        self.with_receipts(rows).await
    }

    /// Insert a message and one receipt per receiver.
    pub async fn create(&self, data: &CreateMessage) -> AppResult<Uuid> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO user_messages (title, body, kind, sender_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&data.title)
        .bind(&data.body)
        .bind(&data.kind)
        .bind(data.sender_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create message", e))?;

        sqlx::query(
            "INSERT INTO message_receipts (message_id, receiver_id) \
             SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&data.receivers)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to deliver message", e))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit message", e)
        })?;
        Ok(id)
    }

    /// Delete whole messages (sender side).
    pub async fn delete(&self, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM user_messages WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete messages", e))
    }

    /// Drop the receiver's copies of the given messages.
    pub async fn delete_receipts(&self, receiver_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query("DELETE FROM message_receipts WHERE receiver_id = $1 AND message_id = ANY($2)")
            .bind(receiver_id)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete receipts", e))
    }

    pub async fn mark_read(&self, receiver_id: Uuid, ids: &[Uuid]) -> AppResult<u64> {
        sqlx::query(
            "UPDATE message_receipts SET readed = TRUE \
             WHERE receiver_id = $1 AND message_id = ANY($2)",
        )
        .bind(receiver_id)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark messages read", e))
    }

    async fn with_receipts(&self, rows: Vec<MessageRow>) -> AppResult<Vec<Message>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let receipts = sqlx::query_as::<_, ReceiptRow>(
            "SELECT r.id, r.message_id, r.receiver_id, u.username AS receiver_username, \
             u.nickname AS receiver_nickname, r.readed \
             FROM message_receipts r JOIN users u ON u.id = r.receiver_id \
             WHERE r.message_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load receipts", e))?;

        let mut grouped: HashMap<Uuid, Vec<MessageReceipt>> = HashMap::new();
        for receipt in receipts {
            grouped
                .entry(receipt.message_id)
                .or_default()
                .push(receipt.into());
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let receipts = grouped.remove(&row.id).unwrap_or_default();
                row.into_message(receipts)
            })
            .collect())
    }
}
