//! Sent box and inbox controllers.
//!
//! Both sides of a message are guarded by their own custom verb: the
//! sender's copy by `sended-manage` (matched on `sender.id`), a
//! receiver's copy by `recevied-manage` (matched on
//! `receivers.receiver.id`).

use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::http::Method;
use axum::routing::patch;
use uuid::Uuid;

use inkwell_auth::rbac::{PermissionAction, PermissionChecker};
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};
use inkwell_entity::message::Message;
use inkwell_service::MessageService;
use inkwell_service::message::rbac::{RECEIVED_MANAGE, SENT_MANAGE};

use crate::crud::{Controller, CrudAction, CrudOptions, CrudService, DeleteInput, NoInput, hook_option};
use crate::dto::request::{MarkReadRequest, MessageInput};
use crate::error::ApiResult;
use crate::extractors::{AuthUser, Caller, ListQuery, ValidatedJson};
use crate::middleware::GuardContext;
use crate::state::AppState;

fn message_checker(verb: &str) -> PermissionChecker<AppState> {
    PermissionChecker::owner::<Message, _, _>(
        PermissionAction::custom(verb),
        |state: AppState, ids: Vec<Uuid>| async move { state.messages.find_by_ids(&ids).await },
    )
}

/// Messages the caller sent.
pub struct SentMessages {
    messages: MessageService,
}

#[async_trait]
impl CrudService for SentMessages {
    type Item = Message;
    type ListQuery = ListQuery;
    type StoreDto = MessageInput;
    type UpdateDto = NoInput;

    const ACTIONS: &'static [CrudAction] = &[
        CrudAction::List,
        CrudAction::Detail,
        CrudAction::Store,
        CrudAction::Delete,
    ];

    async fn list(&self, caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Message>> {
        self.messages.sent(caller.user_id()?, &query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Message> {
        self.messages.detail(id).await
    }

    async fn store(&self, caller: &Caller, data: MessageInput) -> AppResult<Message> {
        self.messages.send(data.into_create(caller.user_id()?)).await
    }

    async fn delete(&self, _caller: &Caller, input: DeleteInput) -> AppResult<Vec<Message>> {
        self.messages.delete_sent(&input.items).await
    }
}

pub fn sent_controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(SentMessages {
        messages: ctx.state.messages.clone(),
    });
    let options = CrudOptions::new("message")
        .action(CrudAction::List, hook_option("Sent messages", false, vec![]))
        .action(
            CrudAction::Detail,
            hook_option("Sent message detail", false, vec![message_checker(SENT_MANAGE)]),
        )
        .action(
            CrudAction::Store,
            hook_option(
                "Send a message",
                false,
                vec![PermissionChecker::can(PermissionAction::Create, "Message")],
            ),
        )
        .action(
            CrudAction::Delete,
            hook_option("Delete sent messages", false, vec![message_checker(SENT_MANAGE)]),
        );

    Controller::new("sent-messages", "/messages/sent", ctx.clone()).crud(service, options)
}

/// Messages addressed to the caller.
pub struct Inbox {
    messages: MessageService,
}

#[async_trait]
impl CrudService for Inbox {
    type Item = Message;
    type ListQuery = ListQuery;
    type StoreDto = NoInput;
    type UpdateDto = NoInput;

    const ACTIONS: &'static [CrudAction] = &[CrudAction::List, CrudAction::Detail, CrudAction::Delete];

    async fn list(&self, caller: &Caller, query: ListQuery) -> AppResult<PageResponse<Message>> {
        self.messages.inbox(caller.user_id()?, &query.page_request()).await
    }

    async fn detail(&self, _caller: &Caller, id: Uuid, _trash: TrashMode) -> AppResult<Message> {
        self.messages.detail(id).await
    }

    /// Removes the caller's receipts; the sender keeps the message.
    async fn delete(&self, caller: &Caller, input: DeleteInput) -> AppResult<Vec<Message>> {
        let messages = self.messages.find_by_ids(&input.items).await?;
        self.messages
            .delete_received(caller.user_id()?, &input.items)
            .await?;
        Ok(messages)
    }
}

pub fn inbox_controller(ctx: &GuardContext<AppState>) -> AppResult<Controller<AppState>> {
    let service = Arc::new(Inbox {
        messages: ctx.state.messages.clone(),
    });
    let options = CrudOptions::new("message")
        .action(CrudAction::List, hook_option("Received messages", false, vec![]))
        .action(
            CrudAction::Detail,
            hook_option("Received message detail", false, vec![message_checker(RECEIVED_MANAGE)]),
        )
        .action(
            CrudAction::Delete,
            hook_option(
                "Remove messages from the inbox",
                false,
                vec![message_checker(RECEIVED_MANAGE)],
            ),
        );

    Ok(Controller::new("inbox", "/messages/inbox", ctx.clone())
        .crud(service, options)?
        .endpoint(
            "read",
            Method::PATCH,
            "/read",
            hook_option("Mark messages as read", false, vec![message_checker(RECEIVED_MANAGE)]),
            patch(mark_read),
        ))
}

/// PATCH /messages/inbox/read
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<MarkReadRequest>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.messages.mark_read(actor.id, &req.items).await?;
    Ok(Json(messages))
}
