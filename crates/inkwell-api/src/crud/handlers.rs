//! Generic handlers bound for the standard actions.

use std::sync::Arc;

use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, delete, get, patch, post};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::{Caller, ValidatedJson, ValidatedQuery};

use super::action::CrudAction;
use super::service::{CrudService, DeleteInput, DetailQuery, RestoreInput, UpdateInput};

/// The generic handler for `action`, bound to `service`.
pub(crate) fn base_route<C, S>(
    action: CrudAction,
    service: Arc<C>,
    group: Option<String>,
) -> MethodRouter<S>
where
    C: CrudService,
    S: Clone + Send + Sync + 'static,
{
    let group: Arc<Option<String>> = Arc::new(group);
    match action {
        CrudAction::List => get(
            move |caller: Caller, ValidatedQuery(query): ValidatedQuery<C::ListQuery>| {
                list(service, group, caller, query)
            },
        ),
        CrudAction::Detail => get(
            move |caller: Caller,
                  Path(id): Path<Uuid>,
                  ValidatedQuery(query): ValidatedQuery<DetailQuery>| {
                detail(service, group, caller, id, query)
            },
        ),
        CrudAction::Store => post(
            move |caller: Caller, ValidatedJson(data): ValidatedJson<C::StoreDto>| {
                store(service, group, caller, data)
            },
        ),
        CrudAction::Update => patch(
            move |caller: Caller, ValidatedJson(input): ValidatedJson<UpdateInput<C::UpdateDto>>| {
                update(service, group, caller, input)
            },
        ),
        CrudAction::Delete => delete(
            move |caller: Caller, ValidatedJson(input): ValidatedJson<DeleteInput>| {
                remove(service, group, caller, input)
            },
        ),
        CrudAction::Restore => patch(
            move |caller: Caller, ValidatedJson(input): ValidatedJson<RestoreInput>| {
                restore(service, group, caller, input)
            },
        ),
    }
}

fn shape_one<C: CrudService>(service: &C, group: &Option<String>, item: &C::Item) -> ApiResult<Value> {
    Ok(service.shape(serde_json::to_value(item)?, group.as_deref()))
}

fn shape_all<C: CrudService>(
    service: &C,
    group: &Option<String>,
    items: &[C::Item],
) -> ApiResult<Vec<Value>> {
    items.iter().map(|item| shape_one(service, group, item)).collect()
}

async fn list<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    query: C::ListQuery,
) -> ApiResult<Json<Value>> {
    let page = service.list(&caller, query).await?;
    let items = shape_all(&*service, &group, &page.items)?;
    Ok(Json(json!({ "items": items, "meta": page.meta })))
}

async fn detail<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    id: Uuid,
    query: DetailQuery,
) -> ApiResult<Json<Value>> {
    let item = service.detail(&caller, id, query.trashed).await?;
    Ok(Json(shape_one(&*service, &group, &item)?))
}

async fn store<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    data: C::StoreDto,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let item = service.store(&caller, data).await?;
    Ok((StatusCode::CREATED, Json(shape_one(&*service, &group, &item)?)))
}

async fn update<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    input: UpdateInput<C::UpdateDto>,
) -> ApiResult<Json<Value>> {
    let item = service.update(&caller, input.id, input.data).await?;
    Ok(Json(shape_one(&*service, &group, &item)?))
}

async fn remove<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    input: DeleteInput,
) -> ApiResult<Json<Value>> {
    let items = service.delete(&caller, input).await?;
    Ok(Json(Value::Array(shape_all(&*service, &group, &items)?)))
}

async fn restore<C: CrudService>(
    service: Arc<C>,
    group: Arc<Option<String>>,
    caller: Caller,
    input: RestoreInput,
) -> ApiResult<Json<Value>> {
    let items = service.restore(&caller, input).await?;
    Ok(Json(Value::Array(shape_all(&*service, &group, &items)?)))
}
