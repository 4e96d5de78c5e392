//! The service side of a CRUD controller.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use inkwell_core::error::AppError;
use inkwell_core::result::AppResult;
use inkwell_core::types::{PageResponse, TrashMode};

use super::action::CrudAction;
use crate::extractors::Caller;

/// Body of update requests: the target id next to the changed fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInput<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Validate> Validate for UpdateInput<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.data.validate()
    }
}

/// Body of delete requests.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeleteInput {
    #[validate(length(min = 1, message = "items must not be empty"))]
    pub items: Vec<Uuid>,
    /// Move to the trash instead of deleting for good.
    #[serde(default = "default_trash")]
    pub trash: bool,
}

fn default_trash() -> bool {
    true
}

/// Body of restore requests.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RestoreInput {
    #[validate(length(min = 1, message = "items must not be empty"))]
    pub items: Vec<Uuid>,
}

/// `?trashed=` on detail requests.
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
pub struct DetailQuery {
    #[serde(default)]
    pub trashed: TrashMode,
}

/// Placeholder for DTO slots a service does not use.
#[derive(Debug, Clone, Copy, Default, Deserialize, Validate)]
pub struct NoInput {}

/// Operations backing the generic CRUD handlers.
///
/// Only the actions named in [`ACTIONS`](Self::ACTIONS) are implemented;
/// the registrar refuses to bind any other action unless the controller
/// provides its own handler for it.
#[async_trait]
pub trait CrudService: Send + Sync + 'static {
    type Item: Serialize + Send;
    type ListQuery: DeserializeOwned + Validate + Send + 'static;
    type StoreDto: DeserializeOwned + Validate + Send + 'static;
    type UpdateDto: DeserializeOwned + Validate + Send + 'static;

    const ACTIONS: &'static [CrudAction];

    async fn list(&self, _caller: &Caller, _query: Self::ListQuery) -> AppResult<PageResponse<Self::Item>> {
        Err(unsupported(CrudAction::List))
    }

    async fn detail(&self, _caller: &Caller, _id: Uuid, _trash: TrashMode) -> AppResult<Self::Item> {
        Err(unsupported(CrudAction::Detail))
    }

    async fn store(&self, _caller: &Caller, _data: Self::StoreDto) -> AppResult<Self::Item> {
        Err(unsupported(CrudAction::Store))
    }

    async fn update(&self, _caller: &Caller, _id: Uuid, _data: Self::UpdateDto) -> AppResult<Self::Item> {
        Err(unsupported(CrudAction::Update))
    }

    async fn delete(&self, _caller: &Caller, _input: DeleteInput) -> AppResult<Vec<Self::Item>> {
        Err(unsupported(CrudAction::Delete))
    }

    async fn restore(&self, _caller: &Caller, _input: RestoreInput) -> AppResult<Vec<Self::Item>> {
        Err(unsupported(CrudAction::Restore))
    }

    /// Trim a serialized item for a serialization group.
    fn shape(&self, item: Value, _group: Option<&str>) -> Value {
        item
    }
}

fn unsupported(action: CrudAction) -> AppError {
    AppError::not_implemented(format!("Action '{action}' is not implemented"))
}

/// Short type name used in the route table and API documents.
pub(crate) fn dto_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Rename {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_update_input_flattens_fields() {
        let id = Uuid::new_v4();
        let input: UpdateInput<Rename> =
            serde_json::from_value(json!({ "id": id, "name": "draft" })).unwrap();
        assert_eq!(input.id, id);
        assert_eq!(input.data.name, "draft");

        let empty: UpdateInput<Rename> =
            serde_json::from_value(json!({ "id": id, "name": "" })).unwrap();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_delete_defaults_to_trash() {
        let input: DeleteInput = serde_json::from_value(json!({ "items": [Uuid::new_v4()] })).unwrap();
        assert!(input.trash);
        let input: DeleteInput = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_batch_bodies_reject_extra_targets() {
        let body = json!({ "id": Uuid::new_v4(), "items": [Uuid::new_v4()] });
        assert!(serde_json::from_value::<DeleteInput>(body.clone()).is_err());
        assert!(serde_json::from_value::<RestoreInput>(body).is_err());
    }

    #[test]
    fn test_dto_name() {
        assert_eq!(dto_name::<DeleteInput>(), "DeleteInput");
        assert_eq!(dto_name::<UpdateInput<Rename>>(), "UpdateInput");
    }
}
