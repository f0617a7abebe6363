use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use smartlease_core::{add_property as insert_and_embed, PropertyRecord, SmartLeaseError};

use crate::models::{AddPropertyRequest, AddPropertyResponse};
use crate::state::AppState;

/// POST /properties - Insert one listing and embed it.
/// 201 on success, 409 if the id exists.
pub async fn add_property(
    State(state): State<AppState>,
    Json(req): Json<AddPropertyRequest>,
) -> (StatusCode, Json<AddPropertyResponse>) {
    let record = match PropertyRecord::from_fields(req.into_fields()) {
        Ok(record) => record,
        Err(e) => return reply(StatusCode::BAD_REQUEST, "error", None, Some(e.to_string())),
    };
    let property_id = record.property_id.clone();

    match insert_and_embed(&state.pool, state.embedder.as_ref(), &record).await {
        Ok(()) => reply(StatusCode::CREATED, "success", Some(property_id), None),
        Err(e @ SmartLeaseError::DuplicateProperty(_)) => reply(
            StatusCode::CONFLICT,
            "duplicate",
            Some(property_id),
            Some(e.to_string()),
        ),
        Err(e) => {
            tracing::error!("Failed to add property {property_id}: {e}");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                Some(property_id),
                Some(e.to_string()),
            )
        }
    }
}

fn reply(
    code: StatusCode,
    status: &str,
    property_id: Option<String>,
    message: Option<String>,
) -> (StatusCode, Json<AddPropertyResponse>) {
    (
        code,
        Json(AddPropertyResponse {
            status: status.to_string(),
            property_id,
            message,
        }),
    )
}
