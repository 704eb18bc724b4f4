//! Clipboard content handlers.
//!
//! - `GET /api/clipboards` - full ordered collection
//! - `POST /api/clipboards` - upsert one entry
//! - `DELETE /api/clipboards/:id` - remove one entry
//!
//! Mutations are applied by the hub, which broadcasts `clipboard-updated`
//! to every connected device before replying.

use crate::errors::HubError;
use crate::models::{ContentEntry, SuccessResponse, UpsertContentRequest};
use crate::routes::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Handler for GET /api/clipboards
#[instrument(skip_all, name = "hub.handlers.content")]
pub async fn list_clipboards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContentEntry>>, HubError> {
    Ok(Json(state.hub.list_content().await?))
}

/// Handler for POST /api/clipboards
///
/// # Request Body
///
/// ```json
/// { "id": "notes", "content": "hello", "name": "Notes" }
/// ```
///
/// `name` is optional and only replaces the stored name when non-empty.
///
/// # Response
///
/// - 200 OK: `{"success": true}`
/// - 400 Bad Request: missing or malformed fields
#[instrument(skip_all, name = "hub.handlers.content")]
pub async fn upsert_clipboard(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpsertContentRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, HubError> {
    let Json(request) = payload.map_err(|e| {
        debug!(target: "hub.handlers.content", error = %e, "Rejected clipboard body");
        HubError::Validation("Missing required fields: id and content".to_string())
    })?;

    if request.id.is_empty() {
        return Err(HubError::Validation(
            "Missing required fields: id and content".to_string(),
        ));
    }

    state
        .hub
        .upsert_content(request.id, request.content, request.name)
        .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Handler for DELETE /api/clipboards/:id
///
/// # Response
///
/// - 200 OK: `{"success": true}`, also when no entry had this id
/// - 400 Bad Request: the default clipboard cannot be deleted
#[instrument(skip(state), name = "hub.handlers.content")]
pub async fn delete_clipboard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, HubError> {
    state.hub.remove_content(id).await?;
    Ok(Json(SuccessResponse::ok()))
}
