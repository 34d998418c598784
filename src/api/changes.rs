//! `POST /documents/{id}/changes` (spec §6), backed entirely by the Change
//! Engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::change_engine::{self, ChangeRequest, ChangeResponse};
use crate::error::Error;
use crate::principal::Principal;

use super::{parse_document_id, AppState, ValidatedJson};

pub async fn apply_changes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
    ValidatedJson(request): ValidatedJson<ChangeRequest>,
) -> Result<Json<ChangeResponse>, Error> {
    let id = parse_document_id(&id)?;
    let response = change_engine::apply(
        &state.db,
        id,
        principal,
        request,
        state.config.max_batch_ops,
        state.config.max_document_bytes,
    )
    .await?;
    Ok(Json(response))
}
