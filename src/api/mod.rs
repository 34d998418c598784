//! HTTP + real-time surface (spec §6). Handlers are deliberately thin:
//! extract, validate, call a `Store`/`Hub`/Change-Engine method, map errors,
//! respond. `AppState` is the one piece of shared, `Clone`-cheap state axum
//! hands to every handler.

pub mod changes;
pub mod documents;
pub mod ws;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::HttpBody;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::http::Request;
use axum::routing::{get, post};
use axum::{BoxError, Json, Router};
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::db::Database;
use crate::error::Error;
use crate::hub::Hub;
use crate::principal::Principal;

pub struct AppState {
    pub db: Database,
    pub hub: Hub,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/documents",
            get(documents::list_documents).post(documents::create_document),
        )
        .route(
            "/documents/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/documents/:id/changes", post(changes::apply_changes))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reads the principal the identity-provider proxy attaches to every
/// authenticated request. The core never authenticates callers itself
/// (spec §1 Non-goals) — it trusts whatever this header carries once the
/// reverse proxy in front of it has validated the caller's session.
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-principal-id")
            .ok_or(Error::Unauthorized)?;
        let raw = header.to_str().map_err(|_| Error::Unauthorized)?;
        let id = Uuid::parse_str(raw).map_err(|_| Error::Unauthorized)?;
        Ok(Principal(id))
    }
}

pub(crate) fn parse_document_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::BadRequest("invalid document id".into()))
}

/// Wraps `axum::Json` so a malformed or mismatched-shape request body
/// still produces this crate's uniform error response (spec §7), rather
/// than axum's own default `JsonRejection` response bypassing it.
pub(crate) struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

fn map_json_rejection(rejection: JsonRejection) -> Error {
    Error::BadRequest(format!("request body failed to parse: {rejection}"))
}
