//! `POST/GET/PUT/DELETE /documents[/{id}]` (spec §6, supplemented per
//! SPEC_FULL §10.6 — the core's change-apply endpoint needs documents to
//! exist before it can be exercised end-to-end).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::authz;
use crate::db::{Document, DocumentFieldUpdate, ListFilter, NewDocument, Store};
use crate::error::Error;
use crate::principal::Principal;

use super::{parse_document_id, AppState, ValidatedJson};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: JsonValue,
    pub is_public: bool,
    pub allow_comments: bool,
    pub allow_suggestions: bool,
    pub require_approval: bool,
    pub owner_id: Uuid,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            body: doc.body,
            tags: doc.tags,
            is_public: doc.is_public,
            allow_comments: doc.allow_comments,
            allow_suggestions: doc.allow_suggestions,
            require_approval: doc.require_approval,
            owner_id: doc.owner_id,
            revision: doc.revision,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            last_edited_at: doc.last_edited_at,
        }
    }
}

fn validate_title(title: &str) -> Result<(), Error> {
    if title.is_empty() || title.chars().count() > 255 {
        return Err(Error::BadRequest("title must be 1..=255 characters".into()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), Error> {
    if description.chars().count() > 1000 {
        return Err(Error::BadRequest(
            "description must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), Error> {
    for tag in tags {
        if tag.is_empty() || tag.chars().count() > 50 {
            return Err(Error::BadRequest(
                "each tag must be 1..=50 characters".into(),
            ));
        }
    }
    Ok(())
}

/// Distinguishes "field omitted" (`None`) from "field explicitly set to
/// `null`" (`Some(None)`) for `PUT /documents/{id}`'s partial update.
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub allow_comments: Option<bool>,
    #[serde(default)]
    pub allow_suggestions: Option<bool>,
    #[serde(default)]
    pub require_approval: Option<bool>,
}

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), Error> {
    validate_title(&req.title)?;
    if let Some(description) = &req.description {
        validate_description(description)?;
    }
    validate_tags(&req.tags)?;

    let body = req.content.unwrap_or_default();
    if body.len() > state.config.max_document_bytes {
        return Err(Error::BadRequest(
            "document body exceeds the configured size ceiling".into(),
        ));
    }

    let doc = state
        .db
        .create_document(NewDocument {
            title: req.title,
            description: req.description,
            body,
            tags: req.tags,
            is_public: req.is_public.unwrap_or(false),
            allow_comments: req.allow_comments.unwrap_or(true),
            allow_suggestions: req.allow_suggestions.unwrap_or(true),
            require_approval: req.require_approval.unwrap_or(false),
            owner_id: principal.0,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(doc.into())))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<Json<DocumentResponse>, Error> {
    let id = parse_document_id(&id)?;
    let doc = state.db.get_document(id).await?;
    if !authz::can_read(&state.db.conn, &doc, principal).await? {
        return Err(Error::NotFound(format!("document {id} not found")));
    }
    Ok(Json(doc.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub allow_comments: Option<bool>,
    pub allow_suggestions: Option<bool>,
    pub require_approval: Option<bool>,
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, Error> {
    let id = parse_document_id(&id)?;
    let doc = state.db.get_document(id).await?;
    if !authz::can_write(&state.db.conn, &doc, principal).await? {
        return Err(Error::Forbidden(
            "not authorized to modify this document".into(),
        ));
    }

    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(Some(description)) = &req.description {
        validate_description(description)?;
    }
    if let Some(tags) = &req.tags {
        validate_tags(tags)?;
    }

    let updated = state
        .db
        .update_document_fields(
            id,
            DocumentFieldUpdate {
                title: req.title,
                description: req.description,
                tags: req.tags,
                is_public: req.is_public,
                allow_comments: req.allow_comments,
                allow_suggestions: req.allow_suggestions,
                require_approval: req.require_approval,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Principal,
) -> Result<StatusCode, Error> {
    let id = parse_document_id(&id)?;
    let doc = state.db.get_document(id).await?;
    if doc.owner_id != principal.0 {
        return Err(Error::NotFound(format!("document {id} not found")));
    }
    state.db.delete_document(id).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub public: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
    _principal: Principal,
) -> Result<Json<Vec<DocumentResponse>>, Error> {
    if let Some(search) = &query.search {
        if search.is_empty() || search.chars().count() > 100 {
            return Err(Error::BadRequest(
                "search must be 1..=100 characters".into(),
            ));
        }
    }
    let limit = query.limit.unwrap_or(10);
    if !(1..=100).contains(&limit) {
        return Err(Error::BadRequest("limit must be between 1 and 100".into()));
    }
    let offset = query.offset.unwrap_or(0);

    let docs = state
        .db
        .list_documents(ListFilter {
            search: query.search,
            public_only: query.public,
            limit,
            offset,
        })
        .await?;
    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}
