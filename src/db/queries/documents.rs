use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::json;
use uuid::Uuid;

use crate::db::tables::document::{ActiveModel, Column, Entity as Document, Model as DocumentModel};
use crate::error::Error;

pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub allow_comments: bool,
    pub allow_suggestions: bool,
    pub require_approval: bool,
    pub owner_id: Uuid,
}

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    new: NewDocument,
) -> Result<DocumentModel, Error> {
    let now = Utc::now();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(new.title),
        description: Set(new.description),
        body: Set(new.body),
        tags: Set(json!(new.tags)),
        is_public: Set(new.is_public),
        allow_comments: Set(new.allow_comments),
        allow_suggestions: Set(new.allow_suggestions),
        require_approval: Set(new.require_approval),
        owner_id: Set(new.owner_id),
        revision: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        last_edited_at: Set(now),
    };
    Ok(model.insert(conn).await?)
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<DocumentModel>, Error> {
    Ok(Document::find_by_id(id).one(conn).await?)
}

pub async fn get_for_read<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<DocumentModel, Error> {
    find_by_id(conn, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("document {id} not found")))
}

/// Atomically bumps `revision` via a `revision = revision + 1` update
/// clause (spec §5 Per-document serialization) and returns the row
/// post-update. Fails `NotFound` if the row doesn't exist (spec §4.1.i).
pub async fn update_body<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    new_body: &str,
) -> Result<DocumentModel, Error> {
    let now = Utc::now();
    let affected = Document::update_many()
        .col_expr(Column::Revision, Expr::col(Column::Revision).add(1))
        .col_expr(Column::Body, Expr::value(new_body))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .col_expr(Column::LastEditedAt, Expr::value(now))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;

    if affected.rows_affected == 0 {
        return Err(Error::NotFound(format!("document {id} not found")));
    }

    get_for_read(conn, id).await
}

pub struct DocumentFieldUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub allow_comments: Option<bool>,
    pub allow_suggestions: Option<bool>,
    pub require_approval: Option<bool>,
}

/// Partial update of metadata fields only (spec §6 `PUT /documents/{id}`).
/// Never touches `body` or `revision` — that is the Change Engine's and
/// the Hub's job exclusively.
pub async fn update_fields<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    update: DocumentFieldUpdate,
) -> Result<DocumentModel, Error> {
    let existing = get_for_read(conn, id).await?;
    let mut model: ActiveModel = existing.into();
    if let Some(title) = update.title {
        model.title = Set(title);
    }
    if let Some(description) = update.description {
        model.description = Set(description);
    }
    if let Some(tags) = update.tags {
        model.tags = Set(json!(tags));
    }
    if let Some(is_public) = update.is_public {
        model.is_public = Set(is_public);
    }
    if let Some(allow_comments) = update.allow_comments {
        model.allow_comments = Set(allow_comments);
    }
    if let Some(allow_suggestions) = update.allow_suggestions {
        model.allow_suggestions = Set(allow_suggestions);
    }
    if let Some(require_approval) = update.require_approval {
        model.require_approval = Set(require_approval);
    }
    model.updated_at = Set(Utc::now());
    Ok(model.update(conn).await?)
}

pub async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<(), Error> {
    let result = Document::delete_by_id(id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound(format!("document {id} not found")));
    }
    Ok(())
}

#[derive(Default)]
pub struct ListFilter {
    pub search: Option<String>,
    pub public_only: Option<bool>,
    pub limit: u64,
    pub offset: u64,
}

/// Backs the out-of-core `GET /documents?search=&public=` listing endpoint
/// (spec §6); shares the same `documents` table as the core so it is
/// implemented here rather than stubbed out.
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: ListFilter,
) -> Result<Vec<DocumentModel>, Error> {
    let mut query = Document::find();
    if let Some(search) = filter.search {
        query = query.filter(Column::Title.contains(&search));
    }
    if let Some(public_only) = filter.public_only {
        query = query.filter(Column::IsPublic.eq(public_only));
    }
    Ok(query
        .order_by_desc(Column::UpdatedAt)
        .limit(filter.limit)
        .offset(filter.offset)
        .all(conn)
        .await?)
}
