use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::db::tables::operation::{ActiveModel, Column, Entity as Operation, Model as OperationModel, OperationKind};
use crate::error::Error;

/// Appends one operation record, assigning `sequence := max(sequence) + 1`
/// for the document (spec §3 Operation Record, §4.1 persistence order
/// step ii). Must run inside the same transaction as the body update that
/// produced it.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    kind: OperationKind,
    position: i64,
    length: i64,
    content: &str,
    principal_id: Uuid,
) -> Result<OperationModel, Error> {
    let last_sequence: Option<i64> = Operation::find()
        .filter(Column::DocumentId.eq(document_id))
        .order_by_desc(Column::Sequence)
        .select_only()
        .column(Column::Sequence)
        .into_tuple()
        .one(conn)
        .await?;

    let model = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        document_id: Set(document_id),
        sequence: Set(last_sequence.unwrap_or(0) + 1),
        kind: Set(kind),
        position: Set(position),
        length: Set(length),
        content: Set(content.to_string()),
        principal_id: Set(principal_id),
        created_at: Set(Utc::now()),
    };
    Ok(model.insert(conn).await?)
}

pub async fn list_for_document<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
) -> Result<Vec<OperationModel>, Error> {
    Ok(Operation::find()
        .filter(Column::DocumentId.eq(document_id))
        .order_by_asc(Column::Sequence)
        .all(conn)
        .await?)
}
