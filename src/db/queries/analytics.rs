use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::db::tables::analytics_event::ActiveModel;
use crate::error::Error;

/// Inserts one analytics record summarizing a Change Engine request (spec
/// §4.1 persistence order step iii). Fire-and-forget from the caller's
/// perspective — failures here still roll back the whole transaction,
/// since this spec treats it as part of the atomic write, not a
/// best-effort side channel.
pub async fn insert<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    principal_id: Uuid,
    request_type: &str,
    total_changes: i64,
    applied_changes: i64,
    per_op: Json,
) -> Result<(), Error> {
    let model = ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        document_id: Set(document_id),
        principal_id: Set(principal_id),
        request_type: Set(request_type.to_string()),
        total_changes: Set(total_changes),
        applied_changes: Set(applied_changes),
        per_op: Set(per_op),
        created_at: Set(Utc::now()),
    };
    model.insert(conn).await?;
    Ok(())
}
