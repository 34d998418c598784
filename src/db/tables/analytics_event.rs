use sea_orm::entity::prelude::*;
use serde_json::Value as Json;

/// One analytics record per Change Engine request (spec §4.1 persistence
/// order, step iii): summarizes request shape, totals, and per-op outcomes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "analytics_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub document_id: Uuid,
    pub principal_id: Uuid,
    pub request_type: String,
    pub total_changes: i64,
    pub applied_changes: i64,
    pub per_op: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
