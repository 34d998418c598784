use sea_orm::entity::prelude::*;

/// Spec §3 Operation Record. Append-only, keyed by `(document_id,
/// sequence)`; `sequence` is strictly increasing per document.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub document_id: Uuid,
    pub sequence: i64,
    pub kind: OperationKind,
    pub position: i64,
    pub length: i64,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub principal_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[sea_orm(string_value = "insert")]
    Insert,
    #[sea_orm(string_value = "delete")]
    Delete,
    #[sea_orm(string_value = "replace")]
    Replace,
}

impl OperationKind {
    /// Classifies an applied change per spec §8 Boundary behaviors: empty
    /// `newText` is a deletion, empty `textToReplace` is an insertion,
    /// anything else is a replace.
    pub fn classify(text_to_replace: &str, new_text: &str) -> Self {
        if new_text.is_empty() {
            OperationKind::Delete
        } else if text_to_replace.is_empty() {
            OperationKind::Insert
        } else {
            OperationKind::Replace
        }
    }
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
