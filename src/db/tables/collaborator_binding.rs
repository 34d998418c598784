use sea_orm::entity::prelude::*;

/// Spec §3 Collaborator Binding. Uniqueness of `(document_id, principal_id)`
/// is enforced by a database-level unique index, not in application code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "collaborator_bindings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub document_id: Uuid,
    pub principal_id: Uuid,
    pub permission: Permission,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[sea_orm(string_value = "owner")]
    Owner,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "viewer")]
    Viewer,
    #[sea_orm(string_value = "commenter")]
    Commenter,
}

impl Permission {
    /// Permissions that satisfy the Change Engine's write gate (spec §4.1.b).
    pub fn can_write(self) -> bool {
        matches!(self, Permission::Owner | Permission::Editor)
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
