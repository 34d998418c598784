use sea_orm::entity::prelude::*;
use serde_json::Value as Json;

/// Spec §3 Document. `revision` is the monotonic counter bumped exactly
/// when `body` changes; it and `body` are always written together.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// JSON array of tags, stored this way (rather than a Postgres native
    /// array) so the same schema runs unmodified against the sqlite
    /// test-support backend.
    pub tags: Json,
    pub is_public: bool,
    pub allow_comments: bool,
    pub allow_suggestions: bool,
    pub require_approval: bool,
    pub owner_id: Uuid,
    pub revision: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub last_edited_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::collaborator_binding::Entity")]
    CollaboratorBinding,
    #[sea_orm(has_many = "super::operation::Entity")]
    Operation,
    #[sea_orm(has_many = "super::analytics_event::Entity")]
    AnalyticsEvent,
}

impl Related<super::collaborator_binding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CollaboratorBinding.def()
    }
}

impl Related<super::operation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operation.def()
    }
}

impl Related<super::analytics_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalyticsEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
