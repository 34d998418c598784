pub mod analytics_event;
pub mod collaborator_binding;
pub mod document;
pub mod operation;

pub use analytics_event::Entity as AnalyticsEvent;
pub use collaborator_binding::Entity as CollaboratorBinding;
pub use document::Entity as Document;
pub use operation::Entity as Operation;
