use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated identity, supplied by the external identity provider.
///
/// The core never authenticates a caller itself — it trusts whatever
/// principal the HTTP/real-time layer attaches to the request after
/// validating a session with the identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub Uuid);

impl Principal {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
