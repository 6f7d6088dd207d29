use serde::{Deserialize, Serialize};

/// Typed link from an entity item to another item.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    /// Relationship type name, e.g. `isAuthorOfPublication`.
    pub relation_type: String,
    /// Stable identifier (uuid or handle) of the related item.
    pub identifier: String,
}

impl Relation {
    pub fn new(relation_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            relation_type: relation_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Line for the SAF `relationships` file.
    pub fn saf_line(&self) -> String {
        format!("relation.{} {}", self.relation_type, self.identifier)
    }
}
