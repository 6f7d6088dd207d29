//! Collections and communities: the containers items are filed under.

use crate::models::entity::{EntityKind, RepositoryEntity};

/// A collection an item can belong to. Only its identity matters here.
#[derive(Clone, Debug)]
pub struct Collection {
    pub entity: RepositoryEntity,
}

impl Collection {
    pub fn new(uuid: &str, handle: &str, name: &str) -> Self {
        Self {
            entity: RepositoryEntity::new(uuid, handle, name).with_kind(EntityKind::Collection),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        self.entity.identifier()
    }
}

/// Top-level container of collections.
#[derive(Clone, Debug)]
pub struct Community {
    pub entity: RepositoryEntity,
    pub collections: Vec<Collection>,
}

impl Community {
    pub fn new(uuid: &str, handle: &str, name: &str) -> Self {
        Self {
            entity: RepositoryEntity::new(uuid, handle, name).with_kind(EntityKind::Community),
            collections: Vec::new(),
        }
    }
}
