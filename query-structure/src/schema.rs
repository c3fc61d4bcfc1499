use crate::{DomainError, EntityDescriptor, EntityRef, Relation};
use std::sync::Arc;

pub type SchemaRef = Arc<Schema>;

/// All entity descriptors of an application. Read-only after construction
/// and safe to share across requests.
#[derive(Debug)]
pub struct Schema {
    entities: Vec<EntityRef>,
}

impl Schema {
    pub fn new(entities: Vec<EntityDescriptor>) -> SchemaRef {
        Arc::new(Self {
            entities: entities.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn entities(&self) -> &[EntityRef] {
        &self.entities
    }

    pub fn find_entity(&self, name: &str) -> Result<EntityRef, DomainError> {
        self.entities
            .iter()
            .find(|entity| entity.name == name)
            .cloned()
            .ok_or_else(|| DomainError::EntityNotFound { name: name.to_owned() })
    }

    /// The entity a relation points at, or `None` for polymorphic targets.
    pub fn related_entity(&self, relation: &Relation) -> Option<EntityRef> {
        let name = relation.related_entity.as_deref()?;
        self.find_entity(name).ok()
    }
}
