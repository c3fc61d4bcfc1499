/// Which side of the relation holds the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationDirection {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Multi,
}

/// The four shapes a relation traversal can take. Reverse relations
/// inherit their cardinality from the forward definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    ForwardSingle,
    ForwardMulti,
    ReverseSingle,
    ReverseMulti,
}

/// The linking table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionTable {
    pub table: String,
    pub parent_column: String,
    pub related_column: String,
}

/// A relation between two entities as seen from one side.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Name the client queries the relation by.
    pub name: String,
    /// Name the database knows the relation by.
    pub db_name: String,
    pub direction: RelationDirection,
    pub cardinality: Cardinality,
    /// Name of the referenced entity. `None` for polymorphic targets whose
    /// entity is unknown until materialization; callers must not recurse
    /// into those.
    pub related_entity: Option<String>,
    /// The foreign key column on whichever side holds it.
    pub foreign_key: String,
    pub junction_table: Option<JunctionTable>,
}

impl Relation {
    pub fn forward_single(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationDirection::Forward, Cardinality::Single, related_entity, foreign_key)
    }

    pub fn forward_multi(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationDirection::Forward, Cardinality::Multi, related_entity, foreign_key)
    }

    pub fn reverse_single(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationDirection::Reverse, Cardinality::Single, related_entity, foreign_key)
    }

    pub fn reverse_multi(
        name: impl Into<String>,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(name, RelationDirection::Reverse, Cardinality::Multi, related_entity, foreign_key)
    }

    fn new(
        name: impl Into<String>,
        direction: RelationDirection,
        cardinality: Cardinality,
        related_entity: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let name = name.into();

        Self {
            db_name: name.clone(),
            name,
            direction,
            cardinality,
            related_entity: Some(related_entity.into()),
            foreign_key: foreign_key.into(),
            junction_table: None,
        }
    }

    /// A relation whose target entity is only known at materialization
    /// time (generic foreign keys, union branches).
    pub fn polymorphic(name: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            db_name: name.clone(),
            name,
            direction: RelationDirection::Forward,
            cardinality: Cardinality::Single,
            related_entity: None,
            foreign_key: foreign_key.into(),
            junction_table: None,
        }
    }

    pub fn db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn through(mut self, junction: JunctionTable) -> Self {
        self.junction_table = Some(junction);
        self
    }

    pub fn kind(&self) -> RelationKind {
        match (self.direction, self.cardinality) {
            (RelationDirection::Forward, Cardinality::Single) => RelationKind::ForwardSingle,
            (RelationDirection::Forward, Cardinality::Multi) => RelationKind::ForwardMulti,
            (RelationDirection::Reverse, Cardinality::Single) => RelationKind::ReverseSingle,
            (RelationDirection::Reverse, Cardinality::Multi) => RelationKind::ReverseMulti,
        }
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::Multi
    }

    pub fn is_to_one(&self) -> bool {
        self.cardinality == Cardinality::Single
    }

    pub fn is_forward(&self) -> bool {
        self.direction == RelationDirection::Forward
    }

    pub fn is_many_to_many(&self) -> bool {
        self.junction_table.is_some()
    }

    pub fn is_polymorphic(&self) -> bool {
        self.related_entity.is_none()
    }
}
