use crate::{Cardinality, OrderBy, Relation, ScalarColumn};
use std::sync::Arc;

pub type EntityRef = Arc<EntityDescriptor>;

/// The literal alias that always resolves to the primary key column.
pub const PK_ALIAS: &str = "pk";

/// Suffix used by reverse multi-valued relations without an explicit
/// back-reference name.
const REVERSE_SET_SUFFIX: &str = "_set";

/// A table-backed entity: scalar columns plus relations.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub table_name: String,
    pub primary_key: String,
    pub columns: Vec<ScalarColumn>,
    pub relations: Vec<Relation>,
    /// Ordering applied when a windowed batch has no explicit one.
    pub default_ordering: Vec<OrderBy>,
}

/// The classification of a name against an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Scalar(&'a ScalarColumn),
    Relation(&'a Relation),
}

impl<'a> Field<'a> {
    pub fn into_relation(self) -> Option<&'a Relation> {
        match self {
            Field::Relation(relation) => Some(relation),
            Field::Scalar(_) => None,
        }
    }

    pub fn into_scalar(self) -> Option<&'a ScalarColumn> {
        match self {
            Field::Scalar(column) => Some(column),
            Field::Relation(_) => None,
        }
    }
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let name = name.into();

        Self {
            table_name: to_snake_case(&name),
            name,
            primary_key: primary_key.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            default_ordering: Vec::new(),
        }
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn column(mut self, column: ScalarColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn ordering(mut self, order_by: OrderBy) -> Self {
        self.default_ordering.push(order_by);
        self
    }

    /// Resolves a client-facing name against this entity.
    ///
    /// Resolution order: the literal `pk` alias, an exact column match, an
    /// exact relation match, and finally the `<name>_set` fallback for a
    /// bare multi-valued relation queried through its default reverse
    /// accessor.
    pub fn find_field(&self, name: &str) -> Option<Field<'_>> {
        if name == PK_ALIAS {
            return self.find_column(&self.primary_key).map(Field::Scalar);
        }

        if let Some(column) = self.find_column(name) {
            return Some(Field::Scalar(column));
        }

        if let Some(relation) = self.find_relation(name) {
            return Some(Field::Relation(relation));
        }

        if let Some(bare) = name.strip_suffix(REVERSE_SET_SUFFIX) {
            if let Some(relation) = self.find_relation(bare) {
                if relation.cardinality == Cardinality::Multi {
                    return Some(Field::Relation(relation));
                }
            }
        }

        None
    }

    pub fn find_column(&self, name: &str) -> Option<&ScalarColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn find_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// The scalar column backing a forward single-valued relation, as the
    /// client may query it directly (`building_id` rather than `building`).
    pub fn foreign_key_id_target(&self, name: &str) -> Option<&Relation> {
        let bare = name.strip_suffix("_id")?;
        let relation = self.find_relation(bare)?;

        (relation.is_forward() && relation.is_to_one()).then_some(relation)
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }

    out
}
