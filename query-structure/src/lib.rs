//! The relational data model the planner operates on: entity descriptors,
//! relations, records and the `QuerySet` query object that gets rewritten.

mod column;
mod entity;
mod error;
mod order_by;
mod queryset;
mod record;
mod relation;
mod schema;

pub use column::*;
pub use entity::*;
pub use error::*;
pub use order_by::*;
pub use queryset::*;
pub use record::*;
pub use relation::*;
pub use schema::*;

pub mod prelude {
    pub use crate::{
        Cardinality, EntityDescriptor, EntityRef, Field, OrderBy, PkValue, QuerySet, Record, Relation,
        RelationDirection, RelationKind, Schema, SchemaRef, Value,
    };
}

pub type DomainResult<T> = Result<T, DomainError>;
