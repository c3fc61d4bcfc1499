use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Entity `{name}` not found in the schema")]
    EntityNotFound { name: String },

    #[error("Field `{name}` does not exist on entity `{entity}`")]
    FieldNotFound { name: String, entity: String },

    #[error("Relation `{relation}` on `{entity}` has no statically known target")]
    PolymorphicTarget { relation: String, entity: String },

    #[error("Record has no value for primary key column `{column}`")]
    MissingPrimaryKey { column: String },

    #[error("Conversion failed: {message}")]
    ConversionFailure { message: String },
}
