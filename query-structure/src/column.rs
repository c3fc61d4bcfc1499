/// The storage type of a scalar column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeIdentifier {
    Int,
    BigInt,
    Float,
    Boolean,
    String,
    DateTime,
    Json,
}

/// A scalar column of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarColumn {
    pub name: String,
    /// Database name, when it differs from the client-facing one.
    pub db_name: Option<String>,
    pub type_identifier: TypeIdentifier,
    pub is_nullable: bool,
}

impl ScalarColumn {
    pub fn new(name: impl Into<String>, type_identifier: TypeIdentifier) -> Self {
        Self {
            name: name.into(),
            db_name: None,
            type_identifier,
            is_nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn db_name(&self) -> &str {
        self.db_name.as_deref().unwrap_or(&self.name)
    }
}
