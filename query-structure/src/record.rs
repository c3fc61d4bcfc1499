use crate::{DomainError, EntityDescriptor};
use indexmap::IndexMap;

/// A database value carried by a materialized record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Json(serde_json::Value),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

/// A primary key value. Restricted to the hashable types entities key on so
/// it can index the identity cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PkValue {
    Int(i64),
    String(String),
}

impl From<i64> for PkValue {
    fn from(value: i64) -> Self {
        PkValue::Int(value)
    }
}

impl From<&str> for PkValue {
    fn from(value: &str) -> Self {
        PkValue::String(value.to_owned())
    }
}

impl TryFrom<&Value> for PkValue {
    type Error = DomainError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Int(i) => Ok(PkValue::Int(*i)),
            Value::String(s) => Ok(PkValue::String(s.clone())),
            other => Err(DomainError::ConversionFailure {
                message: format!("{other:?} cannot be used as a primary key"),
            }),
        }
    }
}

/// One materialized row, with any prefetched child collections attached
/// under their relation names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub values: IndexMap<String, Value>,
    pub related: IndexMap<String, Vec<Record>>,
}

impl Record {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self {
            values,
            related: IndexMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn attach_related(&mut self, relation: impl Into<String>, records: Vec<Record>) {
        self.related.insert(relation.into(), records);
    }

    /// The primary key of this record under the given entity.
    pub fn pk_value(&self, entity: &EntityDescriptor) -> Result<PkValue, DomainError> {
        let value = self.get(&entity.primary_key).ok_or(DomainError::MissingPrimaryKey {
            column: entity.primary_key.clone(),
        })?;

        PkValue::try_from(value)
    }
}
