use crate::ast::{Expression, IntoOrderDefinition, Ordering};

/// The source of a `SELECT`: a named table or an aliased sub-select.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table { name: String, alias: Option<String> },
    Query { select: Box<Select>, alias: String },
}

/// A join attached to a `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub on: Expression,
    pub kind: JoinKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl Join {
    pub fn new(table: impl Into<String>, alias: impl Into<String>, on: Expression) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            on,
            kind: JoinKind::Left,
        }
    }
}

/// A `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub(crate) source: TableSource,
    pub(crate) projection: Vec<Expression>,
    pub(crate) joins: Vec<Join>,
    pub(crate) conditions: Option<Expression>,
    pub(crate) ordering: Ordering,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
}

impl Select {
    pub fn from_table(name: impl Into<String>) -> Self {
        Self {
            source: TableSource::Table {
                name: name.into(),
                alias: None,
            },
            projection: Vec::new(),
            joins: Vec::new(),
            conditions: None,
            ordering: Ordering::default(),
            limit: None,
            offset: None,
        }
    }

    /// Selects from an inner query, aliased so outer projections can refer
    /// to its columns.
    pub fn from_select(select: Select, alias: impl Into<String>) -> Self {
        Self {
            source: TableSource::Query {
                select: Box::new(select),
                alias: alias.into(),
            },
            projection: Vec::new(),
            joins: Vec::new(),
            conditions: None,
            ordering: Ordering::default(),
            limit: None,
            offset: None,
        }
    }

    pub fn inner_join(mut self, join: Join) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            ..join
        });
        self
    }

    pub fn left_join(mut self, join: Join) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            ..join
        });
        self
    }

    pub fn value(mut self, value: impl Into<Expression>) -> Self {
        self.projection.push(value.into());
        self
    }

    pub fn values<I, E>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.projection.extend(values.into_iter().map(Into::into));
        self
    }

    /// Adds a condition, `AND`-folded onto any existing one.
    pub fn so_that(mut self, condition: impl Into<Expression>) -> Self {
        self.conditions = Some(match self.conditions.take() {
            Some(existing) => existing.and(condition.into()),
            None => condition.into(),
        });
        self
    }

    pub fn order_by<T>(mut self, value: T) -> Self
    where
        T: IntoOrderDefinition,
    {
        self.ordering = self.ordering.append(value.into_order_definition());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn conditions(&self) -> Option<&Expression> {
        self.conditions.as_ref()
    }

    pub fn projection(&self) -> &[Expression] {
        &self.projection
    }
}
