use crate::ast::{Column, Function, Order, OrderDefinition, SqlValue};

/// A value expression appearing in projections and conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(Column),
    Value(SqlValue),
    Function(Box<Function>),
    Compare(Box<Compare>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    /// All columns of a table, `"t".*`.
    Asterisk(Option<String>),
    /// An aliased expression in a projection list.
    Aliased(Box<Expression>, String),
    /// An escape hatch for fragments the AST does not model.
    Raw(String),
}

/// A condition comparing expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Compare {
    Binary {
        left: Expression,
        op: CompareOp,
        right: Expression,
    },
    In {
        left: Expression,
        values: Vec<Expression>,
    },
    Between {
        left: Expression,
        low: Expression,
        high: Expression,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
}

impl Expression {
    pub fn equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::Equals, other)
    }

    pub fn not_equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::NotEquals, other)
    }

    pub fn less_than(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::LessThan, other)
    }

    pub fn less_than_or_equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::LessThanOrEquals, other)
    }

    pub fn greater_than(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::GreaterThan, other)
    }

    pub fn greater_than_or_equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(CompareOp::GreaterThanOrEquals, other)
    }

    pub fn in_selection<I, E>(self, values: I) -> Expression
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        Expression::Compare(Box::new(Compare::In {
            left: self,
            values: values.into_iter().map(Into::into).collect(),
        }))
    }

    pub fn between(self, low: impl Into<Expression>, high: impl Into<Expression>) -> Expression {
        Expression::Compare(Box::new(Compare::Between {
            left: self,
            low: low.into(),
            high: high.into(),
        }))
    }

    pub fn and(self, other: impl Into<Expression>) -> Expression {
        Expression::And(Box::new(self), Box::new(other.into()))
    }

    pub fn or(self, other: impl Into<Expression>) -> Expression {
        Expression::Or(Box::new(self), Box::new(other.into()))
    }

    pub fn not(self) -> Expression {
        Expression::Not(Box::new(self))
    }

    fn compare(self, op: CompareOp, other: impl Into<Expression>) -> Expression {
        Expression::Compare(Box::new(Compare::Binary {
            left: self,
            op,
            right: other.into(),
        }))
    }

    pub fn aliased(self, alias: impl Into<String>) -> Expression {
        Expression::Aliased(Box::new(self), alias.into())
    }

    /// Folds an optional condition onto this one with `AND`.
    pub fn and_maybe(self, other: Option<Expression>) -> Expression {
        match other {
            Some(other) => self.and(other),
            None => self,
        }
    }
}

impl From<Column> for Expression {
    fn from(column: Column) -> Self {
        Expression::Column(column)
    }
}

impl From<SqlValue> for Expression {
    fn from(value: SqlValue) -> Self {
        Expression::Value(value)
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Value(SqlValue::Integer(value))
    }
}

impl From<u64> for Expression {
    fn from(value: u64) -> Self {
        Expression::Value(SqlValue::Integer(value as i64))
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Value(SqlValue::Text(value.to_owned()))
    }
}

/// An item usable in an `ORDER BY` list.
pub trait IntoOrderDefinition {
    fn into_order_definition(self) -> OrderDefinition;
}

impl IntoOrderDefinition for Column {
    fn into_order_definition(self) -> OrderDefinition {
        (Expression::Column(self), None)
    }
}

impl IntoOrderDefinition for &str {
    fn into_order_definition(self) -> OrderDefinition {
        (Expression::Column(Column::new(self)), None)
    }
}

impl IntoOrderDefinition for OrderDefinition {
    fn into_order_definition(self) -> OrderDefinition {
        self
    }
}

impl IntoOrderDefinition for (Column, Order) {
    fn into_order_definition(self) -> OrderDefinition {
        (Expression::Column(self.0), Some(self.1))
    }
}
