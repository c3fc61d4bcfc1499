use crate::ast::Expression;

/// The ordering direction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Order {
    Asc,
    Desc,
}

/// One definition for an `ORDER BY` list.
pub type OrderDefinition = (Expression, Option<Order>);

/// A list of definitions for the `ORDER BY` statement.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Ordering(pub Vec<OrderDefinition>);

impl Ordering {
    pub fn new(values: Vec<OrderDefinition>) -> Self {
        Self(values)
    }

    pub fn append(mut self, value: OrderDefinition) -> Self {
        self.0.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
