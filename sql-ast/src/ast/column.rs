use crate::ast::{Expression, Order, OrderDefinition};

/// A column reference, optionally qualified with a table (or table alias).
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// Qualify the column with a table or alias.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn ascend(self) -> OrderDefinition {
        (Expression::from(self), Some(Order::Asc))
    }

    pub fn descend(self) -> OrderDefinition {
        (Expression::from(self), Some(Order::Desc))
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

impl From<(&str, &str)> for Column {
    fn from((table, name): (&str, &str)) -> Self {
        Column::new(name).table(table)
    }
}

impl From<(String, String)> for Column {
    fn from((table, name): (String, String)) -> Self {
        Column::new(name).table(table)
    }
}

/// Turns a dotted path such as `building.real_estate.name` into a column
/// qualified by everything before the last separator.
pub fn column_from_path(path: &str) -> Column {
    match path.rsplit_once('.') {
        Some((table, name)) => Column::new(name).table(table),
        None => Column::new(path),
    }
}
