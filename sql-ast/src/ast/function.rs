use crate::ast::{Column, Expression, IntoOrderDefinition, Over};

/// A database function call, possibly aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub(crate) typ: FunctionType,
    pub(crate) alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionType {
    RowNumber(RowNumber),
    Count(Count),
}

impl Function {
    /// Give the function an alias in the projection list.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A window function assigning a sequential integer to each row of the
/// partition, in the partition's order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowNumber {
    pub(crate) over: Over,
}

impl RowNumber {
    /// Define the order of the row number. Is the row order if not set.
    pub fn order_by<T>(mut self, value: T) -> Self
    where
        T: IntoOrderDefinition,
    {
        self.over.ordering = self.over.ordering.append(value.into_order_definition());
        self
    }

    /// Define the partitioning of the row number.
    pub fn partition_by<T>(mut self, partition: T) -> Self
    where
        T: Into<Column>,
    {
        self.over.partitioning.push(partition.into());
        self
    }
}

/// A number from 1 to n in the order of the `OVER` clause.
pub fn row_number() -> RowNumber {
    RowNumber::default()
}

/// A `COUNT(*)`, plain or windowed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Count {
    pub(crate) over: Option<Over>,
}

impl Count {
    /// Turn the count into a window aggregate over the given partition.
    pub fn partition_by<T>(mut self, partition: T) -> Self
    where
        T: Into<Column>,
    {
        self.over.get_or_insert_with(Over::default).partitioning.push(partition.into());
        self
    }
}

/// Counts all rows, or all rows per partition when `partition_by` is used.
pub fn count() -> Count {
    Count::default()
}

impl From<RowNumber> for Function {
    fn from(rn: RowNumber) -> Self {
        Function {
            typ: FunctionType::RowNumber(rn),
            alias: None,
        }
    }
}

impl From<Count> for Function {
    fn from(count: Count) -> Self {
        Function {
            typ: FunctionType::Count(count),
            alias: None,
        }
    }
}

impl From<Function> for Expression {
    fn from(function: Function) -> Self {
        Expression::Function(Box::new(function))
    }
}
