pub use sql_ast::ast::Order as SortOrder;

/// One ordering step of a queryset or a pagination window.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub sort_order: SortOrder,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sort_order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sort_order: SortOrder::Desc,
        }
    }
}
