use crate::ast::{
    Column, Compare, CompareOp, Expression, FunctionType, Order, Ordering, Over, Select, SqlValue,
    TableSource,
};
use std::fmt::Write as _;

/// Walks the AST and produces a final representation of the statement.
pub trait Visitor {
    fn build(query: Select) -> String;
}

/// A visitor producing generic ANSI SQL with double-quoted identifiers.
/// Literal values are rendered inline; the planner never executes these
/// strings, they exist for diagnostics and assertions.
pub struct Ansi {
    out: String,
}

impl Visitor for Ansi {
    fn build(query: Select) -> String {
        let mut visitor = Ansi { out: String::new() };
        visitor.visit_select(&query);
        visitor.out
    }
}

impl Ansi {
    fn visit_select(&mut self, select: &Select) {
        self.out.push_str("SELECT ");

        if select.projection.is_empty() {
            self.out.push('*');
        } else {
            for (i, expr) in select.projection.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.visit_expression(expr);
            }
        }

        self.out.push_str(" FROM ");
        match &select.source {
            TableSource::Table { name, alias } => {
                self.quote(name);
                if let Some(alias) = alias {
                    self.out.push_str(" AS ");
                    self.quote(alias);
                }
            }
            TableSource::Query { select, alias } => {
                self.out.push('(');
                self.visit_select(select);
                self.out.push_str(") AS ");
                self.quote(alias);
            }
        }

        for join in &select.joins {
            match join.kind {
                crate::ast::JoinKind::Inner => self.out.push_str(" INNER JOIN "),
                crate::ast::JoinKind::Left => self.out.push_str(" LEFT JOIN "),
            }
            self.quote(&join.table);
            self.out.push_str(" AS ");
            self.quote(&join.alias);
            self.out.push_str(" ON ");
            self.visit_expression(&join.on);
        }

        if let Some(conditions) = &select.conditions {
            self.out.push_str(" WHERE ");
            self.visit_expression(conditions);
        }

        if !select.ordering.is_empty() {
            self.out.push_str(" ORDER BY ");
            self.visit_ordering(&select.ordering);
        }

        if let Some(limit) = select.limit {
            let _ = write!(self.out, " LIMIT {limit}");
        }

        if let Some(offset) = select.offset {
            let _ = write!(self.out, " OFFSET {offset}");
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Column(column) => self.visit_column(column),
            Expression::Value(value) => self.visit_value(value),
            Expression::Function(function) => {
                match &function.typ {
                    FunctionType::RowNumber(rn) => {
                        self.out.push_str("ROW_NUMBER() ");
                        self.visit_over(&rn.over);
                    }
                    FunctionType::Count(count) => match &count.over {
                        Some(over) => {
                            self.out.push_str("COUNT(*) ");
                            self.visit_over(over);
                        }
                        None => self.out.push_str("COUNT(*)"),
                    },
                }

                if let Some(alias) = &function.alias {
                    self.out.push_str(" AS ");
                    self.quote(alias);
                }
            }
            Expression::Compare(compare) => self.visit_compare(compare),
            Expression::And(left, right) => {
                self.visit_expression(left);
                self.out.push_str(" AND ");
                self.visit_expression(right);
            }
            Expression::Or(left, right) => {
                self.out.push('(');
                self.visit_expression(left);
                self.out.push_str(" OR ");
                self.visit_expression(right);
                self.out.push(')');
            }
            Expression::Not(inner) => {
                self.out.push_str("NOT (");
                self.visit_expression(inner);
                self.out.push(')');
            }
            Expression::Asterisk(table) => {
                if let Some(table) = table {
                    self.quote(table);
                    self.out.push('.');
                }
                self.out.push('*');
            }
            Expression::Aliased(inner, alias) => {
                self.visit_expression(inner);
                self.out.push_str(" AS ");
                self.quote(alias);
            }
            Expression::Raw(raw) => self.out.push_str(raw),
        }
    }

    fn visit_compare(&mut self, compare: &Compare) {
        match compare {
            Compare::Binary { left, op, right } => {
                self.visit_expression(left);
                let op = match op {
                    CompareOp::Equals => " = ",
                    CompareOp::NotEquals => " <> ",
                    CompareOp::LessThan => " < ",
                    CompareOp::LessThanOrEquals => " <= ",
                    CompareOp::GreaterThan => " > ",
                    CompareOp::GreaterThanOrEquals => " >= ",
                };
                self.out.push_str(op);
                self.visit_expression(right);
            }
            Compare::In { left, values } => {
                self.visit_expression(left);
                self.out.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.visit_expression(value);
                }
                self.out.push(')');
            }
            Compare::Between { left, low, high } => {
                self.visit_expression(left);
                self.out.push_str(" BETWEEN ");
                self.visit_expression(low);
                self.out.push_str(" AND ");
                self.visit_expression(high);
            }
        }
    }

    fn visit_over(&mut self, over: &Over) {
        self.out.push_str("OVER(");

        if !over.partitioning.is_empty() {
            self.out.push_str("PARTITION BY ");
            for (i, column) in over.partitioning.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.visit_column(column);
            }
        }

        if !over.ordering.is_empty() {
            if !over.partitioning.is_empty() {
                self.out.push(' ');
            }
            self.out.push_str("ORDER BY ");
            self.visit_ordering(&over.ordering);
        }

        self.out.push(')');
    }

    fn visit_ordering(&mut self, ordering: &Ordering) {
        for (i, (expr, order)) in ordering.0.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.visit_expression(expr);
            match order {
                Some(Order::Asc) => self.out.push_str(" ASC"),
                Some(Order::Desc) => self.out.push_str(" DESC"),
                None => {}
            }
        }
    }

    fn visit_column(&mut self, column: &Column) {
        if let Some(table) = &column.table {
            self.quote(table);
            self.out.push('.');
        }
        self.quote(&column.name);
    }

    fn visit_value(&mut self, value: &SqlValue) {
        match value {
            SqlValue::Null => self.out.push_str("NULL"),
            SqlValue::Integer(i) => {
                let _ = write!(self.out, "{i}");
            }
            SqlValue::Real(r) => {
                let _ = write!(self.out, "{r}");
            }
            SqlValue::Boolean(b) => self.out.push_str(if *b { "TRUE" } else { "FALSE" }),
            SqlValue::Text(t) => {
                let _ = write!(self.out, "'{}'", t.replace('\'', "''"));
            }
        }
    }

    fn quote(&mut self, identifier: &str) {
        let _ = write!(self.out, "\"{identifier}\"");
    }
}
