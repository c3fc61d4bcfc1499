use crate::{DomainError, EntityRef, OrderBy, PkValue, SchemaRef};
use indexmap::{IndexMap, IndexSet};
use sql_ast::ast::{count, row_number, Column, Expression, Function, Join, Select, SqlValue};
use sql_ast::visitor::{Ansi, Visitor};

/// Synthetic column carrying the per-parent total inside a window rewrite.
pub const PREFETCH_COUNT_KEY: &str = "_optimizer_count";
/// Synthetic columns carrying the resolved slice bounds for resolvers.
pub const PREFETCH_SLICE_START: &str = "_optimizer_slice_start";
pub const PREFETCH_SLICE_STOP: &str = "_optimizer_slice_stop";
/// Synthetic column carrying the per-parent row number.
pub const ROW_NUMBER_ALIAS: &str = "_optimizer_row_number";

const WINDOW_BASE_ALIAS: &str = "base";
const WINDOW_TABLE_ALIAS: &str = "windowed";

/// A per-parent row-number slice applied inside a batch query.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationWindow {
    /// The foreign key linking batch rows back to their parents.
    pub partition_by: String,
    pub order_by: Vec<OrderBy>,
    /// 0-based inclusive start of the slice.
    pub start: u64,
    /// 0-based exclusive stop of the slice.
    pub stop: Option<u64>,
    /// `last = N` semantics: keep the trailing N rows of the window. The
    /// per-parent total must be computed inside the partition for this.
    pub last: Option<u64>,
    /// Project the per-parent `COUNT(*) OVER` total.
    pub needs_total: bool,
    /// Alias the per-parent total is projected under. Defaults to
    /// [`PREFETCH_COUNT_KEY`]; the planner overrides it from its settings.
    pub count_alias: String,
}

impl PaginationWindow {
    pub fn requires_total(&self) -> bool {
        self.needs_total || self.last.is_some()
    }
}

/// A batched sub-query for a multi-valued relation.
#[derive(Debug, Clone)]
pub struct Prefetch {
    pub relation: String,
    /// Attribute the results get attached under when it differs from the
    /// relation name.
    pub to_attr: Option<String>,
    pub queryset: QuerySet,
}

impl Prefetch {
    pub fn new(relation: impl Into<String>, queryset: QuerySet) -> Self {
        Self {
            relation: relation.into(),
            to_attr: None,
            queryset,
        }
    }

    pub fn to_attr(mut self, attr: impl Into<String>) -> Self {
        self.to_attr = Some(attr.into());
        self
    }
}

/// The relational query object the planner rewrites. Filters arrive from
/// the query boundary as opaque [`Expression`] predicates and are never
/// rewritten, only carried.
#[derive(Debug, Clone)]
pub struct QuerySet {
    schema: SchemaRef,
    entity: EntityRef,
    predicate: Option<Expression>,
    order_by: Vec<OrderBy>,
    /// Dotted column paths to project. Empty means all columns.
    selected_columns: IndexSet<String>,
    /// Dotted single-valued relation paths to join.
    select_related: IndexSet<String>,
    prefetches: IndexMap<String, Prefetch>,
    annotations: IndexMap<String, Expression>,
    window: Option<PaginationWindow>,
    limit: Option<u64>,
    offset: Option<u64>,
    pk_filter: Option<PkValue>,
    /// Named hints a resolver attached ahead of planning, such as a
    /// pre-known primary key.
    hints: IndexMap<String, PkValue>,
    with_total_count: bool,
    optimized: bool,
    /// Junction-table aliases already used by batched many-to-many
    /// relations; the driver must reuse them when applying secondary
    /// filters so the partition cardinality stays intact.
    reused_junction_aliases: IndexSet<String>,
}

impl QuerySet {
    pub fn new(schema: SchemaRef, entity: EntityRef) -> Self {
        Self {
            schema,
            entity,
            predicate: None,
            order_by: Vec::new(),
            selected_columns: IndexSet::new(),
            select_related: IndexSet::new(),
            prefetches: IndexMap::new(),
            annotations: IndexMap::new(),
            window: None,
            limit: None,
            offset: None,
            pk_filter: None,
            hints: IndexMap::new(),
            with_total_count: false,
            optimized: false,
            reused_junction_aliases: IndexSet::new(),
        }
    }

    pub fn for_entity(schema: &SchemaRef, entity_name: &str) -> Result<Self, DomainError> {
        let entity = schema.find_entity(entity_name)?;
        Ok(Self::new(schema.clone(), entity))
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// AND-folds an opaque predicate onto the queryset.
    pub fn filter(mut self, predicate: Expression) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
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

    /// Restricts the projection to the given dotted column paths.
    pub fn only<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Registers a single-valued relation path for joining.
    pub fn select_related(mut self, path: impl Into<String>) -> Self {
        self.select_related.insert(path.into());
        self
    }

    pub fn prefetch_related(mut self, prefetch: Prefetch) -> Self {
        self.prefetches.insert(prefetch.relation.clone(), prefetch);
        self
    }

    pub fn annotate(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.annotations.insert(name.into(), expression);
        self
    }

    pub fn window(mut self, window: PaginationWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn pk_filter(mut self, pk: PkValue) -> Self {
        self.pk_filter = Some(pk);
        self
    }

    /// Attaches a pre-known primary key under an attribute name; the
    /// planner turns the hint into a PK filter.
    pub fn hint_pk(mut self, key: impl Into<String>, pk: PkValue) -> Self {
        self.hints.insert(key.into(), pk);
        self
    }

    pub fn hinted_pk(&self, key: &str) -> Option<&PkValue> {
        self.hints.get(key)
    }

    /// Requests a separate `COUNT(*)` round trip ahead of the row query.
    pub fn with_total_count(mut self) -> Self {
        self.with_total_count = true;
        self
    }

    pub fn record_junction_alias(&mut self, alias: impl Into<String>) {
        self.reused_junction_aliases.insert(alias.into());
    }

    pub fn mark_optimized(mut self) -> Self {
        self.optimized = true;
        self
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    pub fn predicate(&self) -> Option<&Expression> {
        self.predicate.as_ref()
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn selected_columns(&self) -> &IndexSet<String> {
        &self.selected_columns
    }

    pub fn select_related_paths(&self) -> &IndexSet<String> {
        &self.select_related
    }

    pub fn prefetches(&self) -> &IndexMap<String, Prefetch> {
        &self.prefetches
    }

    pub fn annotations(&self) -> &IndexMap<String, Expression> {
        &self.annotations
    }

    pub fn window_spec(&self) -> Option<&PaginationWindow> {
        self.window.as_ref()
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn pk(&self) -> Option<&PkValue> {
        self.pk_filter.as_ref()
    }

    pub fn requests_total_count(&self) -> bool {
        self.with_total_count
    }

    pub fn reused_junction_aliases(&self) -> &IndexSet<String> {
        &self.reused_junction_aliases
    }

    /// The effective ordering of a windowed batch: explicit ordering, else
    /// the entity's declared ordering, else its primary key.
    pub fn effective_ordering(&self) -> Vec<OrderBy> {
        if !self.order_by.is_empty() {
            return self.order_by.clone();
        }

        if !self.entity.default_ordering.is_empty() {
            return self.entity.default_ordering.clone();
        }

        vec![OrderBy::asc(&self.entity.primary_key)]
    }

    /// How many driver round trips executing this queryset costs: one for
    /// the root (plus one when a separate total count is requested) and one
    /// per batched relation, recursively. Single-valued joins are free.
    pub fn round_trips(&self) -> usize {
        let own = if self.with_total_count { 2 } else { 1 };

        own + self
            .prefetches
            .values()
            .map(|prefetch| prefetch.queryset.round_trips())
            .sum::<usize>()
    }

    /// Lowers the queryset and all of its batches, in discovery order, to
    /// renderable SQL statements. Depth-first, left to right, matching the
    /// execution order guarantee.
    pub fn to_sql_statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        self.collect_statements(&mut statements);
        statements
    }

    fn collect_statements(&self, out: &mut Vec<String>) {
        if self.with_total_count {
            let mut count_query = Select::from_table(self.entity.table_name.clone())
                .value(Expression::from(Function::from(count())).aliased(PREFETCH_COUNT_KEY));

            if let Some(predicate) = &self.predicate {
                count_query = count_query.so_that(predicate.clone());
            }

            out.push(Ansi::build(count_query));
        }

        out.push(Ansi::build(self.build_select()));

        for prefetch in self.prefetches.values() {
            prefetch.queryset.collect_statements(out);
        }
    }

    fn build_select(&self) -> Select {
        match &self.window {
            Some(window) => self.build_windowed_select(window),
            None => self.build_plain_select(),
        }
    }

    fn build_plain_select(&self) -> Select {
        let table = &self.entity.table_name;
        let mut select = Select::from_table(table.clone());

        if self.selected_columns.is_empty() {
            select = select.value(Expression::Asterisk(None));
        } else {
            for path in &self.selected_columns {
                select = select.value(self.column_for_path(path));
            }
        }

        for (name, expression) in &self.annotations {
            select = select.value(expression.clone().aliased(name.clone()));
        }

        for join in self.build_joins() {
            select = select.left_join(join);
        }

        if let Some(predicate) = &self.predicate {
            select = select.so_that(predicate.clone());
        }

        if let Some(pk) = &self.pk_filter {
            let pk_column = Column::new(self.entity.primary_key.clone()).table(table.clone());
            let value = match pk {
                PkValue::Int(i) => SqlValue::Integer(*i),
                PkValue::String(s) => SqlValue::Text(s.clone()),
            };
            select = select.so_that(Expression::from(pk_column).equals(value));
        }

        for order in &self.order_by {
            let column = Column::new(order.column.clone()).table(table.clone());
            select = select.order_by((column, order.sort_order));
        }

        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }

        if let Some(offset) = self.offset {
            select = select.offset(offset);
        }

        select
    }

    /// The row-number rewrite of a batch: wrap the base query, number the
    /// rows per parent, then keep only the slice.
    fn build_windowed_select(&self, window: &PaginationWindow) -> Select {
        let mut base = self.build_plain_select();

        // The batch is parent-keyed at execution time. The parent key list
        // is unknown until the enclosing query ran, hence the placeholder.
        base = base.so_that(Expression::Raw(format!(
            "\"{}\" IN (<parent keys>)",
            window.partition_by
        )));

        let mut row_number_fn = row_number().partition_by((WINDOW_BASE_ALIAS, window.partition_by.as_str()));

        for order in &self.windowed_ordering(window) {
            let column = Column::new(order.column.clone()).table(WINDOW_BASE_ALIAS);
            row_number_fn = row_number_fn.order_by((column, order.sort_order));
        }

        let mut with_rows = Select::from_select(base, WINDOW_BASE_ALIAS)
            .value(Expression::Asterisk(Some(WINDOW_BASE_ALIAS.into())))
            .value(Expression::from(Function::from(row_number_fn)).aliased(ROW_NUMBER_ALIAS));

        if window.requires_total() {
            let total = count().partition_by((WINDOW_BASE_ALIAS, window.partition_by.as_str()));
            with_rows = with_rows.value(Expression::from(Function::from(total)).aliased(window.count_alias.clone()));
        }

        let row_column = Column::new(ROW_NUMBER_ALIAS).table(WINDOW_TABLE_ALIAS);
        let mut outer = Select::from_select(with_rows, WINDOW_TABLE_ALIAS)
            .value(Expression::Asterisk(Some(WINDOW_TABLE_ALIAS.into())));

        if let Some(last) = window.last {
            // Keep the trailing `last` rows of the window: row > total - N.
            outer = outer.so_that(Expression::Raw(format!(
                "\"{WINDOW_TABLE_ALIAS}\".\"{ROW_NUMBER_ALIAS}\" + {last} > \"{WINDOW_TABLE_ALIAS}\".\"{count}\"",
                count = window.count_alias
            )));

            if window.start > 0 {
                outer = outer.so_that(Expression::from(row_column.clone()).greater_than(window.start as i64));
            }

            if let Some(stop) = window.stop {
                outer = outer.so_that(Expression::from(row_column).less_than_or_equals(stop as i64));
            }
        } else {
            match window.stop {
                Some(stop) => {
                    outer = outer
                        .so_that(Expression::from(row_column).between(window.start as i64 + 1, stop as i64));
                }
                None => {
                    outer = outer.so_that(Expression::from(row_column).greater_than(window.start as i64));
                }
            }
        }

        outer
    }

    fn windowed_ordering(&self, window: &PaginationWindow) -> Vec<OrderBy> {
        if !window.order_by.is_empty() {
            window.order_by.clone()
        } else {
            self.effective_ordering()
        }
    }

    /// Projection column for a dotted path; prefixes resolve to join
    /// aliases, bare names to the base table.
    fn column_for_path(&self, path: &str) -> Column {
        match path.rsplit_once('.') {
            Some((prefix, name)) => Column::new(name).table(join_alias(prefix)),
            None => Column::new(path).table(self.entity.table_name.clone()),
        }
    }

    /// One LEFT JOIN per select-related path segment, prefix-closed so a
    /// path like `building.real_estate` also joins `building`.
    fn build_joins(&self) -> Vec<Join> {
        let mut emitted: IndexSet<String> = IndexSet::new();
        let mut joins = Vec::new();

        for path in &self.select_related {
            let mut prefix = String::new();

            for segment in path.split('.') {
                let parent_prefix = prefix.clone();

                if prefix.is_empty() {
                    prefix.push_str(segment);
                } else {
                    prefix.push('.');
                    prefix.push_str(segment);
                }

                if !emitted.insert(prefix.clone()) {
                    continue;
                }

                if let Some(join) = self.join_for(&parent_prefix, segment, &prefix) {
                    joins.push(join);
                }
            }
        }

        joins
    }

    fn join_for(&self, parent_prefix: &str, segment: &str, path: &str) -> Option<Join> {
        let parent_entity = self.entity_at(parent_prefix)?;
        let relation = parent_entity.find_relation(segment)?;
        let related = self.schema.related_entity(relation)?;

        let parent_alias = if parent_prefix.is_empty() {
            parent_entity.table_name.clone()
        } else {
            join_alias(parent_prefix)
        };
        let alias = join_alias(path);

        let on = if relation.is_forward() {
            // Parent holds the FK pointing at the related PK.
            Expression::from(Column::new(relation.foreign_key.clone()).table(parent_alias))
                .equals(Column::new(related.primary_key.clone()).table(alias.clone()))
        } else {
            // Related side holds the FK pointing back at the parent PK.
            Expression::from(Column::new(relation.foreign_key.clone()).table(alias.clone()))
                .equals(Column::new(parent_entity.primary_key.clone()).table(parent_alias))
        };

        Some(Join::new(related.table_name.clone(), alias, on))
    }

    /// Resolves the entity reached by following a dotted relation prefix
    /// from this queryset's entity.
    fn entity_at(&self, prefix: &str) -> Option<EntityRef> {
        let mut current = self.entity.clone();

        if prefix.is_empty() {
            return Some(current);
        }

        for segment in prefix.split('.') {
            let relation = current.find_relation(segment)?.clone();
            current = self.schema.related_entity(&relation)?;
        }

        Some(current)
    }
}

fn join_alias(path: &str) -> String {
    path.replace('.', "__")
}
