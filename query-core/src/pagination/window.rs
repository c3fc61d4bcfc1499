use crate::{OptimizerSettings, PaginationSlice};
use query_structure::{OrderBy, PaginationWindow, QuerySet, PREFETCH_COUNT_KEY};
use sql_ast::ast::{Expression, SqlValue};

/// Builds the per-parent window a batched connection applies: a
/// `ROW_NUMBER()` partition over the parent foreign key, sliced to the
/// validated bounds.
pub fn window_for(
    partition_by: impl Into<String>,
    ordering: Vec<OrderBy>,
    slice: &PaginationSlice,
    needs_total: bool,
) -> PaginationWindow {
    PaginationWindow {
        partition_by: partition_by.into(),
        order_by: ordering,
        start: slice.start(),
        stop: slice.stop(),
        last: slice.last,
        needs_total,
        count_alias: PREFETCH_COUNT_KEY.into(),
    }
}

/// Pushes the window onto the batch queryset and annotates the resolved
/// slice bounds under the reserved synthetic names so resolvers can read
/// them back without re-deriving the arithmetic.
pub fn apply_window(
    queryset: QuerySet,
    mut window: PaginationWindow,
    slice: &PaginationSlice,
    settings: &OptimizerSettings,
) -> QuerySet {
    window.count_alias = settings.prefetch_count_key.clone();

    let mut queryset = queryset.annotate(
        settings.prefetch_slice_start.clone(),
        Expression::Value(SqlValue::Integer(slice.start() as i64)),
    );

    if let Some(stop) = slice.stop() {
        queryset = queryset.annotate(
            settings.prefetch_slice_stop.clone(),
            Expression::Value(SqlValue::Integer(stop as i64)),
        );
    }

    queryset.window(window)
}
