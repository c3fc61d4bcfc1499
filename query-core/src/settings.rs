use query_structure::{PREFETCH_COUNT_KEY, PREFETCH_SLICE_START, PREFETCH_SLICE_STOP};

/// Process-wide planner options. Read-only after startup and safe to share
/// across requests.
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    /// Ceiling for the join/batch recursion counter.
    pub max_complexity: usize,
    /// Attribute name used to attach a pre-known PK to a queryset for the
    /// single-entity fast path.
    pub pk_cache_key: String,
    /// Name under which per-operation caches live on the schema extension
    /// map.
    pub query_cache_key: String,
    /// Client-visible field requesting a total under a connection.
    pub total_count_field: String,
    /// When true, nested multi-valued relations default to a paginated
    /// connection shape instead of a flat list.
    pub allow_connection_as_default_nested_to_many_field: bool,
    /// Reserved synthetic column names used by the pagination engine.
    pub prefetch_count_key: String,
    pub prefetch_slice_start: String,
    pub prefetch_slice_stop: String,
    /// When true, unexpected planner errors degrade to returning the
    /// unrewritten queryset.
    pub skip_optimization_on_error: bool,
    /// Hard ceiling applied to connection pages when the field declares
    /// none of its own. `None` disables implicit windows entirely.
    pub default_max_limit: Option<u64>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_complexity: 10,
            pk_cache_key: "_optimizer_pk".into(),
            query_cache_key: "_query_cache".into(),
            total_count_field: "totalCount".into(),
            allow_connection_as_default_nested_to_many_field: false,
            prefetch_count_key: PREFETCH_COUNT_KEY.into(),
            prefetch_slice_start: PREFETCH_SLICE_START.into(),
            prefetch_slice_stop: PREFETCH_SLICE_STOP.into(),
            skip_optimization_on_error: false,
            default_max_limit: Some(100),
        }
    }
}
