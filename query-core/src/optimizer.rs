use crate::{
    plan_fingerprint, validate_pagination, CoreError, CoreResult, Executor, OptimizationCompiler,
    PaginationArgs, PlanStore, ResolveInfo, Selection, WalkContext,
};
use query_structure::{EntityRef, PkValue, QuerySet, Record};
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Entity name the declaration registry files root-level fields under.
const ROOT_ENTITY: &str = "Query";

/// Rewrites a queryset to match the selection carried by `info`: scalar
/// fields become a restricted projection, single-valued relations become
/// joins, multi-valued relations become batches, paginated connections get
/// windowed.
///
/// Already-rewritten querysets pass through untouched, so resolvers may
/// call this unconditionally.
pub fn optimize(queryset: QuerySet, info: &ResolveInfo, max_complexity: Option<usize>) -> CoreResult<QuerySet> {
    if queryset.is_optimized() {
        return Ok(queryset);
    }

    // Resolvers that already know the row attach its PK under the
    // configured hint name; honor it before planning.
    let queryset = match queryset.hinted_pk(&info.settings.pk_cache_key).cloned() {
        Some(pk) if queryset.pk().is_none() => queryset.pk_filter(pk),
        _ => queryset,
    };

    let fallback = info.settings.skip_optimization_on_error.then(|| queryset.clone());

    match rewrite(queryset, info, max_complexity) {
        Ok(optimized) => Ok(optimized),
        Err(CoreError::PlannerInternal { message }) => match fallback {
            Some(original) => {
                warn!(%message, "planner failed, returning the unrewritten queryset");
                Ok(original)
            }
            None => Err(CoreError::PlannerInternal { message }),
        },
        Err(err) => Err(err),
    }
}

fn rewrite(queryset: QuerySet, info: &ResolveInfo, max_complexity: Option<usize>) -> CoreResult<QuerySet> {
    let max_complexity = max_complexity.unwrap_or(info.settings.max_complexity);
    let entity = queryset.entity().clone();

    let span = debug_span!("optimize", entity = %entity.name, field = %info.field.name);
    let _guard = span.enter();

    let compiler = OptimizationCompiler::new(info, max_complexity);
    let mut store = PlanStore::new(entity.clone());

    let connection_declaration = info.declarations.connection(ROOT_ENTITY, &info.field.name);
    let is_connection = connection_declaration.is_some() || info.field.find_nested("edges").is_some();

    let queryset = if is_connection {
        compiler.walk_connection(&info.field, &entity, &mut store, WalkContext::root())?;

        let max_limit = connection_declaration
            .and_then(|declaration| declaration.max_limit)
            .or(info.settings.default_max_limit);

        let args = PaginationArgs::from_field(&info.field);
        let slice = validate_pagination(&args, max_limit)?;

        let mut queryset = store.apply(queryset, &info.settings)?;

        // The root connection pages with plain OFFSET/LIMIT; windows are
        // only needed where rows of many parents interleave.
        queryset = queryset.offset(slice.start());

        if let Some(stop) = slice.stop() {
            queryset = queryset.limit(stop - slice.start());
        }

        // Connection payloads carry `pageInfo`/`hasNextPage` whether or not
        // the client selected `totalCount`, and trailing-page bounds resolve
        // against the total, so the count query always rides along.
        queryset = queryset.with_total_count();

        queryset
    } else {
        compiler.walk_selection_set(&info.field.nested, &entity, &mut store, WalkContext::root())?;
        store.apply(queryset, &info.settings)?
    };

    let fingerprint = plan_fingerprint(&queryset);
    info.cache.note_plan(&entity.table_name, &fingerprint);

    debug!(
        %fingerprint,
        round_trips = queryset.round_trips(),
        "rewrote queryset"
    );

    Ok(queryset.mark_optimized())
}

/// The single-entity fast path: rewrite, consult the identity cache, and
/// only hit the driver on a miss. Fetched records are written through so
/// later resolvers of the same operation reuse them.
pub fn optimize_one<E: Executor>(
    queryset: QuerySet,
    info: &ResolveInfo,
    pk: PkValue,
    executor: &mut E,
    max_complexity: Option<usize>,
) -> CoreResult<Option<Arc<Record>>> {
    let entity = queryset.entity().clone();
    let optimized = optimize(queryset, info, max_complexity)?.pk_filter(pk.clone());
    let fingerprint = plan_fingerprint(&optimized);

    if let Some(record) = info.cache.get(&entity.table_name, &fingerprint, &pk) {
        debug!(entity = %entity.name, "identity cache hit");
        return Ok(Some(record));
    }

    match executor.find_one(&optimized)? {
        Some(record) => {
            let record = Arc::new(record);
            info.cache
                .store(&entity.table_name, &fingerprint, pk, record.clone());
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

/// Looks a record up in the operation's identity cache under this
/// queryset's plan fingerprint, without touching the driver.
pub fn get_from_query_cache(info: &ResolveInfo, queryset: &QuerySet, pk: &PkValue) -> Option<Arc<Record>> {
    let fingerprint = plan_fingerprint(queryset);
    info.cache.get(&queryset.entity().table_name, &fingerprint, pk)
}

/// Writes a batch of fetched records into the operation's identity cache,
/// keyed by the plan fingerprint of the queryset that produced them.
///
/// Joined rows flattened into dotted values are split out and stored as
/// companion records of the related entity, and prefetched children recurse
/// under their own batch fingerprints.
pub fn store_in_query_cache(info: &ResolveInfo, queryset: &QuerySet, records: &[Arc<Record>]) -> CoreResult<()> {
    let fingerprint = plan_fingerprint(queryset);
    store_records(info, queryset, &fingerprint, records)
}

fn store_records(
    info: &ResolveInfo,
    queryset: &QuerySet,
    fingerprint: &str,
    records: &[Arc<Record>],
) -> CoreResult<()> {
    let entity = queryset.entity();

    for record in records {
        let pk = record.pk_value(entity)?;
        info.cache.store(&entity.table_name, fingerprint, pk, record.clone());

        for segment in join_root_segments(queryset) {
            store_companion(info, queryset, fingerprint, record, &segment);
        }

        for prefetch in queryset.prefetches().values() {
            let Some(children) = record.related.get(&prefetch.relation) else {
                continue;
            };

            let children: Vec<Arc<Record>> = children.iter().cloned().map(Arc::new).collect();
            let child_fingerprint = plan_fingerprint(&prefetch.queryset);
            store_records(info, &prefetch.queryset, &child_fingerprint, &children)?;
        }
    }

    Ok(())
}

/// Splits the values joined in under `segment.` out of a flattened record
/// and stores them as a record of the related entity.
fn store_companion(info: &ResolveInfo, queryset: &QuerySet, fingerprint: &str, record: &Record, segment: &str) {
    let Some(relation) = queryset.entity().find_relation(segment) else {
        return;
    };
    let Some(related) = info.schema.related_entity(relation) else {
        return;
    };

    let prefix = format!("{segment}.");
    let mut companion = Record::default();

    for (path, value) in &record.values {
        if let Some(column) = path.strip_prefix(&prefix) {
            companion.set(column, value.clone());
        }
    }

    // A LEFT JOIN miss leaves the companion PK null; nothing to cache.
    let Ok(pk) = companion.pk_value(&related) else {
        return;
    };

    info.cache.store(
        &related.table_name,
        &format!("{fingerprint}/{segment}"),
        pk,
        Arc::new(companion),
    );
}

fn join_root_segments(queryset: &QuerySet) -> Vec<String> {
    let mut segments = Vec::new();

    for path in queryset.select_related_paths() {
        let root = path.split('.').next().unwrap_or(path).to_owned();
        if !segments.contains(&root) {
            segments.push(root);
        }
    }

    segments
}

/// A client-selected field, fragments inlined, response names applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectedField {
    Leaf(String),
    Branch { name: String, children: Vec<SelectedField> },
}

impl SelectedField {
    pub fn name(&self) -> &str {
        match self {
            SelectedField::Leaf(name) => name,
            SelectedField::Branch { name, .. } => name,
        }
    }
}

/// The selection tree under the resolved field as plain names, with
/// fragment spreads and inline fragments flattened away. When `entity` is
/// given, top-level type conditions not matching it are dropped.
pub fn get_field_selections(info: &ResolveInfo, entity: Option<&EntityRef>) -> CoreResult<Vec<SelectedField>> {
    collect_selected(&info.field.nested, info, entity.map(|entity| entity.name.as_str()))
}

fn collect_selected(
    selections: &[Selection],
    info: &ResolveInfo,
    entity_name: Option<&str>,
) -> CoreResult<Vec<SelectedField>> {
    let mut out = Vec::new();

    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let name = field.response_name().to_owned();

                if field.nested.is_empty() {
                    out.push(SelectedField::Leaf(name));
                } else {
                    out.push(SelectedField::Branch {
                        name,
                        // Entities change across relation boundaries, so the
                        // condition filter only applies at this level.
                        children: collect_selected(&field.nested, info, None)?,
                    });
                }
            }
            Selection::FragmentSpread { name } => {
                let fragment = info
                    .fragments
                    .get(name)
                    .ok_or_else(|| CoreError::internal(format!("unresolved fragment `{name}`")))?;

                if condition_matches(fragment.type_condition.as_deref(), entity_name) {
                    out.extend(collect_selected(&fragment.selections, info, entity_name)?);
                }
            }
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                if condition_matches(type_condition.as_deref(), entity_name) {
                    out.extend(collect_selected(selections, info, entity_name)?);
                }
            }
        }
    }

    Ok(out)
}

fn condition_matches(condition: Option<&str>, entity_name: Option<&str>) -> bool {
    match (condition, entity_name) {
        (Some(condition), Some(entity)) => condition == entity,
        _ => true,
    }
}
