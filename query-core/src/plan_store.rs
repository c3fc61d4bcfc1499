use crate::{apply_window, CoreError, CoreResult, OptimizerSettings, PaginationSlice};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use query_structure::{EntityRef, PaginationWindow, Prefetch, QuerySet};
use sql_ast::ast::Expression;

/// A batched sub-query accumulated for a multi-valued relation.
#[derive(Debug)]
pub struct BatchPlan {
    pub store: PlanStore,
    /// The base relation queryset the batch starts from; filters arriving
    /// from the query boundary are already on it.
    pub queryset: QuerySet,
    pub window: Option<PaginationWindow>,
    pub slice: Option<PaginationSlice>,
    /// Attribute to attach results under when the client queried the
    /// relation through a different name.
    pub to_attr: Option<String>,
}

/// The per-subtree accumulator: scalar columns to project, single-valued
/// relations to join, multi-valued relations to fetch in separate batches,
/// and synthetic columns to annotate.
///
/// The primary key is inserted at construction; a relation is never both a
/// join and a batch in the same store.
#[derive(Debug)]
pub struct PlanStore {
    entity: EntityRef,
    columns: IndexSet<String>,
    joins: IndexMap<String, PlanStore>,
    batches: IndexMap<String, BatchPlan>,
    annotations: IndexMap<String, Expression>,
    compute_total_count: bool,
}

impl PlanStore {
    pub fn new(entity: EntityRef) -> Self {
        let mut columns = IndexSet::new();
        columns.insert(entity.primary_key.clone());

        Self {
            entity,
            columns,
            joins: IndexMap::new(),
            batches: IndexMap::new(),
            annotations: IndexMap::new(),
            compute_total_count: false,
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn columns(&self) -> &IndexSet<String> {
        &self.columns
    }

    pub fn joins(&self) -> &IndexMap<String, PlanStore> {
        &self.joins
    }

    pub fn batches(&self) -> &IndexMap<String, BatchPlan> {
        &self.batches
    }

    pub fn computes_total_count(&self) -> bool {
        self.compute_total_count
    }

    pub fn add_column(&mut self, name: impl Into<String>) {
        self.columns.insert(name.into());
    }

    pub fn add_annotation(&mut self, name: impl Into<String>, expression: Expression) {
        self.annotations.insert(name.into(), expression);
    }

    pub fn set_total_count(&mut self) {
        self.compute_total_count = true;
    }

    /// Registers a single-valued relation child, merging with an existing
    /// entry for the same relation.
    pub fn add_join(&mut self, name: impl Into<String>, child: PlanStore) -> CoreResult<()> {
        let name = name.into();

        if self.batches.contains_key(&name) {
            return Err(CoreError::internal(format!(
                "relation `{name}` registered as both a join and a batch"
            )));
        }

        match self.joins.get_mut(&name) {
            Some(existing) => existing.merge(child)?,
            None => {
                self.joins.insert(name, child);
            }
        }

        Ok(())
    }

    /// Registers a multi-valued relation batch.
    pub fn add_batch(&mut self, name: impl Into<String>, batch: BatchPlan) -> CoreResult<()> {
        let name = name.into();

        if self.joins.contains_key(&name) {
            return Err(CoreError::internal(format!(
                "relation `{name}` registered as both a join and a batch"
            )));
        }

        match self.batches.get_mut(&name) {
            Some(existing) => {
                existing.store.merge(batch.store)?;
                // Keep the more specific of the two base querysets: the
                // windowed one wins.
                if existing.window.is_none() && batch.window.is_some() {
                    existing.queryset = batch.queryset;
                    existing.window = batch.window;
                    existing.slice = batch.slice;
                }
            }
            None => {
                self.batches.insert(name, batch);
            }
        }

        Ok(())
    }

    /// Tree concatenation: set-union of columns, recursive map-merge of
    /// joins and batches, bit-or of flags.
    pub fn merge(&mut self, other: PlanStore) -> CoreResult<()> {
        self.columns.extend(other.columns);
        self.annotations.extend(other.annotations);
        self.compute_total_count |= other.compute_total_count;

        for (name, child) in other.joins {
            self.add_join(name, child)?;
        }

        for (name, batch) in other.batches {
            self.add_batch(name, batch)?;
        }

        Ok(())
    }

    /// The projected column paths of this store: every local column plus,
    /// for each join, the child's paths prefixed with the relation name.
    pub fn projected_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.columns.iter().cloned().collect();

        for (name, child) in &self.joins {
            for path in child.projected_paths() {
                paths.push(format!("{name}.{path}"));
            }
        }

        paths
    }

    /// All transitive single-valued join paths, dotted.
    pub fn join_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();

        for (name, child) in &self.joins {
            paths.push(name.clone());

            for path in child.join_paths() {
                paths.push(format!("{name}.{path}"));
            }
        }

        paths
    }

    /// Lowers the accumulation onto the queryset: projection and joins
    /// flatten into the parent, batches apply to their own base querysets
    /// and hang off as prefetches.
    pub fn apply(self, queryset: QuerySet, settings: &OptimizerSettings) -> CoreResult<QuerySet> {
        self.apply_inner(queryset, settings, false)
    }

    fn apply_inner(self, queryset: QuerySet, settings: &OptimizerSettings, in_batch: bool) -> CoreResult<QuerySet> {
        let mut queryset = queryset.only(self.projected_paths());

        for path in self.join_paths() {
            queryset = queryset.select_related(path);
        }

        for (name, expression) in self.annotations {
            queryset = queryset.annotate(name, expression);
        }

        for (name, batch) in self.batches {
            let mut child = batch.store.apply_inner(batch.queryset, settings, true)?;

            if let Some(window) = batch.window {
                let slice = batch.slice.unwrap_or_default();
                child = apply_window(child, window, &slice, settings);
            }

            let mut prefetch = Prefetch::new(name, child);
            if let Some(to_attr) = batch.to_attr {
                prefetch = prefetch.to_attr(to_attr);
            }

            queryset = queryset.prefetch_related(prefetch);
        }

        // Inside a batch the total lives in the `COUNT(*) OVER` partition;
        // an unpartitioned count query would span every parent's rows. Only
        // the root gets the separate round trip.
        if self.compute_total_count && !in_batch {
            queryset = queryset.with_total_count();
        }

        Ok(queryset)
    }
}

/// Canonical fingerprint of a rewritten queryset: the projected columns,
/// join paths, batched relation paths and annotation names, sorted so two
/// plans with the same shape share a key. Annotation names are part of the
/// tag so differently annotated requests do not collide.
pub fn plan_fingerprint(queryset: &QuerySet) -> String {
    let columns = queryset.selected_columns().iter().sorted().join(",");
    let joins = queryset.select_related_paths().iter().sorted().join(",");
    let annotations = queryset.annotations().keys().sorted().join(",");

    let batches = queryset
        .prefetches()
        .values()
        .map(|prefetch| format!("{}({})", prefetch.relation, plan_fingerprint(&prefetch.queryset)))
        .sorted()
        .join(",");

    format!(
        "{}|columns:{columns}|joins:{joins}|batches:{batches}|annotations:{annotations}",
        queryset.entity().name
    )
}
