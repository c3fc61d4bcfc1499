use crate::{
    validate_pagination, window_for, BatchPlan, CoreError, CoreResult, FieldDeclaration, FieldSelection,
    OptimizerSettings, PaginationArgs, PlanStore, ResolveInfo, ResolverHints, Selection,
};
use query_structure::{EntityRef, Field, QuerySet, Relation};
use tracing::trace;

/// Per-frame walker state. A new context is derived on every descent, so
/// unwinding out of a subtree (normal or through `?`) releases the frame
/// with the call stack.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkContext {
    /// Depth of join/batch recursions on this branch.
    complexity: usize,
    /// The enclosing subtree is paginating: nested connections must be
    /// windowed even without explicit arguments.
    paginating: bool,
}

impl WalkContext {
    pub(crate) fn root() -> Self {
        Self {
            complexity: 0,
            paginating: false,
        }
    }

    pub(crate) fn paginating(self) -> Self {
        Self {
            paginating: true,
            ..self
        }
    }

    fn descend(self, max_complexity: usize) -> CoreResult<Self> {
        let complexity = self.complexity + 1;

        if complexity > max_complexity {
            return Err(CoreError::ComplexityExceeded { max: max_complexity });
        }

        Ok(Self { complexity, ..self })
    }
}

/// The selection-set walker: dispatches on node kind and on the field's
/// classification against the current entity, accumulating into the plan
/// store of the current frame.
pub(crate) struct OptimizationCompiler<'a> {
    info: &'a ResolveInfo,
    settings: &'a OptimizerSettings,
    max_complexity: usize,
}

impl<'a> OptimizationCompiler<'a> {
    pub(crate) fn new(info: &'a ResolveInfo, max_complexity: usize) -> Self {
        Self {
            info,
            settings: &info.settings,
            max_complexity,
        }
    }

    pub(crate) fn walk_selection_set(
        &self,
        selections: &[Selection],
        entity: &EntityRef,
        store: &mut PlanStore,
        ctx: WalkContext,
    ) -> CoreResult<()> {
        for selection in selections {
            match selection {
                Selection::Field(field) => self.walk_field(field, entity, store, ctx)?,
                Selection::FragmentSpread { name } => {
                    let fragment = self
                        .info
                        .fragments
                        .get(name)
                        .ok_or_else(|| CoreError::internal(format!("unresolved fragment `{name}`")))?;

                    if type_condition_matches(fragment.type_condition.as_deref(), entity) {
                        self.walk_selection_set(&fragment.selections, entity, store, ctx)?;
                    }
                }
                Selection::InlineFragment {
                    type_condition,
                    selections,
                } => {
                    // Union members and polymorphic branches: recurse only
                    // when the condition names the current entity.
                    if type_condition_matches(type_condition.as_deref(), entity) {
                        self.walk_selection_set(selections, entity, store, ctx)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn walk_field(
        &self,
        field: &FieldSelection,
        entity: &EntityRef,
        store: &mut PlanStore,
        ctx: WalkContext,
    ) -> CoreResult<()> {
        trace!(field = %field.name, entity = %entity.name, "classifying field");

        if let Some(declaration) = self.info.declarations.get(&entity.name, &field.name) {
            // Connection declarations describe the wrapper shape of an
            // underlying relation and fall through to relation dispatch.
            if !matches!(declaration, FieldDeclaration::Connection(_)) {
                return self.walk_declared(field, &declaration.clone(), entity, store, ctx);
            }
        }

        match entity.find_field(&field.name) {
            Some(Field::Scalar(column)) => {
                store.add_column(column.name.clone());
                Ok(())
            }
            Some(Field::Relation(relation)) => {
                let relation = relation.clone();

                if relation.is_polymorphic() {
                    // Unknown target at plan time: project the discriminating
                    // scalar and let the resolver pick the branch.
                    store.add_column(relation.foreign_key.clone());
                    return Ok(());
                }

                if relation.is_to_one() {
                    if !field.has_nested_selections() && relation.is_forward() {
                        // The scalar column backing the relation, queried
                        // directly: only the FK is needed.
                        store.add_column(relation.foreign_key.clone());
                        return Ok(());
                    }

                    self.walk_single_relation(field, &relation, store, ctx)
                } else {
                    // `_set` fallback and friends: keep the queried name as
                    // the attachment attribute when it differs.
                    let to_attr = (field.name != relation.name).then(|| field.name.clone());
                    self.walk_multi_relation(field, &relation, entity, store, ctx, to_attr)
                }
            }
            None => {
                if let Some(relation) = entity.foreign_key_id_target(&field.name) {
                    store.add_column(relation.foreign_key.clone());
                    return Ok(());
                }

                Err(CoreError::UnknownField {
                    name: field.name.clone(),
                    entity: entity.name.clone(),
                })
            }
        }
    }

    fn walk_declared(
        &self,
        field: &FieldSelection,
        declaration: &FieldDeclaration,
        entity: &EntityRef,
        store: &mut PlanStore,
        ctx: WalkContext,
    ) -> CoreResult<()> {
        match declaration {
            FieldDeclaration::RelationAlias { field_name } => {
                let relation = entity
                    .find_relation(field_name)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownField {
                        name: field_name.clone(),
                        entity: entity.name.clone(),
                    })?;

                if relation.is_to_one() {
                    // Joined values stay keyed by the relation path; the
                    // aliased resolver reaches them through its declaration,
                    // so no rename is carried on the join.
                    self.walk_single_relation(field, &relation, store, ctx)
                } else {
                    self.walk_multi_relation(field, &relation, entity, store, ctx, Some(field.name.clone()))
                }
            }
            FieldDeclaration::Annotated { expression } => {
                store.add_annotation(field.response_name().to_owned(), expression.clone());
                Ok(())
            }
            FieldDeclaration::Resolver(hints) => self.expand_resolver_hints(hints, entity, store),
            FieldDeclaration::Connection(_) => Err(CoreError::internal(
                "connection declarations are dispatched as relations",
            )),
        }
    }

    /// Expands a resolver's declared requirements into columns, joins,
    /// batches and annotations on the current store.
    fn expand_resolver_hints(
        &self,
        hints: &ResolverHints,
        entity: &EntityRef,
        store: &mut PlanStore,
    ) -> CoreResult<()> {
        for path in &hints.columns {
            self.add_column_path(entity, store, path)?;
        }

        for name in &hints.relations {
            let relation = entity
                .find_relation(name)
                .cloned()
                .ok_or_else(|| CoreError::UnknownField {
                    name: name.clone(),
                    entity: entity.name.clone(),
                })?;

            if relation.is_polymorphic() {
                store.add_column(relation.foreign_key.clone());
                continue;
            }

            let related = self
                .info
                .schema
                .related_entity(&relation)
                .ok_or_else(|| CoreError::internal(format!("relation `{}` has no target", relation.name)))?;

            if relation.is_to_one() {
                if relation.is_forward() {
                    store.add_column(relation.foreign_key.clone());
                }

                let mut child = PlanStore::new(related);
                if !relation.is_forward() {
                    child.add_column(relation.foreign_key.clone());
                }

                store.add_join(relation.name.clone(), child)?;
            } else {
                let mut child = PlanStore::new(related.clone());
                child.add_column(relation.foreign_key.clone());

                store.add_batch(
                    relation.name.clone(),
                    BatchPlan {
                        store: child,
                        queryset: QuerySet::new(self.info.schema.clone(), related),
                        window: None,
                        slice: None,
                        to_attr: None,
                    },
                )?;
            }
        }

        for (name, expression) in &hints.annotations {
            store.add_annotation(name.clone(), expression.clone());
        }

        Ok(())
    }

    /// Declared column requirement, dot-path allowed for joined columns.
    fn add_column_path(&self, entity: &EntityRef, store: &mut PlanStore, path: &str) -> CoreResult<()> {
        match path.split_once('.') {
            None => {
                if entity.find_column(path).is_none() {
                    return Err(CoreError::UnknownField {
                        name: path.to_owned(),
                        entity: entity.name.clone(),
                    });
                }

                store.add_column(path.to_owned());
                Ok(())
            }
            Some((head, rest)) => {
                let relation = entity
                    .find_relation(head)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownField {
                        name: head.to_owned(),
                        entity: entity.name.clone(),
                    })?;

                let related = self
                    .info
                    .schema
                    .related_entity(&relation)
                    .ok_or_else(|| CoreError::internal(format!("relation `{head}` has no target")))?;

                if relation.is_forward() {
                    store.add_column(relation.foreign_key.clone());
                }

                let mut child = PlanStore::new(related.clone());
                self.add_column_path(&related, &mut child, rest)?;
                store.add_join(relation.name.clone(), child)
            }
        }
    }

    /// A single-valued relation becomes a join: child store, FK column on
    /// the side that holds it, recursion into the child entity.
    fn walk_single_relation(
        &self,
        field: &FieldSelection,
        relation: &Relation,
        store: &mut PlanStore,
        ctx: WalkContext,
    ) -> CoreResult<()> {
        let ctx = ctx.descend(self.max_complexity)?;

        let related = self
            .info
            .schema
            .related_entity(relation)
            .ok_or_else(|| CoreError::internal(format!("relation `{}` has no target", relation.name)))?;

        if relation.is_forward() {
            // Keep the join key retrievable on the parent.
            store.add_column(relation.foreign_key.clone());
        }

        let mut child = PlanStore::new(related.clone());
        if !relation.is_forward() {
            child.add_column(relation.foreign_key.clone());
        }

        // A join inside a batch context inherits it: nested connections
        // below still see a paginating ancestor.
        self.walk_selection_set(&field.nested, &related, &mut child, ctx)?;

        store.add_join(relation.name.clone(), child)
    }

    /// A multi-valued relation becomes a batch: its own base queryset,
    /// optionally window-limited, fetched separately and stitched back by
    /// the parent-linking FK.
    fn walk_multi_relation(
        &self,
        field: &FieldSelection,
        relation: &Relation,
        entity: &EntityRef,
        store: &mut PlanStore,
        ctx: WalkContext,
        to_attr: Option<String>,
    ) -> CoreResult<()> {
        let ctx = ctx.descend(self.max_complexity)?;

        let related = self
            .info
            .schema
            .related_entity(relation)
            .ok_or_else(|| CoreError::internal(format!("relation `{}` has no target", relation.name)))?;

        let mut child = PlanStore::new(related.clone());
        let mut base = QuerySet::new(self.info.schema.clone(), related.clone());

        // The column the window partitions on and the driver stitches by.
        let partition_key = match &relation.junction_table {
            Some(junction) => {
                // Many-to-many through a junction table: remember the alias
                // so a secondary filter step reuses it instead of joining
                // the junction table again.
                self.info.cache.record_junction_alias(junction.table.clone());
                base.record_junction_alias(junction.table.clone());
                junction.parent_column.clone()
            }
            None => {
                child.add_column(relation.foreign_key.clone());
                relation.foreign_key.clone()
            }
        };

        let connection_declaration = self.info.declarations.connection(&entity.name, &field.name);
        let is_connection = connection_declaration.is_some() || field.find_nested("edges").is_some();

        // The default-connection setting makes flat to-many lists page like
        // connections, but dispatch still follows the actual sub-selection
        // shape: a flat list has no wrapper fields to unwrap.
        let paginates = is_connection || self.settings.allow_connection_as_default_nested_to_many_field;

        let max_limit = connection_declaration
            .and_then(|declaration| declaration.max_limit)
            .or(self.settings.default_max_limit);

        let args = PaginationArgs::from_field(field);

        // An unlimited connection (no arguments, no ceiling) is not
        // window-rewritten at all; everything else paginating gets a
        // window, nested connections under a paginating parent included.
        let wants_window =
            paginates && (!args.is_empty() || max_limit.is_some() || ctx.paginating);

        let slice = wants_window
            .then(|| validate_pagination(&args, max_limit))
            .transpose()?;

        if is_connection {
            let child_ctx = if wants_window { ctx.paginating() } else { ctx };
            self.walk_connection(field, &related, &mut child, child_ctx)?;
        } else {
            self.walk_selection_set(&field.nested, &related, &mut child, ctx)?;
        }

        let needs_total = child.computes_total_count();
        let window = match &slice {
            Some(slice) => Some(window_for(
                partition_key,
                base.effective_ordering(),
                slice,
                needs_total,
            )),
            None => None,
        };

        store.add_batch(
            relation.name.clone(),
            BatchPlan {
                store: child,
                queryset: base,
                window,
                slice,
                to_attr: to_attr.filter(|attr| attr != &relation.name),
            },
        )
    }

    /// The generated connection wrapper of a paginated result:
    /// `edges.node` recurses under the node entity, `pageInfo` is a no-op,
    /// the total-count field flips the flag.
    pub(crate) fn walk_connection(
        &self,
        field: &FieldSelection,
        entity: &EntityRef,
        store: &mut PlanStore,
        ctx: WalkContext,
    ) -> CoreResult<()> {
        for selection in &field.nested {
            let sub = match selection {
                Selection::Field(sub) => sub,
                // Guarded path: fragment composition inside the wrapper is
                // not expected from any supported client shape.
                Selection::FragmentSpread { .. } | Selection::InlineFragment { .. } => {
                    return Err(CoreError::internal(
                        "fragment inside a connection wrapper",
                    ));
                }
            };

            match sub.name.as_str() {
                "edges" => {
                    for edge_selection in &sub.nested {
                        let edge_field = match edge_selection {
                            Selection::Field(edge_field) => edge_field,
                            Selection::FragmentSpread { .. } | Selection::InlineFragment { .. } => {
                                return Err(CoreError::internal("fragment inside connection edges"));
                            }
                        };

                        match edge_field.name.as_str() {
                            "node" => {
                                self.walk_selection_set(&edge_field.nested, entity, store, ctx)?;
                            }
                            "cursor" => {}
                            other => {
                                return Err(CoreError::UnknownField {
                                    name: other.to_owned(),
                                    entity: entity.name.clone(),
                                })
                            }
                        }
                    }
                }
                "pageInfo" => {}
                name if name == self.settings.total_count_field => store.set_total_count(),
                other => {
                    return Err(CoreError::UnknownField {
                        name: other.to_owned(),
                        entity: entity.name.clone(),
                    })
                }
            }
        }

        Ok(())
    }
}

fn type_condition_matches(type_condition: Option<&str>, entity: &EntityRef) -> bool {
    type_condition.map_or(true, |condition| condition == entity.name)
}
