use pretty_assertions::assert_eq;
use query_core::{
    get_field_selections, get_from_query_cache, optimize, optimize_one, plan_fingerprint,
    store_in_query_cache, ArgumentValue,
    Executor, ExecutorError, FieldDeclaration, FieldSelection, FragmentDefinition, Fragments,
    OptimizerSettings, QueryCacheStore, ResolveInfo, ResolverHints, SchemaExtensions, SelectedField,
};
use query_structure::{
    EntityDescriptor, JunctionTable, PkValue, QuerySet, Record, Relation, ScalarColumn, Schema, SchemaRef,
    TypeIdentifier, Value,
};
use sql_ast::ast::Expression;
use std::sync::Arc;

/// The housing domain: a five-deep chain of single-valued relations plus
/// multi-valued branches for sales and ownerships.
fn housing_schema() -> SchemaRef {
    Schema::new(vec![
        EntityDescriptor::new("PostalCode", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("code", TypeIdentifier::String)),
        EntityDescriptor::new("HousingCompany", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("name", TypeIdentifier::String))
            .relation(Relation::forward_single("postal_code", "PostalCode", "postal_code_id"))
            .relation(Relation::reverse_multi("real_estates", "RealEstate", "housing_company_id"))
            .relation(
                Relation::reverse_multi("developers", "Developer", "id").through(JunctionTable {
                    table: "housing_company_developers".into(),
                    parent_column: "housingcompany_id".into(),
                    related_column: "developer_id".into(),
                }),
            ),
        EntityDescriptor::new("Developer", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("name", TypeIdentifier::String)),
        EntityDescriptor::new("RealEstate", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("name", TypeIdentifier::String))
            .relation(Relation::forward_single("housing_company", "HousingCompany", "housing_company_id"))
            .relation(Relation::reverse_multi("buildings", "Building", "real_estate_id")),
        EntityDescriptor::new("Building", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("name", TypeIdentifier::String))
            .relation(Relation::forward_single("real_estate", "RealEstate", "real_estate_id"))
            .relation(Relation::reverse_multi("apartments", "Apartment", "building_id")),
        EntityDescriptor::new("Apartment", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("street_address", TypeIdentifier::String))
            .relation(Relation::forward_single("building", "Building", "building_id"))
            .relation(Relation::reverse_multi("sales", "Sale", "apartment_id")),
        EntityDescriptor::new("Sale", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("purchase_price", TypeIdentifier::Int))
            .relation(Relation::forward_single("apartment", "Apartment", "apartment_id"))
            .relation(Relation::reverse_multi("ownerships", "Ownership", "sale_id"))
            .relation(Relation::polymorphic("contract", "contract_id")),
        EntityDescriptor::new("Ownership", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("percentage", TypeIdentifier::Int))
            .relation(Relation::forward_single("sale", "Sale", "sale_id"))
            .relation(Relation::forward_single("owner", "Owner", "owner_id")),
        EntityDescriptor::new("Owner", "id")
            .column(ScalarColumn::new("id", TypeIdentifier::Int))
            .column(ScalarColumn::new("name", TypeIdentifier::String))
            .relation(Relation::reverse_multi("ownerships", "Ownership", "owner_id")),
    ])
}

fn queryset(schema: &SchemaRef, entity: &str) -> QuerySet {
    QuerySet::for_entity(schema, entity).unwrap()
}

fn connection_shape(node: FieldSelection) -> FieldSelection {
    FieldSelection::with_name("edges").nested(node)
}

#[test]
fn deep_single_valued_chain_folds_into_one_query() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .nested(FieldSelection::with_name("street_address"))
        .nested(
            FieldSelection::with_name("building")
                .nested(FieldSelection::with_name("name"))
                .nested(
                    FieldSelection::with_name("real_estate").nested(
                        FieldSelection::with_name("housing_company").nested(
                            FieldSelection::with_name("postal_code")
                                .nested(FieldSelection::with_name("code")),
                        ),
                    ),
                ),
        );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert_eq!(optimized.round_trips(), 1);
    assert!(optimized
        .selected_columns()
        .contains("building.real_estate.housing_company.postal_code.code"));
    assert!(optimized
        .select_related_paths()
        .contains("building.real_estate.housing_company.postal_code"));

    let statements = optimized.to_sql_statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].matches("LEFT JOIN").count(), 4);
}

#[test]
fn multi_valued_branches_cost_one_round_trip_each() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .nested(FieldSelection::with_name("street_address"))
        .nested(
            FieldSelection::with_name("sales")
                .nested(FieldSelection::with_name("purchase_price"))
                .nested(
                    FieldSelection::with_name("ownerships")
                        .nested(FieldSelection::with_name("percentage"))
                        .nested(FieldSelection::with_name("owner").nested(FieldSelection::with_name("name"))),
                ),
        );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    // Root, sales, ownerships. The owner join rides along for free.
    assert_eq!(optimized.round_trips(), 3);

    let sales = &optimized.prefetches()["sales"].queryset;
    assert!(sales.selected_columns().contains("apartment_id"));

    let ownerships = &sales.prefetches()["ownerships"].queryset;
    assert!(ownerships.select_related_paths().contains("owner"));

    // Flat lists are fetched whole, never window-numbered.
    for statement in optimized.to_sql_statements() {
        assert!(!statement.contains("ROW_NUMBER"));
    }
}

#[test]
fn recursion_past_the_complexity_ceiling_is_rejected() {
    let schema = housing_schema();

    // Alternate building/apartments twelve relations deep.
    let mut field = FieldSelection::with_name("street_address");
    for depth in 0..12 {
        let name = if depth % 2 == 0 { "apartments" } else { "building" };
        field = FieldSelection::with_name(name).nested(field);
    }
    let root = FieldSelection::with_name("apartments").nested(field);

    let info = ResolveInfo::new(1, schema.clone(), root);
    let err = optimize(queryset(&schema, "Apartment"), &info, None).unwrap_err();

    assert_eq!(err.to_string(), "Query complexity exceeds the maximum allowed of 10");
}

#[test]
fn root_connection_pages_with_limit_and_offset() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .argument("first", 2i64)
        .nested(connection_shape(
            FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
        ))
        .nested(FieldSelection::with_name("totalCount"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.requests_total_count());
    assert_eq!(optimized.round_trips(), 2);
    assert_eq!(optimized.limit_value(), Some(2));
    assert_eq!(optimized.offset_value(), Some(0));

    let statements = optimized.to_sql_statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].contains("COUNT(*)"));
    assert!(statements[1].ends_with("LIMIT 2 OFFSET 0"));
}

#[test]
fn root_connection_offset_defers_bounding_to_the_total() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .argument("offset", 2i64)
        .nested(connection_shape(
            FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
        ));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    // The default ceiling caps the page; the executor clamps further once
    // the total is known.
    assert_eq!(optimized.offset_value(), Some(2));
    assert_eq!(optimized.limit_value(), Some(100));
    assert!(optimized.requests_total_count());
    assert_eq!(optimized.round_trips(), 2);
}

#[test]
fn root_connection_counts_even_without_total_count_selected() {
    let schema = housing_schema();

    // Only nodes are selected; `pageInfo` and the trailing-page arithmetic
    // still need the total, so the count query is unconditional.
    let field = FieldSelection::with_name("apartments")
        .argument("first", 2i64)
        .nested(connection_shape(
            FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
        ));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.requests_total_count());
    assert_eq!(optimized.round_trips(), 2);

    let statements = optimized.to_sql_statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("SELECT COUNT(*)"));
    assert!(statements[1].ends_with("LIMIT 2 OFFSET 0"));
}

#[test]
fn nested_connection_is_window_numbered_per_parent() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("buildings")
        .nested(FieldSelection::with_name("name"))
        .nested(
            FieldSelection::with_name("apartments")
                .argument("first", 2i64)
                .nested(connection_shape(
                    FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
                )),
        );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Building"), &info, None).unwrap();

    assert_eq!(optimized.round_trips(), 2);

    let batch = &optimized.prefetches()["apartments"].queryset;
    let window = batch.window_spec().unwrap();
    assert_eq!(window.partition_by, "building_id");
    assert_eq!(window.start, 0);
    assert_eq!(window.stop, Some(2));

    let statements = optimized.to_sql_statements();
    assert!(statements[1].contains("ROW_NUMBER() OVER(PARTITION BY \"base\".\"building_id\""));
    assert!(statements[1].contains("BETWEEN 1 AND 2"));
}

#[test]
fn nested_total_count_stays_inside_the_window() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("buildings").nested(
        FieldSelection::with_name("apartments")
            .argument("first", 2i64)
            .nested(connection_shape(
                FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
            ))
            .nested(FieldSelection::with_name("totalCount")),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Building"), &info, None).unwrap();

    // The per-parent total comes from the partitioned count column; a
    // separate count query would span every parent's rows.
    assert_eq!(optimized.round_trips(), 2);

    let batch = &optimized.prefetches()["apartments"].queryset;
    assert!(!batch.requests_total_count());
    assert!(batch.window_spec().unwrap().needs_total);

    let statements = optimized.to_sql_statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].contains("COUNT(*) OVER(PARTITION BY \"base\".\"building_id\")"));
    assert!(!statements.iter().any(|s| s.starts_with("SELECT COUNT(*)")));
}

#[test]
fn connection_default_setting_windows_flat_lists() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("buildings").nested(
        FieldSelection::with_name("apartments").nested(FieldSelection::with_name("street_address")),
    );

    let settings = OptimizerSettings {
        allow_connection_as_default_nested_to_many_field: true,
        ..Default::default()
    };

    let info = ResolveInfo::new(1, schema.clone(), field).settings(Arc::new(settings));
    let optimized = optimize(queryset(&schema, "Building"), &info, None).unwrap();

    // The flat sub-selection walks as-is; only the window is implied.
    let batch = &optimized.prefetches()["apartments"].queryset;
    assert!(batch.selected_columns().contains("street_address"));

    let window = batch.window_spec().unwrap();
    assert_eq!(window.partition_by, "building_id");
    assert_eq!(window.stop, Some(100));
}

#[test]
fn invalid_pagination_arguments_surface_with_their_messages() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("buildings").nested(
        FieldSelection::with_name("apartments")
            .argument("first", 0i64)
            .nested(connection_shape(
                FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
            )),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let err = optimize(queryset(&schema, "Building"), &info, None).unwrap_err();

    assert_eq!(err.to_string(), "Argument 'first' must be a positive integer.");
}

#[test]
fn unknown_fields_are_rejected_by_name_and_entity() {
    let schema = housing_schema();
    let field = FieldSelection::with_name("apartments").nested(FieldSelection::with_name("floor_area"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let err = optimize(queryset(&schema, "Apartment"), &info, None).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Field `floor_area` does not exist on entity `Apartment`"
    );
}

#[test]
fn optimizing_twice_is_a_no_op() {
    let schema = housing_schema();
    let field = FieldSelection::with_name("apartments").nested(FieldSelection::with_name("street_address"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let once = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();
    let fingerprint = plan_fingerprint(&once);

    let twice = optimize(once, &info, None).unwrap();
    assert_eq!(plan_fingerprint(&twice), fingerprint);
}

#[test]
fn fragment_spreads_plan_identically_to_inline_fields() {
    let schema = housing_schema();

    let direct = FieldSelection::with_name("apartments")
        .nested(FieldSelection::with_name("street_address"))
        .nested(FieldSelection::with_name("building").nested(FieldSelection::with_name("name")));

    let mut fragments = Fragments::default();
    fragments.insert(
        "ApartmentFields".into(),
        FragmentDefinition {
            type_condition: Some("Apartment".into()),
            selections: vec![
                FieldSelection::with_name("street_address").into(),
                FieldSelection::with_name("building")
                    .nested(FieldSelection::with_name("name"))
                    .into(),
            ],
        },
    );

    let spread = FieldSelection::with_name("apartments").nested(query_core::Selection::FragmentSpread {
        name: "ApartmentFields".into(),
    });

    let direct_info = ResolveInfo::new(1, schema.clone(), direct);
    let spread_info = ResolveInfo::new(2, schema.clone(), spread).fragments(fragments);

    let direct_plan = optimize(queryset(&schema, "Apartment"), &direct_info, None).unwrap();
    let spread_plan = optimize(queryset(&schema, "Apartment"), &spread_info, None).unwrap();

    assert_eq!(plan_fingerprint(&direct_plan), plan_fingerprint(&spread_plan));
}

#[test]
fn set_suffix_queries_attach_under_the_queried_name() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments").nested(
        FieldSelection::with_name("sales_set").nested(FieldSelection::with_name("purchase_price")),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    let prefetch = &optimized.prefetches()["sales"];
    assert_eq!(prefetch.to_attr.as_deref(), Some("sales_set"));
}

#[test]
fn foreign_key_id_fields_only_need_the_key_column() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments").nested(FieldSelection::with_name("building_id"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert_eq!(optimized.round_trips(), 1);
    assert!(optimized.selected_columns().contains("building_id"));
    assert!(optimized.select_related_paths().is_empty());
}

#[test]
fn many_to_many_batches_reserve_their_junction_alias() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("housing_companies").nested(
        FieldSelection::with_name("developers").nested(FieldSelection::with_name("name")),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "HousingCompany"), &info, None).unwrap();

    assert_eq!(optimized.round_trips(), 2);
    assert!(info.cache.junction_aliases().contains("housing_company_developers"));

    let batch = &optimized.prefetches()["developers"].queryset;
    assert!(batch.reused_junction_aliases().contains("housing_company_developers"));
}

#[test]
fn relation_alias_declarations_redirect_to_the_backing_relation() {
    let schema = housing_schema();

    let mut declarations = query_core::DeclarationRegistry::new();
    declarations.declare(
        "Apartment",
        "home_building",
        FieldDeclaration::RelationAlias {
            field_name: "building".into(),
        },
    );

    let field = FieldSelection::with_name("apartments").nested(
        FieldSelection::with_name("home_building").nested(FieldSelection::with_name("name")),
    );

    let info = ResolveInfo::new(1, schema.clone(), field).declarations(Arc::new(declarations));
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.select_related_paths().contains("building"));
    assert!(optimized.selected_columns().contains("building.name"));
}

#[test]
fn annotated_declarations_become_synthetic_columns() {
    let schema = housing_schema();

    let mut declarations = query_core::DeclarationRegistry::new();
    declarations.declare(
        "Apartment",
        "sales_count",
        FieldDeclaration::Annotated {
            expression: Expression::Raw(
                "(SELECT COUNT(*) FROM \"sale\" WHERE \"sale\".\"apartment_id\" = \"apartment\".\"id\")".into(),
            ),
        },
    );

    let field = FieldSelection::with_name("apartments").nested(FieldSelection::with_name("sales_count"));

    let info = ResolveInfo::new(1, schema.clone(), field).declarations(Arc::new(declarations));
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.annotations().contains_key("sales_count"));
    assert!(optimized.to_sql_statements()[0].contains("AS \"sales_count\""));
}

#[test]
fn resolver_hints_expand_into_columns_and_joins() {
    let schema = housing_schema();

    let mut declarations = query_core::DeclarationRegistry::new();
    declarations.declare(
        "Apartment",
        "display_name",
        FieldDeclaration::Resolver(
            ResolverHints::new().required_columns(["street_address", "building.name"]),
        ),
    );

    let field = FieldSelection::with_name("apartments").nested(FieldSelection::with_name("display_name"));

    let info = ResolveInfo::new(1, schema.clone(), field).declarations(Arc::new(declarations));
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.selected_columns().contains("street_address"));
    assert!(optimized.selected_columns().contains("building.name"));
    assert!(optimized.select_related_paths().contains("building"));
}

#[test]
fn planner_failures_can_degrade_to_the_unrewritten_queryset() {
    let schema = housing_schema();

    // An unresolved fragment is an internal planner failure.
    let field = FieldSelection::with_name("apartments")
        .nested(query_core::Selection::FragmentSpread { name: "Missing".into() });

    let settings = OptimizerSettings {
        skip_optimization_on_error: true,
        ..Default::default()
    };

    let info = ResolveInfo::new(1, schema.clone(), field).settings(Arc::new(settings));
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(!optimized.is_optimized());
    assert!(optimized.selected_columns().is_empty());
}

struct CountingExecutor {
    calls: usize,
}

impl Executor for CountingExecutor {
    fn find_one(&mut self, queryset: &QuerySet) -> Result<Option<Record>, ExecutorError> {
        self.calls += 1;

        let mut record = Record::default();
        record.set(queryset.entity().primary_key.as_str(), 1i64);
        record.set("street_address", "Example street 1");
        Ok(Some(record))
    }
}

#[test]
fn single_entity_lookups_hit_the_identity_cache() {
    let schema = housing_schema();
    let field = FieldSelection::with_name("apartment").nested(FieldSelection::with_name("street_address"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let mut executor = CountingExecutor { calls: 0 };

    let first = optimize_one(queryset(&schema, "Apartment"), &info, PkValue::Int(1), &mut executor, None)
        .unwrap()
        .unwrap();
    assert_eq!(executor.calls, 1);

    let second = optimize_one(queryset(&schema, "Apartment"), &info, PkValue::Int(1), &mut executor, None)
        .unwrap()
        .unwrap();

    // Same Arc, no second round trip.
    assert_eq!(executor.calls, 1);
    assert!(Arc::ptr_eq(&first, &second));

    // A different key misses.
    optimize_one(queryset(&schema, "Apartment"), &info, PkValue::Int(2), &mut executor, None).unwrap();
    assert_eq!(executor.calls, 2);
}

#[test]
fn differently_shaped_plans_do_not_share_cache_entries() {
    let schema = housing_schema();
    let store = QueryCacheStore::new();
    let mut executor = CountingExecutor { calls: 0 };

    let narrow = FieldSelection::with_name("apartment").nested(FieldSelection::with_name("street_address"));
    let narrow_info = ResolveInfo::new(1, schema.clone(), narrow).attach_cache_store(&store);
    optimize_one(queryset(&schema, "Apartment"), &narrow_info, PkValue::Int(1), &mut executor, None).unwrap();

    let wide = FieldSelection::with_name("apartment")
        .nested(FieldSelection::with_name("street_address"))
        .nested(FieldSelection::with_name("building").nested(FieldSelection::with_name("name")));
    let wide_info = ResolveInfo::new(1, schema.clone(), wide).attach_cache_store(&store);

    optimize_one(queryset(&schema, "Apartment"), &wide_info, PkValue::Int(1), &mut executor, None).unwrap();

    // Different fingerprints, both fetched.
    assert_eq!(executor.calls, 2);
}

#[test]
fn batch_results_write_through_with_their_companions() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .nested(FieldSelection::with_name("street_address"))
        .nested(FieldSelection::with_name("building").nested(FieldSelection::with_name("name")))
        .nested(FieldSelection::with_name("sales").nested(FieldSelection::with_name("purchase_price")));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();
    let fingerprint = plan_fingerprint(&optimized);

    let mut record = Record::default();
    record.set("id", 1i64);
    record.set("street_address", "Example street 1");
    record.set("building_id", 7i64);
    record.set("building.id", 7i64);
    record.set("building.name", "Building A");

    let mut sale = Record::default();
    sale.set("id", 11i64);
    sale.set("apartment_id", 1i64);
    sale.set("purchase_price", 100_000i64);
    record.attach_related("sales", vec![sale]);

    store_in_query_cache(&info, &optimized, &[Arc::new(record)]).unwrap();

    assert!(info.cache.get("apartment", &fingerprint, &PkValue::Int(1)).is_some());
    assert!(get_from_query_cache(&info, &optimized, &PkValue::Int(1)).is_some());

    // The joined building row is addressable as its own record.
    let companion = info
        .cache
        .get("building", &format!("{fingerprint}/building"), &PkValue::Int(7))
        .unwrap();
    assert_eq!(companion.get("name"), Some(&Value::String("Building A".into())));

    // Prefetched children land under the batch's own fingerprint.
    let sales_fingerprint = plan_fingerprint(&optimized.prefetches()["sales"].queryset);
    assert!(info.cache.get("sale", &sales_fingerprint, &PkValue::Int(11)).is_some());
}

#[test]
fn field_selections_flatten_fragments_and_apply_aliases() {
    let schema = housing_schema();

    let mut fragments = Fragments::default();
    fragments.insert(
        "Address".into(),
        FragmentDefinition {
            type_condition: Some("Apartment".into()),
            selections: vec![FieldSelection::with_name("street_address").into()],
        },
    );

    let field = FieldSelection::with_name("apartments")
        .nested(query_core::Selection::FragmentSpread { name: "Address".into() })
        .nested(
            FieldSelection::with_name("building")
                .alias("home")
                .nested(FieldSelection::with_name("name")),
        );

    let entity = schema.find_entity("Apartment").unwrap();
    let info = ResolveInfo::new(1, schema.clone(), field).fragments(fragments);

    let selections = get_field_selections(&info, Some(&entity)).unwrap();

    assert_eq!(
        selections,
        vec![
            SelectedField::Leaf("street_address".into()),
            SelectedField::Branch {
                name: "home".into(),
                children: vec![SelectedField::Leaf("name".into())],
            },
        ]
    );
}

#[test]
fn nested_connections_inherit_pagination_from_their_parent() {
    let schema = housing_schema();

    // The outer connection paginates; the inner one gives no arguments but
    // still must not fetch unbounded rows.
    let inner = FieldSelection::with_name("apartments").nested(connection_shape(
        FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
    ));

    let field = FieldSelection::with_name("buildings")
        .argument("first", 2i64)
        .nested(connection_shape(
            FieldSelection::with_name("node")
                .nested(FieldSelection::with_name("name"))
                .nested(inner),
        ));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Building"), &info, None).unwrap();

    let batch = &optimized.prefetches()["apartments"].queryset;
    let window = batch.window_spec().unwrap();

    // No explicit arguments: the default ceiling bounds the page.
    assert_eq!(window.start, 0);
    assert_eq!(window.stop, Some(100));
}

#[test]
fn arguments_are_ignored_on_flat_lists() {
    let schema = housing_schema();

    // Without a connection shape the planner does not window, even with a
    // stray argument present.
    let field = FieldSelection::with_name("apartments").nested(
        FieldSelection::with_name("sales")
            .argument("purchase_price", ArgumentValue::Int(1))
            .nested(FieldSelection::with_name("purchase_price")),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    assert!(optimized.prefetches()["sales"].queryset.window_spec().is_none());
}

#[test]
fn inline_fragments_walk_only_on_a_matching_type_condition() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments")
        .nested(query_core::Selection::InlineFragment {
            type_condition: Some("Apartment".into()),
            selections: vec![FieldSelection::with_name("street_address").into()],
        })
        .nested(query_core::Selection::InlineFragment {
            type_condition: Some("Building".into()),
            selections: vec![FieldSelection::with_name("name").into()],
        });

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    // The mismatched branch is skipped silently, so `name` neither projects
    // nor errors as an unknown field.
    assert!(optimized.selected_columns().contains("street_address"));
    assert!(!optimized.selected_columns().contains("name"));
}

#[test]
fn polymorphic_relations_project_only_the_discriminating_key() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("apartments").nested(
        FieldSelection::with_name("sales").nested(
            FieldSelection::with_name("contract").nested(FieldSelection::with_name("id")),
        ),
    );

    let info = ResolveInfo::new(1, schema.clone(), field);
    let optimized = optimize(queryset(&schema, "Apartment"), &info, None).unwrap();

    // The target entity is unknown until materialization: no join, no
    // batch, just the key the resolver branches on.
    let sales = &optimized.prefetches()["sales"].queryset;
    assert!(sales.selected_columns().contains("contract_id"));
    assert!(sales.select_related_paths().is_empty());
    assert!(sales.prefetches().is_empty());
}

#[test]
fn attached_pk_hint_becomes_a_pk_filter() {
    let schema = housing_schema();
    let field = FieldSelection::with_name("apartment").nested(FieldSelection::with_name("street_address"));

    let info = ResolveInfo::new(1, schema.clone(), field);
    let hinted = queryset(&schema, "Apartment").hint_pk(&info.settings.pk_cache_key, PkValue::Int(3));

    let optimized = optimize(hinted, &info, None).unwrap();

    assert_eq!(optimized.pk(), Some(&PkValue::Int(3)));
    assert!(optimized.to_sql_statements()[0].contains("\"apartment\".\"id\" = 3"));
}

#[test]
fn window_count_alias_follows_the_settings() {
    let schema = housing_schema();

    let field = FieldSelection::with_name("buildings").nested(
        FieldSelection::with_name("apartments")
            .argument("last", 2i64)
            .nested(connection_shape(
                FieldSelection::with_name("node").nested(FieldSelection::with_name("street_address")),
            )),
    );

    let settings = OptimizerSettings {
        prefetch_count_key: "_page_total".into(),
        ..Default::default()
    };

    let info = ResolveInfo::new(1, schema.clone(), field).settings(Arc::new(settings));
    let optimized = optimize(queryset(&schema, "Building"), &info, None).unwrap();

    let statements = optimized.to_sql_statements();
    assert!(statements[1].contains("AS \"_page_total\""));
    assert!(statements[1].contains("> \"windowed\".\"_page_total\""));
}

#[test]
fn extension_attached_caches_are_shared_per_operation() {
    let schema = housing_schema();
    let extensions = SchemaExtensions::new();
    let mut executor = CountingExecutor { calls: 0 };

    let field = FieldSelection::with_name("apartment").nested(FieldSelection::with_name("street_address"));

    let first = ResolveInfo::new(1, schema.clone(), field.clone()).attach_extensions(&extensions);
    optimize_one(queryset(&schema, "Apartment"), &first, PkValue::Int(1), &mut executor, None).unwrap();
    assert_eq!(executor.calls, 1);

    // A second resolver of the same operation finds the store under the
    // configured key and hits the cache.
    let second = ResolveInfo::new(1, schema.clone(), field).attach_extensions(&extensions);
    optimize_one(queryset(&schema, "Apartment"), &second, PkValue::Int(1), &mut executor, None).unwrap();
    assert_eq!(executor.calls, 1);
}
