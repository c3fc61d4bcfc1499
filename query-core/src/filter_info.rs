use crate::{ArgumentValue, CoreError, CoreResult, FieldSelection, ResolveInfo, Selection};
use query_structure::{EntityRef, Field};

/// The filtering-relevant shape of one selected field: its arguments, its
/// connection metadata and the filterable descendants below it.
///
/// Filtersets run outside the planner; this tree tells them which nested
/// fields carry arguments at all so argument-free subtrees are never
/// visited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterInfo {
    pub name: String,
    pub arguments: Vec<(String, ArgumentValue)>,
    pub is_connection: bool,
    /// A relay `node(id:)` lookup; its argument is an identity, not a
    /// filter.
    pub is_node: bool,
    pub filterset: Option<String>,
    pub max_limit: Option<u64>,
    pub children: Vec<FilterInfo>,
}

impl FilterInfo {
    pub fn find_child(&self, name: &str) -> Option<&FilterInfo> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Whether keeping this node is justified: it carries arguments, marks
    /// a connection or node boundary, or shelters a descendant that does.
    fn is_relevant(&self) -> bool {
        !self.arguments.is_empty() || self.is_connection || self.is_node || !self.children.is_empty()
    }
}

/// Extracts the filter tree of the resolved field. Returns `None` when
/// nothing under the field carries arguments worth dispatching on.
pub fn get_filter_info(info: &ResolveInfo, entity: &EntityRef) -> CoreResult<Option<FilterInfo>> {
    let root = build_node(info, &info.field, entity, "Query")?;
    Ok(Some(root).filter(FilterInfo::is_relevant))
}

fn build_node(
    info: &ResolveInfo,
    field: &FieldSelection,
    entity: &EntityRef,
    parent_entity_name: &str,
) -> CoreResult<FilterInfo> {
    let declaration = info.declarations.connection(parent_entity_name, &field.name);
    let is_connection = declaration.is_some() || field.find_nested("edges").is_some();
    let is_node = field.name == "node" && field.lookup_argument("id").is_some();

    let mut node = FilterInfo {
        name: field.response_name().to_owned(),
        arguments: field.arguments.clone(),
        is_connection,
        is_node,
        filterset: declaration.and_then(|declaration| declaration.filterset.clone()),
        max_limit: declaration.and_then(|declaration| declaration.max_limit),
        children: Vec::new(),
    };

    collect_children(info, &field.nested, entity, &mut node)?;
    Ok(node)
}

fn collect_children(
    info: &ResolveInfo,
    selections: &[Selection],
    entity: &EntityRef,
    parent: &mut FilterInfo,
) -> CoreResult<()> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                // The connection wrapper is transparent: filters under
                // `edges.node` belong to the connection itself.
                if field.name == "edges" || (field.name == "node" && field.lookup_argument("id").is_none()) {
                    collect_children(info, &field.nested, entity, parent)?;
                    continue;
                }

                let Some(Field::Relation(relation)) = entity.find_field(&field.name) else {
                    // Scalars and computed fields carry no nested filters.
                    continue;
                };

                let Some(related) = info.schema.related_entity(relation) else {
                    continue;
                };

                let child = build_node(info, field, &related, &entity.name)?;
                if child.is_relevant() {
                    parent.children.push(child);
                }
            }
            Selection::FragmentSpread { name } => {
                let fragment = info
                    .fragments
                    .get(name)
                    .ok_or_else(|| CoreError::internal(format!("unresolved fragment `{name}`")))?;

                if condition_matches(fragment.type_condition.as_deref(), entity) {
                    collect_children(info, &fragment.selections, entity, parent)?;
                }
            }
            Selection::InlineFragment {
                type_condition,
                selections,
            } => {
                if condition_matches(type_condition.as_deref(), entity) {
                    collect_children(info, selections, entity, parent)?;
                }
            }
        }
    }

    Ok(())
}

fn condition_matches(condition: Option<&str>, entity: &EntityRef) -> bool {
    condition.map_or(true, |condition| condition == entity.name)
}
