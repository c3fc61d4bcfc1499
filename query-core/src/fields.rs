use indexmap::IndexMap;
use sql_ast::ast::Expression;
use std::collections::HashMap;

/// A declaration registered by the schema layer for a field the entity
/// itself does not explain: computed resolvers, renamed relations,
/// annotated columns and connection wrappers.
#[derive(Debug, Clone)]
pub enum FieldDeclaration {
    /// The client-facing field maps to a differently named relation
    /// (`to_attr` style rename).
    RelationAlias { field_name: String },
    /// A synthetic column computed by the database.
    Annotated { expression: Expression },
    /// A resolver that needs specific columns, relations or annotations
    /// fetched before it runs.
    Resolver(ResolverHints),
    /// A paginated connection wrapper over a multi-valued result.
    Connection(ConnectionDeclaration),
}

/// The data requirements a resolver declares up front.
#[derive(Debug, Clone, Default)]
pub struct ResolverHints {
    pub columns: Vec<String>,
    pub relations: Vec<String>,
    pub annotations: IndexMap<String, Expression>,
}

impl ResolverHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scalar columns this resolver reads. Dot paths reach joined columns.
    pub fn required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Relations this resolver touches.
    pub fn required_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Synthetic columns this resolver reads.
    pub fn required_annotation(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.annotations.insert(name.into(), expression);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionDeclaration {
    /// Name of the filterset handling this connection's arguments.
    pub filterset: Option<String>,
    /// Per-field page size ceiling overriding the global default.
    pub max_limit: Option<u64>,
}

/// The static declarations table, registered once by the schema layer.
#[derive(Debug, Clone, Default)]
pub struct DeclarationRegistry {
    entries: HashMap<String, IndexMap<String, FieldDeclaration>>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        declaration: FieldDeclaration,
    ) {
        self.entries
            .entry(entity.into())
            .or_default()
            .insert(field.into(), declaration);
    }

    pub fn get(&self, entity: &str, field: &str) -> Option<&FieldDeclaration> {
        self.entries.get(entity)?.get(field)
    }

    pub fn connection(&self, entity: &str, field: &str) -> Option<&ConnectionDeclaration> {
        match self.get(entity, field)? {
            FieldDeclaration::Connection(declaration) => Some(declaration),
            _ => None,
        }
    }
}
