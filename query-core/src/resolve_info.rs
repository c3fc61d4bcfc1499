use crate::{
    DeclarationRegistry, FieldSelection, Fragments, OperationCache, OperationId, OptimizerSettings, QueryCacheStore,
    SchemaExtensions,
};
use query_structure::SchemaRef;
use std::sync::Arc;

/// Everything the resolver layer hands the planner about the current
/// field: the operation identity, the selection under the field, the
/// fragment table, the static declarations and the per-operation cache.
#[derive(Debug, Clone)]
pub struct ResolveInfo {
    pub operation_id: OperationId,
    pub schema: SchemaRef,
    pub field: FieldSelection,
    pub fragments: Fragments,
    pub declarations: Arc<DeclarationRegistry>,
    pub settings: Arc<OptimizerSettings>,
    pub cache: Arc<OperationCache>,
}

impl ResolveInfo {
    pub fn new(operation_id: OperationId, schema: SchemaRef, field: FieldSelection) -> Self {
        Self {
            operation_id,
            schema,
            field,
            fragments: Fragments::default(),
            declarations: Arc::new(DeclarationRegistry::default()),
            settings: Arc::new(OptimizerSettings::default()),
            cache: Arc::new(OperationCache::default()),
        }
    }

    pub fn fragments(mut self, fragments: Fragments) -> Self {
        self.fragments = fragments;
        self
    }

    pub fn declarations(mut self, declarations: Arc<DeclarationRegistry>) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn settings(mut self, settings: Arc<OptimizerSettings>) -> Self {
        self.settings = settings;
        self
    }

    /// Shares the identity cache so all resolvers of one operation see the
    /// same entries.
    pub fn attach_cache_store(mut self, store: &QueryCacheStore) -> Self {
        self.cache = store.operation_cache(self.operation_id);
        self
    }

    /// Binds this operation's cache from the schema's extension map, under
    /// the cache key configured in the settings.
    pub fn attach_extensions(self, extensions: &SchemaExtensions) -> Self {
        let store = extensions.cache_store(&self.settings.query_cache_key);
        self.attach_cache_store(&store)
    }
}
