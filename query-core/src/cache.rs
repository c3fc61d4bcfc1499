use indexmap::IndexSet;
use query_structure::{PkValue, Record};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

pub type OperationId = u64;

type FingerprintMap = HashMap<String, HashMap<PkValue, Arc<Record>>>;

/// The per-request identity cache: table name → plan fingerprint →
/// primary key → materialized record.
///
/// The cache is request-scoped; the mutex only guards interior mutability,
/// there is no cross-request sharing to contend on.
#[derive(Debug, Default)]
pub struct OperationCache {
    tables: Mutex<HashMap<String, FingerprintMap>>,
    /// Junction-table aliases used by batched many-to-many relations in
    /// this request; the driver reuses them for secondary filters.
    junction_aliases: Mutex<IndexSet<String>>,
}

impl OperationCache {
    /// Records that a plan with this fingerprint is about to execute, so a
    /// later `store` populates a bucket the readers already know about.
    pub fn note_plan(&self, table: &str, fingerprint: &str) {
        let mut tables = self.tables.lock().expect("poisoned operation cache");
        tables
            .entry(table.to_owned())
            .or_default()
            .entry(fingerprint.to_owned())
            .or_default();
    }

    pub fn store(&self, table: &str, fingerprint: &str, pk: PkValue, record: Arc<Record>) {
        let mut tables = self.tables.lock().expect("poisoned operation cache");
        tables
            .entry(table.to_owned())
            .or_default()
            .entry(fingerprint.to_owned())
            .or_default()
            .insert(pk, record);
    }

    pub fn get(&self, table: &str, fingerprint: &str, pk: &PkValue) -> Option<Arc<Record>> {
        let tables = self.tables.lock().expect("poisoned operation cache");
        tables.get(table)?.get(fingerprint)?.get(pk).cloned()
    }

    pub fn record_junction_alias(&self, alias: impl Into<String>) {
        let mut aliases = self.junction_aliases.lock().expect("poisoned alias set");
        aliases.insert(alias.into());
    }

    pub fn junction_aliases(&self) -> IndexSet<String> {
        self.junction_aliases.lock().expect("poisoned alias set").clone()
    }
}

/// The schema-extension map holding one cache per in-flight operation.
///
/// Entries are weak: the strong handle lives on the request's
/// `ResolveInfo`, so a cache disappears as soon as its request completes.
/// Dead entries are swept opportunistically on access.
#[derive(Debug, Default)]
pub struct QueryCacheStore {
    operations: Mutex<HashMap<OperationId, Weak<OperationCache>>>,
}

impl QueryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for an operation, created on first use.
    pub fn operation_cache(&self, operation_id: OperationId) -> Arc<OperationCache> {
        let mut operations = self.operations.lock().expect("poisoned cache store");
        operations.retain(|_, weak| weak.strong_count() > 0);

        if let Some(cache) = operations.get(&operation_id).and_then(Weak::upgrade) {
            return cache;
        }

        let cache = Arc::new(OperationCache::default());
        operations.insert(operation_id, Arc::downgrade(&cache));
        cache
    }

    /// How many operations currently hold a live cache.
    pub fn live_operations(&self) -> usize {
        let mut operations = self.operations.lock().expect("poisoned cache store");
        operations.retain(|_, weak| weak.strong_count() > 0);
        operations.len()
    }
}

/// The host schema's extension slots. The cache store is registered under
/// a configurable name, so several planner instances with different
/// settings can coexist on one schema without sharing caches.
#[derive(Debug, Default)]
pub struct SchemaExtensions {
    slots: Mutex<HashMap<String, Arc<QueryCacheStore>>>,
}

impl SchemaExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache store registered under `key`, created on first access.
    pub fn cache_store(&self, key: &str) -> Arc<QueryCacheStore> {
        let mut slots = self.slots.lock().expect("poisoned extension map");
        slots.entry(key.to_owned()).or_default().clone()
    }
}
