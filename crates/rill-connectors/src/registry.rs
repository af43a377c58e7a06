//! Connector registry with factory pattern.
//!
//! The [`ConnectorRegistry`] maps connector type names to factory
//! functions, one catalog per table role. Registries are owned by the
//! compilation session that created them; there is no process-global
//! catalog, so two sessions with different registrations never observe
//! each other.
//!
//! Resolution is lazy and at-most-once per key: the first `resolve_*` call
//! for a key runs its factory and caches the instance, every later call
//! returns the cached `Arc`. Side-table keys fold the cache strategy into
//! the key, so `mysql` with full-cache and `mysql` with LRU resolve to
//! distinct instances.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::connector::{SideConnector, TableParser};
use crate::error::ConnectorError;
use crate::factory::{side_unit, sink_unit, source_unit};
use crate::table::{CacheMode, TableRole};

/// Factory function type for source table parsers.
pub type SourceFactory = Arc<dyn Fn() -> Arc<dyn TableParser> + Send + Sync>;

/// Factory function type for sink table parsers.
pub type SinkFactory = Arc<dyn Fn() -> Arc<dyn TableParser> + Send + Sync>;

/// Factory function type for side connectors.
pub type SideFactory = Arc<dyn Fn() -> Arc<dyn SideConnector> + Send + Sync>;

struct RoleCatalog<F, I: ?Sized> {
    factories: RwLock<HashMap<String, F>>,
    instances: RwLock<HashMap<String, Arc<I>>>,
}

impl<F, I: ?Sized> RoleCatalog<F, I> {
    fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }
}

impl<I: ?Sized> RoleCatalog<Arc<dyn Fn() -> Arc<I> + Send + Sync>, I> {
    fn register(&self, key: String, factory: Arc<dyn Fn() -> Arc<I> + Send + Sync>) {
        self.factories.write().insert(key, factory);
    }

    /// Double-checked: the fast path is a read lock on the instance map;
    /// the write lock re-checks so concurrent resolvers run the factory
    /// only once.
    fn resolve(&self, key: &str) -> Option<Arc<I>> {
        if let Some(instance) = self.instances.read().get(key) {
            return Some(Arc::clone(instance));
        }
        let mut instances = self.instances.write();
        if let Some(instance) = instances.get(key) {
            return Some(Arc::clone(instance));
        }
        let factory = Arc::clone(self.factories.read().get(key)?);
        let instance = factory();
        instances.insert(key.to_string(), Arc::clone(&instance));
        Some(instance)
    }

    fn keys(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }
}

/// Registry of available connector implementations, one catalog per role.
pub struct ConnectorRegistry {
    sources: RoleCatalog<SourceFactory, dyn TableParser>,
    sinks: RoleCatalog<SinkFactory, dyn TableParser>,
    sides: RoleCatalog<SideFactory, dyn SideConnector>,
}

impl ConnectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: RoleCatalog::new(),
            sinks: RoleCatalog::new(),
            sides: RoleCatalog::new(),
        }
    }

    /// Registers a source connector factory under a type name.
    pub fn register_source(&self, connector_type: impl Into<String>, factory: SourceFactory) {
        self.sources
            .register(connector_type.into().to_lowercase(), factory);
    }

    /// Registers a sink connector factory under a type name.
    pub fn register_sink(&self, connector_type: impl Into<String>, factory: SinkFactory) {
        self.sinks
            .register(connector_type.into().to_lowercase(), factory);
    }

    /// Registers a side connector factory under a type name and cache
    /// strategy.
    pub fn register_side(
        &self,
        connector_type: impl Into<String>,
        cache_mode: CacheMode,
        factory: SideFactory,
    ) {
        self.sides
            .register(side_unit(&connector_type.into(), cache_mode), factory);
    }

    /// Resolves the source parser for a connector type.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnsupportedType`] if no factory is
    /// registered for the type.
    pub fn resolve_source(&self, connector_type: &str) -> Result<Arc<dyn TableParser>, ConnectorError> {
        let key = connector_type.to_lowercase();
        self.sources.resolve(&key).ok_or_else(|| {
            ConnectorError::UnsupportedType {
                role: TableRole::Source,
                connector_type: connector_type.to_string(),
                plugin_unit: source_unit(connector_type),
            }
        })
    }

    /// Resolves the sink parser for a connector type.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnsupportedType`] if no factory is
    /// registered for the type.
    pub fn resolve_sink(&self, connector_type: &str) -> Result<Arc<dyn TableParser>, ConnectorError> {
        let key = connector_type.to_lowercase();
        self.sinks.resolve(&key).ok_or_else(|| {
            ConnectorError::UnsupportedType {
                role: TableRole::Sink,
                connector_type: connector_type.to_string(),
                plugin_unit: sink_unit(connector_type),
            }
        })
    }

    /// Resolves the side connector for a connector type and cache strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnsupportedType`] if no factory is
    /// registered for the type/strategy pair.
    pub fn resolve_side(
        &self,
        connector_type: &str,
        cache_mode: CacheMode,
    ) -> Result<Arc<dyn SideConnector>, ConnectorError> {
        let key = side_unit(connector_type, cache_mode);
        let resolved = self.sides.resolve(&key);
        if resolved.is_some() {
            debug!(unit = %key, "resolved side connector");
        }
        resolved.ok_or_else(|| ConnectorError::UnsupportedType {
            role: TableRole::Side,
            connector_type: connector_type.to_string(),
            plugin_unit: key,
        })
    }

    /// Lists registered source connector type names.
    #[must_use]
    pub fn list_sources(&self) -> Vec<String> {
        self.sources.keys()
    }

    /// Lists registered sink connector type names.
    #[must_use]
    pub fn list_sinks(&self) -> Vec<String> {
        self.sinks.keys()
    }

    /// Lists registered side connector unit names.
    #[must_use]
    pub fn list_sides(&self) -> Vec<String> {
        self.sides.keys()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("sources", &self.list_sources())
            .field("sinks", &self.list_sinks())
            .field("sides", &self.list_sides())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingSideConnector, CountingTableParser};

    #[test]
    fn test_register_and_resolve_source() {
        let registry = ConnectorRegistry::new();
        let (factory, _count) = CountingTableParser::factory("kafka", TableRole::Source);
        registry.register_source("kafka", factory);

        assert!(registry.resolve_source("kafka").is_ok());
        assert!(registry.resolve_source("KAFKA").is_ok());
    }

    #[test]
    fn test_resolve_unknown_type_names_unit() {
        let registry = ConnectorRegistry::new();
        let err = registry.resolve_source("kudu").unwrap_err();
        match err {
            ConnectorError::UnsupportedType {
                role,
                connector_type,
                plugin_unit,
            } => {
                assert_eq!(role, TableRole::Source);
                assert_eq!(connector_type, "kudu");
                assert_eq!(plugin_unit, "kudusource");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolution_is_at_most_once_per_key() {
        let registry = ConnectorRegistry::new();
        let (factory, count) = CountingTableParser::factory("kafka", TableRole::Source);
        registry.register_source("kafka", factory);

        let first = registry.resolve_source("kafka").unwrap();
        let second = registry.resolve_source("kafka").unwrap();
        let third = registry.resolve_source("Kafka").unwrap();

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn test_roles_resolve_independently() {
        let registry = ConnectorRegistry::new();
        let (source_factory, source_count) =
            CountingTableParser::factory("mysql", TableRole::Source);
        let (sink_factory, sink_count) = CountingTableParser::factory("mysql", TableRole::Sink);
        registry.register_source("mysql", source_factory);
        registry.register_sink("mysql", sink_factory);

        registry.resolve_source("mysql").unwrap();
        registry.resolve_source("mysql").unwrap();
        registry.resolve_sink("mysql").unwrap();

        assert_eq!(source_count.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(sink_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_side_key_folds_cache_mode() {
        let registry = ConnectorRegistry::new();
        let (full_factory, full_count) = CountingSideConnector::factory("mysql");
        let (lru_factory, lru_count) = CountingSideConnector::factory("mysql");
        registry.register_side("mysql", CacheMode::Full, full_factory);
        registry.register_side("mysql", CacheMode::LruAsync, lru_factory);

        registry.resolve_side("mysql", CacheMode::Full).unwrap();
        registry.resolve_side("mysql", CacheMode::Full).unwrap();
        registry.resolve_side("mysql", CacheMode::LruAsync).unwrap();

        assert_eq!(full_count.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(lru_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_side_missing_strategy_is_an_error() {
        let registry = ConnectorRegistry::new();
        let (factory, _count) = CountingSideConnector::factory("mysql");
        registry.register_side("mysql", CacheMode::Full, factory);

        let err = registry.resolve_side("mysql", CacheMode::LruAsync).unwrap_err();
        assert!(err.to_string().contains("mysqllruside"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = ConnectorRegistry::new();
        let b = ConnectorRegistry::new();
        let (factory, _count) = CountingTableParser::factory("kafka", TableRole::Source);
        a.register_source("kafka", factory);

        assert!(a.resolve_source("kafka").is_ok());
        assert!(b.resolve_source("kafka").is_err());
    }
}
