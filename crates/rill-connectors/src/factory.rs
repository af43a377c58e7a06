//! Plugin-unit naming convention.
//!
//! Every connector implementation is addressable by a deterministic unit
//! name derived from its `type` property and role:
//!
//! ```text
//! kafka  + source           -> kafkasource
//! mysql  + sink             -> mysqlsink
//! mysql  + side(cache=full) -> mysqlallside
//! redis  + side(cache=lru)  -> redislruside
//! ```
//!
//! The names are pure locators: resolution happens against the static
//! registry, and the unit name appears in errors so a missing plugin can be
//! identified without inspecting registry internals.

use crate::table::{CacheMode, TableRole};

/// Unit name for a source connector.
#[must_use]
pub fn source_unit(connector_type: &str) -> String {
    format!("{}source", connector_type.to_lowercase())
}

/// Unit name for a sink connector.
#[must_use]
pub fn sink_unit(connector_type: &str) -> String {
    format!("{}sink", connector_type.to_lowercase())
}

/// Unit name for a side connector; the cache strategy is part of the name.
#[must_use]
pub fn side_unit(connector_type: &str, cache_mode: CacheMode) -> String {
    format!(
        "{}{}",
        connector_type.to_lowercase(),
        cache_mode.unit_suffix()
    )
}

/// Unit name for any role. Side units require a cache strategy; sources and
/// sinks ignore it.
#[must_use]
pub fn plugin_unit(role: TableRole, connector_type: &str, cache_mode: CacheMode) -> String {
    match role {
        TableRole::Source => source_unit(connector_type),
        TableRole::Sink => sink_unit(connector_type),
        TableRole::Side => side_unit(connector_type, cache_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_names() {
        assert_eq!(source_unit("kafka"), "kafkasource");
        assert_eq!(sink_unit("mysql"), "mysqlsink");
        assert_eq!(side_unit("mysql", CacheMode::Full), "mysqlallside");
        assert_eq!(side_unit("redis", CacheMode::LruAsync), "redislruside");
    }

    #[test]
    fn test_unit_names_fold_case() {
        assert_eq!(source_unit("Kafka"), "kafkasource");
        assert_eq!(side_unit("MySQL", CacheMode::Full), "mysqlallside");
    }

    #[test]
    fn test_plugin_unit_dispatch() {
        assert_eq!(
            plugin_unit(TableRole::Source, "kafka", CacheMode::Full),
            "kafkasource"
        );
        assert_eq!(
            plugin_unit(TableRole::Side, "mysql", CacheMode::LruAsync),
            "mysqllruside"
        );
    }
}
