//! Connector configuration types.
//!
//! [`ConnectorConfig`] is the property bag a table carries from its SQL
//! `WITH (...)` clause to its connector. Keys are folded to lower case on
//! insert so that `TYPE = 'kafka'` and `type = 'kafka'` configure the same
//! thing; values are stored verbatim.

use std::collections::HashMap;
use std::fmt;

use crate::error::ConnectorError;

/// Configuration for a connector instance.
#[derive(Debug, Clone, Default)]
pub struct ConnectorConfig {
    properties: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Creates an empty config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config from existing properties, lower-casing every key.
    #[must_use]
    pub fn from_properties(properties: HashMap<String, String>) -> Self {
        let mut config = Self::new();
        for (key, value) in properties {
            config.set(key, value);
        }
        config
    }

    /// Sets a property. The key is lower-cased.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into().to_lowercase(), value.into());
    }

    /// Gets a property. The lookup key is lower-cased.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Gets a required property, returning an error if missing.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if the key is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key)
            .ok_or_else(|| ConnectorError::MissingConfig(key.to_string()))
    }

    /// Gets a property parsed as the given type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` if the value cannot be
    /// parsed.
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConnectorError>
    where
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(v) => v.parse::<T>().map(Some).map_err(|e| {
                ConnectorError::ConfigurationError(format!("invalid value for '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Gets a required property parsed as the given type.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if the key is missing, or
    /// `ConnectorError::ConfigurationError` if parsing fails.
    pub fn require_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<T, ConnectorError>
    where
        T::Err: fmt::Display,
    {
        let value = self.require(key)?;
        value.parse::<T>().map_err(|e| {
            ConnectorError::ConfigurationError(format!("invalid value for '{key}': {e}"))
        })
    }

    /// Returns all properties.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut config = ConnectorConfig::new();
        config.set("TYPE", "kafka");
        config.set("Cache", "full");

        assert_eq!(config.get("type"), Some("kafka"));
        assert_eq!(config.get("TYPE"), Some("kafka"));
        assert_eq!(config.get("cAcHe"), Some("full"));
    }

    #[test]
    fn test_values_keep_their_case() {
        let mut config = ConnectorConfig::new();
        config.set("topic", "OrderEvents");
        assert_eq!(config.get("topic"), Some("OrderEvents"));
    }

    #[test]
    fn test_from_properties_folds_keys() {
        let mut props = HashMap::new();
        props.insert("Type".to_string(), "mysql".to_string());
        props.insert("URL".to_string(), "jdbc:mysql://db".to_string());

        let config = ConnectorConfig::from_properties(props);
        assert_eq!(config.get("type"), Some("mysql"));
        assert_eq!(config.get("url"), Some("jdbc:mysql://db"));
    }

    #[test]
    fn test_require() {
        let mut config = ConnectorConfig::new();
        config.set("type", "kafka");

        assert!(config.require("type").is_ok());
        let err = config.require("topic").unwrap_err();
        assert!(matches!(err, ConnectorError::MissingConfig(_)));
    }

    #[test]
    fn test_get_parsed() {
        let mut config = ConnectorConfig::new();
        config.set("parallelism", "4");
        config.set("bad", "not_a_number");

        let n: Option<usize> = config.get_parsed("parallelism").unwrap();
        assert_eq!(n, Some(4));
        let missing: Option<usize> = config.get_parsed("missing").unwrap();
        assert_eq!(missing, None);
        let bad: Result<Option<usize>, _> = config.get_parsed("bad");
        assert!(bad.is_err());
    }
}
