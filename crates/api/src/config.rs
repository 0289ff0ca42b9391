//! Application configuration loaded from environment variables.

use std::str::FromStr;

use inventory::InventoryConfig;
use inventory::validation::ACTOR_MAX_CHARS;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; unset runs in memory
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `SEED_CATALOG` — insert the default catalog on start (default: `true`)
/// - `SYSTEM_ACTOR` — actor recorded when a request names none (default: `"System"`)
/// - `MAX_BATCH_SIZE` — cap on products per create request (default: unlimited)
/// - `MAX_STOCK` — cap on a product's stock after a restock (default: unlimited)
/// - `ID_ALLOCATION_ATTEMPTS` — batch retries on id collision (default: `3`)
///
/// The three limits must be positive; zero or negative values are ignored
/// with a warning.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub seed_catalog: bool,
    pub system_actor: String,
    pub max_batch_size: Option<usize>,
    pub max_stock: Option<i32>,
    pub id_allocation_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            seed_catalog: lookup("SEED_CATALOG")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.seed_catalog),
            system_actor: lookup("SYSTEM_ACTOR")
                .filter(|actor| !actor.trim().is_empty())
                .filter(|actor| {
                    let fits = actor.chars().count() <= ACTOR_MAX_CHARS;
                    if !fits {
                        tracing::warn!(max = ACTOR_MAX_CHARS, "ignoring overlong SYSTEM_ACTOR");
                    }
                    fits
                })
                .unwrap_or(defaults.system_actor),
            max_batch_size: positive("MAX_BATCH_SIZE", parse_var(&lookup, "MAX_BATCH_SIZE")),
            max_stock: positive("MAX_STOCK", parse_var(&lookup, "MAX_STOCK")),
            id_allocation_attempts: positive(
                "ID_ALLOCATION_ATTEMPTS",
                parse_var(&lookup, "ID_ALLOCATION_ATTEMPTS"),
            )
            .unwrap_or(defaults.id_allocation_attempts),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Limits handed to the inventory service.
    pub fn inventory(&self) -> InventoryConfig {
        let mut config =
            InventoryConfig::default().with_id_allocation_attempts(self.id_allocation_attempts);
        if let Some(max) = self.max_batch_size {
            config = config.with_max_batch_size(max);
        }
        if let Some(max) = self.max_stock {
            config = config.with_max_stock(max);
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            database_max_connections: 5,
            seed_catalog: true,
            system_actor: common::Actor::SYSTEM.to_string(),
            max_batch_size: None,
            max_stock: None,
            id_allocation_attempts: 3,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Drops zero and negative limits.
fn positive<T>(key: &str, value: Option<T>) -> Option<T>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    match value {
        Some(v) if v <= T::default() => {
            tracing::warn!(key, value = %v, "ignoring non-positive limit");
            None
        }
        other => other,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert!(config.seed_catalog);
        assert_eq!(config.system_actor, "System");
        assert_eq!(config.id_allocation_attempts, 3);
    }

    #[test]
    fn test_empty_environment_matches_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert!(config.max_batch_size.is_none());
        assert!(config.max_stock.is_none());
    }

    #[test]
    fn test_values_are_read() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("SEED_CATALOG", "false"),
            ("SYSTEM_ACTOR", "batch-job"),
            ("MAX_BATCH_SIZE", "50"),
            ("MAX_STOCK", "10000"),
            ("ID_ALLOCATION_ATTEMPTS", "5"),
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/catalog")
        );
        assert_eq!(config.database_max_connections, 12);
        assert!(!config.seed_catalog);
        assert_eq!(config.system_actor, "batch-job");
        assert_eq!(config.max_batch_size, Some(50));
        assert_eq!(config.max_stock, Some(10_000));
        assert_eq!(config.id_allocation_attempts, 5);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "eighty"),
            ("SEED_CATALOG", "maybe"),
            ("SYSTEM_ACTOR", "  "),
            ("DATABASE_URL", ""),
            ("MAX_STOCK", "lots"),
        ]);
        assert_eq!(config.port, 3000);
        assert!(config.seed_catalog);
        assert_eq!(config.system_actor, "System");
        assert!(config.database_url.is_none());
        assert!(config.max_stock.is_none());
    }

    #[test]
    fn test_inventory_limits() {
        let config = from_pairs(&[("MAX_BATCH_SIZE", "2"), ("MAX_STOCK", "99")]);
        let limits = config.inventory();
        assert_eq!(limits.max_batch_size, Some(2));
        assert_eq!(limits.max_stock, Some(99));
        assert_eq!(limits.stock_ceiling(), 99);
        assert_eq!(limits.id_allocation_attempts, 3);
    }

    #[test]
    fn test_non_positive_limits_are_ignored() {
        let config = from_pairs(&[
            ("MAX_BATCH_SIZE", "0"),
            ("MAX_STOCK", "-5"),
            ("ID_ALLOCATION_ATTEMPTS", "0"),
        ]);
        assert!(config.max_batch_size.is_none());
        assert!(config.max_stock.is_none());
        assert_eq!(config.id_allocation_attempts, 3);

        let config = from_pairs(&[("MAX_STOCK", "0")]);
        assert!(config.max_stock.is_none());
        assert_eq!(config.inventory().stock_ceiling(), i32::MAX);
    }

    #[test]
    fn test_overlong_system_actor_falls_back() {
        let overlong = "a".repeat(ACTOR_MAX_CHARS + 1);
        let config = from_pairs(&[("SYSTEM_ACTOR", overlong.as_str())]);
        assert_eq!(config.system_actor, "System");

        let longest = "a".repeat(ACTOR_MAX_CHARS);
        let config = from_pairs(&[("SYSTEM_ACTOR", longest.as_str())]);
        assert_eq!(config.system_actor, longest);
    }
}
