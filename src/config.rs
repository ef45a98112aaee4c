//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (bearer tokens) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Every business threshold has a
//! default so a minimal file only needs to list realms.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub scan: ScanConfig,
    pub cache: CacheConfig,
    pub realms: RealmsConfig,
    pub strategy: StrategyConfig,
    pub collections: CollectionsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// API region: "us", "eu", "kr", "tw".
    pub region: String,
    pub locale: String,
    pub request_timeout_secs: u64,
    /// Env var holding the app-level bearer token (required).
    pub token_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            region: "us".to_string(),
            locale: "en_US".to_string(),
            request_timeout_secs: 60,
            token_env: "BLIZZARD_ACCESS_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Realm names to scan; `Commodities` selects the commodity market.
    pub realms: Vec<String>,
    /// Seconds between passes. Zero scans once and exits.
    pub interval_secs: u64,
    /// Wall-clock budget for one realm's resolve→fetch→evaluate.
    pub task_deadline_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            realms: vec!["Commodities".to_string()],
            interval_secs: 0,
            task_deadline_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub path: String,
    /// Maximum age of a cached item record before it is refetched.
    pub max_age_hours: i64,
    /// Bypass cache reads for this run (writes still land).
    pub read_through: bool,
    /// Extra item ids known to be unresolvable.
    pub deny_list: Vec<i64>,
    /// Stale entries to refresh before the first pass. 0 disables.
    pub refresh_on_start: usize,
    /// Print every cached record before the first pass.
    pub list_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "item_cache.json".to_string(),
            max_age_hours: 24 * 7,
            read_through: false,
            deny_list: Vec::new(),
            refresh_on_start: 0,
            list_on_start: false,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours)
    }

    /// Max age for resolution; a non-positive setting accepts any age.
    pub fn effective_max_age(&self) -> Option<chrono::Duration> {
        (self.max_age_hours > 0).then(|| self.max_age())
    }

    /// `(max_age, limit)` for the startup refresh, if one should run.
    ///
    /// Nothing is ever stale when any age is accepted, so no refresh runs.
    pub fn startup_refresh(&self) -> Option<(chrono::Duration, usize)> {
        if self.refresh_on_start == 0 {
            return None;
        }
        self.effective_max_age().map(|age| (age, self.refresh_on_start))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RealmsConfig {
    /// Known realm name → connected-realm id. Checked before searching.
    pub known: HashMap<String, i64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrategyConfig {
    /// Item id (as a string key) → maximum unit price in copper.
    pub watch_list: HashMap<String, i64>,
    /// Minimum aggregate arbitrage profit in copper.
    pub min_arbitrage_profit: i64,
    pub pets: PetRuleConfig,
    pub toys: ToyRuleConfig,
    pub transmog: TransmogRuleConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            watch_list: HashMap::new(),
            min_arbitrage_profit: 500,
            pets: PetRuleConfig::default(),
            toys: ToyRuleConfig::default(),
            transmog: TransmogRuleConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Watch-list with parsed integer keys. Non-numeric keys are rejected.
    pub fn watch_list_ids(&self) -> Result<HashMap<i64, i64>> {
        self.watch_list
            .iter()
            .map(|(k, v)| {
                let id = k
                    .parse::<i64>()
                    .with_context(|| format!("Watch-list key is not an item id: {k}"))?;
                Ok((id, *v))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PetRuleConfig {
    pub enabled: bool,
    /// Ceiling for species not yet owned.
    pub max_price: i64,
    /// Ceiling for species already owned.
    pub bargain_price: i64,
    pub min_quality: i64,
    pub min_level: i64,
}

impl Default for PetRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_price: 1_000_000,
            bargain_price: 50_000,
            min_quality: 3,
            min_level: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToyRuleConfig {
    pub enabled: bool,
    pub max_price: i64,
}

impl Default for ToyRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_price: 1_000_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransmogRuleConfig {
    pub enabled: bool,
    pub max_price: i64,
    pub min_item_level: i64,
}

impl Default for TransmogRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_price: 200_000,
            min_item_level: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectionsConfig {
    /// JSON snapshot of owned pets / needed toys and appearances.
    pub path: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            path: "collections.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.strategy.watch_list_ids()?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert_eq!(cfg.api.region, "us");
        assert_eq!(cfg.scan.realms, vec!["Commodities".to_string()]);
        assert_eq!(cfg.scan.task_deadline_secs, 120);
        assert_eq!(cfg.cache.max_age(), chrono::Duration::hours(168));
        assert_eq!(cfg.strategy.min_arbitrage_profit, 500);
        assert!(!cfg.cache.read_through);
        assert_eq!(cfg.cache.refresh_on_start, 0);
        assert!(!cfg.cache.list_on_start);
    }

    #[test]
    fn test_startup_refresh_needs_limit_and_max_age() {
        let cfg = AppConfig::parse("[cache]\nrefresh_on_start = 25\nmax_age_hours = 2\n").unwrap();
        assert_eq!(cfg.cache.startup_refresh(), Some((chrono::Duration::hours(2), 25)));

        let any_age = AppConfig::parse("[cache]\nrefresh_on_start = 25\nmax_age_hours = 0\n").unwrap();
        assert_eq!(any_age.cache.startup_refresh(), None);

        assert_eq!(AppConfig::default().cache.startup_refresh(), None);
    }

    #[test]
    fn test_cache_maintenance_flags() {
        let cfg = AppConfig::parse("[cache]
refresh_on_start = 25
list_on_start = true
").unwrap();
        assert_eq!(cfg.cache.refresh_on_start, 25);
        assert!(cfg.cache.list_on_start);
    }

    #[test]
    fn test_zero_max_age_accepts_any_age() {
        let cfg = AppConfig::parse("[cache]\nmax_age_hours = 0\n").unwrap();
        assert!(cfg.cache.effective_max_age().is_none());
        assert_eq!(
            AppConfig::default().cache.effective_max_age(),
            Some(chrono::Duration::hours(168))
        );
    }

    #[test]
    fn test_parse_full_config() {
        let cfg = AppConfig::parse(
            r#"
            [scan]
            realms = ["Sisters of Elune", "Commodities"]
            interval_secs = 60

            [realms.known]
            "Sisters of Elune" = 3678

            [strategy]
            min_arbitrage_profit = 1000

            [strategy.watch_list]
            "34722" = 40000
            "10938" = 800

            [strategy.pets]
            max_price = 250000
            "#,
        )
        .unwrap();

        assert_eq!(cfg.scan.realms.len(), 2);
        assert_eq!(cfg.scan.interval_secs, 60);
        assert_eq!(cfg.realms.known.get("Sisters of Elune"), Some(&3678));
        assert_eq!(cfg.strategy.min_arbitrage_profit, 1000);
        let watch = cfg.strategy.watch_list_ids().unwrap();
        assert_eq!(watch.get(&34722), Some(&40000));
        assert_eq!(cfg.strategy.pets.max_price, 250_000);
        // Unlisted fields keep their defaults.
        assert_eq!(cfg.strategy.pets.min_quality, 3);
    }

    #[test]
    fn test_non_numeric_watch_list_key_rejected() {
        let result = AppConfig::parse(
            r#"
            [strategy.watch_list]
            "linen" = 100
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(AppConfig::load("/tmp/auctionhawk_no_such_config.toml").is_err());
    }
}
