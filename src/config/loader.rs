//! Load [`BootstrapConfig`] from environment variables.

use crate::config::types::BootstrapConfig;
use crate::error::ConfigError;
use crate::schema::ddl::check_identifier;
use std::collections::BTreeSet;
use std::str::FromStr;

impl BootstrapConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to honor `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = BootstrapConfig::default();

        if let Some(v) = get("DATABASE_URL") {
            config.database_url = v;
        }
        if let Some(v) = get("DB_SCHEMA") {
            check_identifier(&v)?;
            config.db_schema = v;
        }
        if let Some(v) = get("DB_MAX_CONNECTIONS") {
            config.max_connections = parse("DB_MAX_CONNECTIONS", &v)?;
            if config.max_connections == 0 {
                return Err(invalid("DB_MAX_CONNECTIONS", &v, "must be at least 1"));
            }
        }
        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = get("API_PREFIX") {
            if !v.starts_with('/') {
                return Err(invalid("API_PREFIX", &v, "must start with '/'"));
            }
            config.api_prefix = v;
        }
        if let Some(v) = get("SCHEMA_STOP_ON_ERROR") {
            config.stop_on_error = parse_bool("SCHEMA_STOP_ON_ERROR", &v)?;
        }
        if let Some(v) = get("SCHEMA_LEVELS") {
            config.level_filter = Some(parse_levels(&v)?);
        }
        if let Some(v) = get("SCHEMA_PARALLELISM") {
            config.schema_parallelism = parse("SCHEMA_PARALLELISM", &v)?;
            if config.schema_parallelism == 0 {
                return Err(invalid("SCHEMA_PARALLELISM", &v, "must be at least 1"));
            }
        }
        if let Some(v) = get("SCHEMA_BACKGROUND") {
            config.schema_in_background = parse_bool("SCHEMA_BACKGROUND", &v)?;
        }
        if let Some(v) = get("REQUEST_BODY_LIMIT") {
            config.request_body_limit = parse("REQUEST_BODY_LIMIT", &v)?;
        }
        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(key, value, e.to_string()))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

/// Comma-separated level ranks, e.g. `1,2,4`.
fn parse_levels(value: &str) -> Result<BTreeSet<u32>, ConfigError> {
    let ranks = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse::<u32>("SCHEMA_LEVELS", s))
        .collect::<Result<BTreeSet<u32>, _>>()?;
    if ranks.is_empty() {
        return Err(invalid("SCHEMA_LEVELS", value, "no level ranks given"));
    }
    Ok(ranks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ExecutionMode;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<BootstrapConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BootstrapConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, BootstrapConfig::default());
        assert_eq!(config.api_prefix, "/api/v1");
        assert!(!config.stop_on_error);
        assert!(config.level_filter.is_none());
        assert_eq!(config.run_options().execution, ExecutionMode::Sequential);
    }

    #[test]
    fn reads_schema_policy() {
        let config = load(&[
            ("SCHEMA_STOP_ON_ERROR", "true"),
            ("SCHEMA_LEVELS", "1, 3"),
            ("SCHEMA_PARALLELISM", "4"),
            ("API_PREFIX", "/api/v2"),
            ("DB_SCHEMA", "estate"),
        ])
        .unwrap();
        let options = config.run_options();
        assert!(options.stop_on_error);
        assert_eq!(
            options.level_filter,
            Some([1, 3].into_iter().collect::<BTreeSet<u32>>())
        );
        assert_eq!(options.execution, ExecutionMode::Parallel { max_concurrency: 4 });
        assert_eq!(config.api_prefix, "/api/v2");
        assert_eq!(config.db_schema, "estate");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = load(&[("SCHEMA_LEVELS", "  "), ("BIND_ADDR", "")]).unwrap();
        assert!(config.level_filter.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("SCHEMA_STOP_ON_ERROR", "maybe")]),
            Err(ConfigError::InvalidValue { key: "SCHEMA_STOP_ON_ERROR", .. })
        ));
        assert!(load(&[("SCHEMA_LEVELS", "1,two")]).is_err());
        assert!(load(&[("SCHEMA_LEVELS", ",")]).is_err());
        assert!(load(&[("SCHEMA_PARALLELISM", "0")]).is_err());
        assert!(load(&[("API_PREFIX", "api")]).is_err());
        assert!(matches!(
            load(&[("DB_SCHEMA", "estate-prod")]),
            Err(ConfigError::InvalidIdentifier(_))
        ));
    }
}
