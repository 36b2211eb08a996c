use crate::domain::Decimal;
use crate::engine::GroupingConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub executions_path: PathBuf,
    pub simultaneity_window_ms: i64,
    pub expiration_proximity_days: i64,
    pub roll_window_ms: i64,
    pub assignment_price_threshold: Decimal,
    pub worker_concurrency: usize,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Summary,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = GroupingConfig::default();

        let executions_path = env_map
            .get("EXECUTIONS_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("EXECUTIONS_PATH".to_string()))?;

        let simultaneity_window_ms = parse_or(
            &env_map,
            "SIMULTANEITY_WINDOW_MS",
            defaults.simultaneity_window_ms,
            "must be a non-negative i64",
        )?;
        let expiration_proximity_days = parse_or(
            &env_map,
            "EXPIRATION_PROXIMITY_DAYS",
            defaults.expiration_proximity_days,
            "must be a non-negative i64",
        )?;
        let roll_window_ms = parse_or(
            &env_map,
            "ROLL_WINDOW_MS",
            defaults.roll_window_ms,
            "must be a non-negative i64",
        )?;
        for (key, value) in [
            ("SIMULTANEITY_WINDOW_MS", simultaneity_window_ms),
            ("EXPIRATION_PROXIMITY_DAYS", expiration_proximity_days),
            ("ROLL_WINDOW_MS", roll_window_ms),
        ] {
            if value < 0 {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must be a non-negative i64".to_string(),
                ));
            }
        }

        let assignment_price_threshold = parse_or(
            &env_map,
            "ASSIGNMENT_PRICE_THRESHOLD",
            defaults.assignment_price_threshold,
            "must be a decimal",
        )?;
        if assignment_price_threshold.is_negative() {
            return Err(ConfigError::InvalidValue(
                "ASSIGNMENT_PRICE_THRESHOLD".to_string(),
                "must be non-negative".to_string(),
            ));
        }

        let worker_concurrency = parse_or(
            &env_map,
            "WORKER_CONCURRENCY",
            crate::orchestration::DEFAULT_CONCURRENCY,
            "must be a positive integer",
        )?;
        if worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "WORKER_CONCURRENCY".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let output_format = match env_map
            .get("OUTPUT_FORMAT")
            .map(|s| s.as_str())
            .unwrap_or("json")
        {
            "json" => OutputFormat::Json,
            "summary" => OutputFormat::Summary,
            other => {
                return Err(ConfigError::InvalidValue(
                    "OUTPUT_FORMAT".to_string(),
                    format!("must be json or summary, got {}", other),
                ))
            }
        };

        Ok(Config {
            executions_path,
            simultaneity_window_ms,
            expiration_proximity_days,
            roll_window_ms,
            assignment_price_threshold,
            worker_concurrency,
            output_format,
        })
    }

    /// Engine tunables. Constants not exposed as env vars keep their defaults.
    pub fn grouping(&self) -> GroupingConfig {
        GroupingConfig {
            simultaneity_window_ms: self.simultaneity_window_ms,
            expiration_proximity_days: self.expiration_proximity_days,
            assignment_price_threshold: self.assignment_price_threshold,
            roll_window_ms: self.roll_window_ms,
            ..GroupingConfig::default()
        }
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "EXECUTIONS_PATH".to_string(),
            "/tmp/executions.csv".to_string(),
        );
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.executions_path, PathBuf::from("/tmp/executions.csv"));
        assert_eq!(config.worker_concurrency, 4);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.grouping(), GroupingConfig::default());
    }

    #[test]
    fn test_missing_executions_path() {
        let mut env_map = setup_required_env();
        env_map.remove("EXECUTIONS_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "EXECUTIONS_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_overrides_flow_into_grouping() {
        let mut env_map = setup_required_env();
        env_map.insert("SIMULTANEITY_WINDOW_MS".to_string(), "2000".to_string());
        env_map.insert("EXPIRATION_PROXIMITY_DAYS".to_string(), "7".to_string());
        env_map.insert("ROLL_WINDOW_MS".to_string(), "60000".to_string());
        env_map.insert("ASSIGNMENT_PRICE_THRESHOLD".to_string(), "0.01".to_string());
        env_map.insert("OUTPUT_FORMAT".to_string(), "summary".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        let grouping = config.grouping();
        assert_eq!(grouping.simultaneity_window_ms, 2000);
        assert_eq!(grouping.expiration_proximity_days, 7);
        assert_eq!(grouping.roll_window_ms, 60_000);
        assert_eq!(
            grouping.assignment_price_threshold,
            Decimal::from_str_canonical("0.01").unwrap()
        );
        assert_eq!(
            grouping.spread_balance_ratio,
            GroupingConfig::default().spread_balance_ratio
        );
        assert_eq!(config.output_format, OutputFormat::Summary);
    }

    #[test]
    fn test_invalid_window() {
        let mut env_map = setup_required_env();
        env_map.insert("SIMULTANEITY_WINDOW_MS".to_string(), "soon".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "SIMULTANEITY_WINDOW_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_negative_roll_window() {
        let mut env_map = setup_required_env();
        env_map.insert("ROLL_WINDOW_MS".to_string(), "-1".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "ROLL_WINDOW_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_concurrency() {
        let mut env_map = setup_required_env();
        env_map.insert("WORKER_CONCURRENCY".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "WORKER_CONCURRENCY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_output_format() {
        let mut env_map = setup_required_env();
        env_map.insert("OUTPUT_FORMAT".to_string(), "xml".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "OUTPUT_FORMAT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
