use crate::config::ConfigError;
use crate::orchestration::JournalError;
use thiserror::Error;

/// Failure of a whole journal run, as returned by `output::run`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: AppError = ConfigError::MissingEnv("EXECUTIONS_PATH".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: EXECUTIONS_PATH"
        );
    }
}
