//! Execution source abstraction for loading broker fills.

use crate::domain::{Execution, InputError, Symbol};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod csv_file;
pub mod mock;

pub use csv_file::{parse_csv, CsvExecutionSource};
pub use mock::MockExecutionSource;

/// Source of validated executions.
///
/// Implementations reject malformed records here so the engine only ever
/// sees validated input.
#[async_trait]
pub trait ExecutionSource: Send + Sync + fmt::Debug {
    /// Fetch executions, optionally restricted to one underlying.
    ///
    /// # Returns
    /// Executions in source order. Ordering is not significant; the engine
    /// sorts internally.
    async fn fetch_executions(
        &self,
        underlying: Option<&Symbol>,
    ) -> Result<Vec<Execution>, DataSourceError>;
}

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv parse error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("invalid record at row {row}: {source}")]
    InvalidRecord {
        row: usize,
        #[source]
        source: InputError,
    },
}
