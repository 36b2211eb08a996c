use crate::compile::{CompileOutput, CompileSummary, Compiler};
use crate::datasource::{DataSourceError, ExecutionSource};
use crate::domain::{Execution, Symbol, TradeGroup};
use crate::engine::GroupingConfig;
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Trade groups for every underlying, concatenated in underlying order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalReport {
    pub trades: Vec<TradeGroup>,
    pub summaries: Vec<CompileSummary>,
}

impl JournalReport {
    pub fn trades_for(&self, underlying: &Symbol) -> impl Iterator<Item = &TradeGroup> + '_ {
        let underlying = underlying.clone();
        self.trades
            .iter()
            .filter(move |t| t.underlying == underlying)
    }
}

/// Fetches executions from a source and compiles each underlying on a
/// bounded pool of blocking workers.
#[derive(Debug, Clone)]
pub struct Journal {
    source: Arc<dyn ExecutionSource>,
    config: GroupingConfig,
    concurrency: usize,
}

impl Journal {
    pub fn new(source: Arc<dyn ExecutionSource>, config: GroupingConfig) -> Self {
        Self {
            source,
            config,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Max underlyings compiled at once. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch and compile, optionally restricted to one underlying.
    pub async fn run(&self, underlying: Option<&Symbol>) -> Result<JournalReport, JournalError> {
        let executions = self.source.fetch_executions(underlying).await?;
        tracing::info!(
            executions = executions.len(),
            concurrency = self.concurrency,
            "compiling journal"
        );
        compile_all(executions, &self.config, self.concurrency).await
    }
}

/// Partition by underlying and compile each partition independently.
///
/// A failed worker fails the whole batch; no partial report is returned.
pub async fn compile_all(
    executions: Vec<Execution>,
    config: &GroupingConfig,
    concurrency: usize,
) -> Result<JournalReport, JournalError> {
    let mut by_underlying: BTreeMap<Symbol, Vec<Execution>> = BTreeMap::new();
    for execution in executions {
        by_underlying
            .entry(execution.underlying.clone())
            .or_default()
            .push(execution);
    }

    let outputs: Vec<CompileOutput> = stream::iter(by_underlying)
        .map(|(underlying, executions)| {
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                Compiler::compile(&underlying, &executions, &config)
            })
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut report = JournalReport::default();
    for output in outputs {
        report.trades.extend(output.trades);
        report.summaries.push(output.summary);
    }
    Ok(report)
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error("compile worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
