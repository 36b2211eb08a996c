//! Entry point used by the binary: load, compile and render a journal.

use crate::config::{Config, OutputFormat};
use crate::datasource::{CsvExecutionSource, ExecutionSource};
use crate::domain::{TradeGroup, TradeStatus};
use crate::error::AppError;
use crate::orchestration::{Journal, JournalReport};
use std::sync::Arc;

/// Build the journal described by the environment and render it.
pub async fn run_from_env() -> Result<String, AppError> {
    let config = Config::from_env()?;
    run(&config).await
}

/// Read the configured CSV export, compile every underlying and render the
/// report in the configured format.
pub async fn run(config: &Config) -> Result<String, AppError> {
    tracing::info!(path = %config.executions_path.display(), "reading executions");
    let source: Arc<dyn ExecutionSource> =
        Arc::new(CsvExecutionSource::new(config.executions_path.clone()));
    let report = Journal::new(source, config.grouping())
        .with_concurrency(config.worker_concurrency)
        .run(None)
        .await?;
    render(&report, config.output_format)
}

pub fn render(report: &JournalReport, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report.trades)?),
        OutputFormat::Summary => Ok(summary(report)),
    }
}

fn summary(report: &JournalReport) -> String {
    let mut lines: Vec<String> = report.trades.iter().map(summary_line).collect();
    for s in &report.summaries {
        lines.push(format!(
            "{}: {} executions, {} open, {} closed, {} rolls, {} assignments, {} warnings",
            s.underlying,
            s.executions,
            s.open_trades,
            s.closed_trades,
            s.rolls,
            s.assignments,
            s.warnings
        ));
    }
    lines.join("\n")
}

fn summary_line(trade: &TradeGroup) -> String {
    let status = match trade.status {
        TradeStatus::Open => "OPEN",
        TradeStatus::Closed => "CLOSED",
    };
    let mut line = format!(
        "{} {} {:<6} {:<22} fills={} net={}",
        trade.underlying,
        trade.id,
        status,
        trade.strategy.label(),
        trade.executions.len(),
        trade.net_cash_flow
    );
    if let Some(from) = trade.rolled_from {
        line.push_str(&format!(" rolled_from={}", from));
    }
    if let Some(into) = trade.rolled_into {
        line.push_str(&format!(" rolled_into={}", into));
    }
    if trade.is_assignment {
        let from: Vec<String> = trade.assigned_from.iter().map(|id| id.to_string()).collect();
        line.push_str(&format!(" assigned_from={}", from.join(",")));
    }
    if !trade.warnings.is_empty() {
        line.push_str(&format!(" warnings={}", trade.warnings.len()));
    }
    line
}
