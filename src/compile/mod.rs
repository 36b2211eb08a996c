//! Compile pipeline for turning one underlying's executions into trade groups.
//!
//! This module provides:
//! - Clustering into atomic execution groups
//! - Routing groups through the position state machine
//! - Per-underlying summary counters

use crate::domain::{Execution, Symbol, TradeGroup, TradeStatus};
use crate::engine::{cluster_executions, GroupingConfig, PositionTracker};
use serde::Serialize;

/// Counters describing one compiled underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileSummary {
    pub underlying: Symbol,
    pub executions: usize,
    pub groups: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub rolls: usize,
    pub assignments: usize,
    pub warnings: usize,
}

impl CompileSummary {
    fn from_trades(
        underlying: &Symbol,
        executions: usize,
        groups: usize,
        trades: &[TradeGroup],
    ) -> Self {
        let closed_trades = trades
            .iter()
            .filter(|t| t.status == TradeStatus::Closed)
            .count();
        Self {
            underlying: underlying.clone(),
            executions,
            groups,
            open_trades: trades.len() - closed_trades,
            closed_trades,
            rolls: trades.iter().filter(|t| t.is_roll()).count(),
            assignments: trades.iter().filter(|t| t.is_assignment).count(),
            warnings: trades.iter().map(|t| t.warnings.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOutput {
    pub trades: Vec<TradeGroup>,
    pub summary: CompileSummary,
}

/// Stateless entry point for the per-underlying pipeline.
pub struct Compiler;

impl Compiler {
    /// Compile all executions of one underlying into trade groups.
    ///
    /// Executions may arrive in any order and must already be validated.
    /// Fills for other underlyings are ignored with a warning.
    pub fn compile(
        underlying: &Symbol,
        executions: &[Execution],
        config: &GroupingConfig,
    ) -> CompileOutput {
        let foreign = executions
            .iter()
            .filter(|e| &e.underlying != underlying)
            .count();
        let owned: Vec<Execution>;
        let executions = if foreign > 0 {
            tracing::warn!(%underlying, foreign, "ignoring executions for other underlyings");
            owned = executions
                .iter()
                .filter(|e| &e.underlying == underlying)
                .cloned()
                .collect();
            owned.as_slice()
        } else {
            executions
        };

        let groups = cluster_executions(executions, config);
        let mut tracker = PositionTracker::new(underlying.clone(), config.clone());
        for group in &groups {
            tracker.process_group(group);
        }
        let trades = tracker.into_trades();
        let summary =
            CompileSummary::from_trades(underlying, executions.len(), groups.len(), &trades);

        tracing::info!(
            %underlying,
            executions = summary.executions,
            groups = summary.groups,
            open = summary.open_trades,
            closed = summary.closed_trades,
            rolls = summary.rolls,
            assignments = summary.assignments,
            warnings = summary.warnings,
            "compiled underlying"
        );

        CompileOutput { trades, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, ExecutionId, Side, TimeMs};

    fn stock(id: &str, symbol: &str, time_ms: i64, side: Side) -> Execution {
        Execution::equity(
            ExecutionId::new(id),
            Symbol::new(symbol),
            side,
            100,
            Decimal::from(50i64),
            TimeMs::new(time_ms),
        )
        .unwrap()
    }

    #[test]
    fn test_compile_empty() {
        let out = Compiler::compile(&Symbol::new("AAPL"), &[], &GroupingConfig::default());
        assert!(out.trades.is_empty());
        assert_eq!(out.summary.executions, 0);
        assert_eq!(out.summary.groups, 0);
    }

    #[test]
    fn test_compile_summary_counts() {
        let execs = vec![
            stock("a", "AAPL", 0, Side::Buy),
            stock("b", "AAPL", 60_000, Side::Sell),
            stock("c", "AAPL", 120_000, Side::Sell),
        ];
        let out = Compiler::compile(&Symbol::new("AAPL"), &execs, &GroupingConfig::default());

        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.summary.underlying, Symbol::new("AAPL"));
        assert_eq!(out.summary.executions, 3);
        assert_eq!(out.summary.groups, 3);
        assert_eq!(out.summary.closed_trades, 1);
        assert_eq!(out.summary.open_trades, 1);
        assert_eq!(out.summary.rolls, 0);
        assert_eq!(out.summary.warnings, 0);
    }

    #[test]
    fn test_compile_ignores_other_underlyings() {
        let execs = vec![
            stock("a", "AAPL", 0, Side::Buy),
            stock("m", "MSFT", 0, Side::Buy),
        ];
        let out = Compiler::compile(&Symbol::new("AAPL"), &execs, &GroupingConfig::default());
        assert_eq!(out.summary.executions, 1);
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].execution_ids()[0].as_str(), "a");
    }
}
