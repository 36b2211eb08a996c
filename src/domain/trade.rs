//! Trade group: the logical trade reconstructed from executions.

use crate::domain::{
    Decimal, Execution, ExecutionId, LegId, LegQuantity, Strategy, Symbol, TimeMs,
};
use serde::Serialize;

/// Opaque trade identifier, assigned in creation order within one underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TradeId(pub u64);

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Set when the trade is created; never cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RollKind {
    #[default]
    None,
    Roll,
}

/// A grouping decision that was a best-effort guess and deserves review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeWarning {
    /// No open trade could absorb this close without crossing zero; it was
    /// assigned to the trade with the largest opposite remaining quantity.
    OverCloseFallback { execution_id: ExecutionId },
    /// A close with nothing to close; it opened this trade instead.
    OrphanedClose { execution_id: ExecutionId },
}

/// One logical trade: a single position, a spread, a roll leg or an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeGroup {
    pub id: TradeId,
    pub underlying: Symbol,
    pub status: TradeStatus,
    pub strategy: Strategy,
    /// Leg quantities from the executions that created the trade.
    pub opening_legs: Vec<LegQuantity>,
    /// Every leg the trade has touched, sorted.
    pub legs: Vec<LegId>,
    pub executions: Vec<Execution>,
    pub opened_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<TimeMs>,
    pub roll_kind: RollKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_from: Option<TradeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_into: Option<TradeId>,
    pub is_assignment: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assigned_from: Vec<TradeId>,
    /// Sum of premium received minus premium paid (credit positive).
    pub net_cash_flow: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TradeWarning>,
}

impl TradeGroup {
    pub fn execution_ids(&self) -> Vec<&ExecutionId> {
        self.executions.iter().map(|e| &e.id).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    pub fn is_roll(&self) -> bool {
        self.roll_kind == RollKind::Roll
    }

    /// Signed quantity of `leg` held by this trade, from its own executions.
    pub fn remaining_quantity(&self, leg: &LegId) -> i64 {
        self.executions
            .iter()
            .filter(|e| &crate::engine::derive_leg_id(e) == leg)
            .map(Execution::signed_quantity)
            .sum()
    }
}
