//! Per-leg position ledger shared by all trades on one underlying.

use crate::domain::{Decimal, Execution, ExecutionId, LegId};
use std::collections::BTreeMap;

/// Net position on one leg across every trade.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegPosition {
    /// Positive = net long, negative = net short, zero = flat.
    pub quantity: i64,
    /// Accumulated signed cost (buys positive).
    pub cost: Decimal,
    pub executions: Vec<ExecutionId>,
}

impl LegPosition {
    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct LegLedger {
    positions: BTreeMap<LegId, LegPosition>,
}

impl LegLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current signed quantity on `leg`; zero if never traded.
    pub fn quantity(&self, leg: &LegId) -> i64 {
        self.positions.get(leg).map(|p| p.quantity).unwrap_or(0)
    }

    #[cfg(test)]
    fn position(&self, leg: &LegId) -> Option<&LegPosition> {
        self.positions.get(leg)
    }

    pub fn apply(&mut self, leg: &LegId, execution: &Execution) {
        let position = self.positions.entry(leg.clone()).or_default();
        position.quantity += execution.signed_quantity();
        position.cost += execution.signed_cost();
        position.executions.push(execution.id.clone());
    }

    /// Legs with a non-zero net position.
    #[cfg(test)]
    fn open_legs(&self) -> impl Iterator<Item = (&LegId, &LegPosition)> {
        self.positions.iter().filter(|(_, p)| !p.is_flat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Side, Symbol, TimeMs};

    fn stock(id: &str, side: Side, qty: i64, px: i64) -> Execution {
        Execution::equity(
            ExecutionId::new(id),
            Symbol::new("AAPL"),
            side,
            qty,
            Decimal::from(px),
            TimeMs::new(0),
        )
        .unwrap()
    }

    #[test]
    fn test_quantity_is_sum_of_signed_deltas() {
        let mut ledger = LegLedger::new();
        ledger.apply(&LegId::Stock, &stock("a", Side::Buy, 100, 10));
        ledger.apply(&LegId::Stock, &stock("b", Side::Sell, 30, 12));
        assert_eq!(ledger.quantity(&LegId::Stock), 70);
        let pos = ledger.position(&LegId::Stock).unwrap();
        assert_eq!(pos.cost, Decimal::from(1000i64 - 360));
        assert_eq!(pos.executions.len(), 2);
        assert_eq!(ledger.open_legs().count(), 1);
    }

    #[test]
    fn test_flat_after_round_trip() {
        let mut ledger = LegLedger::new();
        ledger.apply(&LegId::Stock, &stock("a", Side::Sell, 5, 10));
        ledger.apply(&LegId::Stock, &stock("b", Side::Buy, 5, 9));
        assert!(ledger.position(&LegId::Stock).unwrap().is_flat());
        assert_eq!(ledger.open_legs().count(), 0);
    }

    #[test]
    fn test_unknown_leg_is_zero() {
        assert_eq!(LegLedger::new().quantity(&LegId::Stock), 0);
    }
}
