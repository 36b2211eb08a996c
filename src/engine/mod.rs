//! Pure, synchronous trade grouping engine.
//!
//! Control flow for one underlying: `cluster_executions` produces ordered
//! execution groups, `PositionTracker` routes each group into trades, and
//! `classify` labels every trade from its opening legs. Nothing here performs
//! I/O or returns errors; input is validated before it gets here.

use crate::domain::Decimal;

pub mod assignment;
pub mod classifier;
pub mod clusterer;
pub mod ledger;
pub mod leg_identity;
pub mod position_tracker;
pub mod roll;
pub mod spread;

pub use classifier::classify;
pub use clusterer::{cluster_executions, ExecutionGroup, GroupKind};
pub use ledger::{LegLedger, LegPosition};
pub use leg_identity::{derive_leg_id, normalize_expiration};
pub use position_tracker::PositionTracker;

/// Tunables for the grouping heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingConfig {
    /// Fills within this many ms of a cluster's first fill are simultaneous.
    pub simultaneity_window_ms: i64,
    /// Max distance in days between expirations grouped together.
    pub expiration_proximity_days: i64,
    /// Minimum smaller/larger ratio of bought vs sold quantity for a spread.
    pub spread_balance_ratio: Decimal,
    /// Option closes at or below this price are assignment candidates.
    pub assignment_price_threshold: Decimal,
    /// Allowed relative deviation of assigned share count.
    pub assignment_tolerance: Decimal,
    /// Max gap between a closure and a new trade for a cross-group roll.
    pub roll_window_ms: i64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            simultaneity_window_ms: 5_000,
            expiration_proximity_days: 30,
            spread_balance_ratio: Decimal::from_parts(9, 1),
            assignment_price_threshold: Decimal::from_parts(5, 2),
            assignment_tolerance: Decimal::from_parts(1, 1),
            roll_window_ms: 86_400_000,
        }
    }
}
