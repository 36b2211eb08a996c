//! Domain types for the options trade journal.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Primitives: TimeMs, Symbol, ExecutionId, Side
//! - Execution (equity vs option variants) and boundary validation
//! - Leg identity, trade group output and strategy labels
//! - Stable execution ordering

pub mod decimal;
pub mod execution;
pub mod leg;
pub mod ordering;
pub mod primitives;
pub mod strategy;
pub mod trade;

pub use decimal::Decimal;
pub use execution::{
    Execution, ExecutionRecord, InputError, Instrument, OptionContract, OptionKind,
    PositionEffect, DEFAULT_OPTION_MULTIPLIER,
};
pub use leg::{LegId, LegQuantity};
pub use ordering::{sort_executions_stable, ExecutionOrderingKey};
pub use primitives::{ExecutionId, Side, Symbol, TimeMs};
pub use strategy::Strategy;
pub use trade::{RollKind, TradeGroup, TradeId, TradeStatus, TradeWarning};
