//! Predicates deciding whether simultaneous fills form one multi-leg order.

use super::{derive_leg_id, GroupingConfig};
use crate::domain::{Decimal, Execution, Side};
use std::collections::BTreeSet;

/// True if a batch of simultaneous fills is one intentional multi-leg spread.
///
/// All of the following must hold:
/// 1. at least two fills, with both a buy and a sell;
/// 2. no fill carries an explicit close hint;
/// 3. either every fill is hinted open, or all share one non-zero order id;
/// 4. bought and sold quantities are balanced within `spread_balance_ratio`.
pub fn is_spread(executions: &[&Execution], config: &GroupingConfig) -> bool {
    has_both_sides(executions)
        && !has_close_hint(executions)
        && order_ids_agree(executions)
        && is_balanced(executions, config.spread_balance_ratio)
}

/// Rule 1.
pub fn has_both_sides(executions: &[&Execution]) -> bool {
    executions.len() >= 2
        && executions.iter().any(|e| e.side == Side::Buy)
        && executions.iter().any(|e| e.side == Side::Sell)
}

/// Rule 2: a close hint means the batch mixes closing an old position with
/// opening a new one.
pub fn has_close_hint(executions: &[&Execution]) -> bool {
    executions.iter().any(|e| e.is_close_hint())
}

/// Rule 3.
pub fn order_ids_agree(executions: &[&Execution]) -> bool {
    if !executions.is_empty() && executions.iter().all(|e| e.is_open_hint()) {
        return true;
    }
    shared_order_id(executions).is_some()
}

/// The single non-zero order id shared by every fill, if there is one.
pub fn shared_order_id(executions: &[&Execution]) -> Option<u64> {
    let first = executions.first()?.order_id?;
    executions
        .iter()
        .all(|e| e.order_id == Some(first))
        .then_some(first)
}

/// Rule 4.
pub fn is_balanced(executions: &[&Execution], min_ratio: Decimal) -> bool {
    let bought: i64 = executions
        .iter()
        .filter(|e| e.side == Side::Buy)
        .map(|e| e.quantity)
        .sum();
    let sold: i64 = executions
        .iter()
        .filter(|e| e.side == Side::Sell)
        .map(|e| e.quantity)
        .sum();
    let (small, large) = if bought < sold {
        (bought, sold)
    } else {
        (sold, bought)
    };
    if large == 0 {
        return false;
    }
    Decimal::from(small) / Decimal::from(large) >= min_ratio
}

/// True if opening fills form a new spread structure that must stay in one
/// trade: at least two option legs, a buy and a sell, and two distinct strikes.
pub fn is_new_spread_structure(executions: &[&Execution]) -> bool {
    let options: Vec<&Execution> = executions.iter().copied().filter(|e| e.is_option()).collect();
    let legs: BTreeSet<_> = options.iter().map(|e| derive_leg_id(e)).collect();
    let strikes: BTreeSet<_> = options
        .iter()
        .filter_map(|e| e.strike().map(|s| s.normalized()))
        .collect();
    legs.len() >= 2 && has_both_sides(&options) && strikes.len() >= 2
}

/// True if at least two distinct option legs were placed under one order id.
///
/// Covers straddles and calendars, which share a strike or a side and so
/// never satisfy `is_new_spread_structure`.
pub fn is_single_order_multi_leg(executions: &[&Execution]) -> bool {
    let legs: BTreeSet<_> = executions
        .iter()
        .filter(|e| e.is_option())
        .map(|e| derive_leg_id(e))
        .collect();
    legs.len() >= 2
        && executions.iter().all(|e| e.is_option())
        && shared_order_id(executions).is_some()
}
