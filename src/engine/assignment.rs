//! Option assignment detection.

use super::{derive_leg_id, GroupingConfig};
use crate::domain::{Decimal, Execution, LegId, OptionKind};
use std::collections::BTreeMap;

/// Option fills priced at or below the assignment threshold.
pub fn assigned_options<'a>(
    executions: &'a [&'a Execution],
    config: &'a GroupingConfig,
) -> impl Iterator<Item = &'a Execution> + 'a {
    executions
        .iter()
        .copied()
        .filter(move |e| e.is_option() && e.price <= config.assignment_price_threshold)
}

/// True if `shares` is within tolerance of the share count `contracts` settle into.
pub fn share_count_matches(expected_shares: i64, shares: i64, tolerance: Decimal) -> bool {
    if expected_shares <= 0 || shares <= 0 {
        return false;
    }
    let diff = Decimal::from((shares - expected_shares).abs());
    diff <= Decimal::from(expected_shares) * tolerance
}

/// Share counts the near-zero option fills could settle into: one per
/// contract, and one per option kind and side. The worthless wing of an
/// assigned spread also closes near zero and is never added in.
fn candidate_share_counts<'a>(options: impl Iterator<Item = &'a Execution>) -> Vec<i64> {
    let mut by_leg: BTreeMap<LegId, i64> = BTreeMap::new();
    let mut by_kind_side: BTreeMap<(OptionKind, i64), i64> = BTreeMap::new();
    for e in options {
        let Some(contract) = e.contract() else {
            continue;
        };
        let shares = e.quantity * i64::from(e.multiplier);
        *by_leg.entry(derive_leg_id(e)).or_insert(0) += shares;
        *by_kind_side.entry((contract.kind, e.side.sign())).or_insert(0) += shares;
    }
    by_leg.into_values().chain(by_kind_side.into_values()).collect()
}

fn equity_shares(executions: &[&Execution]) -> i64 {
    executions
        .iter()
        .filter(|e| e.is_equity())
        .map(|e| e.quantity)
        .sum()
}

fn any_count_matches(candidates: Vec<i64>, shares: i64, tolerance: Decimal) -> bool {
    candidates
        .into_iter()
        .any(|expected| share_count_matches(expected, shares, tolerance))
}

/// True if some closing option fill near zero price is paired with an equity
/// opening of roughly multiplier × contracts shares.
pub fn is_assignment(
    closing: &[&Execution],
    opening: &[&Execution],
    config: &GroupingConfig,
) -> bool {
    let candidates = candidate_share_counts(assigned_options(closing, config));
    any_count_matches(candidates, equity_shares(opening), config.assignment_tolerance)
}

/// Clusterer-side check on a raw time cluster, before open/close is known.
///
/// Option fills hinted as openings are never treated as assigned.
pub fn looks_like_assignment(cluster: &[&Execution], config: &GroupingConfig) -> bool {
    let candidates =
        candidate_share_counts(assigned_options(cluster, config).filter(|e| !e.is_open_hint()));
    any_count_matches(candidates, equity_shares(cluster), config.assignment_tolerance)
}
