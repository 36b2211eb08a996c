//! Roll detection.

use super::derive_leg_id;
use crate::domain::{Execution, LegId};
use std::collections::BTreeSet;

/// Same-group roll: the closing side is all options, the opening side has
/// options, and the two leg sets do not overlap.
pub fn is_roll(closing: &[&Execution], opening: &[&Execution]) -> bool {
    if closing.is_empty() || !closing.iter().all(|e| e.is_option()) {
        return false;
    }
    if !opening.iter().any(|e| e.is_option()) {
        return false;
    }
    let closed: BTreeSet<LegId> = closing.iter().map(|e| derive_leg_id(e)).collect();
    let opened: BTreeSet<LegId> = opening.iter().map(|e| derive_leg_id(e)).collect();
    closed.is_disjoint(&opened)
}

/// Cross-group roll: a new trade continues a recently closed one.
///
/// Both leg sets must be all-option and disjoint, share an option kind, and
/// share at least one strike (rolled out) or expiration (rolled up/down).
pub fn is_roll_continuation(previous: &BTreeSet<LegId>, next: &BTreeSet<LegId>) -> bool {
    if previous.is_empty() || next.is_empty() {
        return false;
    }
    if !previous.iter().all(LegId::is_option) || !next.iter().all(LegId::is_option) {
        return false;
    }
    if !previous.is_disjoint(next) {
        return false;
    }
    let kinds = |legs: &BTreeSet<LegId>| {
        legs.iter()
            .filter_map(LegId::kind)
            .collect::<BTreeSet<_>>()
    };
    if kinds(previous).is_disjoint(&kinds(next)) {
        return false;
    }
    let strikes = |legs: &BTreeSet<LegId>| {
        legs.iter()
            .filter_map(LegId::strike)
            .collect::<BTreeSet<_>>()
    };
    let expirations = |legs: &BTreeSet<LegId>| {
        legs.iter()
            .filter_map(LegId::expiration)
            .collect::<BTreeSet<_>>()
    };
    !strikes(previous).is_disjoint(&strikes(next))
        || !expirations(previous).is_disjoint(&expirations(next))
}
