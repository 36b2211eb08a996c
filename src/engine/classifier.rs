//! Strategy classification from a trade's opening legs.

use crate::domain::{LegId, LegQuantity, OptionKind, Strategy};
use std::collections::BTreeMap;

/// Label a trade from its opening leg quantities. Pure and total: shapes it
/// does not recognise get a generic leg-count label.
pub fn classify(opening: &[LegQuantity]) -> Strategy {
    let mut merged: BTreeMap<&LegId, i64> = BTreeMap::new();
    for lq in opening {
        *merged.entry(&lq.leg).or_insert(0) += lq.quantity;
    }
    let legs: Vec<(&LegId, i64)> = merged.into_iter().filter(|(_, q)| *q != 0).collect();

    match legs.as_slice() {
        [] => Strategy::Unknown,
        [single] => classify_single(*single),
        [a, b] => classify_two(*a, *b),
        [_, _, _] => classify_three(&legs),
        [_, _, _, _] => classify_four(&legs),
        _ => Strategy::Complex(legs.len()),
    }
}

fn classify_single((leg, quantity): (&LegId, i64)) -> Strategy {
    let long = quantity > 0;
    match (leg.kind(), long) {
        (None, true) => Strategy::LongStock,
        (None, false) => Strategy::ShortStock,
        (Some(OptionKind::Call), true) => Strategy::LongCall,
        (Some(OptionKind::Call), false) => Strategy::ShortCall,
        (Some(OptionKind::Put), true) => Strategy::LongPut,
        (Some(OptionKind::Put), false) => Strategy::ShortPut,
    }
}

fn classify_two(a: (&LegId, i64), b: (&LegId, i64)) -> Strategy {
    // LegId ordering puts stock first.
    if *a.0 == LegId::Stock {
        return match (a.1 > 0, b.0.kind(), b.1 > 0) {
            (true, Some(OptionKind::Call), false) => Strategy::CoveredCall,
            (true, Some(OptionKind::Put), true) => Strategy::ProtectivePut,
            _ => Strategy::TwoLeg,
        };
    }

    let (lo, hi) = if a.0.strike() <= b.0.strike() { (a, b) } else { (b, a) };
    let same_kind = lo.0.kind() == hi.0.kind();
    let same_expiration = lo.0.expiration() == hi.0.expiration();

    if same_kind && same_expiration {
        let bull = lo.1 > 0 && hi.1 < 0;
        let bear = lo.1 < 0 && hi.1 > 0;
        return match (lo.0.kind(), bull, bear) {
            (Some(OptionKind::Call), true, _) => Strategy::BullCallSpread,
            (Some(OptionKind::Call), _, true) => Strategy::BearCallSpread,
            (Some(OptionKind::Put), true, _) => Strategy::BullPutSpread,
            (Some(OptionKind::Put), _, true) => Strategy::BearPutSpread,
            _ => Strategy::TwoLeg,
        };
    }
    if same_kind {
        return Strategy::CalendarSpread;
    }
    if lo.0.strike() == hi.0.strike() {
        Strategy::Straddle
    } else {
        Strategy::Strangle
    }
}

fn classify_three(legs: &[(&LegId, i64)]) -> Strategy {
    if !legs.iter().all(|(leg, _)| leg.is_option()) {
        return Strategy::ThreeLeg;
    }
    let mut by_strike = legs.to_vec();
    by_strike.sort_by_key(|(leg, _)| leg.strike());
    let q: Vec<i64> = by_strike.iter().map(|(_, q)| q.abs()).collect();
    if q[0] == q[2] && q[1] == 2 * q[0] {
        Strategy::Butterfly
    } else {
        Strategy::ThreeLeg
    }
}

fn classify_four(legs: &[(&LegId, i64)]) -> Strategy {
    let calls = legs
        .iter()
        .filter(|(leg, _)| leg.kind() == Some(OptionKind::Call))
        .count();
    let puts = legs
        .iter()
        .filter(|(leg, _)| leg.kind() == Some(OptionKind::Put))
        .count();
    if calls == 2 && puts == 2 {
        Strategy::IronCondor
    } else {
        Strategy::FourLeg
    }
}
