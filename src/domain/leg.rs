//! Canonical leg identity.

use crate::domain::{Decimal, OptionKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity of one leg: a specific option contract, or the underlying stock.
///
/// Executions with equal `LegId`s accumulate into the same position. The
/// derived ordering sorts stock first, then options by expiration, strike and
/// kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LegId {
    Stock,
    Option {
        expiration: NaiveDate,
        strike: Decimal,
        kind: OptionKind,
    },
}

impl LegId {
    pub fn is_option(&self) -> bool {
        matches!(self, LegId::Option { .. })
    }

    pub fn strike(&self) -> Option<Decimal> {
        match self {
            LegId::Option { strike, .. } => Some(*strike),
            LegId::Stock => None,
        }
    }

    pub fn expiration(&self) -> Option<NaiveDate> {
        match self {
            LegId::Option { expiration, .. } => Some(*expiration),
            LegId::Stock => None,
        }
    }

    pub fn kind(&self) -> Option<OptionKind> {
        match self {
            LegId::Option { kind, .. } => Some(*kind),
            LegId::Stock => None,
        }
    }
}

impl std::fmt::Display for LegId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegId::Stock => write!(f, "STOCK"),
            LegId::Option {
                expiration,
                strike,
                kind,
            } => {
                let k = match kind {
                    OptionKind::Call => 'C',
                    OptionKind::Put => 'P',
                };
                write!(f, "{} {}{}", expiration.format("%Y-%m-%d"), strike, k)
            }
        }
    }
}

/// A leg with a signed quantity (positive long, negative short).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegQuantity {
    pub leg: LegId,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(strike: i64, day: u32) -> LegId {
        LegId::Option {
            expiration: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            strike: Decimal::from(strike),
            kind: OptionKind::Call,
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(LegId::Stock.to_string(), "STOCK");
        assert_eq!(call(150, 19).to_string(), "2024-01-19 150C");
    }

    #[test]
    fn test_ordering_stock_first_then_expiration_then_strike() {
        let mut legs = vec![call(160, 19), call(150, 26), LegId::Stock, call(150, 19)];
        legs.sort();
        assert_eq!(legs, vec![LegId::Stock, call(150, 19), call(160, 19), call(150, 26)]);
    }

    #[test]
    fn test_accessors() {
        assert!(call(150, 19).is_option());
        assert!(!LegId::Stock.is_option());
        assert_eq!(LegId::Stock.strike(), None);
        assert_eq!(call(150, 19).kind(), Some(OptionKind::Call));
    }
}
