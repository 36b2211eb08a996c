//! Leg identity derivation with expiration date normalization.

use crate::domain::{Execution, Instrument, LegId};
use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// Expirations stored at or after this UTC hour belong to the next calendar day.
///
/// Some brokers store midnight US/Eastern as a UTC timestamp late the previous
/// evening (20:00 or 21:00 UTC depending on DST).
pub const EXPIRATION_ROLLOVER_HOUR_UTC: u32 = 20;

/// Calendar expiration date for a broker-reported expiration timestamp.
pub fn normalize_expiration(expiration: DateTime<Utc>) -> NaiveDate {
    let date = expiration.date_naive();
    if expiration.hour() >= EXPIRATION_ROLLOVER_HOUR_UTC {
        date.succ_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Map an execution to its canonical leg. Pure and total.
pub fn derive_leg_id(execution: &Execution) -> LegId {
    match &execution.instrument {
        Instrument::Equity => LegId::Stock,
        Instrument::Option(contract) => LegId::Option {
            expiration: normalize_expiration(contract.expiration),
            strike: contract.strike.normalized(),
            kind: contract.kind,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Decimal, ExecutionId, OptionContract, OptionKind, Side, Symbol, TimeMs,
    };
    use chrono::TimeZone;

    fn option_exec(expiration: DateTime<Utc>, strike: &str) -> Execution {
        Execution::option(
            ExecutionId::new("x"),
            Symbol::new("AAPL"),
            OptionContract {
                kind: OptionKind::Put,
                strike: Decimal::from_str_canonical(strike).unwrap(),
                expiration,
            },
            Side::Sell,
            1,
            Decimal::from(1i64),
            TimeMs::new(0),
        )
        .unwrap()
    }

    #[test]
    fn test_midnight_utc_keeps_date() {
        let exp = Utc.with_ymd_and_hms(2024, 1, 19, 0, 0, 0).unwrap();
        assert_eq!(
            normalize_expiration(exp),
            NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
        );
    }

    #[test]
    fn test_eastern_midnight_stored_as_utc_evening_rolls_forward() {
        let winter = Utc.with_ymd_and_hms(2024, 1, 18, 21, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 18, 20, 0, 0).unwrap();
        assert_eq!(
            normalize_expiration(winter),
            NaiveDate::from_ymd_opt(2024, 1, 19).unwrap()
        );
        assert_eq!(
            normalize_expiration(summer),
            NaiveDate::from_ymd_opt(2024, 7, 19).unwrap()
        );
    }

    #[test]
    fn test_hour_nineteen_does_not_roll() {
        let exp = Utc.with_ymd_and_hms(2024, 1, 18, 19, 59, 59).unwrap();
        assert_eq!(
            normalize_expiration(exp),
            NaiveDate::from_ymd_opt(2024, 1, 18).unwrap()
        );
    }

    #[test]
    fn test_same_contract_different_representations_share_leg() {
        let a = option_exec(Utc.with_ymd_and_hms(2024, 1, 19, 0, 0, 0).unwrap(), "150");
        let b = option_exec(Utc.with_ymd_and_hms(2024, 1, 18, 21, 0, 0).unwrap(), "150.00");
        assert_eq!(derive_leg_id(&a), derive_leg_id(&b));
    }

    #[test]
    fn test_equity_is_stock() {
        let e = Execution::equity(
            ExecutionId::new("s"),
            Symbol::new("AAPL"),
            Side::Buy,
            100,
            Decimal::from(150i64),
            TimeMs::new(0),
        )
        .unwrap();
        assert_eq!(derive_leg_id(&e), LegId::Stock);
    }

    #[test]
    fn test_max_date_is_total() {
        let exp = NaiveDate::MAX.and_hms_opt(23, 0, 0).unwrap().and_utc();
        assert_eq!(normalize_expiration(exp), NaiveDate::MAX);
    }
}
