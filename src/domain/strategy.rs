//! Strategy labels derived from a trade's opening legs.

use serde::Serialize;

/// Human-readable strategy of a trade.
///
/// Serializes as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Strategy {
    LongCall,
    ShortCall,
    LongPut,
    ShortPut,
    LongStock,
    ShortStock,
    BullCallSpread,
    BearCallSpread,
    BullPutSpread,
    BearPutSpread,
    CalendarSpread,
    Straddle,
    Strangle,
    CoveredCall,
    ProtectivePut,
    TwoLeg,
    Butterfly,
    ThreeLeg,
    IronCondor,
    FourLeg,
    Complex(usize),
    /// Opening legs netted to nothing.
    Unknown,
}

impl Strategy {
    pub fn label(&self) -> String {
        match self {
            Strategy::LongCall => "Long Call".to_string(),
            Strategy::ShortCall => "Short Call".to_string(),
            Strategy::LongPut => "Long Put".to_string(),
            Strategy::ShortPut => "Short Put".to_string(),
            Strategy::LongStock => "Long Stock".to_string(),
            Strategy::ShortStock => "Short Stock".to_string(),
            Strategy::BullCallSpread => "Bull Call Spread".to_string(),
            Strategy::BearCallSpread => "Bear Call Spread".to_string(),
            Strategy::BullPutSpread => "Bull Put Spread".to_string(),
            Strategy::BearPutSpread => "Bear Put Spread".to_string(),
            Strategy::CalendarSpread => "Calendar Spread".to_string(),
            Strategy::Straddle => "Straddle".to_string(),
            Strategy::Strangle => "Strangle".to_string(),
            Strategy::CoveredCall => "Covered Call".to_string(),
            Strategy::ProtectivePut => "Protective Put".to_string(),
            Strategy::TwoLeg => "Two-Leg".to_string(),
            Strategy::Butterfly => "Butterfly".to_string(),
            Strategy::ThreeLeg => "Three-Leg".to_string(),
            Strategy::IronCondor => "Iron Condor".to_string(),
            Strategy::FourLeg => "Four-Leg".to_string(),
            Strategy::Complex(n) => format!("{}-Leg Complex", n),
            Strategy::Unknown => "Unknown".to_string(),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.label()
    }
}
