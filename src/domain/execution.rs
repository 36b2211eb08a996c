//! Execution type representing a single brokerage fill.

use crate::domain::{Decimal, ExecutionId, Side, Symbol, TimeMs};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default contract multiplier for equity options.
pub const DEFAULT_OPTION_MULTIPLIER: u32 = 100;

/// Input bounds. Share counts and cash flows are summed in `i64` and
/// `Decimal` without overflow checks, so every fill must stay below these.
pub const MAX_QUANTITY: i64 = 100_000_000;
pub const MAX_MULTIPLIER: u32 = 10_000;
pub const MAX_PRICE: i64 = 1_000_000_000;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Put => write!(f, "Put"),
        }
    }
}

/// Option contract terms as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub kind: OptionKind,
    pub strike: Decimal,
    /// Expiration as stored by the broker. May drift across midnight; use
    /// `engine::derive_leg_id` for the calendar expiration.
    pub expiration: DateTime<Utc>,
}

/// What was traded. Option-only terms exist only on the option variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instrument {
    Equity,
    Option(OptionContract),
}

/// Broker-supplied open/close hint. Frequently missing or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionEffect {
    Open,
    Close,
}

/// One validated fill. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub underlying: Symbol,
    pub instrument: Instrument,
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<PositionEffect>,
    /// Unsigned quantity, always > 0. Direction comes from `side`.
    pub quantity: i64,
    pub price: Decimal,
    pub multiplier: u32,
    /// Broker order id; zero is normalized to `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    pub time_ms: TimeMs,
}

/// Rejection of a malformed execution at the input boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i64),
    #[error("price must be non-negative, got {0}")]
    NegativePrice(Decimal),
    #[error("strike must be positive, got {0}")]
    NonPositiveStrike(Decimal),
    #[error("multiplier must be positive")]
    ZeroMultiplier,
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Execution {
    /// Build a validated option execution with the default multiplier.
    #[allow(clippy::too_many_arguments)]
    pub fn option(
        id: ExecutionId,
        underlying: Symbol,
        contract: OptionContract,
        side: Side,
        quantity: i64,
        price: Decimal,
        time_ms: TimeMs,
    ) -> Result<Self, InputError> {
        if !contract.strike.is_positive() {
            return Err(InputError::NonPositiveStrike(contract.strike));
        }
        Self::validated(Execution {
            id,
            underlying,
            instrument: Instrument::Option(contract),
            side,
            effect: None,
            quantity,
            price,
            multiplier: DEFAULT_OPTION_MULTIPLIER,
            order_id: None,
            time_ms,
        })
    }

    /// Build a validated equity execution (multiplier 1).
    pub fn equity(
        id: ExecutionId,
        underlying: Symbol,
        side: Side,
        quantity: i64,
        price: Decimal,
        time_ms: TimeMs,
    ) -> Result<Self, InputError> {
        Self::validated(Execution {
            id,
            underlying,
            instrument: Instrument::Equity,
            side,
            effect: None,
            quantity,
            price,
            multiplier: 1,
            order_id: None,
            time_ms,
        })
    }

    fn validated(execution: Execution) -> Result<Self, InputError> {
        if execution.quantity <= 0 {
            return Err(InputError::NonPositiveQuantity(execution.quantity));
        }
        if execution.quantity > MAX_QUANTITY {
            return Err(out_of_range("quantity", execution.quantity));
        }
        if execution.price.is_negative() {
            return Err(InputError::NegativePrice(execution.price));
        }
        if execution.price > Decimal::from(MAX_PRICE) {
            return Err(out_of_range("price", execution.price));
        }
        if execution.multiplier == 0 {
            return Err(InputError::ZeroMultiplier);
        }
        Ok(execution)
    }

    pub fn with_order_id(mut self, order_id: Option<u64>) -> Self {
        self.order_id = order_id.filter(|id| *id != 0);
        self
    }

    pub fn with_effect(mut self, effect: Option<PositionEffect>) -> Self {
        self.effect = effect;
        self
    }

    /// Override the contract multiplier. Zero and values above
    /// `MAX_MULTIPLIER` are ignored.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        if multiplier > 0 && multiplier <= MAX_MULTIPLIER {
            self.multiplier = multiplier;
        }
        self
    }

    /// Quantity with direction applied: positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity
    }

    /// Signed cash cost of this fill (buys positive).
    pub fn signed_cost(&self) -> Decimal {
        Decimal::from(self.signed_quantity()) * self.price * Decimal::from(self.multiplier)
    }

    pub fn is_option(&self) -> bool {
        matches!(self.instrument, Instrument::Option(_))
    }

    pub fn is_equity(&self) -> bool {
        matches!(self.instrument, Instrument::Equity)
    }

    pub fn contract(&self) -> Option<&OptionContract> {
        match &self.instrument {
            Instrument::Option(contract) => Some(contract),
            Instrument::Equity => None,
        }
    }

    pub fn strike(&self) -> Option<Decimal> {
        self.contract().map(|c| c.strike)
    }

    pub fn is_open_hint(&self) -> bool {
        self.effect == Some(PositionEffect::Open)
    }

    pub fn is_close_hint(&self) -> bool {
        self.effect == Some(PositionEffect::Close)
    }

    /// Deterministic id for records that arrive without a broker id.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_execution_id(
        underlying: &Symbol,
        instrument: &Instrument,
        side: Side,
        quantity: i64,
        price: &Decimal,
        order_id: Option<u64>,
        time_ms: TimeMs,
    ) -> ExecutionId {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(underlying.as_str());
        match instrument {
            Instrument::Equity => hasher.update(b"E"),
            Instrument::Option(contract) => {
                hasher.update(match contract.kind {
                    OptionKind::Call => b"C",
                    OptionKind::Put => b"P",
                });
                hasher.update(contract.strike.to_canonical_string());
                hasher.update(contract.expiration.timestamp_millis().to_le_bytes());
            }
        }
        hasher.update(if side == Side::Buy { b"B" } else { b"S" });
        hasher.update(quantity.to_le_bytes());
        hasher.update(price.to_canonical_string());
        if let Some(order_id) = order_id {
            hasher.update(order_id.to_le_bytes());
        }
        hasher.update(time_ms.as_i64().to_le_bytes());
        let hash = hasher.finalize();
        ExecutionId(format!("hash:{}", hex::encode(&hash[..16])))
    }
}

/// Raw, unvalidated execution row as it appears in a broker export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub underlying: Option<String>,
    #[serde(default)]
    pub security_type: Option<String>,
    #[serde(default)]
    pub option_type: Option<String>,
    #[serde(default)]
    pub strike: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub open_close: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub multiplier: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, InputError> {
    present(value).ok_or(InputError::MissingField(field))
}

fn out_of_range(field: &'static str, value: impl std::fmt::Display) -> InputError {
    InputError::OutOfRange {
        field,
        value: value.to_string(),
    }
}

fn invalid(field: &'static str, value: &str) -> InputError {
    InputError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

fn parse_decimal(value: &str, field: &'static str) -> Result<Decimal, InputError> {
    Decimal::from_str_canonical(value).map_err(|_| invalid(field, value))
}

fn parse_side(value: &str) -> Result<Side, InputError> {
    match value.to_ascii_lowercase().as_str() {
        "buy" | "b" | "bot" => Ok(Side::Buy),
        "sell" | "s" | "sld" => Ok(Side::Sell),
        _ => Err(invalid("side", value)),
    }
}

fn parse_option_kind(value: &str) -> Result<OptionKind, InputError> {
    match value.to_ascii_lowercase().as_str() {
        "call" | "c" => Ok(OptionKind::Call),
        "put" | "p" => Ok(OptionKind::Put),
        _ => Err(invalid("option_type", value)),
    }
}

fn parse_effect(value: &str) -> Result<PositionEffect, InputError> {
    match value.to_ascii_lowercase().as_str() {
        "open" | "o" | "to_open" => Ok(PositionEffect::Open),
        "close" | "c" | "to_close" => Ok(PositionEffect::Close),
        _ => Err(invalid("open_close", value)),
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_datetime(value: &str, field: &'static str) -> Result<DateTime<Utc>, InputError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| invalid(field, value))
}

/// Execution time: integer epoch milliseconds or RFC 3339.
fn parse_time(value: &str) -> Result<TimeMs, InputError> {
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(TimeMs::new(ms));
    }
    parse_datetime(value, "time").map(TimeMs::from_datetime)
}

impl TryFrom<ExecutionRecord> for Execution {
    type Error = InputError;

    fn try_from(record: ExecutionRecord) -> Result<Self, Self::Error> {
        let underlying = Symbol::new(required(&record.underlying, "underlying")?);
        let side = parse_side(required(&record.side, "side")?)?;

        let quantity_str = required(&record.quantity, "quantity")?;
        let quantity = quantity_str
            .parse::<i64>()
            .map_err(|_| invalid("quantity", quantity_str))?;
        let price = parse_decimal(required(&record.price, "price")?, "price")?;
        let time_ms = parse_time(required(&record.time, "time")?)?;

        let effect = present(&record.open_close).map(parse_effect).transpose()?;
        let order_id = match present(&record.order_id) {
            Some(s) => Some(s.parse::<u64>().map_err(|_| invalid("order_id", s))?),
            None => None,
        };
        let multiplier = match present(&record.multiplier) {
            Some(s) => Some(s.parse::<u32>().map_err(|_| invalid("multiplier", s))?),
            None => None,
        };

        let security_type = required(&record.security_type, "security_type")?;
        let instrument = match security_type.to_ascii_lowercase().as_str() {
            "option" | "opt" => Instrument::Option(OptionContract {
                kind: parse_option_kind(required(&record.option_type, "option_type")?)?,
                strike: parse_decimal(required(&record.strike, "strike")?, "strike")?,
                expiration: parse_datetime(
                    required(&record.expiration, "expiration")?,
                    "expiration",
                )?,
            }),
            "equity" | "stock" | "stk" => Instrument::Equity,
            other => return Err(invalid("security_type", other)),
        };

        let id = match present(&record.id) {
            Some(id) => ExecutionId::new(id),
            None => Execution::compute_execution_id(
                &underlying,
                &instrument,
                side,
                quantity,
                &price,
                order_id.filter(|id| *id != 0),
                time_ms,
            ),
        };

        let execution = match instrument {
            Instrument::Option(contract) => {
                Execution::option(id, underlying, contract, side, quantity, price, time_ms)?
            }
            Instrument::Equity => {
                Execution::equity(id, underlying, side, quantity, price, time_ms)?
            }
        };
        match multiplier {
            Some(0) => return Err(InputError::ZeroMultiplier),
            Some(m) if m > MAX_MULTIPLIER => return Err(out_of_range("multiplier", m)),
            _ => {}
        }

        Ok(execution
            .with_order_id(order_id)
            .with_effect(effect)
            .with_multiplier(multiplier.unwrap_or(0)))
    }
}
