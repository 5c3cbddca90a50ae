//! House margin application.
//!
//! A single fee rate, fixed for the process lifetime, applied to gross
//! bet amounts before pricing and to displayed prices as a bid/ask
//! spread. The spread is display-only; settlement math never uses it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{EngineError, EngineResult};

/// Lowest configurable fee rate (0.1%).
pub const MIN_FEE_RATE: Decimal = dec!(0.001);
/// Highest configurable fee rate (10%).
pub const MAX_FEE_RATE: Decimal = dec!(0.10);
/// Rate substituted for out-of-range configuration (2%).
pub const DEFAULT_FEE_RATE: Decimal = dec!(0.02);

/// Gross amount split into the part that prices and the part the house
/// keeps. `net + fee == gross` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub net: Decimal,
    pub fee: Decimal,
}

/// Displayed bid/ask pair around a base price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSpread {
    pub buy_price: Decimal,
    pub sell_price: Decimal,
}

/// Process-wide immutable fee configuration.
///
/// Constructed once at startup from config and passed by reference into
/// the settlement orchestrator. No hidden global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    rate: Decimal,
}

impl FeeSchedule {
    /// Build a schedule from a configured rate.
    ///
    /// Rates outside [`MIN_FEE_RATE`, `MAX_FEE_RATE`] are replaced by
    /// [`DEFAULT_FEE_RATE`] with a startup warning rather than failing
    /// the process.
    pub fn from_rate(rate: Decimal) -> Self {
        if rate < MIN_FEE_RATE || rate > MAX_FEE_RATE {
            warn!(
                configured = %rate,
                fallback = %DEFAULT_FEE_RATE,
                "Configured fee rate out of range, using default"
            );
            return Self {
                rate: DEFAULT_FEE_RATE,
            };
        }
        Self { rate }
    }

    /// The active fee rate.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Split a gross stake into net amount and house fee.
    ///
    /// The net is derived by subtraction so the two parts always sum
    /// back to the gross exactly.
    pub fn apply_fee(&self, gross: Decimal) -> EngineResult<FeeBreakdown> {
        if gross <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(
                "bet amount must be positive".to_string(),
            ));
        }
        let fee = gross * self.rate;
        Ok(FeeBreakdown {
            net: gross - fee,
            fee,
        })
    }

    /// Bid/ask pair around a base price, half the fee rate each side.
    /// Display only.
    pub fn price_spread(&self, base: Decimal) -> PriceSpread {
        let half = self.rate / Decimal::TWO;
        PriceSpread {
            buy_price: (base * (Decimal::ONE + half)).min(Decimal::ONE),
            sell_price: (base * (Decimal::ONE - half)).max(Decimal::ZERO),
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            rate: DEFAULT_FEE_RATE,
        }
    }
}

/// Price at which a bet breaks even: stake over tokens received.
pub fn break_even_price(bet_amount: Decimal, tokens_received: Decimal) -> EngineResult<Decimal> {
    if tokens_received.is_zero() {
        return Err(EngineError::DivideByZero("break-even price"));
    }
    Ok(bet_amount / tokens_received)
}
