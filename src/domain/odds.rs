//! Probability ⇄ decimal-odds conversion and payout arithmetic.
//!
//! Everything here is a pure projection for the multiplier presentation
//! mode and display surfaces; settlement math never consumes odds.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// Decimal odds for a probability in (0, 1): `1 / p`.
pub fn probability_to_odds(probability: Decimal) -> EngineResult<Decimal> {
    if probability <= Decimal::ZERO || probability >= Decimal::ONE {
        return Err(EngineError::Validation(
            "probability must be strictly between 0 and 1".to_string(),
        ));
    }
    Ok(Decimal::ONE / probability)
}

/// Implied probability for decimal odds above 1: `1 / odds`.
pub fn odds_to_probability(odds: Decimal) -> EngineResult<Decimal> {
    if odds <= Decimal::ONE {
        return Err(EngineError::Validation(
            "decimal odds must exceed 1".to_string(),
        ));
    }
    Ok(Decimal::ONE / odds)
}

/// Stake multiplied out: payout, profit, and return on investment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    /// Total returned on a win: `stake * odds`.
    pub payout: Decimal,
    /// Payout net of the stake.
    pub profit: Decimal,
    /// Profit as a percentage of the stake.
    pub roi_pct: Decimal,
}

/// Payout arithmetic for a stake at decimal odds.
pub fn payout(stake: Decimal, odds: Decimal) -> EngineResult<PayoutBreakdown> {
    if stake <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "stake must be positive".to_string(),
        ));
    }
    if odds <= Decimal::ZERO {
        return Err(EngineError::Validation(
            "odds must be positive".to_string(),
        ));
    }
    let total = stake * odds;
    let profit = total - stake;
    Ok(PayoutBreakdown {
        payout: total,
        profit,
        roi_pct: profit / stake * Decimal::ONE_HUNDRED,
    })
}

/// Shrink odds by the house margin: the implied probability grows by the
/// margin rate, capped at 0.99 so it never reaches 1.
pub fn apply_margin_to_odds(odds: Decimal, rate: Decimal) -> EngineResult<Decimal> {
    let implied = odds_to_probability(odds)?;
    let margined = (implied * (Decimal::ONE + rate)).min(dec!(0.99));
    Ok(Decimal::ONE / margined)
}

/// Supported odds display styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OddsStyle {
    Decimal,
    American,
    Fractional,
}

/// Render decimal odds in the requested style.
///
/// American: "+150" for 2.50, "-200" for 1.50. Fractional: profit over
/// stake reduced by GCD, "3/2" for 2.50. Odds at or below 1 carry no
/// profit and cannot be rendered in either derived style.
pub fn format_odds(odds: Decimal, style: OddsStyle) -> EngineResult<String> {
    match style {
        OddsStyle::Decimal => Ok(format!("{odds:.2}")),
        OddsStyle::American => {
            if odds <= Decimal::ONE {
                return Err(EngineError::Validation(
                    "decimal odds must exceed 1".to_string(),
                ));
            }
            let profit = odds - Decimal::ONE;
            if odds >= Decimal::TWO {
                let plus = (profit * Decimal::ONE_HUNDRED).round();
                Ok(format!("+{plus}"))
            } else {
                let minus = (Decimal::ONE_HUNDRED / profit).round();
                Ok(format!("-{minus}"))
            }
        }
        OddsStyle::Fractional => {
            if odds < Decimal::ONE {
                return Err(EngineError::Validation(
                    "decimal odds must be at least 1".to_string(),
                ));
            }
            let numerator = ((odds - Decimal::ONE) * Decimal::ONE_HUNDRED)
                .round()
                .to_i64()
                .ok_or(EngineError::Validation("odds too large to format".to_string()))?;
            if numerator == 0 {
                return Ok("0/1".to_string());
            }
            let divisor = gcd(numerator, 100);
            Ok(format!("{}/{}", numerator / divisor, 100 / divisor))
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Coarse bucket for an odds value. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OddsCategory {
    LongShot,
    Underdog,
    Moderate,
    Favorite,
    HeavyFavorite,
}

impl std::fmt::Display for OddsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongShot => write!(f, "long shot"),
            Self::Underdog => write!(f, "underdog"),
            Self::Moderate => write!(f, "moderate"),
            Self::Favorite => write!(f, "favorite"),
            Self::HeavyFavorite => write!(f, "heavy favorite"),
        }
    }
}

/// Bucket decimal odds: ≥10 long shot, ≥5 underdog, ≥2.5 moderate,
/// ≥1.5 favorite, below that heavy favorite.
pub fn category(odds: Decimal) -> OddsCategory {
    if odds >= dec!(10) {
        OddsCategory::LongShot
    } else if odds >= dec!(5) {
        OddsCategory::Underdog
    } else if odds >= dec!(2.5) {
        OddsCategory::Moderate
    } else if odds >= dec!(1.5) {
        OddsCategory::Favorite
    } else {
        OddsCategory::HeavyFavorite
    }
}

/// Volume-implied odds pair: each side pays total over its own volume,
/// i.e. 1 plus the opposite side's share. Both 2.0 when nothing has
/// been staked (or one side has no volume to price against).
pub fn odds_from_volume(yes_volume: Decimal, no_volume: Decimal) -> (Decimal, Decimal) {
    let total = yes_volume + no_volume;
    if total.is_zero() || yes_volume.is_zero() || no_volume.is_zero() {
        return (Decimal::TWO, Decimal::TWO);
    }
    (total / yes_volume, total / no_volume)
}
