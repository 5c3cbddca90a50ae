//! Constant Product Market Maker (CPMM) pricing engine.
//!
//! Pure functions over pool reserves: marginal prices, tokens-out for a
//! net stake, inverse cost, slippage, price impact, a full trade
//! simulation, and the product-invariant check. No side effects; the
//! settlement orchestrator is the only caller that turns a simulation
//! into committed state.
//!
//! A bet on one outcome adds the net stake to the opposite reserve and
//! pays tokens out of the outcome's own reserve, holding the product of
//! both reserves constant.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};
use super::market::{Outcome, Pool};

/// Relative tolerance for the constant-product check.
///
/// The tolerance is relative, not absolute: token counts scale with pool
/// size, so a fixed absolute bound would be meaningless for large pools.
pub const INVARIANT_TOLERANCE: Decimal = dec!(0.0001);

/// Marginal price of an outcome, in (0, 1).
///
/// `yes = no_reserve / total`, `no = yes_reserve / total`. The scarcer
/// an outcome's reserve, the higher its price.
pub fn price(outcome: Outcome, pool: &Pool) -> EngineResult<Decimal> {
    let total = pool.total();
    if total.is_zero() {
        return Err(EngineError::DegeneratePool);
    }
    Ok(pool.reserve(outcome.opposite()) / total)
}

/// Outcome tokens received for a net stake against one reserve pair.
///
/// `new_input = input + bet_net; new_output = k / new_input;
/// tokens_out = output - new_output`.
pub fn tokens_out(
    bet_net: Decimal,
    input_reserve: Decimal,
    output_reserve: Decimal,
    k: Decimal,
) -> EngineResult<Decimal> {
    if bet_net <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "bet amount must be positive".to_string(),
        ));
    }
    let new_input = input_reserve + bet_net;
    if new_input <= Decimal::ZERO {
        return Err(EngineError::DegeneratePool);
    }
    let new_output = k / new_input;
    let out = output_reserve - new_output;
    if out >= output_reserve || out <= Decimal::ZERO {
        return Err(EngineError::PoolExhausted);
    }
    Ok(out)
}

/// Net stake required to receive a desired number of outcome tokens.
///
/// Inverse of [`tokens_out`]: `new_output = output - tokens;
/// new_input = k / new_output; cost = new_input - input`.
pub fn cost_for_tokens(
    tokens_desired: Decimal,
    input_reserve: Decimal,
    output_reserve: Decimal,
    k: Decimal,
) -> EngineResult<Decimal> {
    if tokens_desired <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "token amount must be positive".to_string(),
        ));
    }
    if tokens_desired >= output_reserve {
        return Err(EngineError::PoolExhausted);
    }
    let new_output = output_reserve - tokens_desired;
    let new_input = k / new_output;
    Ok(new_input - input_reserve)
}

/// Average probability implied by a trade: `bet_net / (bet_net + tokens_out)`.
///
/// Distinct from the marginal price; this captures the slippage the
/// trade itself caused. The formula mixes a currency amount with a token
/// count and is kept verbatim as a modeling approximation, not a true
/// probability.
pub fn effective_price(bet_net: Decimal, tokens_out: Decimal) -> EngineResult<Decimal> {
    let denom = bet_net + tokens_out;
    if denom.is_zero() {
        return Err(EngineError::DivideByZero("effective price"));
    }
    Ok(bet_net / denom)
}

/// Relative divergence between the pre-trade marginal price and the
/// trade's realized average price. Zero when there was no price to
/// diverge from.
pub fn slippage(price_before: Decimal, effective: Decimal) -> Decimal {
    if price_before.is_zero() {
        return Decimal::ZERO;
    }
    ((effective - price_before) / price_before).abs()
}

/// Relative divergence between pre-trade and post-trade marginal price.
pub fn price_impact(price_before: Decimal, price_after: Decimal) -> Decimal {
    if price_before.is_zero() {
        return Decimal::ZERO;
    }
    ((price_after - price_before) / price_before).abs()
}

/// Everything a trade would do to the pool, computed without mutation.
///
/// Used both for quotes and as the pure core of actual settlement. The
/// returned pool keeps the pre-trade `invariant_k` so the caller can run
/// the post-trade invariant check before deciding to recompute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Outcome tokens the trade receives.
    pub tokens_out: Decimal,
    /// Candidate post-trade pool (invariant_k untouched).
    pub new_pool: Pool,
    /// Marginal price of the bet outcome before the trade.
    pub price_before: Decimal,
    /// Marginal price of the bet outcome after the trade.
    pub price_after: Decimal,
    /// Average price realized by the trade.
    pub effective_price: Decimal,
    /// Relative divergence of effective price from the pre-trade price.
    pub slippage: Decimal,
    /// Relative divergence of post-trade from pre-trade marginal price.
    pub price_impact: Decimal,
}

/// Simulate a net-stake bet on an outcome against the given pool.
pub fn simulate(outcome: Outcome, bet_net: Decimal, pool: &Pool) -> EngineResult<Simulation> {
    let price_before = price(outcome, pool)?;

    let input_reserve = pool.reserve(outcome.opposite());
    let output_reserve = pool.reserve(outcome);
    let out = tokens_out(bet_net, input_reserve, output_reserve, pool.invariant_k)?;

    let new_pool = match outcome {
        Outcome::Yes => Pool {
            yes_reserve: pool.yes_reserve - out,
            no_reserve: pool.no_reserve + bet_net,
            invariant_k: pool.invariant_k,
        },
        Outcome::No => Pool {
            yes_reserve: pool.yes_reserve + bet_net,
            no_reserve: pool.no_reserve - out,
            invariant_k: pool.invariant_k,
        },
    };

    let price_after = price(outcome, &new_pool)?;
    let effective = effective_price(bet_net, out)?;

    Ok(Simulation {
        tokens_out: out,
        new_pool,
        price_before,
        price_after,
        effective_price: effective,
        slippage: slippage(price_before, effective),
        price_impact: price_impact(price_before, price_after),
    })
}

/// Check the pool's reserves still multiply to its stored invariant,
/// within [`INVARIANT_TOLERANCE`] relative difference.
pub fn validate_invariant(pool: &Pool) -> EngineResult<()> {
    if pool.invariant_k <= Decimal::ZERO {
        return Err(EngineError::DegeneratePool);
    }
    let drift = (pool.product() - pool.invariant_k).abs() / pool.invariant_k;
    if drift > INVARIANT_TOLERANCE {
        return Err(EngineError::InvariantViolation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric_pool() -> Pool {
        Pool {
            yes_reserve: dec!(1000),
            no_reserve: dec!(1000),
            invariant_k: dec!(1000000),
        }
    }

    #[test]
    fn test_symmetric_pool_prices_at_half() {
        let pool = symmetric_pool();
        assert_eq!(price(Outcome::Yes, &pool).unwrap(), dec!(0.5));
        assert_eq!(price(Outcome::No, &pool).unwrap(), dec!(0.5));
    }

    #[test]
    fn test_prices_sum_to_one() {
        let pool = Pool {
            yes_reserve: dec!(600),
            no_reserve: dec!(1400),
            invariant_k: dec!(840000),
        };
        let sum = price(Outcome::Yes, &pool).unwrap() + price(Outcome::No, &pool).unwrap();
        assert!((sum - Decimal::ONE).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_empty_pool_is_degenerate() {
        let pool = Pool {
            yes_reserve: Decimal::ZERO,
            no_reserve: Decimal::ZERO,
            invariant_k: Decimal::ZERO,
        };
        assert_eq!(
            price(Outcome::Yes, &pool).unwrap_err(),
            EngineError::DegeneratePool
        );
    }

    #[test]
    fn test_tokens_out_scenario() {
        // Net 98 into a 1000/1000 pool: 1000 - 1000000/1098 ≈ 89.2532
        let out = tokens_out(dec!(98), dec!(1000), dec!(1000), dec!(1000000)).unwrap();
        assert!((out - dec!(89.2532)).abs() < dec!(0.0001), "got {out}");
    }

    #[test]
    fn test_tokens_out_rejects_non_positive() {
        let err = tokens_out(dec!(0), dec!(1000), dec!(1000), dec!(1000000)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn test_tokens_out_zero_product_exhausts() {
        // A corrupted zero product would hand out the entire reserve.
        let err = tokens_out(dec!(98), dec!(1000), dec!(1000), Decimal::ZERO).unwrap_err();
        assert_eq!(err, EngineError::PoolExhausted);
    }

    #[test]
    fn test_cost_for_tokens_inverts_tokens_out() {
        let out = tokens_out(dec!(98), dec!(1000), dec!(1000), dec!(1000000)).unwrap();
        let cost = cost_for_tokens(out, dec!(1000), dec!(1000), dec!(1000000)).unwrap();
        assert!((cost - dec!(98)).abs() < dec!(0.0001), "got {cost}");
    }

    #[test]
    fn test_cost_for_entire_reserve_exhausts() {
        let err = cost_for_tokens(dec!(1000), dec!(500), dec!(1000), dec!(500000)).unwrap_err();
        assert_eq!(err, EngineError::PoolExhausted);
    }

    #[test]
    fn test_slippage_zero_base_price() {
        assert_eq!(slippage(Decimal::ZERO, dec!(0.5)), Decimal::ZERO);
    }

    #[test]
    fn test_simulate_moves_price_toward_outcome() {
        let pool = symmetric_pool();
        let sim = simulate(Outcome::Yes, dec!(98), &pool).unwrap();
        assert!(sim.price_after > sim.price_before);
        assert!(sim.effective_price > sim.price_before);
        assert!(sim.slippage > Decimal::ZERO);
        assert!(sim.price_impact > sim.slippage);
        // Reserves move in opposite directions
        assert_eq!(sim.new_pool.no_reserve, dec!(1098));
        assert!(sim.new_pool.yes_reserve < dec!(1000));
    }

    #[test]
    fn test_simulate_preserves_product() {
        let pool = symmetric_pool();
        let sim = simulate(Outcome::No, dec!(50), &pool).unwrap();
        validate_invariant(&sim.new_pool).unwrap();
    }

    #[test]
    fn test_validate_invariant_tolerance() {
        let ok = Pool {
            yes_reserve: dec!(1000.05),
            no_reserve: dec!(1000),
            invariant_k: dec!(1000000),
        };
        validate_invariant(&ok).unwrap();

        let bad = Pool {
            yes_reserve: dec!(1010),
            no_reserve: dec!(1000),
            invariant_k: dec!(1000000),
        };
        assert_eq!(
            validate_invariant(&bad).unwrap_err(),
            EngineError::InvariantViolation
        );
    }
}
