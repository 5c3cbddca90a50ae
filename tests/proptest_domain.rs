//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the pricing engine, margin module,
//! and odds converter maintain mathematical invariants across random
//! inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

use cpmm_bet_engine::domain::margin::FeeSchedule;
use cpmm_bet_engine::domain::market::{Outcome, Pool};
use cpmm_bet_engine::domain::{liquidity, odds, pricing};

fn pool_from(yes: f64, no: f64) -> Pool {
    let yes_reserve = Decimal::from_f64(yes).unwrap();
    let no_reserve = Decimal::from_f64(no).unwrap();
    Pool {
        yes_reserve,
        no_reserve,
        invariant_k: yes_reserve * no_reserve,
    }
}

// ── Pricing Engine Properties ───────────────────────────────

proptest! {
    /// Prices stay in (0, 1) and complement to exactly 1 for any
    /// positive reserve pair.
    #[test]
    fn prices_bounded_and_complementary(
        yes in 100.0f64..100_000.0,
        no in 100.0f64..100_000.0,
    ) {
        let pool = pool_from(yes, no);
        let p_yes = pricing::price(Outcome::Yes, &pool).unwrap();
        let p_no = pricing::price(Outcome::No, &pool).unwrap();

        prop_assert!(p_yes > Decimal::ZERO && p_yes < Decimal::ONE);
        prop_assert!(p_no > Decimal::ZERO && p_no < Decimal::ONE);
        let sum_drift = (p_yes + p_no - Decimal::ONE).abs();
        prop_assert!(
            sum_drift < dec!(0.000000001),
            "Prices must sum to 1, drift {sum_drift}"
        );
    }

    /// A larger net bet strictly buys more tokens and suffers strictly
    /// more slippage, for fixed reserves and product.
    #[test]
    fn tokens_out_and_slippage_monotonic_in_bet(
        bet in 1.0f64..400.0,
        delta in 1.0f64..400.0,
    ) {
        let pool = pool_from(1000.0, 1000.0);
        let small = Decimal::from_f64(bet).unwrap();
        let large = small + Decimal::from_f64(delta).unwrap();

        let sim_small = pricing::simulate(Outcome::Yes, small, &pool).unwrap();
        let sim_large = pricing::simulate(Outcome::Yes, large, &pool).unwrap();

        prop_assert!(
            sim_large.tokens_out > sim_small.tokens_out,
            "tokens_out must grow with bet size"
        );
        prop_assert!(
            sim_large.slippage > sim_small.slippage,
            "slippage must grow with bet size"
        );
    }

    /// Simulation preserves the constant product within tolerance, and
    /// tokens out never reach the output reserve.
    #[test]
    fn simulation_preserves_product(
        yes in 200.0f64..50_000.0,
        no in 200.0f64..50_000.0,
        bet in 1.0f64..5_000.0,
    ) {
        let pool = pool_from(yes, no);
        let net = Decimal::from_f64(bet).unwrap();
        let sim = pricing::simulate(Outcome::No, net, &pool).unwrap();

        pricing::validate_invariant(&sim.new_pool).unwrap();
        prop_assert!(sim.tokens_out < pool.no_reserve);
        prop_assert!(sim.new_pool.yes_reserve > Decimal::ZERO);
        prop_assert!(sim.new_pool.no_reserve > Decimal::ZERO);
    }

    /// The invariant holds after every commit across a whole random bet
    /// sequence, with the product re-anchored after each step the way
    /// the settlement orchestrator does.
    #[test]
    fn invariant_conserved_across_bet_sequences(
        size in 100.0f64..10_000.0,
        bets in prop::collection::vec((any::<bool>(), 1.0f64..200.0), 1..40),
    ) {
        let initial = Decimal::from_f64(size).unwrap();
        let mut pool = liquidity::init_symmetric(initial).unwrap();

        for (on_yes, amount) in bets {
            let outcome = if on_yes { Outcome::Yes } else { Outcome::No };
            let net = Decimal::from_f64(amount).unwrap();
            let sim = pricing::simulate(outcome, net, &pool).unwrap();

            pricing::validate_invariant(&sim.new_pool).unwrap();

            pool = sim.new_pool;
            pool.invariant_k = pool.product();
        }
    }

    /// Asking for the whole output reserve (or more) always fails with
    /// pool exhaustion, never a negative or saturating cost.
    #[test]
    fn cost_for_entire_reserve_always_exhausts(
        yes in 100.0f64..10_000.0,
        no in 100.0f64..10_000.0,
        excess in 0.0f64..500.0,
    ) {
        let pool = pool_from(yes, no);
        let desired = pool.yes_reserve + Decimal::from_f64(excess).unwrap();
        let err = pricing::cost_for_tokens(
            desired,
            pool.no_reserve,
            pool.yes_reserve,
            pool.invariant_k,
        )
        .unwrap_err();
        prop_assert_eq!(err, cpmm_bet_engine::domain::EngineError::PoolExhausted);
    }
}

// ── Margin Module Properties ────────────────────────────────

proptest! {
    /// Fee and net always recompose the gross amount exactly.
    #[test]
    fn fee_conservation_is_exact(
        cents in 1i64..100_000_000,
        rate_bps in 10u32..1000,
    ) {
        let gross = Decimal::new(cents, 2);
        let rate = Decimal::new(i64::from(rate_bps), 4);
        let fees = FeeSchedule::from_rate(rate);

        let split = fees.apply_fee(gross).unwrap();
        prop_assert_eq!(split.net + split.fee, gross);
        prop_assert!(split.fee > Decimal::ZERO);
        prop_assert!(split.net < gross);
    }

    /// The displayed spread always brackets the base price inside [0, 1].
    #[test]
    fn price_spread_brackets_base(
        base_bps in 1u32..9999,
        rate_bps in 10u32..1000,
    ) {
        let base = Decimal::new(i64::from(base_bps), 4);
        let rate = Decimal::new(i64::from(rate_bps), 4);
        let fees = FeeSchedule::from_rate(rate);

        let spread = fees.price_spread(base);
        prop_assert!(spread.sell_price <= base);
        prop_assert!(spread.buy_price >= base);
        prop_assert!(spread.sell_price >= Decimal::ZERO);
        prop_assert!(spread.buy_price <= Decimal::ONE);
    }
}

// ── Odds Converter Properties ───────────────────────────────

proptest! {
    /// probability → odds → probability is the identity within floating
    /// tolerance.
    #[test]
    fn odds_round_trip(p in 0.01f64..0.99) {
        let prob = Decimal::from_f64(p).unwrap();
        let decimal_odds = odds::probability_to_odds(prob).unwrap();
        let back = odds::odds_to_probability(decimal_odds).unwrap();
        prop_assert!(
            (back - prob).abs() < dec!(0.000000001),
            "Round trip drifted: {prob} -> {back}"
        );
    }

    /// Margined odds always imply a probability strictly below 1.
    #[test]
    fn margin_never_pushes_probability_to_one(
        p in 0.01f64..0.99,
        rate_bps in 10u32..1000,
    ) {
        let prob = Decimal::from_f64(p).unwrap();
        let rate = Decimal::new(i64::from(rate_bps), 4);

        let raw = odds::probability_to_odds(prob).unwrap();
        let margined = odds::apply_margin_to_odds(raw, rate).unwrap();
        let implied = odds::odds_to_probability(margined).unwrap();

        prop_assert!(implied < Decimal::ONE);
        prop_assert!(implied <= dec!(0.99) + dec!(0.000000001));
        prop_assert!(margined <= raw, "Margin must never lengthen odds");
    }

    /// Payout arithmetic recomposes: profit + stake == payout.
    #[test]
    fn payout_recomposes(
        stake_cents in 100i64..10_000_000,
        odds_hundredths in 101i64..5000,
    ) {
        let stake = Decimal::new(stake_cents, 2);
        let decimal_odds = Decimal::new(odds_hundredths, 2);

        let breakdown = odds::payout(stake, decimal_odds).unwrap();
        prop_assert_eq!(breakdown.profit + stake, breakdown.payout);
    }
}
