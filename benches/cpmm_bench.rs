//! CPMM Pricing Benchmarks — Hot-Path Performance Validation
//!
//! Benchmarks the core domain functions that run on every quote and
//! settlement. All of them are pure Decimal arithmetic.
//!
//! Run with: cargo bench --bench cpmm_bench

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use cpmm_bet_engine::domain::margin::FeeSchedule;
use cpmm_bet_engine::domain::market::{Outcome, Pool};
use cpmm_bet_engine::domain::{liquidity, odds, pricing};

fn bench_pool() -> Pool {
    Pool {
        yes_reserve: dec!(1000),
        no_reserve: dec!(1000),
        invariant_k: dec!(1000000),
    }
}

/// Benchmark marginal price computation.
fn bench_price(c: &mut Criterion) {
    let pool = bench_pool();

    c.bench_function("cpmm_price", |b| {
        b.iter(|| {
            let _price = pricing::price(black_box(Outcome::Yes), black_box(&pool));
        });
    });
}

/// Benchmark a full trade simulation (the settlement hot path).
fn bench_simulate(c: &mut Criterion) {
    let pool = bench_pool();

    c.bench_function("cpmm_simulate_bet", |b| {
        b.iter(|| {
            let _sim = pricing::simulate(
                black_box(Outcome::Yes),
                black_box(dec!(98)),
                black_box(&pool),
            );
        });
    });
}

/// Benchmark the invariant check run twice per settlement.
fn bench_validate_invariant(c: &mut Criterion) {
    let pool = bench_pool();

    c.bench_function("cpmm_validate_invariant", |b| {
        b.iter(|| {
            let _ok = pricing::validate_invariant(black_box(&pool));
        });
    });
}

/// Benchmark fee application.
fn bench_apply_fee(c: &mut Criterion) {
    let fees = FeeSchedule::from_rate(dec!(0.02));

    c.bench_function("margin_apply_fee", |b| {
        b.iter(|| {
            let _split = fees.apply_fee(black_box(dec!(100)));
        });
    });
}

/// Benchmark asymmetric pool initialization.
fn bench_init_asymmetric(c: &mut Criterion) {
    c.bench_function("liquidity_init_asymmetric", |b| {
        b.iter(|| {
            let _pool = liquidity::init_asymmetric(black_box(dec!(2000)), black_box(dec!(0.70)));
        });
    });
}

/// Benchmark odds conversion plus margin for multiplier mode.
fn bench_odds_projection(c: &mut Criterion) {
    c.bench_function("odds_margined_projection", |b| {
        b.iter(|| {
            let raw = odds::probability_to_odds(black_box(dec!(0.52))).unwrap();
            let _margined = odds::apply_margin_to_odds(raw, black_box(dec!(0.02)));
        });
    });
}

criterion_group!(
    benches,
    bench_price,
    bench_simulate,
    bench_validate_invariant,
    bench_apply_fee,
    bench_init_asymmetric,
    bench_odds_projection,
);
criterion_main!(benches);
