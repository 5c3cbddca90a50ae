//! Settlement Use Case - Atomic Bet Execution
//!
//! Drives a bet request through the settlement state machine:
//!
//! 1. Validate: request shape, market state, requester balance
//! 2. Price: apply the house fee, check the pre-trade invariant
//! 3. Simulate: pure CPMM trade simulation, check the post-trade invariant
//! 4. Commit: hand the six-effect batch to the market store atomically
//!
//! Any failure short-circuits to a rejected terminal state with no
//! partial effect. Lost optimistic-concurrency races are retried against
//! fresh state up to a fixed bound. A commit timeout with unknown
//! outcome is reconciled by reading the bet record back before the
//! request is reported as failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::margin::{self, FeeSchedule};
use crate::domain::market::{
  BetMode, BetRecord, BetRequest, LedgerEntry, LedgerKind, Market, MarketStatus, Outcome,
  Position, PriceHistoryPoint,
};
use crate::domain::odds;
use crate::domain::pricing::{self, Simulation};
use crate::ports::account_ledger::AccountLedger;
use crate::ports::market_store::{BalanceDebit, MarketStore, SettlementBatch};

/// Default bound on internal retries after a lost market-version race.
const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Default per-commit persistence timeout.
const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Phases a settlement request moves through. Terminal states are
/// `Committed` and (implicitly, via the returned error) rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPhase {
  Validated,
  Priced,
  Simulated,
  Committed,
}

/// Odds-mode projection of a settled or quoted bet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierQuote {
  /// Margined decimal odds implied by the trade's effective price.
  pub odds: Decimal,
  /// Total returned on a win for the gross stake.
  pub payout: Decimal,
  /// Payout net of the stake.
  pub profit: Decimal,
  /// Profit as a percentage of the stake.
  pub roi_pct: Decimal,
}

/// Result of a committed settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSummary {
  /// The immutable bet record as committed.
  pub bet: BetRecord,
  /// Cached YES price after the trade.
  pub yes_price: Decimal,
  /// Cached NO price after the trade.
  pub no_price: Decimal,
  /// Odds/payout projection, present in multiplier mode.
  pub multiplier: Option<MultiplierQuote>,
}

/// Result of a quote call. Never touches persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
  /// Outcome tokens the bet would receive.
  pub tokens_out: Decimal,
  /// Marginal price before the trade.
  pub price_before: Decimal,
  /// Marginal price after the trade.
  pub price_after: Decimal,
  /// Average price the trade would realize.
  pub effective_price: Decimal,
  /// Relative divergence of effective from pre-trade price.
  pub slippage: Decimal,
  /// Relative divergence of post-trade from pre-trade price.
  pub price_impact: Decimal,
  /// House fee retained from the gross stake.
  pub fee: Decimal,
  /// Net amount that would enter the pool.
  pub net_amount: Decimal,
  /// Price at which the bet breaks even.
  pub break_even_price: Decimal,
  /// Odds/payout projection, present in multiplier mode.
  pub multiplier: Option<MultiplierQuote>,
}

/// Settlement orchestrator over the market store and account ledger.
///
/// Owns no market state: every attempt re-reads a fresh snapshot and the
/// store's version check decides whether the commit applies.
pub struct SettlementEngine<S: MarketStore, L: AccountLedger> {
  store: Arc<S>,
  ledger: Arc<L>,
  /// Immutable fee configuration, fixed at startup.
  fees: FeeSchedule,
  /// Bound on version-conflict retries before surfacing the conflict.
  max_commit_attempts: u32,
  /// Timeout applied to the persistence commit call.
  commit_timeout: Duration,
}

impl<S: MarketStore, L: AccountLedger> SettlementEngine<S, L> {
  /// Create an engine with default retry/timeout policy.
  pub fn new(store: Arc<S>, ledger: Arc<L>, fees: FeeSchedule) -> Self {
    Self {
      store,
      ledger,
      fees,
      max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
      commit_timeout: DEFAULT_COMMIT_TIMEOUT,
    }
  }

  /// Create an engine with explicit retry bound and commit timeout.
  pub fn with_policy(
    store: Arc<S>,
    ledger: Arc<L>,
    fees: FeeSchedule,
    max_commit_attempts: u32,
    commit_timeout: Duration,
  ) -> Self {
    Self {
      store,
      ledger,
      fees,
      max_commit_attempts: max_commit_attempts.max(1),
      commit_timeout,
    }
  }

  /// The fee schedule this engine settles with.
  pub fn fees(&self) -> &FeeSchedule {
    &self.fees
  }

  /// Execute a bet to completion or rejection.
  ///
  /// Replaying a request id that already committed returns the stored
  /// settlement instead of creating a second record or debit.
  #[instrument(skip(self, request), fields(
    request_id = %request.request_id,
    market_id = %request.market_id,
    outcome = %request.outcome,
  ))]
  pub async fn settle(&self, request: &BetRequest) -> EngineResult<SettlementSummary> {
    validate_request(request)?;

    if let Some(existing) = self.store.fetch_bet(request.request_id).await? {
      info!("Request already settled, returning stored record");
      return self.summary_from_record(existing, request.mode);
    }

    let mut attempt = 0;
    loop {
      attempt += 1;
      match self.try_settle(request).await {
        Ok(summary) => return Ok(summary),
        Err(EngineError::ConcurrencyConflict) if attempt < self.max_commit_attempts => {
          warn!(attempt, "Market version changed under us, repricing");
        }
        Err(EngineError::PersistenceFailure {
          message,
          indeterminate: true,
        }) => {
          return self.reconcile_indeterminate(request, message).await;
        }
        Err(e) => {
          debug!(kind = e.kind(), "Settlement rejected");
          return Err(e);
        }
      }
    }
  }

  /// Price a bet without committing anything.
  ///
  /// Runs the same validate/price/simulate phases as settlement (minus
  /// the balance check, since no funds move) and returns the simulation
  /// output only.
  #[instrument(skip(self, request), fields(
    market_id = %request.market_id,
    outcome = %request.outcome,
  ))]
  pub async fn quote(&self, request: &BetRequest) -> EngineResult<Quote> {
    validate_request(request)?;

    let market = self.store.fetch(&request.market_id).await?;
    validate_market(&market)?;

    let split = self.fees.apply_fee(request.amount)?;
    pricing::validate_invariant(&market.pool)?;

    let sim = pricing::simulate(request.outcome, split.net, &market.pool)?;
    pricing::validate_invariant(&sim.new_pool)?;

    let multiplier = match request.mode {
      BetMode::Shares => None,
      BetMode::Multiplier => {
        Some(self.multiplier_projection(request.amount, sim.effective_price)?)
      }
    };

    Ok(Quote {
      tokens_out: sim.tokens_out,
      price_before: sim.price_before,
      price_after: sim.price_after,
      effective_price: sim.effective_price,
      slippage: sim.slippage,
      price_impact: sim.price_impact,
      fee: split.fee,
      net_amount: split.net,
      break_even_price: margin::break_even_price(request.amount, sim.tokens_out)?,
      multiplier,
    })
  }

  /// One full validate → price → simulate → commit pass against a fresh
  /// market snapshot.
  async fn try_settle(&self, request: &BetRequest) -> EngineResult<SettlementSummary> {
    // ── Validate ────────────────────────────────────────────
    let market = self.store.fetch(&request.market_id).await?;
    validate_market(&market)?;

    let balance = self.ledger.balance(&request.user_id).await?;
    if balance < request.amount {
      return Err(EngineError::InsufficientBalance);
    }
    debug!(phase = ?SettlementPhase::Validated);

    // ── Price ───────────────────────────────────────────────
    let split = self.fees.apply_fee(request.amount)?;
    pricing::validate_invariant(&market.pool)?;
    debug!(phase = ?SettlementPhase::Priced);

    // ── Simulate ────────────────────────────────────────────
    let sim = pricing::simulate(request.outcome, split.net, &market.pool)?;
    pricing::validate_invariant(&sim.new_pool)?;
    debug!(phase = ?SettlementPhase::Simulated);

    // ── Commit ──────────────────────────────────────────────
    let batch = self
      .build_batch(request, &market, &sim, split.fee, split.net)
      .await?;

    match tokio::time::timeout(self.commit_timeout, self.store.commit_settlement(&batch)).await
    {
      Ok(Ok(())) => {}
      Ok(Err(e)) => return Err(e),
      Err(_) => {
        return Err(EngineError::PersistenceFailure {
          message: "commit timed out".to_string(),
          indeterminate: true,
        });
      }
    }
    debug!(phase = ?SettlementPhase::Committed);

    info!(
      tokens_out = %batch.bet.tokens_out,
      effective_price = %batch.bet.effective_price,
      slippage = %batch.bet.slippage,
      fee = %batch.bet.fee,
      "Bet settled"
    );

    let multiplier = match request.mode {
      BetMode::Shares => None,
      BetMode::Multiplier => {
        Some(self.multiplier_projection(request.amount, batch.bet.effective_price)?)
      }
    };

    Ok(SettlementSummary {
      bet: batch.bet,
      yes_price: batch.market.yes_price,
      no_price: batch.market.no_price,
      multiplier,
    })
  }

  /// Assemble the six-effect batch from a simulation.
  async fn build_batch(
    &self,
    request: &BetRequest,
    market: &Market,
    sim: &Simulation,
    fee: Decimal,
    net: Decimal,
  ) -> EngineResult<SettlementBatch> {
    let now = Utc::now();

    // The invariant was checked against the pre-trade product above;
    // only now is the stored k refreshed from the committed reserves.
    let mut new_pool = sim.new_pool.clone();
    new_pool.invariant_k = new_pool.product();

    let yes_price = pricing::price(Outcome::Yes, &new_pool)?;
    let no_price = pricing::price(Outcome::No, &new_pool)?;
    let total_volume = market.total_volume + request.amount;

    let bet = BetRecord {
      id: request.request_id,
      market_id: request.market_id.clone(),
      user_id: request.user_id.clone(),
      outcome: request.outcome,
      gross_amount: request.amount,
      fee,
      net_amount: net,
      price_before: sim.price_before,
      effective_price: sim.effective_price,
      tokens_out: sim.tokens_out,
      slippage: sim.slippage,
      pool_before: market.pool.clone(),
      pool_after: new_pool.clone(),
      placed_at: now,
    };

    let outcome_price = match request.outcome {
      Outcome::Yes => yes_price,
      Outcome::No => no_price,
    };
    let position = match self
      .store
      .fetch_position(&request.user_id, &request.market_id, request.outcome)
      .await?
    {
      Some(mut existing) => {
        existing.apply_fill(sim.tokens_out, request.amount, outcome_price, now);
        existing
      }
      None => Position::open(
        request.user_id.clone(),
        request.market_id.clone(),
        request.outcome,
        sim.tokens_out,
        request.amount,
        outcome_price,
        now,
      ),
    };

    let updated_market = Market {
      id: market.id.clone(),
      status: market.status,
      pool_initialized: market.pool_initialized,
      pool: new_pool.clone(),
      total_volume,
      yes_price,
      no_price,
      version: market.version + 1,
    };

    Ok(SettlementBatch {
      expected_version: market.version,
      market: updated_market,
      bet,
      debit: BalanceDebit {
        user_id: request.user_id.clone(),
        amount: request.amount,
      },
      position,
      ledger: LedgerEntry {
        id: Uuid::new_v4(),
        user_id: request.user_id.clone(),
        kind: LedgerKind::BetDebit,
        amount: request.amount,
        bet_id: request.request_id,
        created_at: now,
      },
      price_point: PriceHistoryPoint {
        market_id: request.market_id.clone(),
        yes_price,
        no_price,
        yes_reserve: new_pool.yes_reserve,
        no_reserve: new_pool.no_reserve,
        total_volume,
        bet_id: request.request_id,
        recorded_at: now,
      },
    })
  }

  /// A commit timed out with unknown outcome: read the bet record back
  /// to decide whether it landed, instead of blindly retrying (which
  /// could settle the bet twice).
  async fn reconcile_indeterminate(
    &self,
    request: &BetRequest,
    message: String,
  ) -> EngineResult<SettlementSummary> {
    warn!("Commit outcome unknown, reconciling via bet read-back");
    match self.store.fetch_bet(request.request_id).await? {
      Some(record) => {
        info!("Reconciliation found the committed bet");
        self.summary_from_record(record, request.mode)
      }
      None => Err(EngineError::PersistenceFailure {
        message,
        indeterminate: false,
      }),
    }
  }

  /// Rebuild a settlement summary from a stored record (replay and
  /// reconciliation paths).
  fn summary_from_record(
    &self,
    record: BetRecord,
    mode: BetMode,
  ) -> EngineResult<SettlementSummary> {
    let yes_price = pricing::price(Outcome::Yes, &record.pool_after)?;
    let no_price = pricing::price(Outcome::No, &record.pool_after)?;
    let multiplier = match mode {
      BetMode::Shares => None,
      BetMode::Multiplier => {
        Some(self.multiplier_projection(record.gross_amount, record.effective_price)?)
      }
    };
    Ok(SettlementSummary {
      bet: record,
      yes_price,
      no_price,
      multiplier,
    })
  }

  /// Project a trade into margined odds and payout for multiplier mode.
  fn multiplier_projection(
    &self,
    gross_amount: Decimal,
    effective_price: Decimal,
  ) -> EngineResult<MultiplierQuote> {
    let raw_odds = odds::probability_to_odds(effective_price)?;
    let margined = odds::apply_margin_to_odds(raw_odds, self.fees.rate())?;
    let breakdown = odds::payout(gross_amount, margined)?;
    Ok(MultiplierQuote {
      odds: margined,
      payout: breakdown.payout,
      profit: breakdown.profit,
      roi_pct: breakdown.roi_pct,
    })
  }
}

/// Shape checks that need no market state.
fn validate_request(request: &BetRequest) -> EngineResult<()> {
  if request.market_id.trim().is_empty() {
    return Err(EngineError::Validation(
      "market id must not be empty".to_string(),
    ));
  }
  if request.user_id.trim().is_empty() {
    return Err(EngineError::Validation(
      "user id must not be empty".to_string(),
    ));
  }
  if request.amount <= Decimal::ZERO {
    return Err(EngineError::InvalidAmount(
      "bet amount must be positive".to_string(),
    ));
  }
  Ok(())
}

/// Market-state checks shared by quote and settlement.
fn validate_market(market: &Market) -> EngineResult<()> {
  if !market.pool_initialized {
    return Err(EngineError::PoolNotInitialized(market.id.clone()));
  }
  if market.status != MarketStatus::Active {
    return Err(EngineError::MarketNotActive(market.id.clone()));
  }
  Ok(())
}
