//! Market Store Port - Settlement Persistence Interface
//!
//! The settlement orchestrator's window onto market state. The store
//! owns markets, bets, positions, the account ledger rows touched by a
//! bet, and the price history; the orchestrator hands it a complete
//! batch that must commit atomically or not at all.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::EngineResult;
use crate::domain::market::{
  BetRecord, LedgerEntry, Market, Outcome, Position, PriceHistoryPoint, UserId,
};

/// Balance movement applied inside the settlement batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceDebit {
  /// Account to debit.
  pub user_id: UserId,
  /// Gross bet amount (the fee is absorbed in pool mechanics, never a
  /// second debit).
  pub amount: Decimal,
}

/// The six effects of one settled bet, committed as a single unit.
///
/// `expected_version` keys the optimistic concurrency check: the commit
/// must fail with `ConcurrencyConflict` if the stored market version no
/// longer matches the snapshot the batch was priced against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementBatch {
  /// Market version the batch was priced against.
  pub expected_version: u64,
  /// Post-trade market state (pool, cached prices, volume, version + 1).
  pub market: Market,
  /// Immutable record of the bet.
  pub bet: BetRecord,
  /// Gross-amount debit against the requester's balance.
  pub debit: BalanceDebit,
  /// Upserted position state for the (user, market, outcome) triple.
  pub position: Position,
  /// Account-ledger row for the debit.
  pub ledger: LedgerEntry,
  /// Append-only price snapshot caused by the bet.
  pub price_point: PriceHistoryPoint,
}

/// Trait for market persistence providers.
///
/// `commit_settlement` is all-or-nothing: on any failure no effect of
/// the batch may be visible. Implementations without native multi-record
/// atomicity must compensate internally before returning an error.
#[async_trait]
pub trait MarketStore: Send + Sync + 'static {
  /// Fetch a market snapshot by id.
  async fn fetch(&self, market_id: &str) -> EngineResult<Market>;

  /// Fetch the position for a (user, market, outcome) triple, if any.
  async fn fetch_position(
    &self,
    user_id: &str,
    market_id: &str,
    outcome: Outcome,
  ) -> EngineResult<Option<Position>>;

  /// Fetch a committed bet by id (request id). Used for idempotent
  /// replay detection and post-timeout reconciliation.
  async fn fetch_bet(&self, bet_id: Uuid) -> EngineResult<Option<BetRecord>>;

  /// Atomically apply all effects of the batch, keyed on the market
  /// version. A batch whose bet id was already committed is a no-op
  /// success, never a second record.
  async fn commit_settlement(&self, batch: &SettlementBatch) -> EngineResult<()>;
}
