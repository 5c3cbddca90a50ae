//! In-Memory Market Store — Versioned Atomic Settlement State
//!
//! Reference implementation of the `MarketStore` and `AccountLedger`
//! ports: all state behind one `RwLock`, so the six-effect settlement
//! batch applies under a single write guard — either every effect lands
//! or none do. The optimistic version check and the duplicate-bet guard
//! both run inside that guard, before any mutation.
//!
//! This is the hexagonal architecture glue: the usecases layer only
//! knows the port traits, never this struct's internals.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::journal::SettlementJournal;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::market::{
    BetRecord, LedgerEntry, Market, MarketId, Outcome, Position, PriceHistoryPoint, UserId,
};
use crate::ports::account_ledger::AccountLedger;
use crate::ports::market_store::{MarketStore, SettlementBatch};

/// Everything the store owns, guarded by one lock.
#[derive(Default)]
struct StoreState {
    markets: HashMap<MarketId, Market>,
    balances: HashMap<UserId, Decimal>,
    bets: HashMap<Uuid, BetRecord>,
    positions: HashMap<(UserId, MarketId, Outcome), Position>,
    ledger: Vec<LedgerEntry>,
    price_history: HashMap<MarketId, Vec<PriceHistoryPoint>>,
}

/// In-memory market store with optimistic versioning.
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    /// Optional append-only audit journal. Not authoritative; failures
    /// are logged, never propagated into the commit outcome.
    journal: Option<Arc<SettlementJournal>>,
}

impl InMemoryStore {
    /// Create an empty store with no audit journal.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            journal: None,
        }
    }

    /// Create a store that mirrors committed bets into a JSONL journal.
    pub fn with_journal(journal: Arc<SettlementJournal>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            journal: Some(journal),
        }
    }

    /// Register a market. Replaces any existing market under the same id.
    pub async fn insert_market(&self, market: Market) {
        let mut state = self.state.write().await;
        state.markets.insert(market.id.clone(), market);
    }

    /// Credit a user's balance (seeding and test setup).
    pub async fn credit(&self, user_id: &str, amount: Decimal) {
        let mut state = self.state.write().await;
        *state
            .balances
            .entry(user_id.to_string())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Number of committed bets across all markets.
    pub async fn bet_count(&self) -> usize {
        self.state.read().await.bets.len()
    }

    /// Price history points recorded for a market, oldest first.
    pub async fn price_history(&self, market_id: &str) -> Vec<PriceHistoryPoint> {
        self.state
            .read()
            .await
            .price_history
            .get(market_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All ledger entries in commit order.
    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.ledger.clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn fetch(&self, market_id: &str) -> EngineResult<Market> {
        let state = self.state.read().await;
        state
            .markets
            .get(market_id)
            .cloned()
            .ok_or_else(|| EngineError::MarketNotFound(market_id.to_string()))
    }

    async fn fetch_position(
        &self,
        user_id: &str,
        market_id: &str,
        outcome: Outcome,
    ) -> EngineResult<Option<Position>> {
        let state = self.state.read().await;
        let key = (user_id.to_string(), market_id.to_string(), outcome);
        Ok(state.positions.get(&key).cloned())
    }

    async fn fetch_bet(&self, bet_id: Uuid) -> EngineResult<Option<BetRecord>> {
        let state = self.state.read().await;
        Ok(state.bets.get(&bet_id).cloned())
    }

    async fn commit_settlement(&self, batch: &SettlementBatch) -> EngineResult<()> {
        {
            let mut state = self.state.write().await;

            // Replayed batch: the bet already landed, nothing to do.
            if state.bets.contains_key(&batch.bet.id) {
                debug!(bet_id = %batch.bet.id, "Duplicate commit ignored");
                return Ok(());
            }

            let stored = state
                .markets
                .get(&batch.market.id)
                .ok_or_else(|| EngineError::MarketNotFound(batch.market.id.clone()))?;
            if stored.version != batch.expected_version {
                return Err(EngineError::ConcurrencyConflict);
            }

            let balance = state
                .balances
                .get(&batch.debit.user_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if balance < batch.debit.amount {
                // Balance moved between validation and commit; refusing
                // keeps the non-negativity constraint without partial
                // effects.
                return Err(EngineError::persistence(
                    "debit would overdraw the account",
                ));
            }

            // All checks passed; apply every effect under the same guard.
            state
                .markets
                .insert(batch.market.id.clone(), batch.market.clone());
            state.bets.insert(batch.bet.id, batch.bet.clone());
            state
                .balances
                .insert(batch.debit.user_id.clone(), balance - batch.debit.amount);
            state.positions.insert(
                (
                    batch.position.user_id.clone(),
                    batch.position.market_id.clone(),
                    batch.position.outcome,
                ),
                batch.position.clone(),
            );
            state.ledger.push(batch.ledger.clone());
            state
                .price_history
                .entry(batch.price_point.market_id.clone())
                .or_default()
                .push(batch.price_point.clone());
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append_bet(&batch.bet).await {
                warn!(bet_id = %batch.bet.id, error = %e, "Audit journal append failed");
            }
            if let Err(e) = journal.append_price_point(&batch.price_point).await {
                warn!(bet_id = %batch.bet.id, error = %e, "Price history journal append failed");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AccountLedger for InMemoryStore {
    async fn balance(&self, user_id: &str) -> EngineResult<Decimal> {
        let state = self.state.read().await;
        state
            .balances
            .get(user_id)
            .copied()
            .ok_or_else(|| EngineError::Validation(format!("unknown account: {user_id}")))
    }
}
