//! Core betting domain types.
//!
//! Defines the entities the settlement flow reads and writes: pools,
//! markets, bet requests/records, positions, ledger entries, and price
//! history points. All money-equivalent values are `Decimal`; floating
//! point never touches reserves, balances, or fees.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Lightweight market identifier used at the ports boundary.
pub type MarketId = String;

/// Lightweight user identifier used at the ports boundary.
pub type UserId = String;

// ────────────────────────────────────────────
// Enums shared across domain and ports
// ────────────────────────────────────────────

/// Binary market outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// The other side of the market.
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// Lifecycle status of a market. Only `Active` markets accept bets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Active,
    Closed,
    Resolved,
    Cancelled,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
            Self::Resolved => write!(f, "resolved"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How settlement results are surfaced to the caller.
///
/// Both modes commit the identical pool mutation; `Multiplier` adds an
/// odds/payout projection to the returned summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetMode {
    /// Shares received at an effective price.
    Shares,
    /// Decimal-odds multiplier and projected payout.
    Multiplier,
}

// ────────────────────────────────────────────
// Pool and market state
// ────────────────────────────────────────────

/// Constant-product liquidity pool for one binary market.
///
/// At every rest state `yes_reserve * no_reserve` must stay within the
/// relative invariant tolerance of `invariant_k`. The stored `invariant_k`
/// is set at initialization and recomputed only by the settlement
/// orchestrator after a committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Tokens held for the YES outcome.
    pub yes_reserve: Decimal,
    /// Tokens held for the NO outcome.
    pub no_reserve: Decimal,
    /// Constant product both reserves must multiply to.
    pub invariant_k: Decimal,
}

impl Pool {
    /// Current product of the two reserves.
    pub fn product(&self) -> Decimal {
        self.yes_reserve * self.no_reserve
    }

    /// Combined size of both reserves.
    pub fn total(&self) -> Decimal {
        self.yes_reserve + self.no_reserve
    }

    /// Reserve held for the given outcome.
    pub fn reserve(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::Yes => self.yes_reserve,
            Outcome::No => self.no_reserve,
        }
    }
}

/// A binary prediction market with its embedded pool.
///
/// `yes_price`/`no_price` are caches of the pricing engine's output for
/// the current pool, recomputed on every committed mutation and never
/// hand-edited. `version` increments on each commit and keys the
/// optimistic concurrency check in the market store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Unique market identifier.
    pub id: MarketId,
    /// Lifecycle status.
    pub status: MarketStatus,
    /// Whether the pool has been initialized with liquidity.
    pub pool_initialized: bool,
    /// Embedded constant-product pool.
    pub pool: Pool,
    /// Cumulative gross volume settled against this market.
    pub total_volume: Decimal,
    /// Cached marginal YES price for the current pool.
    pub yes_price: Decimal,
    /// Cached marginal NO price for the current pool.
    pub no_price: Decimal,
    /// Optimistic concurrency version, bumped on every commit.
    pub version: u64,
}

// ────────────────────────────────────────────
// Bet request / record
// ────────────────────────────────────────────

/// An incoming bet. Ephemeral; a committed bet produces a `BetRecord`.
///
/// `request_id` doubles as the bet id, so replays of the same request
/// settle at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    /// Caller-supplied idempotency key and eventual bet id.
    pub request_id: Uuid,
    /// Market to bet on.
    pub market_id: MarketId,
    /// Requesting user.
    pub user_id: UserId,
    /// Side of the market.
    pub outcome: Outcome,
    /// Gross stake, before the house fee.
    pub amount: Decimal,
    /// Presentation mode for the returned summary.
    pub mode: BetMode,
}

impl BetRequest {
    /// Create a shares-mode request with a fresh request id.
    pub fn new(
        market_id: impl Into<MarketId>,
        user_id: impl Into<UserId>,
        outcome: Outcome,
        amount: Decimal,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            market_id: market_id.into(),
            user_id: user_id.into(),
            outcome,
            amount,
            mode: BetMode::Shares,
        }
    }

    /// Same request surfaced as a multiplier/payout quote.
    pub fn with_mode(mut self, mode: BetMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Immutable record of a committed bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    /// Bet id (equals the request id that produced it).
    pub id: Uuid,
    /// Market the bet settled against.
    pub market_id: MarketId,
    /// Betting user.
    pub user_id: UserId,
    /// Side of the market.
    pub outcome: Outcome,
    /// Gross stake debited from the user.
    pub gross_amount: Decimal,
    /// House fee retained from the gross stake.
    pub fee: Decimal,
    /// Net amount that entered the pool.
    pub net_amount: Decimal,
    /// Marginal price before the trade.
    pub price_before: Decimal,
    /// Average price realized by the trade.
    pub effective_price: Decimal,
    /// Outcome tokens received.
    pub tokens_out: Decimal,
    /// Relative divergence between pre-trade and realized price.
    pub slippage: Decimal,
    /// Pool snapshot before the trade.
    pub pool_before: Pool,
    /// Pool snapshot after the trade.
    pub pool_after: Pool,
    /// Commit timestamp.
    pub placed_at: DateTime<Utc>,
}

// ────────────────────────────────────────────
// Positions, ledger, price history
// ────────────────────────────────────────────

/// A user's accumulated stake on one outcome of one market.
///
/// Created on the first bet for the (user, market, outcome) triple and
/// updated in place on subsequent bets via weighted-average accumulation.
/// Never deleted by the settlement core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome: Outcome,
    /// Total outcome tokens held.
    pub shares: Decimal,
    /// Total gross currency put in across all bets.
    pub total_invested: Decimal,
    /// `total_invested / shares`.
    pub avg_price: Decimal,
    /// Shares marked at the current marginal price.
    pub current_value: Decimal,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Open a fresh position from a first fill.
    pub fn open(
        user_id: UserId,
        market_id: MarketId,
        outcome: Outcome,
        shares: Decimal,
        invested: Decimal,
        current_price: Decimal,
        at: DateTime<Utc>,
    ) -> Self {
        let avg_price = if shares.is_zero() {
            Decimal::ZERO
        } else {
            invested / shares
        };
        Self {
            user_id,
            market_id,
            outcome,
            shares,
            total_invested: invested,
            avg_price,
            current_value: shares * current_price,
            opened_at: at,
            updated_at: at,
        }
    }

    /// Fold another fill into the position (weighted-average accumulation).
    pub fn apply_fill(
        &mut self,
        shares: Decimal,
        invested: Decimal,
        current_price: Decimal,
        at: DateTime<Utc>,
    ) {
        self.shares += shares;
        self.total_invested += invested;
        self.avg_price = if self.shares.is_zero() {
            Decimal::ZERO
        } else {
            self.total_invested / self.shares
        };
        self.current_value = self.shares * current_price;
        self.updated_at = at;
    }
}

/// Kind of account-ledger movement produced by the settlement core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerKind {
    /// Gross stake debited on a committed bet.
    BetDebit,
}

/// One account-ledger movement, committed inside the settlement batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: LedgerKind,
    /// Amount moved out of the account (positive).
    pub amount: Decimal,
    /// Bet that caused the movement.
    pub bet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Append-only price snapshot, one per committed bet. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub market_id: MarketId,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub yes_reserve: Decimal,
    pub no_reserve: Decimal,
    /// Cumulative market volume after the causing bet.
    pub total_volume: Decimal,
    /// Bet that produced this point.
    pub bet_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_outcome_opposite() {
        assert_eq!(Outcome::Yes.opposite(), Outcome::No);
        assert_eq!(Outcome::No.opposite(), Outcome::Yes);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(format!("{}", Outcome::Yes), "YES");
        assert_eq!(format!("{}", Outcome::No), "NO");
    }

    #[test]
    fn test_pool_product_and_reserve() {
        let pool = Pool {
            yes_reserve: dec!(600),
            no_reserve: dec!(1400),
            invariant_k: dec!(840000),
        };
        assert_eq!(pool.product(), dec!(840000));
        assert_eq!(pool.total(), dec!(2000));
        assert_eq!(pool.reserve(Outcome::Yes), dec!(600));
        assert_eq!(pool.reserve(Outcome::No), dec!(1400));
    }

    #[test]
    fn test_position_weighted_average() {
        let now = Utc::now();
        let mut pos = Position::open(
            "alice".to_string(),
            "market_1".to_string(),
            Outcome::Yes,
            dec!(100),
            dec!(50),
            dec!(0.5),
            now,
        );
        assert_eq!(pos.avg_price, dec!(0.5));

        pos.apply_fill(dec!(100), dec!(70), dec!(0.7), now);
        assert_eq!(pos.shares, dec!(200));
        assert_eq!(pos.total_invested, dec!(120));
        assert_eq!(pos.avg_price, dec!(0.6));
        assert_eq!(pos.current_value, dec!(140.0));
    }

    #[test]
    fn test_bet_request_mode() {
        let req = BetRequest::new("m1", "alice", Outcome::No, dec!(25))
            .with_mode(BetMode::Multiplier);
        assert_eq!(req.mode, BetMode::Multiplier);
        assert_eq!(req.outcome, Outcome::No);
    }
}
