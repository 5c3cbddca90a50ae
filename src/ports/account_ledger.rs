//! Account Ledger Port - Balance Queries
//!
//! Read-side interface to the account ledger collaborator. The debit for
//! a committed bet travels inside the settlement batch (market store
//! port), so this port only answers "can this user cover the stake".

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::error::EngineResult;

/// Trait for account balance providers.
#[async_trait]
pub trait AccountLedger: Send + Sync + 'static {
  /// Current available balance for a user.
  async fn balance(&self, user_id: &str) -> EngineResult<Decimal>;
}
