//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! providing clear error messages for misconfiguration. The fee rate is
//! the one soft-validated field: out-of-range rates fall back to the
//! default inside `FeeSchedule` rather than failing startup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig = toml::from_str(&content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    markets = config.markets.len(),
    fee_rate = config.fees.rate,
    default_pool_size = config.pools.default_size,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Engine validation
  anyhow::ensure!(
    !config.engine.name.is_empty(),
    "Engine name must not be empty"
  );

  // Pool validation
  anyhow::ensure!(
    (100.0..=100_000.0).contains(&config.pools.default_size),
    "default_size must be within [100, 100000], got {}",
    config.pools.default_size
  );

  // Market validation
  for (i, market) in config.markets.iter().enumerate() {
    anyhow::ensure!(
      !market.id.is_empty(),
      "Market {i} has empty id"
    );
    if let Some(liquidity) = market.initial_liquidity {
      anyhow::ensure!(
        liquidity > 0.0,
        "Market {} ({}) must have positive initial_liquidity",
        i,
        market.id
      );
    }
    if let Some(target) = market.target_yes_price {
      anyhow::ensure!(
        target > 0.0 && target < 1.0,
        "Market {} ({}) target_yes_price must be in (0, 1), got {}",
        i,
        market.id,
        target
      );
    }
  }

  // Settlement validation
  anyhow::ensure!(
    (1..=10).contains(&config.settlement.max_commit_attempts),
    "max_commit_attempts must be in [1, 10], got {}",
    config.settlement.max_commit_attempts
  );
  anyhow::ensure!(
    config.settlement.commit_timeout_ms > 0,
    "commit_timeout_ms must be positive"
  );

  // Metrics validation
  anyhow::ensure!(
    !config.metrics.bind_address.is_empty(),
    "Metrics bind address must not be empty"
  );

  Ok(())
}
