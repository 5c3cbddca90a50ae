//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. All pricing
//! and policy parameters are externalized here - nothing is hardcoded
//! in the domain layer. Values are immutable for the process lifetime.

pub mod loader;

use serde::Deserialize;

/// Top-level engine configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the engine begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Engine identity and metadata.
  pub engine: EngineConfig,
  /// House fee parameters.
  pub fees: FeeConfig,
  /// Pool initialization defaults.
  pub pools: PoolConfig,
  /// Settlement retry and timeout policy.
  pub settlement: SettlementConfig,
  /// Markets to seed at startup.
  #[serde(default)]
  pub markets: Vec<MarketSeedConfig>,
  /// Metrics and monitoring.
  pub metrics: MetricsConfig,
  /// Persistence configuration.
  pub persistence: PersistenceConfig,
}

/// Engine identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Human-readable engine name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// House fee configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
  /// Fee rate on gross bet amounts. Values outside [0.001, 0.10] are
  /// replaced with the default rate at startup, with a warning.
  #[serde(default = "default_fee_rate")]
  pub rate: f64,
}

/// Pool initialization defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
  /// Default per-side reserve for newly seeded symmetric pools.
  #[serde(default = "default_pool_size")]
  pub default_size: f64,
}

/// Settlement retry and timeout policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
  /// Bound on optimistic-concurrency retries before surfacing a conflict.
  #[serde(default = "default_max_attempts")]
  pub max_commit_attempts: u32,
  /// Timeout for the persistence commit call (milliseconds).
  #[serde(default = "default_commit_timeout")]
  pub commit_timeout_ms: u64,
}

/// A market seeded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketSeedConfig {
  /// Market identifier.
  pub id: String,
  /// Total liquidity for the pool, split evenly unless a target price
  /// is given. Defaults to twice the configured default pool size.
  pub initial_liquidity: Option<f64>,
  /// Optional starting YES price in (0, 1); omits to start at 0.5.
  pub target_yes_price: Option<f64>,
  /// Whether this market accepts bets.
  #[serde(default = "default_true")]
  pub active: bool,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for JSONL audit journals.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Whether to mirror committed bets into the JSONL journal.
  #[serde(default = "default_true")]
  pub journal_enabled: bool,
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_fee_rate() -> f64 {
  0.02
}

fn default_pool_size() -> f64 {
  1000.0
}

fn default_max_attempts() -> u32 {
  3
}

fn default_commit_timeout() -> u64 {
  5000
}

fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
