//! CPMM Bet Engine — Entry Point
//!
//! Initializes configuration, logging, persistence, and the settlement
//! engine. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Shutdown signal channels
//! 4. Create JSONL audit journal + in-memory market store
//! 5. Seed configured markets through the liquidity pool manager
//! 6. Construct the settlement engine for in-process callers
//! 7. Spawn Prometheus metrics server (/metrics)
//! 8. Spawn health server (/live + /ready)
//! 9. Pool-health heartbeat loop until SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use adapters::persistence::{InMemoryStore, SettlementJournal};
use domain::margin::FeeSchedule;
use domain::market::{Market, MarketId, MarketStatus, Outcome};
use domain::{liquidity, pricing};
use usecases::SettlementEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.engine.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.engine.name,
        version = env!("CARGO_PKG_VERSION"),
        markets = config.markets.len(),
        fee_rate = config.fees.rate,
        "Starting CPMM bet engine"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health_state = Arc::new(HealthState::new());

    // ── 4. Audit journal + market store ─────────────────────
    let store = if config.persistence.journal_enabled {
        let journal = Arc::new(
            SettlementJournal::new(&config.persistence.data_dir)
                .await
                .context("Failed to create settlement journal")?,
        );
        health_state
            .store_healthy
            .store(journal.is_healthy().await, std::sync::atomic::Ordering::Relaxed);
        Arc::new(InMemoryStore::with_journal(journal))
    } else {
        Arc::new(InMemoryStore::new())
    };

    // ── 5. Seed configured markets ──────────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to create metrics")?);
    let initial_sizes = seed_markets(&config, &store, &metrics).await?;

    if initial_sizes.is_empty() {
        warn!("No active markets configured — engine idle");
    }

    // ── 6. Settlement engine for in-process callers ─────────
    let fees = FeeSchedule::from_rate(
        Decimal::from_f64(config.fees.rate).unwrap_or(domain::margin::DEFAULT_FEE_RATE),
    );
    let _engine = SettlementEngine::with_policy(
        Arc::clone(&store),
        Arc::clone(&store),
        fees,
        config.settlement.max_commit_attempts,
        std::time::Duration::from_millis(config.settlement.commit_timeout_ms),
    );

    // ── 7. Spawn Prometheus metrics server ──────────────────
    let metrics_handle = if config.metrics.enabled {
        let metrics_shutdown = shutdown_tx.subscribe();
        let metrics_ref = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = metrics_ref.serve(bind, metrics_shutdown).await {
                warn!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 8. Spawn health server ──────────────────────────────
    let health_server = HealthServer::new(Arc::clone(&health_state), config.metrics.health_port);
    let health_shutdown = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            warn!(error = %e, "Health server failed");
        }
    });

    info!("All tasks spawned — engine is running");

    // ── 9. Heartbeat loop until SIGINT ──────────────────────
    let mut heartbeat_shutdown = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                break;
            }
            _ = heartbeat_shutdown.recv() => {
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
                report_pool_health(&store, &initial_sizes, &metrics).await;
            }
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Mark not ready (readiness probe → 503)
    health_state
        .accepting
        .store(false, std::sync::atomic::Ordering::Relaxed);

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 3. Wait for servers to drain (up to 5s each)
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), health_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Build each configured market's pool through the liquidity manager and
/// register it with the store. Returns per-market initial reserve sizes
/// for later health reporting.
async fn seed_markets(
    config: &config::AppConfig,
    store: &Arc<InMemoryStore>,
    metrics: &Arc<MetricsRegistry>,
) -> Result<HashMap<MarketId, Decimal>> {
    let mut initial_sizes = HashMap::new();

    for seed in config.markets.iter().filter(|m| m.active) {
        let liquidity_value = seed
            .initial_liquidity
            .unwrap_or(config.pools.default_size * 2.0);
        let total = Decimal::from_f64(liquidity_value)
            .with_context(|| format!("Invalid liquidity for market {}", seed.id))?;

        let pool = match seed.target_yes_price {
            Some(target) => {
                let target = Decimal::from_f64(target)
                    .with_context(|| format!("Invalid target price for market {}", seed.id))?;
                liquidity::init_asymmetric(total, target)
                    .with_context(|| format!("Failed to initialize pool for {}", seed.id))?
            }
            None => liquidity::init_symmetric(total / Decimal::TWO)
                .with_context(|| format!("Failed to initialize pool for {}", seed.id))?,
        };

        let yes_price = pricing::price(Outcome::Yes, &pool)
            .with_context(|| format!("Failed to price seeded pool for {}", seed.id))?;
        let no_price = pricing::price(Outcome::No, &pool)
            .with_context(|| format!("Failed to price seeded pool for {}", seed.id))?;

        let market = Market {
            id: seed.id.clone(),
            status: MarketStatus::Active,
            pool_initialized: true,
            pool: pool.clone(),
            total_volume: Decimal::ZERO,
            yes_price,
            no_price,
            version: 1,
        };

        info!(
            market_id = %market.id,
            yes_reserve = %pool.yes_reserve,
            no_reserve = %pool.no_reserve,
            yes_price = %yes_price,
            "Market seeded"
        );

        metrics
            .pool_yes_reserve
            .with_label_values(&[&seed.id])
            .set(pool.yes_reserve.to_f64().unwrap_or(0.0));
        metrics
            .pool_no_reserve
            .with_label_values(&[&seed.id])
            .set(pool.no_reserve.to_f64().unwrap_or(0.0));

        initial_sizes.insert(seed.id.clone(), pool.total() / Decimal::TWO);
        store.insert_market(market).await;
    }

    Ok(initial_sizes)
}

/// Log pool health for every seeded market and refresh reserve gauges.
async fn report_pool_health(
    store: &Arc<InMemoryStore>,
    initial_sizes: &HashMap<MarketId, Decimal>,
    metrics: &Arc<MetricsRegistry>,
) {
    use crate::ports::market_store::MarketStore;

    for (market_id, initial_size) in initial_sizes {
        let market = match store.fetch(market_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(market_id = %market_id, error = %e, "Heartbeat fetch failed");
                continue;
            }
        };

        metrics
            .pool_yes_reserve
            .with_label_values(&[market_id])
            .set(market.pool.yes_reserve.to_f64().unwrap_or(0.0));
        metrics
            .pool_no_reserve
            .with_label_values(&[market_id])
            .set(market.pool.no_reserve.to_f64().unwrap_or(0.0));
        metrics
            .market_volume
            .with_label_values(&[market_id])
            .set(market.total_volume.to_f64().unwrap_or(0.0));

        match liquidity::health(&market.pool, *initial_size) {
            Ok(report) => {
                if report.warnings.is_empty() {
                    info!(market_id = %market_id, healthy = report.healthy, "Pool heartbeat");
                }
                for warning in &report.warnings {
                    warn!(
                        market_id = %market_id,
                        severity = %warning.severity,
                        healthy = report.healthy,
                        "{}", warning.message
                    );
                }
            }
            Err(e) => warn!(market_id = %market_id, error = %e, "Health check failed"),
        }
    }
}
