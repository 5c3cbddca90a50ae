//! Prometheus Metrics Registry - Settlement Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers settlement throughput, rejection reasons, fee revenue,
//! slippage distribution, and per-market pool reserves.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the settlement engine.
///
/// All metrics follow the naming convention `cpmm_engine_*` and include
/// outcome/market labels for filtering.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Total bets settled counter.
    pub bets_settled: IntCounterVec,
    /// Total bets rejected counter, by error kind.
    pub bets_rejected: IntCounterVec,
    /// Settlement latency histogram (microseconds).
    pub settlement_latency_us: HistogramVec,
    /// Slippage per settled bet histogram.
    pub slippage: HistogramVec,
    /// Cumulative fee revenue gauge.
    pub fee_revenue: Gauge,
    /// YES reserve per market.
    pub pool_yes_reserve: GaugeVec,
    /// NO reserve per market.
    pub pool_no_reserve: GaugeVec,
    /// Cumulative gross volume per market.
    pub market_volume: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bets_settled = IntCounterVec::new(
            Opts::new("cpmm_engine_bets_settled_total", "Total bets settled"),
            &["outcome"],
        )?;

        let bets_rejected = IntCounterVec::new(
            Opts::new("cpmm_engine_bets_rejected_total", "Total bets rejected"),
            &["reason"],
        )?;

        let settlement_latency_us = HistogramVec::new(
            HistogramOpts::new(
                "cpmm_engine_settlement_latency_us",
                "Settlement latency in microseconds",
            )
            .buckets(vec![
                100.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 50000.0,
            ]),
            &["outcome"],
        )?;

        let slippage = HistogramVec::new(
            HistogramOpts::new(
                "cpmm_engine_slippage",
                "Relative slippage per settled bet",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.02, 0.05, 0.10, 0.25]),
            &["market"],
        )?;

        let fee_revenue = Gauge::new(
            "cpmm_engine_fee_revenue",
            "Cumulative house fees collected",
        )?;

        let pool_yes_reserve = GaugeVec::new(
            Opts::new("cpmm_engine_pool_yes_reserve", "Current YES reserve"),
            &["market"],
        )?;

        let pool_no_reserve = GaugeVec::new(
            Opts::new("cpmm_engine_pool_no_reserve", "Current NO reserve"),
            &["market"],
        )?;

        let market_volume = GaugeVec::new(
            Opts::new("cpmm_engine_market_volume", "Cumulative gross volume"),
            &["market"],
        )?;

        // Register all metrics
        registry.register(Box::new(bets_settled.clone()))?;
        registry.register(Box::new(bets_rejected.clone()))?;
        registry.register(Box::new(settlement_latency_us.clone()))?;
        registry.register(Box::new(slippage.clone()))?;
        registry.register(Box::new(fee_revenue.clone()))?;
        registry.register(Box::new(pool_yes_reserve.clone()))?;
        registry.register(Box::new(pool_no_reserve.clone()))?;
        registry.register(Box::new(market_volume.clone()))?;

        Ok(Self {
            registry,
            bets_settled,
            bets_rejected,
            settlement_latency_us,
            slippage,
            fee_revenue,
            pool_yes_reserve,
            pool_no_reserve,
            market_volume,
        })
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let registry = metrics_self.registry.clone();
                async move {
                    let encoder = TextEncoder::new();
                    let metric_families = registry.gather();
                    let mut buffer = Vec::new();
                    if encoder.encode(&metric_families, &mut buffer).is_err() {
                        return String::new();
                    }
                    String::from_utf8(buffer).unwrap_or_default()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
