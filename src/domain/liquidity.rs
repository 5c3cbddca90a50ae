//! Liquidity pool initialization and health policy.
//!
//! Creates symmetric and price-targeted pools, recommends pool sizing
//! from expected flow, and reports utilization/health diagnostics the
//! operator loop surfaces. Pure policy; the pools it builds are handed
//! to markets by the wiring layer, never mutated here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{EngineError, EngineResult};
use super::market::{Outcome, Pool};
use super::pricing;

/// Smallest reserve a pool may be initialized with.
pub const MIN_POOL_SIZE: Decimal = dec!(100);
/// Largest reserve a pool may be initialized with.
pub const MAX_POOL_SIZE: Decimal = dec!(100000);

/// Absolute tolerance between a requested target price and the price the
/// initialized reserves actually produce.
const TARGET_PRICE_TOLERANCE: Decimal = dec!(0.001);

/// Initialize a pool with equal reserves on both sides (both prices 0.5).
pub fn init_symmetric(size: Decimal) -> EngineResult<Pool> {
    if size < MIN_POOL_SIZE || size > MAX_POOL_SIZE {
        return Err(EngineError::PoolSizeOutOfRange);
    }
    Ok(Pool {
        yes_reserve: size,
        no_reserve: size,
        invariant_k: size * size,
    })
}

/// Initialize a pool whose YES price starts at `target_yes_price`.
///
/// `no_reserve = total * target`, `yes_reserve = total - no_reserve`.
/// Rounding at extreme targets near 0 or 1 can leave the realized price
/// slightly off target; a mismatch beyond tolerance is logged, not fatal.
pub fn init_asymmetric(total_liquidity: Decimal, target_yes_price: Decimal) -> EngineResult<Pool> {
    if target_yes_price <= Decimal::ZERO || target_yes_price >= Decimal::ONE {
        return Err(EngineError::Validation(
            "target price must be strictly between 0 and 1".to_string(),
        ));
    }
    if total_liquidity <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "total liquidity must be positive".to_string(),
        ));
    }

    let no_reserve = total_liquidity * target_yes_price;
    let yes_reserve = total_liquidity - no_reserve;
    let pool = Pool {
        yes_reserve,
        no_reserve,
        invariant_k: yes_reserve * no_reserve,
    };

    let realized = pricing::price(Outcome::Yes, &pool)?;
    if (realized - target_yes_price).abs() > TARGET_PRICE_TOLERANCE {
        warn!(
            target = %target_yes_price,
            realized = %realized,
            "Initialized pool price misses target beyond tolerance"
        );
    }

    Ok(pool)
}

/// Recommended pool size for expected flow:
/// `clamp(max(2 * daily_volume, 10 * max_bet), MIN, MAX)`.
pub fn optimal_size(expected_daily_volume: Decimal, expected_max_bet: Decimal) -> Decimal {
    let by_volume = Decimal::TWO * expected_daily_volume;
    let by_bet = dec!(10) * expected_max_bet;
    by_volume.max(by_bet).clamp(MIN_POOL_SIZE, MAX_POOL_SIZE)
}

/// Per-side and average fractional deviation from the initial reserve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub yes: Decimal,
    pub no: Decimal,
    pub average: Decimal,
}

/// How far each reserve has drifted from its initial size.
pub fn utilization(pool: &Pool, initial_size: Decimal) -> EngineResult<Utilization> {
    if initial_size <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "initial pool size must be positive".to_string(),
        ));
    }
    let yes = (pool.yes_reserve - initial_size).abs() / initial_size;
    let no = (pool.no_reserve - initial_size).abs() / initial_size;
    Ok(Utilization {
        yes,
        no,
        average: (yes + no) / Decimal::TWO,
    })
}

/// Severity attached to a pool health warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for WarningSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One diagnostic finding about a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthWarning {
    pub severity: WarningSeverity,
    pub message: String,
}

/// Health report for one pool against its initial size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolHealth {
    /// False when a reserve has fallen below the minimum pool size.
    pub healthy: bool,
    /// Findings in evaluation order.
    pub warnings: Vec<HealthWarning>,
}

/// Diagnose a pool: utilization thresholds, reserve skew, minimum floor.
pub fn health(pool: &Pool, initial_size: Decimal) -> EngineResult<PoolHealth> {
    let util = utilization(pool, initial_size)?;
    let mut warnings = Vec::new();

    if util.average > dec!(0.95) {
        warnings.push(HealthWarning {
            severity: WarningSeverity::Critical,
            message: "average utilization above 95%".to_string(),
        });
    } else if util.average > dec!(0.80) {
        warnings.push(HealthWarning {
            severity: WarningSeverity::Warning,
            message: "average utilization above 80%".to_string(),
        });
    }

    let (larger, smaller) = if pool.yes_reserve >= pool.no_reserve {
        (pool.yes_reserve, pool.no_reserve)
    } else {
        (pool.no_reserve, pool.yes_reserve)
    };
    if smaller > Decimal::ZERO && larger / smaller > dec!(10) {
        warnings.push(HealthWarning {
            severity: WarningSeverity::Info,
            message: "reserve skew exceeds 10:1".to_string(),
        });
    }

    let floor_breached = pool.yes_reserve < MIN_POOL_SIZE || pool.no_reserve < MIN_POOL_SIZE;
    if floor_breached {
        warnings.push(HealthWarning {
            severity: WarningSeverity::Critical,
            message: "reserve below minimum pool size".to_string(),
        });
    }

    Ok(PoolHealth {
        healthy: !floor_breached,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_symmetric() {
        let pool = init_symmetric(dec!(1000)).unwrap();
        assert_eq!(pool.yes_reserve, dec!(1000));
        assert_eq!(pool.no_reserve, dec!(1000));
        assert_eq!(pool.invariant_k, dec!(1000000));
        assert_eq!(pricing::price(Outcome::Yes, &pool).unwrap(), dec!(0.5));
    }

    #[test]
    fn test_init_symmetric_bounds() {
        assert_eq!(
            init_symmetric(dec!(99)).unwrap_err(),
            EngineError::PoolSizeOutOfRange
        );
        assert_eq!(
            init_symmetric(dec!(100001)).unwrap_err(),
            EngineError::PoolSizeOutOfRange
        );
        assert!(init_symmetric(MIN_POOL_SIZE).is_ok());
        assert!(init_symmetric(MAX_POOL_SIZE).is_ok());
    }

    #[test]
    fn test_init_asymmetric_hits_target() {
        let pool = init_asymmetric(dec!(2000), dec!(0.70)).unwrap();
        assert_eq!(pool.no_reserve, dec!(1400));
        assert_eq!(pool.yes_reserve, dec!(600));
        assert_eq!(pool.invariant_k, dec!(840000));
        assert_eq!(pricing::price(Outcome::Yes, &pool).unwrap(), dec!(0.70));
    }

    #[test]
    fn test_init_asymmetric_rejects_bad_target() {
        assert!(init_asymmetric(dec!(2000), Decimal::ONE).is_err());
        assert!(init_asymmetric(dec!(2000), Decimal::ZERO).is_err());
        assert!(init_asymmetric(dec!(2000), dec!(1.5)).is_err());
    }

    #[test]
    fn test_optimal_size() {
        // Bet term dominates: 10 * 300 > 2 * 1000
        assert_eq!(optimal_size(dec!(1000), dec!(300)), dec!(3000));
        // Volume term dominates
        assert_eq!(optimal_size(dec!(5000), dec!(100)), dec!(10000));
        // Clamped at both ends
        assert_eq!(optimal_size(dec!(1), dec!(1)), MIN_POOL_SIZE);
        assert_eq!(optimal_size(dec!(900000), dec!(1)), MAX_POOL_SIZE);
    }

    #[test]
    fn test_utilization() {
        let pool = Pool {
            yes_reserve: dec!(500),
            no_reserve: dec!(1500),
            invariant_k: dec!(750000),
        };
        let util = utilization(&pool, dec!(1000)).unwrap();
        assert_eq!(util.yes, dec!(0.5));
        assert_eq!(util.no, dec!(0.5));
        assert_eq!(util.average, dec!(0.5));
    }

    #[test]
    fn test_health_clean_pool() {
        let pool = init_symmetric(dec!(1000)).unwrap();
        let report = health(&pool, dec!(1000)).unwrap();
        assert!(report.healthy);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_health_high_utilization_warns() {
        let pool = Pool {
            yes_reserve: dec!(150),
            no_reserve: dec!(1850),
            invariant_k: dec!(277500),
        };
        let report = health(&pool, dec!(1000)).unwrap();
        assert!(report.healthy);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].severity, WarningSeverity::Warning);
        assert_eq!(report.warnings[1].severity, WarningSeverity::Info);
    }

    #[test]
    fn test_health_floor_breach_is_unhealthy() {
        let pool = Pool {
            yes_reserve: dec!(40),
            no_reserve: dec!(2500),
            invariant_k: dec!(100000),
        };
        let report = health(&pool, dec!(1000)).unwrap();
        assert!(!report.healthy);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Critical));
    }
}
