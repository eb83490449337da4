//! Summary statistics over a daily return series.

use std::fmt;

use crate::domain::error::ModelfolioError;
use crate::domain::returns::{ReturnSeries, TRADING_DAYS_PER_YEAR};

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Risk-adjusted return. Zero volatility leaves the ratio undefined instead
/// of producing an infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SharpeRatio {
    Value(f64),
    Undefined,
}

impl SharpeRatio {
    /// Zero or non-finite inputs give `Undefined`; a `Value` is always finite.
    pub fn from_parts(excess_return: f64, volatility: f64) -> Self {
        let ratio = excess_return / volatility;
        if volatility == 0.0 || !ratio.is_finite() {
            SharpeRatio::Undefined
        } else {
            SharpeRatio::Value(ratio)
        }
    }

    pub fn value(&self) -> Result<f64, ModelfolioError> {
        match self {
            SharpeRatio::Value(v) => Ok(*v),
            SharpeRatio::Undefined => Err(ModelfolioError::DivideByZero {
                quantity: "sharpe ratio (volatility is zero)".into(),
            }),
        }
    }
}

impl fmt::Display for SharpeRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharpeRatio::Value(v) => write!(f, "{v:.2}"),
            SharpeRatio::Undefined => f.write_str("n/a"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceStats {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: SharpeRatio,
    pub max_drawdown: f64,
}

/// Growth of one unit: `cumulative[t] = Π(1 + r_i)` for `i <= t`.
pub fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator). A single observation has
/// no dispersion and yields 0.
pub fn sample_stdev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Worst peak-to-trough decline of the curve; always `<= 0`.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in cumulative {
        if value > peak {
            peak = value;
        }
        let dd = value / peak - 1.0;
        if dd < worst {
            worst = dd;
        }
    }
    worst
}

pub fn compute(
    series: &ReturnSeries,
    risk_free_rate: f64,
) -> Result<(PerformanceStats, Vec<f64>), ModelfolioError> {
    compute_from_returns(&series.returns, risk_free_rate)
}

pub fn compute_from_returns(
    returns: &[f64],
    risk_free_rate: f64,
) -> Result<(PerformanceStats, Vec<f64>), ModelfolioError> {
    let n = returns.len();
    if n == 0 {
        return Err(ModelfolioError::DivideByZero {
            quantity: "annualized return (no daily observations)".into(),
        });
    }
    if let Some(r) = returns.iter().find(|r| !r.is_finite() || **r <= -1.0) {
        return Err(ModelfolioError::NoData {
            reason: format!("daily return {r} cannot be compounded"),
        });
    }

    let cumulative = cumulative_curve(returns);
    let total_return = cumulative[n - 1] - 1.0;
    let annualized_return = (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / n as f64) - 1.0;
    let volatility = sample_stdev(returns) * TRADING_DAYS_PER_YEAR.sqrt();
    let sharpe_ratio = SharpeRatio::from_parts(annualized_return - risk_free_rate, volatility);
    let max_drawdown = max_drawdown(&cumulative);

    if !annualized_return.is_finite() || !volatility.is_finite() {
        return Err(ModelfolioError::NoData {
            reason: format!(
                "statistics are not finite (annualized {annualized_return}, volatility {volatility})"
            ),
        });
    }

    Ok((
        PerformanceStats {
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            max_drawdown,
        },
        cumulative,
    ))
}
