//! Fee-adjusted daily portfolio returns.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::error::ModelfolioError;
use crate::domain::price::PriceHistory;
use crate::domain::weights::Weights;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// How per-ticker expense-ratio drag combines with the running series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeeCascade {
    /// Each ticker's drag is applied to the already fee-reduced series, in
    /// ticker order. Reproduces the reference numbers.
    #[default]
    Sequential,
    /// Every ticker's drag is applied to the advisory-discounted series and
    /// the drags are combined multiplicatively.
    Independent,
}

impl FromStr for FeeCascade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(FeeCascade::Sequential),
            "independent" => Ok(FeeCascade::Independent),
            other => Err(format!(
                "unknown fee cascade '{other}' (expected sequential or independent)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

/// Daily factor equivalent to an annual fee: `(1 - fee)^(1/252)`.
pub fn daily_fee_factor(annual_fee: f64) -> f64 {
    (1.0 - annual_fee).powf(1.0 / TRADING_DAYS_PER_YEAR)
}

/// Annual fee rates must lie in `[0, 1)`.
fn check_fee_rate(what: &str, rate: f64) -> Result<(), ModelfolioError> {
    if rate.is_finite() && (0.0..1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ModelfolioError::InvalidPortfolio {
            reason: format!("{what} {rate} outside [0, 1)"),
        })
    }
}

/// Weighted gross daily returns, discounted by the advisory fee and then by
/// each ticker's expense ratio raised to that ticker's weight.
pub fn compound(
    prices: &PriceHistory,
    weights: &Weights,
    advisory_fee: f64,
    expense_ratios: &HashMap<String, f64>,
    cascade: FeeCascade,
) -> Result<ReturnSeries, ModelfolioError> {
    if prices.len() < 2 {
        return Err(ModelfolioError::NoData {
            reason: format!(
                "need at least 2 price observations to derive returns, have {}",
                prices.len()
            ),
        });
    }

    for ticker in weights.tickers() {
        if !prices.contains(ticker) {
            return Err(ModelfolioError::WeightMismatch {
                ticker: ticker.to_string(),
                reason: "has a weight but no price history".into(),
            });
        }
    }
    for ticker in prices.tickers() {
        if !weights.contains(ticker) {
            return Err(ModelfolioError::WeightMismatch {
                ticker: ticker.to_string(),
                reason: "has price history but no weight".into(),
            });
        }
    }

    for ticker in prices.tickers() {
        let bad = prices
            .closes(ticker)
            .and_then(|closes| closes.iter().find(|c| !c.is_finite() || **c <= 0.0));
        if let Some(close) = bad {
            return Err(ModelfolioError::NoData {
                reason: format!("{ticker} has an unusable close price {close}"),
            });
        }
    }
    check_fee_rate("advisory fee", advisory_fee)?;
    for ticker in weights.tickers() {
        if let Some(er) = expense_ratios.get(ticker) {
            check_fee_rate(&format!("expense ratio for {ticker}"), *er)?;
        }
    }

    let days = prices.len() - 1;
    let mut gross = vec![0.0; days];
    for (ticker, weight) in weights.iter() {
        let changes = prices
            .pct_change(ticker)
            .ok_or_else(|| ModelfolioError::WeightMismatch {
                ticker: ticker.to_string(),
                reason: "has a weight but no price history".into(),
            })?;
        for (acc, r) in gross.iter_mut().zip(changes) {
            *acc += weight * r;
        }
    }

    let advisory_factor = daily_fee_factor(advisory_fee);
    let mut net: Vec<f64> = gross
        .iter()
        .map(|r| (1.0 + r) * advisory_factor - 1.0)
        .collect();

    let drags: Vec<f64> = weights
        .iter()
        .filter_map(|(ticker, weight)| {
            let er = expense_ratios.get(ticker).copied().unwrap_or(0.0);
            (er > 0.0).then(|| daily_fee_factor(er).powf(weight))
        })
        .collect();

    match cascade {
        FeeCascade::Sequential => {
            for drag in &drags {
                for r in net.iter_mut() {
                    *r = (1.0 + *r) * drag - 1.0;
                }
            }
        }
        FeeCascade::Independent => {
            let combined: f64 = drags.iter().product();
            for r in net.iter_mut() {
                *r = (1.0 + *r) * combined - 1.0;
            }
        }
    }

    tracing::debug!(
        days,
        advisory_fee,
        fee_drags = drags.len(),
        ?cascade,
        "compounded daily returns"
    );

    Ok(ReturnSeries {
        dates: prices.dates()[1..].to_vec(),
        returns: net,
    })
}
