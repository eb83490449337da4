//! Weight derivation and asset-class aggregation.

use std::collections::{BTreeMap, HashMap};

use crate::domain::asset_class::AssetClassAllocation;
use crate::domain::classifier::ClassificationMap;
use crate::domain::error::ModelfolioError;
use crate::domain::holdings::Holdings;

/// Ticker to fraction of total value. Non-negative, sums to 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights {
    values: BTreeMap<String, f64>,
}

impl Weights {
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.values.get(ticker).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(t, &w)| (t.as_str(), w))
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|t| t.as_str())
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.values.contains_key(ticker)
    }

    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Weights {
            values: iter.into_iter().collect(),
        }
    }
}

/// `weight(t) = dollars(t) / total`.
pub fn compute_weights(holdings: &Holdings) -> Result<Weights, ModelfolioError> {
    if let Some(h) = holdings.iter().find(|h| h.dollar_amount < 0.0) {
        return Err(ModelfolioError::InvalidPortfolio {
            reason: format!("negative dollar amount for {}: {}", h.ticker, h.dollar_amount),
        });
    }
    if let Some(h) = holdings.iter().find(|h| !h.dollar_amount.is_finite()) {
        return Err(ModelfolioError::InvalidPortfolio {
            reason: format!("non-finite dollar amount for {}", h.ticker),
        });
    }

    let total = holdings.total();
    if total <= 0.0 {
        return Err(ModelfolioError::InvalidPortfolio {
            reason: format!("total investment must be positive, got {total}"),
        });
    }

    Ok(holdings
        .iter()
        .map(|h| (h.ticker.clone(), h.dollar_amount / total))
        .collect())
}

/// Sums weights by class using a single classification map snapshot.
pub fn asset_class_allocation(
    weights: &Weights,
    classifications: &ClassificationMap,
) -> Result<AssetClassAllocation, ModelfolioError> {
    let mut allocation = AssetClassAllocation::new();
    for (ticker, weight) in weights.iter() {
        let class = classifications
            .get(ticker)
            .ok_or_else(|| ModelfolioError::InvalidPortfolio {
                reason: format!("no classification for {ticker}"),
            })?;
        allocation.add(class, weight);
    }
    Ok(allocation)
}

/// Σ weight(t)·rate(t); tickers without a rate contribute 0.
pub fn weighted_average(weights: &Weights, rates: &HashMap<String, f64>) -> f64 {
    weights
        .iter()
        .map(|(ticker, w)| w * rates.get(ticker).copied().unwrap_or(0.0))
        .sum()
}
