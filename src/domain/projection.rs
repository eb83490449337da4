//! Forward projections from static class assumptions.
//!
//! Fees are deducted once per year as a simple charge on the year's starting
//! value. The historical path compounds fees daily over 252 trading days; the
//! projection deliberately does not.

use std::collections::HashMap;

use crate::domain::asset_class::{AssetClass, AssetClassAllocation};
use crate::domain::reference::ReferenceTables;
use crate::domain::stats::SharpeRatio;

#[derive(Debug, Clone, PartialEq)]
pub struct YearProjection {
    pub year: u32,
    pub starting_value: f64,
    pub growth: f64,
    pub fees: f64,
    pub ending_value: f64,
}

impl YearProjection {
    pub fn cumulative_return(&self) -> f64 {
        self.ending_value - 1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub weighted_annual_return: f64,
    pub fee_rate: f64,
    pub total_projected_return: f64,
    pub starting_value: f64,
    pub final_value: f64,
    pub total_fees: f64,
    pub years: Vec<YearProjection>,
}

/// `Σ allocation[class] * growth[class]` over classes with a growth rate,
/// accumulated in `AssetClass::ALL` order.
pub fn weighted_annual_return(
    allocation: &AssetClassAllocation,
    growth_rates: &HashMap<AssetClass, f64>,
) -> f64 {
    AssetClass::ALL
        .iter()
        .filter_map(|class| growth_rates.get(class).map(|rate| allocation.get(*class) * rate))
        .sum()
}

/// Fee-naive projection of one unit of currency.
pub fn project(
    allocation: &AssetClassAllocation,
    growth_rates: &HashMap<AssetClass, f64>,
    years: u32,
) -> ProjectionResult {
    project_with_fees(allocation, growth_rates, 0.0, years)
}

/// Projection of one unit with `fee_rate` charged on each year's starting
/// value: `ending = starting * (1 + r) - starting * fee_rate`.
pub fn project_with_fees(
    allocation: &AssetClassAllocation,
    growth_rates: &HashMap<AssetClass, f64>,
    fee_rate: f64,
    years: u32,
) -> ProjectionResult {
    let rate = weighted_annual_return(allocation, growth_rates);
    let starting_value = 1.0;

    let mut value = starting_value;
    let mut total_fees = 0.0;
    let mut yearly = Vec::with_capacity(years as usize);
    for year in 1..=years {
        let growth = value * rate;
        let fees = value * fee_rate;
        let ending_value = value + growth - fees;
        yearly.push(YearProjection {
            year,
            starting_value: value,
            growth,
            fees,
            ending_value,
        });
        total_fees += fees;
        value = ending_value;
    }

    let total_projected_return = if fee_rate == 0.0 {
        (1.0 + rate).powi(years as i32) - 1.0
    } else {
        value / starting_value - 1.0
    };

    ProjectionResult {
        weighted_annual_return: rate,
        fee_rate,
        total_projected_return,
        starting_value,
        final_value: value,
        total_fees,
        years: yearly,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardMetrics {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: SharpeRatio,
}

/// Expected return, uncorrelated class volatility and Sharpe estimate.
pub fn forward_metrics(
    allocation: &AssetClassAllocation,
    tables: &ReferenceTables,
    risk_free_rate: f64,
) -> ForwardMetrics {
    let expected_return = weighted_annual_return(allocation, &tables.growth_rates);
    let variance: f64 = allocation
        .iter()
        .map(|(class, weight)| {
            let vol = tables.volatility(class);
            weight * weight * vol * vol
        })
        .sum();
    let volatility = variance.sqrt();

    ForwardMetrics {
        expected_return,
        volatility,
        sharpe_ratio: SharpeRatio::from_parts(expected_return - risk_free_rate, volatility),
    }
}
