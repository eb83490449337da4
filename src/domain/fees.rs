//! Fee profile and current-versus-model fee comparison.

use std::collections::HashMap;

use crate::domain::weights::{Weights, weighted_average};

/// Fund-level expense ratios plus the portfolio-level advisory fee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeProfile {
    pub expense_ratios: HashMap<String, f64>,
    pub advisory_fee: f64,
}

impl FeeProfile {
    pub fn expense_ratio(&self, ticker: &str) -> f64 {
        self.expense_ratios.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn weighted_expense_ratio(&self, weights: &Weights) -> f64 {
        weighted_average(weights, &self.expense_ratios)
    }

    pub fn total_fee_rate(&self, weights: &Weights) -> f64 {
        self.weighted_expense_ratio(weights) + self.advisory_fee
    }
}

/// Annual rates for one side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRates {
    pub weighted_expense_ratio: f64,
    pub advisory_fee: f64,
    pub gross_annual_return: f64,
}

impl FeeRates {
    pub fn total(&self) -> f64 {
        self.weighted_expense_ratio + self.advisory_fee
    }

    pub fn net_annual_return(&self) -> f64 {
        self.gross_annual_return - self.total()
    }
}

/// Dollar savings from moving the current portfolio to the model. Positive
/// values mean the model is cheaper.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeComparison {
    pub years: u32,
    pub annual_advisory_savings: f64,
    pub annual_expense_savings: f64,
    pub advisory_savings: f64,
    pub expense_savings: f64,
    pub current_gross_final: f64,
    pub current_net_final: f64,
    pub model_gross_final: f64,
    pub model_net_final: f64,
}

impl FeeComparison {
    pub fn compute(current: &FeeRates, model: &FeeRates, investment: f64, years: u32) -> Self {
        let annual_advisory_savings = (current.advisory_fee - model.advisory_fee) * investment;
        let annual_expense_savings =
            (current.weighted_expense_ratio - model.weighted_expense_ratio) * investment;
        let grow = |rate: f64| investment * (1.0 + rate).powi(years as i32);

        FeeComparison {
            years,
            annual_advisory_savings,
            annual_expense_savings,
            advisory_savings: annual_advisory_savings * years as f64,
            expense_savings: annual_expense_savings * years as f64,
            current_gross_final: grow(current.gross_annual_return),
            current_net_final: grow(current.net_annual_return()),
            model_gross_final: grow(model.gross_annual_return),
            model_net_final: grow(model.net_annual_return()),
        }
    }

    pub fn annual_total_savings(&self) -> f64 {
        self.annual_advisory_savings + self.annual_expense_savings
    }

    pub fn total_savings(&self) -> f64 {
        self.advisory_savings + self.expense_savings
    }
}
