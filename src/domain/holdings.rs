//! Dollar holdings and holdings-list parsing.

use std::collections::HashSet;

use crate::domain::reference::ModelPortfolio;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub dollar_amount: f64,
}

/// Ticker to dollar amount, in input order. Tickers are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    entries: Vec<Holding>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HoldingsError {
    #[error("empty token in holdings list")]
    EmptyToken,

    #[error("expected TICKER:AMOUNT, got '{0}'")]
    MissingSeparator(String),

    #[error("invalid amount for {ticker}: '{value}'")]
    InvalidAmount { ticker: String, value: String },

    #[error("negative amount for {ticker}: {amount}")]
    NegativeAmount { ticker: String, amount: f64 },

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a holding, rejecting duplicate tickers.
    pub fn insert(&mut self, ticker: &str, dollar_amount: f64) -> Result<(), HoldingsError> {
        let ticker = ticker.trim().to_uppercase();
        if self.entries.iter().any(|h| h.ticker == ticker) {
            return Err(HoldingsError::DuplicateTicker(ticker));
        }
        self.entries.push(Holding {
            ticker,
            dollar_amount,
        });
        Ok(())
    }

    /// Converts a model's ticker weights into dollar holdings worth `total_value`.
    pub fn from_model(model: &ModelPortfolio, total_value: f64) -> Self {
        Holdings {
            entries: model
                .weights
                .iter()
                .map(|(ticker, weight)| Holding {
                    ticker: ticker.clone(),
                    dollar_amount: total_value * weight,
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.entries.iter()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.entries.iter().map(|h| h.ticker.clone()).collect()
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|h| h.ticker == ticker)
            .map(|h| h.dollar_amount)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|h| h.dollar_amount).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses `"VOO:20000, VXUS:10000"` into holdings. Tickers are upper-cased.
pub fn parse_holdings(input: &str) -> Result<Holdings, HoldingsError> {
    let mut holdings = Holdings::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(HoldingsError::EmptyToken);
        }
        let (ticker, amount) = trimmed
            .split_once(':')
            .ok_or_else(|| HoldingsError::MissingSeparator(trimmed.to_string()))?;

        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(HoldingsError::MissingSeparator(trimmed.to_string()));
        }
        let amount_str = amount.trim();
        let amount: f64 = amount_str
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| HoldingsError::InvalidAmount {
                ticker: ticker.clone(),
                value: amount_str.to_string(),
            })?;
        if amount < 0.0 {
            return Err(HoldingsError::NegativeAmount { ticker, amount });
        }
        if !seen.insert(ticker.clone()) {
            return Err(HoldingsError::DuplicateTicker(ticker));
        }
        holdings.insert(&ticker, amount)?;
    }

    Ok(holdings)
}
