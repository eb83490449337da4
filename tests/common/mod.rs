#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use modelfolio::domain::asset_class::AssetClass;
use modelfolio::domain::classifier::InstrumentMetadata;
use modelfolio::domain::error::ModelfolioError;
pub use modelfolio::domain::price::PricePoint;
use modelfolio::ports::market_data_port::MarketDataPort;
use modelfolio::ports::prompt_port::ClassificationPrompt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub struct MockMarketData {
    pub closes: HashMap<String, Vec<PricePoint>>,
    pub expense_ratios: HashMap<String, f64>,
    pub metadata: HashMap<String, InstrumentMetadata>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            expense_ratios: HashMap::new(),
            metadata: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.closes.insert(ticker.to_string(), points);
        self
    }

    /// `days` consecutive closes at `price` starting on `start`.
    pub fn with_flat(self, ticker: &str, start: &str, days: usize, price: f64) -> Self {
        let closes = vec![price; days];
        self.with_series(ticker, start, &closes)
    }

    /// One close per consecutive calendar day starting on `start`.
    pub fn with_series(self, ticker: &str, start: &str, closes: &[f64]) -> Self {
        let first = date(start);
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: first + Duration::days(i as i64),
                close,
            })
            .collect();
        self.with_closes(ticker, points)
    }

    pub fn with_expense_ratio(mut self, ticker: &str, er: f64) -> Self {
        self.expense_ratios.insert(ticker.to_string(), er);
        self
    }

    pub fn with_metadata(mut self, ticker: &str, metadata: InstrumentMetadata) -> Self {
        self.metadata.insert(ticker.to_string(), metadata);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), ModelfolioError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(ModelfolioError::DataSource {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl MarketDataPort for MockMarketData {
    fn get_price_history(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>, ModelfolioError> {
        let mut out = BTreeMap::new();
        for ticker in tickers {
            self.check(ticker)?;
            let points = self
                .closes
                .get(ticker)
                .map(|points| {
                    points
                        .iter()
                        .filter(|p| p.date >= start && p.date <= end)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            out.insert(ticker.clone(), points);
        }
        Ok(out)
    }

    fn get_current_price(&self, ticker: &str) -> Result<f64, ModelfolioError> {
        self.check(ticker)?;
        self.closes
            .get(ticker)
            .and_then(|points| points.last())
            .map(|p| p.close)
            .ok_or_else(|| ModelfolioError::DataSource {
                reason: format!("no prices for {ticker}"),
            })
    }

    fn get_expense_ratio(&self, ticker: &str) -> Result<Option<f64>, ModelfolioError> {
        self.check(ticker)?;
        Ok(self.expense_ratios.get(ticker).copied())
    }

    fn get_instrument_metadata(&self, ticker: &str) -> Result<InstrumentMetadata, ModelfolioError> {
        self.check(ticker)?;
        Ok(self.metadata.get(ticker).cloned().unwrap_or_default())
    }
}

/// Answers every prompt with a fixed class and records the tickers asked about.
pub struct FixedPrompt {
    pub answer: AssetClass,
    pub asked: Mutex<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: AssetClass) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl ClassificationPrompt for FixedPrompt {
    fn choose(&self, ticker: &str, _options: &[AssetClass]) -> Result<AssetClass, ModelfolioError> {
        self.asked.lock().unwrap().push(ticker.to_string());
        Ok(self.answer)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Flat prices for every catalog ticker plus `extra`, over `days` days from 2024-01-01.
pub fn flat_market(extra: &[&str], days: usize) -> MockMarketData {
    ["VTI", "VXUS", "BND", "VNQ", "GLD"]
        .iter()
        .chain(extra.iter())
        .fold(MockMarketData::new(), |market, ticker| {
            market.with_flat(ticker, "2024-01-01", days, 100.0)
        })
}
