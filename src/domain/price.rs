//! Aligned daily close-price history for a set of tickers.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::error::ModelfolioError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Close prices on a shared date index. Every ticker has one price per date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    dates: Vec<NaiveDate>,
    closes: BTreeMap<String, Vec<f64>>,
}

impl PriceHistory {
    /// Builds a history from columns already on the same date index.
    pub fn new(
        dates: Vec<NaiveDate>,
        closes: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, ModelfolioError> {
        for (ticker, column) in &closes {
            if column.len() != dates.len() {
                return Err(ModelfolioError::NoData {
                    reason: format!(
                        "{ticker} has {} prices for {} dates",
                        column.len(),
                        dates.len()
                    ),
                });
            }
        }
        Ok(Self { dates, closes })
    }

    /// Aligns per-ticker series onto a common index: starts at the latest
    /// first date across tickers and keeps only dates every ticker has.
    pub fn align(series: &BTreeMap<String, Vec<PricePoint>>) -> Self {
        let latest_start = series
            .values()
            .filter_map(|points| points.iter().map(|p| p.date).min())
            .max();

        let Some(latest_start) = latest_start else {
            return Self {
                dates: Vec::new(),
                closes: series.keys().map(|t| (t.clone(), Vec::new())).collect(),
            };
        };

        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for points in series.values() {
            let dates: BTreeSet<NaiveDate> = points
                .iter()
                .map(|p| p.date)
                .filter(|d| *d >= latest_start)
                .collect();
            common = Some(match common {
                Some(existing) => existing.intersection(&dates).copied().collect(),
                None => dates,
            });
        }
        let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();

        let closes = series
            .iter()
            .map(|(ticker, points)| {
                let by_date: BTreeMap<NaiveDate, f64> =
                    points.iter().map(|p| (p.date, p.close)).collect();
                let column = dates
                    .iter()
                    .filter_map(|d| by_date.get(d).copied())
                    .collect();
                (ticker.clone(), column)
            })
            .collect();

        Self { dates, closes }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn closes(&self, ticker: &str) -> Option<&[f64]> {
        self.closes.get(ticker).map(|c| c.as_slice())
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.closes.keys().map(|t| t.as_str())
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.closes.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Per-ticker percentage change; the first, undefined observation is dropped.
    pub fn pct_change(&self, ticker: &str) -> Option<Vec<f64>> {
        self.closes.get(ticker).map(|column| {
            column
                .windows(2)
                .map(|w| (w[1] - w[0]) / w[0])
                .collect()
        })
    }

    /// Total return per ticker between the first and last observation.
    pub fn individual_returns(&self) -> BTreeMap<String, f64> {
        self.closes
            .iter()
            .filter_map(|(ticker, column)| {
                let first = *column.first()?;
                let last = *column.last()?;
                Some((ticker.clone(), (last - first) / first))
            })
            .collect()
    }
}
