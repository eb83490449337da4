//! Market data access port.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::classifier::InstrumentMetadata;
use crate::domain::error::ModelfolioError;
use crate::domain::price::PricePoint;

/// Source of prices, fund fees and instrument metadata.
///
/// Implementations report collaborator failures as
/// [`ModelfolioError::DataSource`]; the core never retries.
pub trait MarketDataPort {
    /// Daily closes per ticker, inclusive of both bounds. Series are not
    /// assumed to share a start date or be gap-free.
    fn get_price_history(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>, ModelfolioError>;

    fn get_current_price(&self, ticker: &str) -> Result<f64, ModelfolioError>;

    /// Annual expense ratio in `[0, 1)`, or `None` when the source has none.
    fn get_expense_ratio(&self, ticker: &str) -> Result<Option<f64>, ModelfolioError>;

    fn get_instrument_metadata(&self, ticker: &str)
        -> Result<InstrumentMetadata, ModelfolioError>;
}
