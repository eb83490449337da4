//! CSV directory market data adapter.
//!
//! Layout under the base directory:
//! - `<TICKER>.csv` with `date,close` rows (`%Y-%m-%d`)
//! - optional `instruments.csv` with
//!   `ticker,expense_ratio,category,asset_class,country,quote_type`

use crate::domain::classifier::InstrumentMetadata;
use crate::domain::error::ModelfolioError;
use crate::domain::price::PricePoint;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

const INSTRUMENTS_FILE: &str = "instruments.csv";

pub struct CsvMarketData {
    base_path: PathBuf,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker.to_uppercase()))
    }

    fn read_closes(&self, ticker: &str) -> Result<Vec<PricePoint>, ModelfolioError> {
        let path = self.price_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| ModelfolioError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ModelfolioError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| ModelfolioError::DataSource {
                reason: format!("missing date column in {}", path.display()),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                ModelfolioError::DataSource {
                    reason: format!("invalid date '{}' for {}: {}", date_str, ticker, e),
                }
            })?;

            let close: f64 = record
                .get(1)
                .ok_or_else(|| ModelfolioError::DataSource {
                    reason: format!("missing close column in {}", path.display()),
                })?
                .trim()
                .parse()
                .map_err(|e| ModelfolioError::DataSource {
                    reason: format!("invalid close value for {} on {}: {}", ticker, date, e),
                })?;
            if !close.is_finite() || close <= 0.0 {
                return Err(ModelfolioError::DataSource {
                    reason: format!("close for {} on {} must be positive, got {}", ticker, date, close),
                });
            }

            points.push(PricePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    /// Instrument rows keyed by upper-cased ticker. A missing file yields
    /// an empty table.
    fn read_instruments(&self) -> Result<HashMap<String, InstrumentRow>, ModelfolioError> {
        let path = self.base_path.join(INSTRUMENTS_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| ModelfolioError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| ModelfolioError::DataSource {
                reason: format!("CSV header error in {}: {}", path.display(), e),
            })?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        let ticker_col = column("ticker").ok_or_else(|| ModelfolioError::DataSource {
            reason: format!("{} has no ticker column", path.display()),
        })?;
        let er_col = column("expense_ratio");
        let category_col = column("category");
        let asset_class_col = column("asset_class");
        let country_col = column("country");
        let quote_type_col = column("quote_type");

        let mut rows = HashMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| ModelfolioError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let field = |col: Option<usize>| {
                col.and_then(|i| record.get(i))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };

            let Some(ticker) = field(Some(ticker_col)) else {
                continue;
            };
            let expense_ratio = match field(er_col) {
                Some(raw) => {
                    let er = raw.parse::<f64>().map_err(|e| ModelfolioError::DataSource {
                        reason: format!("invalid expense ratio for {}: {}", ticker, e),
                    })?;
                    if !er.is_finite() || !(0.0..1.0).contains(&er) {
                        return Err(ModelfolioError::DataSource {
                            reason: format!("expense ratio for {} outside [0, 1): {}", ticker, er),
                        });
                    }
                    Some(er)
                }
                None => None,
            };

            rows.insert(
                ticker.to_uppercase(),
                InstrumentRow {
                    expense_ratio,
                    category: field(category_col),
                    asset_class: field(asset_class_col),
                    country: field(country_col),
                    quote_type: field(quote_type_col),
                },
            );
        }
        Ok(rows)
    }

    /// Tickers with a price file, sorted.
    pub fn list_tickers(&self) -> Result<Vec<String>, ModelfolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ModelfolioError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModelfolioError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str == INSTRUMENTS_FILE {
                continue;
            }
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

#[derive(Debug, Clone, Default)]
struct InstrumentRow {
    expense_ratio: Option<f64>,
    category: Option<String>,
    asset_class: Option<String>,
    country: Option<String>,
    quote_type: Option<String>,
}

impl MarketDataPort for CsvMarketData {
    fn get_price_history(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<String, Vec<PricePoint>>, ModelfolioError> {
        let mut series = BTreeMap::new();
        for ticker in tickers {
            let points: Vec<PricePoint> = self
                .read_closes(ticker)?
                .into_iter()
                .filter(|p| p.date >= start && p.date <= end)
                .collect();
            tracing::debug!(%ticker, points = points.len(), "loaded price history");
            series.insert(ticker.clone(), points);
        }
        Ok(series)
    }

    fn get_current_price(&self, ticker: &str) -> Result<f64, ModelfolioError> {
        self.read_closes(ticker)?
            .last()
            .map(|p| p.close)
            .ok_or_else(|| ModelfolioError::DataSource {
                reason: format!("no prices for {}", ticker),
            })
    }

    fn get_expense_ratio(&self, ticker: &str) -> Result<Option<f64>, ModelfolioError> {
        Ok(self
            .read_instruments()?
            .get(&ticker.to_uppercase())
            .and_then(|row| row.expense_ratio))
    }

    fn get_instrument_metadata(&self, ticker: &str) -> Result<InstrumentMetadata, ModelfolioError> {
        let row = self
            .read_instruments()?
            .remove(&ticker.to_uppercase())
            .unwrap_or_default();
        Ok(InstrumentMetadata {
            category: row.category,
            asset_class: row.asset_class,
            country: row.country,
            quote_type: row.quote_type,
            expense_ratio: row.expense_ratio,
        })
    }
}
