//! Portfolio composition: gathers market data at the boundary, then runs the
//! weight, classification, return, statistics and projection stages over it.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::domain::asset_class::{AssetClass, AssetClassAllocation};
use crate::domain::classifier::{
    ClassificationMap, ClassificationResolver, Classifier, InstrumentMetadata,
};
use crate::domain::error::ModelfolioError;
use crate::domain::fees::{FeeProfile, FeeRates};
use crate::domain::holdings::Holdings;
use crate::domain::price::PriceHistory;
use crate::domain::projection::{self, ForwardMetrics, ProjectionResult};
use crate::domain::reference::{ModelPortfolio, ReferenceTables};
use crate::domain::returns::{self, FeeCascade};
use crate::domain::stats::{self, PerformanceStats};
use crate::domain::weights::{Weights, asset_class_allocation, compute_weights};
use crate::ports::market_data_port::MarketDataPort;

pub const MIN_WORKERS: usize = 3;
pub const MAX_WORKERS: usize = 10;
pub const DEFAULT_WORKERS: usize = 3;

/// Collaborators needed to build a [`Portfolio`].
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub market: &'a (dyn MarketDataPort + Sync),
    pub classifier: &'a Classifier,
    pub overrides: &'a HashMap<String, AssetClass>,
    pub resolver: ClassificationResolver<'a>,
    pub workers: usize,
}

/// Per-ticker data fetched once when a portfolio is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub prices: HashMap<String, f64>,
    pub expense_ratios: HashMap<String, f64>,
    pub metadata: HashMap<String, InstrumentMetadata>,
}

/// Fetches current prices, expense ratios and metadata concurrently on a
/// bounded pool. Any failure fails the whole snapshot.
pub fn fetch_snapshot(
    market: &(dyn MarketDataPort + Sync),
    tickers: &[String],
    workers: usize,
) -> Result<MarketSnapshot, ModelfolioError> {
    let threads = workers.clamp(MIN_WORKERS, MAX_WORKERS);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ModelfolioError::DataSource {
            reason: format!("failed to start fetch pool: {e}"),
        })?;

    tracing::info!(tickers = tickers.len(), threads, "fetching market snapshot");

    let (prices, (expense_ratios, metadata)) = pool.install(|| {
        rayon::join(
            || fetch_prices(market, tickers),
            || {
                rayon::join(
                    || fetch_expense_ratios(market, tickers),
                    || fetch_metadata(market, tickers),
                )
            },
        )
    });

    Ok(MarketSnapshot {
        prices: prices?,
        expense_ratios: expense_ratios?,
        metadata: metadata?,
    })
}

fn fetch_prices(
    market: &(dyn MarketDataPort + Sync),
    tickers: &[String],
) -> Result<HashMap<String, f64>, ModelfolioError> {
    tickers
        .par_iter()
        .map(|ticker| -> Result<(String, f64), ModelfolioError> {
            let price = market.get_current_price(ticker)?;
            if !price.is_finite() || price <= 0.0 {
                return Err(ModelfolioError::DataSource {
                    reason: format!("non-positive current price for {ticker}: {price}"),
                });
            }
            Ok((ticker.clone(), price))
        })
        .collect()
}

fn fetch_expense_ratios(
    market: &(dyn MarketDataPort + Sync),
    tickers: &[String],
) -> Result<HashMap<String, f64>, ModelfolioError> {
    tickers
        .par_iter()
        .map(|ticker| -> Result<(String, f64), ModelfolioError> {
            let er = match market.get_expense_ratio(ticker)? {
                Some(er) => er,
                None => {
                    tracing::warn!(%ticker, "no expense ratio, assuming 0");
                    0.0
                }
            };
            if !er.is_finite() || !(0.0..1.0).contains(&er) {
                return Err(ModelfolioError::DataSource {
                    reason: format!("expense ratio for {ticker} outside [0, 1): {er}"),
                });
            }
            Ok((ticker.clone(), er))
        })
        .collect()
}

fn fetch_metadata(
    market: &(dyn MarketDataPort + Sync),
    tickers: &[String],
) -> Result<HashMap<String, InstrumentMetadata>, ModelfolioError> {
    tickers
        .par_iter()
        .map(|ticker| -> Result<(String, InstrumentMetadata), ModelfolioError> {
            Ok((ticker.clone(), market.get_instrument_metadata(ticker)?))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalAnalysis {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub with_fees: PerformanceStats,
    pub without_advisory: PerformanceStats,
    pub cumulative_with_fees: Vec<f64>,
    pub cumulative_without_advisory: Vec<f64>,
    pub individual_returns: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingSummary {
    pub ticker: String,
    pub dollar_amount: f64,
    pub weight: f64,
    pub price: f64,
    pub shares: f64,
    pub expense_ratio: f64,
    pub asset_class: Option<AssetClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub name: String,
    pub total_value: f64,
    pub holdings: Vec<HoldingSummary>,
    pub allocation: AssetClassAllocation,
    pub weighted_expense_ratio: f64,
    pub advisory_fee: f64,
    pub total_fee_rate: f64,
}

/// A fully initialised portfolio. Construction either succeeds with every
/// stage populated or fails; there is no partial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    name: String,
    holdings: Holdings,
    weights: Weights,
    classifications: ClassificationMap,
    allocation: AssetClassAllocation,
    fees: FeeProfile,
    prices: HashMap<String, f64>,
}

impl Portfolio {
    pub fn build(
        name: &str,
        holdings: Holdings,
        advisory_fee: f64,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, ModelfolioError> {
        if !advisory_fee.is_finite() || !(0.0..1.0).contains(&advisory_fee) {
            return Err(ModelfolioError::InvalidPortfolio {
                reason: format!("advisory fee {advisory_fee} outside [0, 1)"),
            });
        }

        let weights = compute_weights(&holdings)?;
        let tickers = holdings.tickers();
        let snapshot = fetch_snapshot(ctx.market, &tickers, ctx.workers)?;

        let classifications = ctx.classifier.classify_all(
            &tickers,
            &snapshot.metadata,
            ctx.overrides,
            ctx.resolver,
        )?;
        let allocation = asset_class_allocation(&weights, &classifications)?;

        tracing::info!(
            portfolio = name,
            holdings = holdings.len(),
            total = holdings.total(),
            "portfolio built"
        );

        Ok(Self {
            name: name.to_string(),
            holdings,
            weights,
            classifications,
            allocation,
            fees: FeeProfile {
                expense_ratios: snapshot.expense_ratios,
                advisory_fee,
            },
            prices: snapshot.prices,
        })
    }

    /// Builds a model portfolio worth `total_value` through the same pipeline.
    pub fn from_model(
        model: &ModelPortfolio,
        total_value: f64,
        advisory_fee: f64,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, ModelfolioError> {
        Self::build(
            &model.name,
            Holdings::from_model(model, total_value),
            advisory_fee,
            ctx,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn classifications(&self) -> &ClassificationMap {
        &self.classifications
    }

    pub fn allocation(&self) -> &AssetClassAllocation {
        &self.allocation
    }

    pub fn fees(&self) -> &FeeProfile {
        &self.fees
    }

    pub fn total_value(&self) -> f64 {
        self.holdings.total()
    }

    pub fn current_price(&self, ticker: &str) -> Option<f64> {
        self.prices.get(ticker).copied()
    }

    pub fn weighted_expense_ratio(&self) -> f64 {
        self.fees.weighted_expense_ratio(&self.weights)
    }

    pub fn total_fee_rate(&self) -> f64 {
        self.fees.total_fee_rate(&self.weights)
    }

    /// Compounds the aligned history twice, once with the advisory fee and
    /// once without it. Expense ratios apply to both.
    pub fn analyze_historical_performance(
        &self,
        market: &dyn MarketDataPort,
        start: NaiveDate,
        end: NaiveDate,
        risk_free_rate: f64,
        cascade: FeeCascade,
    ) -> Result<HistoricalAnalysis, ModelfolioError> {
        let tickers = self.holdings.tickers();
        let series = market.get_price_history(&tickers, start, end)?;
        let history = PriceHistory::align(&series);

        if let Some(first) = history.first_date().filter(|first| *first > start) {
            tracing::info!(requested = %start, actual = %first, "start date moved to common range");
        }

        let with_fees = returns::compound(
            &history,
            &self.weights,
            self.fees.advisory_fee,
            &self.fees.expense_ratios,
            cascade,
        )?;
        let without_advisory = returns::compound(
            &history,
            &self.weights,
            0.0,
            &self.fees.expense_ratios,
            cascade,
        )?;

        let (with_stats, with_curve) = stats::compute(&with_fees, risk_free_rate)?;
        let (without_stats, without_curve) = stats::compute(&without_advisory, risk_free_rate)?;

        let (Some(start_date), Some(end_date)) = (history.first_date(), history.last_date())
        else {
            return Err(ModelfolioError::NoData {
                reason: "aligned price history is empty".into(),
            });
        };

        Ok(HistoricalAnalysis {
            start_date,
            end_date,
            dates: with_fees.dates,
            with_fees: with_stats,
            without_advisory: without_stats,
            cumulative_with_fees: with_curve,
            cumulative_without_advisory: without_curve,
            individual_returns: history.individual_returns(),
        })
    }

    pub fn project_future_returns(&self, tables: &ReferenceTables, years: u32) -> ProjectionResult {
        projection::project(&self.allocation, &tables.growth_rates, years)
    }

    /// Projection net of the weighted expense ratio plus the advisory fee.
    pub fn project_future_with_fees(
        &self,
        tables: &ReferenceTables,
        years: u32,
    ) -> ProjectionResult {
        projection::project_with_fees(
            &self.allocation,
            &tables.growth_rates,
            self.total_fee_rate(),
            years,
        )
    }

    pub fn forward_metrics(&self, tables: &ReferenceTables, risk_free_rate: f64) -> ForwardMetrics {
        projection::forward_metrics(&self.allocation, tables, risk_free_rate)
    }

    pub fn fee_rates(&self, tables: &ReferenceTables) -> FeeRates {
        FeeRates {
            weighted_expense_ratio: self.weighted_expense_ratio(),
            advisory_fee: self.fees.advisory_fee,
            gross_annual_return: projection::weighted_annual_return(
                &self.allocation,
                &tables.growth_rates,
            ),
        }
    }

    pub fn summary(&self) -> PortfolioSummary {
        let holdings = self
            .holdings
            .iter()
            .map(|h| {
                let price = self.current_price(&h.ticker).unwrap_or(0.0);
                HoldingSummary {
                    ticker: h.ticker.clone(),
                    dollar_amount: h.dollar_amount,
                    weight: self.weights.get(&h.ticker).unwrap_or(0.0),
                    price,
                    shares: if price > 0.0 { h.dollar_amount / price } else { 0.0 },
                    expense_ratio: self.fees.expense_ratio(&h.ticker),
                    asset_class: self.classifications.get(&h.ticker),
                }
            })
            .collect();

        PortfolioSummary {
            name: self.name.clone(),
            total_value: self.total_value(),
            holdings,
            allocation: self.allocation.clone(),
            weighted_expense_ratio: self.weighted_expense_ratio(),
            advisory_fee: self.fees.advisory_fee,
            total_fee_rate: self.total_fee_rate(),
        }
    }
}
