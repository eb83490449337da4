//! Run-level analysis settings.

use chrono::NaiveDate;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::asset_class::AssetClass;
use crate::domain::returns::FeeCascade;
use crate::domain::stats::DEFAULT_RISK_FREE_RATE;

pub const DEFAULT_PROJECTION_YEARS: u32 = 10;
pub const DEFAULT_ADVISORY_FEE: f64 = 0.0;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// How tickers left unclassified by every rule are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownPolicy {
    #[default]
    Prompt,
    Default,
    Strict,
}

impl FromStr for UnknownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prompt" => Ok(UnknownPolicy::Prompt),
            "default" => Ok(UnknownPolicy::Default),
            "strict" => Ok(UnknownPolicy::Strict),
            other => Err(format!(
                "unknown policy '{other}' (expected prompt, default or strict)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub risk_free_rate: f64,
    pub projection_years: u32,
    pub fee_cascade: FeeCascade,
    pub unknown_policy: UnknownPolicy,
    pub default_class: AssetClass,
}

impl AnalysisConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            projection_years: DEFAULT_PROJECTION_YEARS,
            fee_cascade: FeeCascade::default(),
            unknown_policy: UnknownPolicy::default(),
            default_class: AssetClass::Alternatives,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub path: std::path::PathBuf,
    pub cache_ttl: Duration,
    pub workers: usize,
}
