//! Configuration validation.
//!
//! Validates every config field before any data is fetched.

use crate::domain::asset_class::AssetClass;
use crate::domain::analysis::UnknownPolicy;
use crate::domain::error::ModelfolioError;
use crate::domain::holdings::parse_holdings;
use crate::domain::returns::FeeCascade;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const MAX_PROJECTION_YEARS: i64 = 100;

/// Runs every section validator. `require_holdings` is false when holdings
/// come from the command line instead of `[portfolio]`.
pub fn validate_config(
    config: &dyn ConfigPort,
    require_holdings: bool,
) -> Result<(), ModelfolioError> {
    validate_portfolio_config(config, require_holdings)?;
    validate_analysis_config(config)?;
    validate_classification_config(config)?;
    validate_assumption_overrides(config)?;
    validate_data_config(config)?;
    Ok(())
}

pub fn validate_portfolio_config(
    config: &dyn ConfigPort,
    require_holdings: bool,
) -> Result<(), ModelfolioError> {
    validate_advisory_fee(config)?;
    match config.get_string("portfolio", "holdings") {
        Some(raw) if !raw.trim().is_empty() => validate_holdings(&raw),
        _ if require_holdings => Err(ModelfolioError::ConfigMissing {
            section: "portfolio".to_string(),
            key: "holdings".to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    validate_dates(config)?;
    validate_risk_free_rate(config)?;
    validate_projection_years(config)?;
    validate_fee_cascade(config)?;
    validate_unknown_policy(config)?;
    Ok(())
}

/// Every `[classification]` value must name an asset class.
pub fn validate_classification_config(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    for key in config.section_keys("classification") {
        let value = config.get_string("classification", &key).unwrap_or_default();
        value
            .parse::<AssetClass>()
            .map_err(|e| invalid("classification", &key, e.to_string()))?;
    }
    Ok(())
}

/// `[growth_rates]` and `[volatility]` keys must be asset classes with
/// numeric values; volatilities must be non-negative.
pub fn validate_assumption_overrides(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    for section in ["growth_rates", "volatility"] {
        for key in config.section_keys(section) {
            key.parse::<AssetClass>()
                .map_err(|e| invalid(section, &key, e.to_string()))?;
            let value = parse_optional_f64(config, section, &key)?.unwrap_or(f64::NAN);
            if !value.is_finite() {
                return Err(invalid(section, &key, "value must be a finite number".into()));
            }
            if section == "volatility" && value < 0.0 {
                return Err(invalid(section, &key, "volatility must be non-negative".into()));
            }
        }
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    if config.get_string("data", "path").is_some_and(|path| path.trim().is_empty()) {
        return Err(invalid("data", "path", "path must not be empty".into()));
    }
    if parse_optional_i64(config, "data", "cache_ttl_secs")?.is_some_and(|ttl| ttl < 0) {
        return Err(invalid(
            "data",
            "cache_ttl_secs",
            "cache_ttl_secs must be non-negative".into(),
        ));
    }
    if parse_optional_i64(config, "data", "workers")?.is_some_and(|workers| workers < 1) {
        return Err(invalid("data", "workers", "workers must be at least 1".into()));
    }
    Ok(())
}

fn validate_advisory_fee(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    let fee = parse_optional_f64(config, "portfolio", "advisory_fee")?;
    if fee.is_some_and(|fee| !(0.0..1.0).contains(&fee)) {
        return Err(invalid(
            "portfolio",
            "advisory_fee",
            "advisory_fee must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

fn validate_holdings(raw: &str) -> Result<(), ModelfolioError> {
    let holdings =
        parse_holdings(raw).map_err(|e| invalid("portfolio", "holdings", e.to_string()))?;
    if holdings.is_empty() || holdings.total() <= 0.0 {
        return Err(invalid(
            "portfolio",
            "holdings",
            "total investment must be positive".into(),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    let start_str = config.get_string("analysis", "start_date");
    let end_str = config.get_string("analysis", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "analysis",
            "start_date",
            "start_date must be before end_date".into(),
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, ModelfolioError> {
    match value {
        None => Err(ModelfolioError::ConfigMissing {
            section: "analysis".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "analysis",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    let rate = parse_optional_f64(config, "analysis", "risk_free_rate")?;
    if rate.is_some_and(|rate| !(0.0..1.0).contains(&rate)) {
        return Err(invalid(
            "analysis",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

fn validate_projection_years(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    let years = parse_optional_i64(config, "analysis", "projection_years")?;
    if years.is_some_and(|years| !(0..=MAX_PROJECTION_YEARS).contains(&years)) {
        return Err(invalid(
            "analysis",
            "projection_years",
            format!("projection_years must be between 0 and {MAX_PROJECTION_YEARS}"),
        ));
    }
    Ok(())
}

fn validate_fee_cascade(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    if let Some(raw) = config.get_string("analysis", "fee_cascade") {
        raw.parse::<FeeCascade>()
            .map_err(|e| invalid("analysis", "fee_cascade", e))?;
    }
    Ok(())
}

fn validate_unknown_policy(config: &dyn ConfigPort) -> Result<(), ModelfolioError> {
    if let Some(raw) = config.get_string("analysis", "unknown_policy") {
        raw.parse::<UnknownPolicy>()
            .map_err(|e| invalid("analysis", "unknown_policy", e))?;
    }
    if let Some(raw) = config.get_string("analysis", "default_class") {
        raw.parse::<AssetClass>()
            .map_err(|e| invalid("analysis", "default_class", e.to_string()))?;
    }
    Ok(())
}

/// Reads an optional float, rejecting values that are present but not numeric.
pub fn parse_optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, ModelfolioError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
    }
}

pub fn parse_optional_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, ModelfolioError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{}' is not an integer", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: String) -> ModelfolioError {
    ModelfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
