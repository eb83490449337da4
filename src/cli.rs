//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::cached_market_data::CachedMarketData;
use crate::adapters::console_prompt::ConsolePrompt;
use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{
    AnalysisConfig, DEFAULT_ADVISORY_FEE, DEFAULT_CACHE_TTL_SECS, DataConfig, UnknownPolicy,
};
use crate::domain::asset_class::{AssetClass, AssetClassAllocation};
use crate::domain::classifier::{ClassificationResolver, ClassificationSource, Classifier};
use crate::domain::config_validation::{
    parse_date, parse_optional_f64, parse_optional_i64, validate_config,
};
use crate::domain::error::ModelfolioError;
use crate::domain::fees::FeeComparison;
use crate::domain::holdings::{Holdings, parse_holdings};
use crate::domain::matcher::{ModelMatch, best_match, model_allocation};
use crate::domain::portfolio::{BuildContext, DEFAULT_WORKERS, HistoricalAnalysis, Portfolio};
use crate::domain::projection::{ForwardMetrics, ProjectionResult};
use crate::domain::reference::{ModelCatalog, ReferenceTables};
use crate::domain::returns::FeeCascade;
use crate::domain::stats::PerformanceStats;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::prompt_port::ClassificationPrompt;

pub const DEFAULT_PORTFOLIO_NAME: &str = "Current Portfolio";

#[derive(Parser, Debug)]
#[command(name = "modelfolio", about = "Portfolio analytics and model-portfolio matching")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a portfolio against the closest model portfolio
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Holdings as TICKER:AMOUNT pairs, overriding [portfolio] holdings
        #[arg(long)]
        holdings: Option<String>,
        /// Market data directory, overriding [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Compare against this model instead of the best match
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List the model portfolio catalog
    Models,
    /// Show how tickers are classified
    Classify {
        #[arg(short, long)]
        ticker: Option<String>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            config,
            holdings,
            data,
            model,
        } => run_analyze(&config, holdings.as_deref(), data.as_deref(), model.as_deref()),
        Command::Models => run_models(),
        Command::Classify {
            ticker,
            data,
            config,
        } => run_classify(ticker.as_deref(), data.as_deref(), config.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ModelfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

fn fail(err: &ModelfolioError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn build_analysis_config(adapter: &dyn ConfigPort) -> Result<AnalysisConfig, ModelfolioError> {
    let start_date = parse_date(
        adapter.get_string("analysis", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("analysis", "end_date").as_deref(),
        "end_date",
    )?;

    let mut config = AnalysisConfig::new(start_date, end_date);
    if let Some(rate) = parse_optional_f64(adapter, "analysis", "risk_free_rate")? {
        config.risk_free_rate = rate;
    }
    if let Some(years) = parse_optional_i64(adapter, "analysis", "projection_years")? {
        config.projection_years = u32::try_from(years).map_err(|_| ModelfolioError::ConfigInvalid {
            section: "analysis".into(),
            key: "projection_years".into(),
            reason: "projection_years must be non-negative".into(),
        })?;
    }
    if let Some(raw) = adapter.get_string("analysis", "fee_cascade") {
        config.fee_cascade = raw.parse::<FeeCascade>().map_err(|reason| ModelfolioError::ConfigInvalid {
            section: "analysis".into(),
            key: "fee_cascade".into(),
            reason,
        })?;
    }
    if let Some(raw) = adapter.get_string("analysis", "unknown_policy") {
        config.unknown_policy = raw.parse::<UnknownPolicy>().map_err(|reason| ModelfolioError::ConfigInvalid {
            section: "analysis".into(),
            key: "unknown_policy".into(),
            reason,
        })?;
    }
    if let Some(raw) = adapter.get_string("analysis", "default_class") {
        config.default_class =
            raw.parse::<AssetClass>()
                .map_err(|e| ModelfolioError::ConfigInvalid {
                    section: "analysis".into(),
                    key: "default_class".into(),
                    reason: e.to_string(),
                })?;
    }
    Ok(config)
}

pub fn build_data_config(
    adapter: &dyn ConfigPort,
    path_override: Option<&Path>,
) -> Result<DataConfig, ModelfolioError> {
    let path = match path_override {
        Some(p) => p.to_path_buf(),
        None => adapter
            .get_string("data", "path")
            .filter(|p| !p.trim().is_empty())
            .map(|p| PathBuf::from(p.trim()))
            .ok_or_else(|| ModelfolioError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?,
    };

    let ttl_secs = parse_optional_i64(adapter, "data", "cache_ttl_secs")?
        .map(|secs| {
            u64::try_from(secs).map_err(|_| ModelfolioError::ConfigInvalid {
                section: "data".into(),
                key: "cache_ttl_secs".into(),
                reason: "cache_ttl_secs must be non-negative".into(),
            })
        })
        .transpose()?
        .unwrap_or(DEFAULT_CACHE_TTL_SECS);

    let workers = parse_optional_i64(adapter, "data", "workers")?
        .map(|w| usize::try_from(w.max(1)).unwrap_or(DEFAULT_WORKERS))
        .unwrap_or(DEFAULT_WORKERS);

    Ok(DataConfig {
        path,
        cache_ttl: Duration::from_secs(ttl_secs),
        workers,
    })
}

/// Default tables with `[growth_rates]` and `[volatility]` entries applied.
pub fn build_reference_tables(adapter: &dyn ConfigPort) -> Result<ReferenceTables, ModelfolioError> {
    let mut tables = ReferenceTables::default();
    for section in ["growth_rates", "volatility"] {
        for key in adapter.section_keys(section) {
            let class = key
                .parse::<AssetClass>()
                .map_err(|e| ModelfolioError::ConfigInvalid {
                    section: section.into(),
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            let value = parse_optional_f64(adapter, section, &key)?.ok_or_else(|| {
                ModelfolioError::ConfigMissing {
                    section: section.into(),
                    key: key.clone(),
                }
            })?;
            let table = if section == "growth_rates" {
                &mut tables.growth_rates
            } else {
                &mut tables.volatilities
            };
            tracing::debug!(section, %class, value, "assumption override");
            table.insert(class, value);
        }
    }
    Ok(tables)
}

/// `[classification]` entries keyed by upper-cased ticker.
pub fn build_overrides(
    adapter: &dyn ConfigPort,
) -> Result<HashMap<String, AssetClass>, ModelfolioError> {
    adapter
        .section_keys("classification")
        .into_iter()
        .map(|key| {
            let raw = adapter
                .get_string("classification", &key)
                .unwrap_or_default();
            let class = raw
                .parse::<AssetClass>()
                .map_err(|e| ModelfolioError::ConfigInvalid {
                    section: "classification".into(),
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            Ok((key.to_uppercase(), class))
        })
        .collect()
}

pub fn resolve_holdings(
    holdings_override: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<Holdings, ModelfolioError> {
    let raw = match holdings_override {
        Some(h) => h.to_string(),
        None => adapter
            .get_string("portfolio", "holdings")
            .ok_or_else(|| ModelfolioError::ConfigMissing {
                section: "portfolio".into(),
                key: "holdings".into(),
            })?,
    };
    Ok(parse_holdings(&raw)?)
}

pub fn make_resolver<'a>(
    config: &AnalysisConfig,
    prompt: &'a dyn ClassificationPrompt,
) -> ClassificationResolver<'a> {
    match config.unknown_policy {
        UnknownPolicy::Prompt => ClassificationResolver::Prompting(prompt),
        UnknownPolicy::Default => ClassificationResolver::DefaultingTo(config.default_class),
        UnknownPolicy::Strict => ClassificationResolver::Strict,
    }
}

/// Everything the `analyze` command reports.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub current: Portfolio,
    pub model: Portfolio,
    /// `None` when the model was chosen by name.
    pub matched: Option<ModelMatch>,
    pub current_history: HistoricalAnalysis,
    pub model_history: HistoricalAnalysis,
    pub current_projection: ProjectionResult,
    pub current_projection_net: ProjectionResult,
    pub model_projection: ProjectionResult,
    pub model_projection_net: ProjectionResult,
    pub current_forward: ForwardMetrics,
    pub model_forward: ForwardMetrics,
    pub fee_comparison: FeeComparison,
}

pub fn run_analysis_pipeline(
    adapter: &dyn ConfigPort,
    market: &(dyn MarketDataPort + Sync),
    holdings_override: Option<&str>,
    model_name: Option<&str>,
    prompt: &dyn ClassificationPrompt,
    workers: usize,
) -> Result<AnalysisReport, ModelfolioError> {
    validate_config(adapter, holdings_override.is_none())?;

    let config = build_analysis_config(adapter)?;
    let tables = build_reference_tables(adapter)?;
    let overrides = build_overrides(adapter)?;
    let holdings = resolve_holdings(holdings_override, adapter)?;
    let name = adapter
        .get_string("portfolio", "name")
        .unwrap_or_else(|| DEFAULT_PORTFOLIO_NAME.to_string());
    let advisory_fee =
        parse_optional_f64(adapter, "portfolio", "advisory_fee")?.unwrap_or(DEFAULT_ADVISORY_FEE);

    let classifier = Classifier::default();
    let resolver = make_resolver(&config, prompt);
    let ctx = BuildContext {
        market,
        classifier: &classifier,
        overrides: &overrides,
        resolver,
        workers,
    };

    tracing::info!(portfolio = %name, "building current portfolio");
    let current = Portfolio::build(&name, holdings, advisory_fee, &ctx)?;

    let (model, matched) = match model_name {
        Some(requested) => {
            let model = tables.models.get(requested).cloned().ok_or_else(|| {
                ModelfolioError::InvalidPortfolio {
                    reason: format!(
                        "unknown model '{}' (available: {})",
                        requested,
                        tables.models.names().join(", ")
                    ),
                }
            })?;
            (model, None)
        }
        None => {
            let found = best_match(
                current.allocation(),
                &tables.models,
                &classifier,
                &HashMap::new(),
                resolver,
            )?;
            tracing::info!(model = %found.model.name, similarity = found.similarity, "matched model");
            (found.model.clone(), Some(found))
        }
    };

    let no_overrides = HashMap::new();
    let model_ctx = BuildContext {
        overrides: &no_overrides,
        ..ctx
    };
    let model = Portfolio::from_model(
        &model,
        current.total_value(),
        tables.model_advisory_fee,
        &model_ctx,
    )?;

    let current_history = current.analyze_historical_performance(
        market,
        config.start_date,
        config.end_date,
        config.risk_free_rate,
        config.fee_cascade,
    )?;
    let model_history = model.analyze_historical_performance(
        market,
        config.start_date,
        config.end_date,
        config.risk_free_rate,
        config.fee_cascade,
    )?;

    let years = config.projection_years;
    let fee_comparison = FeeComparison::compute(
        &current.fee_rates(&tables),
        &model.fee_rates(&tables),
        current.total_value(),
        years,
    );

    Ok(AnalysisReport {
        current_projection: current.project_future_returns(&tables, years),
        current_projection_net: current.project_future_with_fees(&tables, years),
        model_projection: model.project_future_returns(&tables, years),
        model_projection_net: model.project_future_with_fees(&tables, years),
        current_forward: current.forward_metrics(&tables, config.risk_free_rate),
        model_forward: model.forward_metrics(&tables, config.risk_free_rate),
        config,
        current,
        model,
        matched,
        current_history,
        model_history,
        fee_comparison,
    })
}

fn run_analyze(
    config_path: &Path,
    holdings_override: Option<&str>,
    data_override: Option<&Path>,
    model_name: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data = match build_data_config(&adapter, data_override) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    let market = CachedMarketData::new(CsvMarketData::new(data.path.clone()), data.cache_ttl);
    let prompt = ConsolePrompt::stdio();

    match run_analysis_pipeline(
        &adapter,
        &market,
        holdings_override,
        model_name,
        &prompt,
        data.workers,
    ) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn print_allocation(allocation: &AssetClassAllocation) {
    for (class, weight) in allocation.iter() {
        println!("  {:<24} {:>8}", class, pct(weight));
    }
}

fn print_portfolio(portfolio: &Portfolio) {
    let summary = portfolio.summary();
    println!("\n== {} (${:.2}) ==", summary.name, summary.total_value);
    println!(
        "  {:<8} {:>12} {:>8} {:>10} {:>10} {:>7}  Class",
        "Ticker", "Value", "Weight", "Shares", "Price", "ER"
    );
    for h in &summary.holdings {
        let class = h
            .asset_class
            .map(|c| c.label().to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<8} {:>12.2} {:>8} {:>10.3} {:>10.2} {:>7}  {}",
            h.ticker,
            h.dollar_amount,
            pct(h.weight),
            h.shares,
            h.price,
            pct(h.expense_ratio),
            class
        );
    }
    println!("Allocation:");
    print_allocation(&summary.allocation);
    println!(
        "Weighted expense ratio: {}  Advisory fee: {}  Total fees: {}",
        pct(summary.weighted_expense_ratio),
        pct(summary.advisory_fee),
        pct(summary.total_fee_rate)
    );
}

fn print_stats_row(label: &str, stats: &PerformanceStats) {
    println!(
        "  {:<26} {:>10} {:>10} {:>10} {:>7} {:>10}",
        label,
        pct(stats.total_return),
        pct(stats.annualized_return),
        pct(stats.volatility),
        stats.sharpe_ratio,
        pct(stats.max_drawdown)
    );
}

fn print_history(report: &AnalysisReport) {
    let h = &report.current_history;
    println!(
        "\n== Historical performance {} to {} ==",
        h.start_date, h.end_date
    );
    if h.start_date > report.config.start_date {
        println!(
            "  (requested start {} adjusted to common data range)",
            report.config.start_date
        );
    }
    println!(
        "  {:<26} {:>10} {:>10} {:>10} {:>7} {:>10}",
        "", "Total", "Annual", "Vol", "Sharpe", "Max DD"
    );
    print_stats_row("Current (all fees)", &h.with_fees);
    print_stats_row("Current (no advisory fee)", &h.without_advisory);
    print_stats_row(
        &format!("{} (all fees)", report.model.name()),
        &report.model_history.with_fees,
    );
    println!("Individual returns:");
    for (ticker, ret) in &h.individual_returns {
        println!("  {:<8} {:>10}", ticker, pct(*ret));
    }
}

fn print_projection(label: &str, gross: &ProjectionResult, net: &ProjectionResult, fwd: &ForwardMetrics) {
    println!(
        "  {:<26} {:>9} {:>8} {:>7} {:>12} {:>12}",
        label,
        pct(fwd.expected_return),
        pct(fwd.volatility),
        fwd.sharpe_ratio,
        pct(gross.total_projected_return),
        pct(net.total_projected_return)
    );
}

fn print_report(report: &AnalysisReport) {
    print_portfolio(&report.current);

    match &report.matched {
        Some(m) => println!(
            "\nClosest model: {} (similarity {:.4})",
            m.model.name, m.similarity
        ),
        None => println!("\nSelected model: {}", report.model.name()),
    }
    print_portfolio(&report.model);
    print_history(report);

    let years = report.config.projection_years;
    println!("\n== Forward projection ({years} years) ==");
    println!(
        "  {:<26} {:>9} {:>8} {:>7} {:>12} {:>12}",
        "", "Expected", "Vol", "Sharpe", "Gross total", "Net total"
    );
    print_projection(
        report.current.name(),
        &report.current_projection,
        &report.current_projection_net,
        &report.current_forward,
    );
    print_projection(
        report.model.name(),
        &report.model_projection,
        &report.model_projection_net,
        &report.model_forward,
    );

    let fc = &report.fee_comparison;
    println!("\n== Fee comparison ==");
    println!("  Annual advisory savings:  ${:.2}", fc.annual_advisory_savings);
    println!("  Annual expense savings:   ${:.2}", fc.annual_expense_savings);
    println!("  Annual total savings:     ${:.2}", fc.annual_total_savings());
    println!("  Total savings ({} years): ${:.2}", fc.years, fc.total_savings());
    println!(
        "  Final value, current:     ${:.2} gross / ${:.2} net",
        fc.current_gross_final, fc.current_net_final
    );
    println!(
        "  Final value, model:       ${:.2} gross / ${:.2} net",
        fc.model_gross_final, fc.model_net_final
    );
}

fn run_models() -> ExitCode {
    let catalog = ModelCatalog::standard();
    let classifier = Classifier::default();
    for model in catalog.iter() {
        println!("\n{}", model.name);
        for (ticker, weight) in &model.weights {
            println!("  {:<8} {:>8}", ticker, pct(*weight));
        }
        match model_allocation(
            model,
            &classifier,
            &HashMap::new(),
            ClassificationResolver::Strict,
        ) {
            Ok(allocation) => print_allocation(&allocation),
            Err(e) => return fail(&e),
        }
    }
    eprintln!("{} models", catalog.len());
    ExitCode::SUCCESS
}

fn source_label(source: ClassificationSource) -> &'static str {
    match source {
        ClassificationSource::Override => "override",
        ClassificationSource::Pattern => "ticker table",
        ClassificationSource::Metadata => "metadata",
        ClassificationSource::Fallback => "fallback",
    }
}

fn run_classify(
    ticker: Option<&str>,
    data_path: Option<&Path>,
    config_path: Option<&Path>,
) -> ExitCode {
    let overrides = match config_path {
        Some(path) => {
            let adapter = match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            };
            match build_overrides(&adapter) {
                Ok(o) => o,
                Err(e) => return fail(&e),
            }
        }
        None => HashMap::new(),
    };
    let market = data_path.map(|p| CsvMarketData::new(p.to_path_buf()));

    let tickers = match (ticker, &market) {
        (Some(t), _) => vec![t.trim().to_uppercase()],
        (None, Some(m)) => match m.list_tickers() {
            Ok(t) => t,
            Err(e) => return fail(&e),
        },
        (None, None) => {
            eprintln!("error: --ticker or --data is required for classify");
            return ExitCode::from(2);
        }
    };

    let classifier = Classifier::default();
    for ticker in &tickers {
        if let Some(class) = overrides.get(ticker) {
            println!("{:<10} {:<24} ({})", ticker, class, source_label(ClassificationSource::Override));
            continue;
        }
        let metadata = match &market {
            Some(m) => match m.get_instrument_metadata(ticker) {
                Ok(meta) => Some(meta),
                Err(e) => return fail(&e),
            },
            None => None,
        };
        match classifier.classify_with_source(ticker, metadata.as_ref()) {
            Some((class, source)) => {
                println!("{:<10} {:<24} ({})", ticker, class, source_label(source))
            }
            None => println!("{:<10} unknown", ticker),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter, true) {
        return fail(&e);
    }

    let config = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let overrides = match build_overrides(&adapter) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };
    let holdings = match resolve_holdings(None, &adapter) {
        Ok(h) => h,
        Err(e) => return fail(&e),
    };

    eprintln!("\nPortfolio:");
    for h in holdings.iter() {
        eprintln!("  {:<8} ${:.2}", h.ticker, h.dollar_amount);
    }
    eprintln!("\nAnalysis:");
    eprintln!("  period:          {} to {}", config.start_date, config.end_date);
    eprintln!("  risk-free rate:  {}", pct(config.risk_free_rate));
    eprintln!("  projection:      {} years", config.projection_years);
    eprintln!("  fee cascade:     {:?}", config.fee_cascade);
    eprintln!("  unknown tickers: {:?}", config.unknown_policy);
    if !overrides.is_empty() {
        eprintln!("\nClassification overrides: {}", overrides.len());
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
