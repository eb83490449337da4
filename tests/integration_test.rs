//! End-to-end tests of portfolio construction, historical analysis,
//! projections and model matching against an in-memory market.

mod common;

use approx::assert_relative_eq;
use common::*;
use modelfolio::domain::asset_class::{AssetClass, AssetClassAllocation};
use modelfolio::domain::classifier::{ClassificationResolver, ClassificationSource, Classifier};
use modelfolio::domain::error::ModelfolioError;
use modelfolio::domain::fees::FeeComparison;
use modelfolio::domain::holdings::parse_holdings;
use modelfolio::domain::matcher::{best_match, cosine_similarity};
use modelfolio::domain::portfolio::{BuildContext, Portfolio};
use modelfolio::domain::reference::{ModelCatalog, ModelPortfolio, ReferenceTables};
use modelfolio::domain::returns::FeeCascade;
use modelfolio::domain::stats::SharpeRatio;
use modelfolio::domain::weights::{asset_class_allocation, compute_weights};
use proptest::prelude::*;
use std::collections::HashMap;

fn build(
    market: &MockMarketData,
    holdings: &str,
    advisory_fee: f64,
    overrides: &HashMap<String, AssetClass>,
    resolver: ClassificationResolver<'_>,
) -> Result<Portfolio, ModelfolioError> {
    let classifier = Classifier::default();
    let ctx = BuildContext {
        market,
        classifier: &classifier,
        overrides,
        resolver,
        workers: 3,
    };
    Portfolio::build("Test", parse_holdings(holdings)?, advisory_fee, &ctx)
}

mod historical_analysis {
    use super::*;

    #[test]
    fn flat_prices_without_fees() {
        let market = MockMarketData::new()
            .with_flat("VTI", "2024-01-01", 2, 100.0)
            .with_flat("BND", "2024-01-01", 2, 100.0);
        let portfolio = build(
            &market,
            "VTI:6000, BND:4000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        assert_relative_eq!(portfolio.weights().get("VTI").unwrap(), 0.6);
        assert_relative_eq!(portfolio.weights().get("BND").unwrap(), 0.4);

        let history = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-02"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap();

        let stats = &history.with_fees;
        assert_relative_eq!(stats.total_return, 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats.volatility, 0.0);
        assert_relative_eq!(stats.max_drawdown, 0.0);
        assert_eq!(stats.sharpe_ratio, SharpeRatio::Undefined);
        assert_eq!(history.dates, vec![date("2024-01-02")]);
    }

    #[test]
    fn advisory_fee_makes_flat_returns_negative() {
        let market = MockMarketData::new()
            .with_flat("VTI", "2024-01-01", 2, 100.0)
            .with_flat("BND", "2024-01-01", 2, 100.0);
        let portfolio = build(
            &market,
            "VTI:6000, BND:4000",
            0.01,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let history = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-02"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap();

        assert!(history.with_fees.total_return < 0.0);
        assert_relative_eq!(history.without_advisory.total_return, 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            history.with_fees.total_return,
            0.99_f64.powf(1.0 / 252.0) - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn expense_ratios_reduce_both_series() {
        let market = MockMarketData::new()
            .with_series("VTI", "2024-01-01", &[100.0, 101.0, 102.0])
            .with_series("BND", "2024-01-01", &[50.0, 50.0, 50.5])
            .with_expense_ratio("VTI", 0.0003)
            .with_expense_ratio("BND", 0.0005);
        let portfolio = build(
            &market,
            "VTI:5000, BND:5000",
            0.01,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let history = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-03"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap();

        let gross: f64 = 1.005 * (1.0 + 0.5 * (102.0 / 101.0 - 1.0) + 0.5 * 0.01) - 1.0;
        assert!(history.without_advisory.total_return < gross);
        assert!(history.with_fees.total_return < history.without_advisory.total_return);
        assert_relative_eq!(history.individual_returns["VTI"], 0.02, epsilon = 1e-12);
        assert_relative_eq!(history.individual_returns["BND"], 0.01, epsilon = 1e-12);
    }

    #[test]
    fn window_starts_at_latest_common_date() {
        let market = MockMarketData::new()
            .with_series("VTI", "2024-01-01", &[100.0, 101.0, 102.0, 103.0, 104.0])
            .with_series("BND", "2024-01-03", &[50.0, 50.5, 51.0]);
        let portfolio = build(
            &market,
            "VTI:5000, BND:5000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let history = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-05"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap();

        assert_eq!(history.start_date, date("2024-01-03"));
        assert_eq!(history.end_date, date("2024-01-05"));
        assert_eq!(history.dates.len(), 2);
    }

    #[test]
    fn zero_close_raises_instead_of_infinite_returns() {
        let market = MockMarketData::new().with_series("VTI", "2024-01-01", &[0.0, 100.0, 101.0]);
        let portfolio = build(
            &market,
            "VTI:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let err = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-03"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap_err();
        assert!(matches!(err, ModelfolioError::NoData { .. }));
    }

    #[test]
    fn single_observation_is_no_data() {
        let market = MockMarketData::new().with_flat("VTI", "2024-01-01", 1, 100.0);
        let portfolio = build(
            &market,
            "VTI:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let err = portfolio
            .analyze_historical_performance(
                &market,
                date("2024-01-01"),
                date("2024-01-31"),
                0.02,
                FeeCascade::Sequential,
            )
            .unwrap_err();
        assert!(matches!(err, ModelfolioError::NoData { .. }));
        assert_eq!(err.exit_status(), 5);
    }
}

mod classification {
    use super::*;

    #[test]
    fn override_beats_table_and_skips_prompt() {
        let market = flat_market(&["ZZZ"], 2);
        let prompt = FixedPrompt::new(AssetClass::Alternatives);
        let overrides = HashMap::from([
            ("ZZZ".to_string(), AssetClass::CoreFixedIncome),
            ("VTI".to_string(), AssetClass::InternationalEquities),
        ]);

        let portfolio = build(
            &market,
            "VTI:5000, ZZZ:5000",
            0.0,
            &overrides,
            ClassificationResolver::Prompting(&prompt),
        )
        .unwrap();

        assert!(prompt.asked().is_empty());
        let classes = portfolio.classifications();
        assert_eq!(classes.get("ZZZ"), Some(AssetClass::CoreFixedIncome));
        assert_eq!(classes.get("VTI"), Some(AssetClass::InternationalEquities));
        assert_eq!(classes.source("VTI"), Some(ClassificationSource::Override));
        assert_relative_eq!(
            portfolio.allocation().get(AssetClass::InternationalEquities),
            0.5
        );
    }

    #[test]
    fn unknown_ticker_is_prompted_once() {
        let market = flat_market(&["ZZZ"], 2);
        let prompt = FixedPrompt::new(AssetClass::Alternatives);

        let portfolio = build(
            &market,
            "VTI:7500, ZZZ:2500",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Prompting(&prompt),
        )
        .unwrap();

        assert_eq!(prompt.asked(), vec!["ZZZ".to_string()]);
        assert_eq!(
            portfolio.classifications().source("ZZZ"),
            Some(ClassificationSource::Fallback)
        );
        assert_relative_eq!(portfolio.allocation().get(AssetClass::Alternatives), 0.25);
        assert_relative_eq!(portfolio.allocation().get(AssetClass::UsEquities), 0.75);
    }

    #[test]
    fn metadata_classifies_unlisted_fund() {
        let market = flat_market(&["XBND"], 2).with_metadata(
            "XBND",
            modelfolio::domain::classifier::InstrumentMetadata {
                category: Some("Intermediate Core Bond".into()),
                ..Default::default()
            },
        );

        let portfolio = build(
            &market,
            "XBND:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        assert_eq!(
            portfolio.classifications().get("XBND"),
            Some(AssetClass::CoreFixedIncome)
        );
        assert_eq!(
            portfolio.classifications().source("XBND"),
            Some(ClassificationSource::Metadata)
        );
    }

    #[test]
    fn strict_policy_rejects_unknown_ticker() {
        let market = flat_market(&["ZZZ"], 2);
        let err = build(
            &market,
            "ZZZ:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelfolioError::UnresolvedClassification { ref ticker } if ticker == "ZZZ"
        ));
        assert_eq!(err.exit_status(), 4);
    }

    #[test]
    fn default_policy_uses_configured_class() {
        let market = flat_market(&["ZZZ"], 2);
        let portfolio = build(
            &market,
            "ZZZ:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::DefaultingTo(AssetClass::UsEquities),
        )
        .unwrap();
        assert_relative_eq!(portfolio.allocation().get(AssetClass::UsEquities), 1.0);
    }
}

mod construction {
    use super::*;

    #[test]
    fn data_source_failure_is_reported() {
        let market = flat_market(&[], 2).with_error("BND", "connection refused");
        let err = build(
            &market,
            "VTI:1000, BND:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, ModelfolioError::DataSource { .. }));
        assert_eq!(err.exit_status(), 1);
    }

    #[test]
    fn expense_ratio_of_one_or_more_is_rejected() {
        let market = flat_market(&[], 2).with_expense_ratio("VTI", 1.5);
        let err = build(
            &market,
            "VTI:1000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, ModelfolioError::DataSource { .. }));
    }

    #[test]
    fn zero_total_is_rejected_before_fetch() {
        let market = MockMarketData::new().with_error("VTI", "should not be called");
        let err = build(
            &market,
            "VTI:0",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, ModelfolioError::InvalidPortfolio { .. }));
    }

    #[test]
    fn advisory_fee_out_of_range() {
        let market = flat_market(&[], 2);
        let err = build(
            &market,
            "VTI:1000",
            1.5,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, ModelfolioError::InvalidPortfolio { .. }));
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn summary_reports_shares_and_fees() {
        let market = MockMarketData::new()
            .with_flat("VTI", "2024-01-01", 3, 250.0)
            .with_flat("BND", "2024-01-01", 3, 80.0)
            .with_expense_ratio("VTI", 0.0003)
            .with_expense_ratio("BND", 0.0003);
        let portfolio = build(
            &market,
            "VTI:5000, BND:4000",
            0.01,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let summary = portfolio.summary();
        assert_relative_eq!(summary.total_value, 9000.0);
        let vti = summary.holdings.iter().find(|h| h.ticker == "VTI").unwrap();
        assert_relative_eq!(vti.shares, 20.0);
        assert_eq!(vti.asset_class, Some(AssetClass::UsEquities));
        assert_relative_eq!(summary.weighted_expense_ratio, 0.0003, epsilon = 1e-15);
        assert_relative_eq!(summary.total_fee_rate, 0.0103, epsilon = 1e-15);
    }
}

mod projections {
    use super::*;

    #[test]
    fn model_projection_and_fee_comparison() {
        let tables = ReferenceTables::default();
        let market = flat_market(&[], 2);
        let current = build(
            &market,
            "VTI:10000",
            0.01,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let gross = current.project_future_returns(&tables, 10);
        assert_relative_eq!(gross.weighted_annual_return, 0.10);
        assert_relative_eq!(
            gross.total_projected_return,
            1.1_f64.powi(10) - 1.0,
            epsilon = 1e-12
        );

        let net = current.project_future_with_fees(&tables, 10);
        assert_relative_eq!(net.final_value, 1.09_f64.powi(10), epsilon = 1e-12);
        assert!(net.total_fees > 0.0);

        let model_def = tables.models.get("balanced").unwrap();
        let classifier = Classifier::default();
        let no_overrides = HashMap::new();
        let ctx = BuildContext {
            market: &market,
            classifier: &classifier,
            overrides: &no_overrides,
            resolver: ClassificationResolver::Strict,
            workers: 3,
        };
        let model = Portfolio::from_model(
            model_def,
            current.total_value(),
            tables.model_advisory_fee,
            &ctx,
        )
        .unwrap();
        assert_relative_eq!(model.total_value(), 10000.0, epsilon = 1e-9);

        let comparison = FeeComparison::compute(
            &current.fee_rates(&tables),
            &model.fee_rates(&tables),
            current.total_value(),
            10,
        );
        assert_relative_eq!(comparison.annual_advisory_savings, 75.0, epsilon = 1e-9);
        assert_relative_eq!(comparison.total_savings(), 750.0, epsilon = 1e-9);
    }

    #[test]
    fn forward_metrics_use_class_volatility() {
        let tables = ReferenceTables::default();
        let market = flat_market(&[], 2);
        let portfolio = build(
            &market,
            "VTI:5000, BND:5000",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let fwd = portfolio.forward_metrics(&tables, 0.02);
        assert_relative_eq!(fwd.expected_return, 0.07, epsilon = 1e-12);
        let vol = (0.25_f64 * 0.18 * 0.18 + 0.25 * 0.05 * 0.05).sqrt();
        assert_relative_eq!(fwd.volatility, vol, epsilon = 1e-12);
        assert_relative_eq!(
            fwd.sharpe_ratio.value().unwrap(),
            0.05 / vol,
            epsilon = 1e-12
        );
    }
}

mod matching {
    use super::*;

    #[test]
    fn exact_allocation_matches_aggressive() {
        let market = flat_market(&[], 2);
        let current = build(
            &market,
            "VTI:5000, VXUS:1500, VNQ:2000, GLD:1500",
            0.0,
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();

        let found = best_match(
            current.allocation(),
            &ModelCatalog::standard(),
            &Classifier::default(),
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();
        assert_eq!(found.model.name, "Aggressive");
        assert_relative_eq!(found.similarity, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bond_heavy_matches_conservative() {
        let allocation: AssetClassAllocation = [
            (AssetClass::UsEquities, 0.1),
            (AssetClass::CoreFixedIncome, 0.9),
        ]
        .into_iter()
        .collect();

        let found = best_match(
            &allocation,
            &ModelCatalog::standard(),
            &Classifier::default(),
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();
        assert_eq!(found.model.name, "Conservative");
    }

    #[test]
    fn tie_keeps_first_model() {
        let catalog = ModelCatalog::new(vec![
            ModelPortfolio::new("First", &[("VTI", 1.0)]),
            ModelPortfolio::new("Second", &[("VOO", 1.0)]),
        ]);
        let allocation: AssetClassAllocation =
            [(AssetClass::UsEquities, 1.0)].into_iter().collect();

        let found = best_match(
            &allocation,
            &catalog,
            &Classifier::default(),
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();
        assert_eq!(found.model.name, "First");
    }

    #[test]
    fn zero_vector_scores_zero_everywhere() {
        let empty = AssetClassAllocation::new();
        let found = best_match(
            &empty,
            &ModelCatalog::standard(),
            &Classifier::default(),
            &HashMap::new(),
            ClassificationResolver::Strict,
        )
        .unwrap();
        assert_eq!(found.model.name, "Conservative");
        assert_eq!(found.similarity, 0.0);
        assert_eq!(cosine_similarity(&empty, &found.allocation), 0.0);
    }
}

proptest! {
    #[test]
    fn weights_sum_to_one(amounts in prop::collection::vec(0.01f64..1_000_000.0, 1..12)) {
        let input = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| format!("T{i}:{a}"))
            .collect::<Vec<_>>()
            .join(",");
        let holdings = parse_holdings(&input).unwrap();
        let weights = compute_weights(&holdings).unwrap();

        prop_assert!((weights.sum() - 1.0).abs() < 1e-9);
        prop_assert!(weights.iter().all(|(_, w)| (0.0..=1.0).contains(&w)));
    }

    #[test]
    fn allocation_sums_to_one(
        us in 1.0f64..10_000.0,
        intl in 1.0f64..10_000.0,
        bonds in 1.0f64..10_000.0,
        gold in 1.0f64..10_000.0,
    ) {
        let input = format!("VTI:{us}, VXUS:{intl}, BND:{bonds}, GLD:{gold}");
        let holdings = parse_holdings(&input).unwrap();
        let weights = compute_weights(&holdings).unwrap();
        let classes = Classifier::default()
            .classify_all(
                &holdings.tickers(),
                &HashMap::new(),
                &HashMap::new(),
                ClassificationResolver::Strict,
            )
            .unwrap();
        let allocation = asset_class_allocation(&weights, &classes).unwrap();

        prop_assert!((allocation.total() - 1.0).abs() < 1e-9);
        prop_assert_eq!(allocation.len(), 4);
    }

    #[test]
    fn self_similarity_is_one(a in 0.01f64..1.0, b in 0.01f64..1.0, c in 0.0f64..1.0) {
        let allocation: AssetClassAllocation = [
            (AssetClass::UsEquities, a),
            (AssetClass::CoreFixedIncome, b),
            (AssetClass::Alternatives, c),
        ]
        .into_iter()
        .collect();
        prop_assert!((cosine_similarity(&allocation, &allocation) - 1.0).abs() < 1e-9);
    }
}
