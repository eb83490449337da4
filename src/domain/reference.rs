//! Static reference data: class growth/volatility assumptions and the model
//! portfolio catalog.
//!
//! Loaded once at startup and passed around by reference; nothing here is
//! mutated after construction.

use std::collections::{BTreeMap, HashMap};

use crate::domain::asset_class::AssetClass;

/// Advisory fee charged on model portfolios.
pub const MODEL_ADVISORY_FEE: f64 = 0.0025;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPortfolio {
    pub name: String,
    pub weights: BTreeMap<String, f64>,
}

impl ModelPortfolio {
    pub fn new(name: &str, weights: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            weights: weights
                .iter()
                .filter(|(_, w)| *w > 0.0)
                .map(|(t, w)| (t.to_string(), *w))
                .collect(),
        }
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Ordered catalog of model portfolios. Definition order breaks ties when
/// matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelPortfolio>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelPortfolio>) -> Self {
        Self { models }
    }

    /// Conservative through Aggressive.
    pub fn standard() -> Self {
        Self::new(vec![
            ModelPortfolio::new(
                "Conservative",
                &[("VTI", 0.15), ("VXUS", 0.20), ("BND", 0.60), ("VNQ", 0.05)],
            ),
            ModelPortfolio::new(
                "Moderately Conservative",
                &[
                    ("VTI", 0.25),
                    ("VXUS", 0.25),
                    ("BND", 0.40),
                    ("VNQ", 0.05),
                    ("GLD", 0.05),
                ],
            ),
            ModelPortfolio::new(
                "Balanced",
                &[
                    ("VTI", 0.30),
                    ("VXUS", 0.25),
                    ("BND", 0.30),
                    ("VNQ", 0.10),
                    ("GLD", 0.05),
                ],
            ),
            ModelPortfolio::new(
                "Moderately Aggressive",
                &[
                    ("VTI", 0.40),
                    ("VXUS", 0.20),
                    ("BND", 0.15),
                    ("VNQ", 0.15),
                    ("GLD", 0.10),
                ],
            ),
            ModelPortfolio::new(
                "Aggressive",
                &[
                    ("VTI", 0.50),
                    ("VXUS", 0.15),
                    ("BND", 0.00),
                    ("VNQ", 0.20),
                    ("GLD", 0.15),
                ],
            ),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ModelPortfolio> {
        self.models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelPortfolio> {
        self.models.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTables {
    pub growth_rates: HashMap<AssetClass, f64>,
    pub volatilities: HashMap<AssetClass, f64>,
    pub models: ModelCatalog,
    pub model_advisory_fee: f64,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        let growth_rates = HashMap::from([
            (AssetClass::UsEquities, 0.10),
            (AssetClass::InternationalEquities, 0.09),
            (AssetClass::CoreFixedIncome, 0.04),
            (AssetClass::Alternatives, 0.08),
        ]);
        let volatilities = HashMap::from([
            (AssetClass::UsEquities, 0.18),
            (AssetClass::InternationalEquities, 0.20),
            (AssetClass::CoreFixedIncome, 0.05),
            (AssetClass::Alternatives, 0.15),
        ]);
        Self {
            growth_rates,
            volatilities,
            models: ModelCatalog::standard(),
            model_advisory_fee: MODEL_ADVISORY_FEE,
        }
    }
}

impl ReferenceTables {
    pub fn growth_rate(&self, class: AssetClass) -> f64 {
        self.growth_rates.get(&class).copied().unwrap_or(0.0)
    }

    pub fn volatility(&self, class: AssetClass) -> f64 {
        self.volatilities.get(&class).copied().unwrap_or(0.0)
    }
}
