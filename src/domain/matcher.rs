//! Model-portfolio matching by cosine similarity of class allocations.

use std::collections::{BTreeMap, HashMap};

use crate::domain::asset_class::{AssetClass, AssetClassAllocation};
use crate::domain::classifier::{ClassificationResolver, Classifier, InstrumentMetadata};
use crate::domain::error::ModelfolioError;
use crate::domain::holdings::Holdings;
use crate::domain::reference::{ModelCatalog, ModelPortfolio};
use crate::domain::weights::{asset_class_allocation, compute_weights};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMatch {
    pub model: ModelPortfolio,
    pub allocation: AssetClassAllocation,
    pub similarity: f64,
}

/// Cosine similarity over the union of classes in either allocation, taken
/// in label order. Zero-magnitude vectors score 0.
pub fn cosine_similarity(a: &AssetClassAllocation, b: &AssetClassAllocation) -> f64 {
    let union: BTreeMap<&'static str, AssetClass> = a
        .classes()
        .chain(b.classes())
        .map(|c| (c.label(), c))
        .collect();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for class in union.into_values() {
        let x = a.get(class);
        let y = b.get(class);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Derives a model's class allocation through the same weight and
/// classification pipeline used for user holdings.
pub fn model_allocation(
    model: &ModelPortfolio,
    classifier: &Classifier,
    metadata: &HashMap<String, InstrumentMetadata>,
    resolver: ClassificationResolver<'_>,
) -> Result<AssetClassAllocation, ModelfolioError> {
    let holdings = Holdings::from_model(model, 1.0);
    let weights = compute_weights(&holdings)?;
    let classifications =
        classifier.classify_all(&holdings.tickers(), metadata, &HashMap::new(), resolver)?;
    asset_class_allocation(&weights, &classifications)
}

/// Scans the catalog in order, keeping a model only when it scores strictly
/// higher than the best so far.
pub fn best_match(
    current: &AssetClassAllocation,
    catalog: &ModelCatalog,
    classifier: &Classifier,
    metadata: &HashMap<String, InstrumentMetadata>,
    resolver: ClassificationResolver<'_>,
) -> Result<ModelMatch, ModelfolioError> {
    let mut best: Option<ModelMatch> = None;

    for model in catalog.iter() {
        let allocation = model_allocation(model, classifier, metadata, resolver)?;
        let similarity = cosine_similarity(current, &allocation);
        tracing::debug!(model = %model.name, similarity, "scored model portfolio");

        let better = match &best {
            None => true,
            Some(b) => similarity > b.similarity,
        };
        if better {
            best = Some(ModelMatch {
                model: model.clone(),
                allocation,
                similarity,
            });
        }
    }

    best.ok_or(ModelfolioError::EmptyCatalog)
}
