//! Interactive classification port.

use crate::domain::asset_class::AssetClass;
use crate::domain::error::ModelfolioError;

/// Asks a person to classify a ticker no rule could place.
pub trait ClassificationPrompt {
    fn choose(&self, ticker: &str, options: &[AssetClass]) -> Result<AssetClass, ModelfolioError>;
}
