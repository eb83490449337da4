//! Domain error types.

use crate::domain::holdings::HoldingsError;

/// Top-level error type for modelfolio.
#[derive(Debug, thiserror::Error)]
pub enum ModelfolioError {
    #[error("invalid portfolio: {reason}")]
    InvalidPortfolio { reason: String },

    #[error("no data: {reason}")]
    NoData { reason: String },

    #[error("weight mismatch: {ticker} {reason}")]
    WeightMismatch { ticker: String, reason: String },

    #[error("division by zero computing {quantity}")]
    DivideByZero { quantity: String },

    #[error("model catalog is empty")]
    EmptyCatalog,

    #[error("could not classify {ticker}")]
    UnresolvedClassification { ticker: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Holdings(#[from] HoldingsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModelfolioError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            ModelfolioError::Io(_) | ModelfolioError::DataSource { .. } => 1,
            ModelfolioError::ConfigParse { .. }
            | ModelfolioError::ConfigMissing { .. }
            | ModelfolioError::ConfigInvalid { .. } => 2,
            ModelfolioError::InvalidPortfolio { .. }
            | ModelfolioError::WeightMismatch { .. }
            | ModelfolioError::EmptyCatalog
            | ModelfolioError::Holdings(_) => 3,
            ModelfolioError::UnresolvedClassification { .. } => 4,
            ModelfolioError::NoData { .. } | ModelfolioError::DivideByZero { .. } => 5,
        }
    }
}

impl From<&ModelfolioError> for std::process::ExitCode {
    fn from(err: &ModelfolioError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
