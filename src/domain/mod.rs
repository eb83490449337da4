//! Core domain types and analytics.

pub mod analysis;
pub mod asset_class;
pub mod classifier;
pub mod config_validation;
pub mod error;
pub mod fees;
pub mod holdings;
pub mod matcher;
pub mod portfolio;
pub mod price;
pub mod projection;
pub mod reference;
pub mod returns;
pub mod stats;
pub mod weights;
