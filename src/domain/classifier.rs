//! Rule-based asset classification.
//!
//! Resolution order, first match wins:
//! 1. user override
//! 2. curated exact-match ticker tables
//! 3. metadata keyword heuristics (fixed priority, see [`Classifier::classify_by_metadata`])
//! 4. the caller's [`ClassificationResolver`] policy for anything still unknown

use std::collections::{BTreeMap, HashMap};

use crate::domain::asset_class::AssetClass;
use crate::domain::error::ModelfolioError;
use crate::ports::prompt_port::ClassificationPrompt;

/// Free-form instrument metadata from the data source. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentMetadata {
    pub category: Option<String>,
    pub asset_class: Option<String>,
    pub country: Option<String>,
    pub quote_type: Option<String>,
    pub expense_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Known(AssetClass),
    Unknown,
}

/// What to do with a ticker no rule could classify.
#[derive(Clone, Copy)]
pub enum ClassificationResolver<'a> {
    Prompting(&'a dyn ClassificationPrompt),
    DefaultingTo(AssetClass),
    Strict,
}

impl std::fmt::Debug for ClassificationResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationResolver::Prompting(_) => f.write_str("Prompting"),
            ClassificationResolver::DefaultingTo(c) => write!(f, "DefaultingTo({c})"),
            ClassificationResolver::Strict => f.write_str("Strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Override,
    Pattern,
    Metadata,
    Fallback,
}

/// Ticker to resolved class. Override entries are never replaced by
/// automatic classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationMap {
    entries: BTreeMap<String, (AssetClass, ClassificationSource)>,
}

impl ClassificationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_override(&mut self, ticker: &str, class: AssetClass) {
        self.entries
            .insert(ticker.to_string(), (class, ClassificationSource::Override));
    }

    /// Records an automatic result unless the ticker carries an override.
    pub fn insert_automatic(
        &mut self,
        ticker: &str,
        class: AssetClass,
        source: ClassificationSource,
    ) -> bool {
        match self.entries.get(ticker) {
            Some((_, ClassificationSource::Override)) => false,
            _ => {
                self.entries.insert(ticker.to_string(), (class, source));
                true
            }
        }
    }

    pub fn get(&self, ticker: &str) -> Option<AssetClass> {
        self.entries.get(ticker).map(|&(c, _)| c)
    }

    pub fn source(&self, ticker: &str) -> Option<ClassificationSource> {
        self.entries.get(ticker).map(|&(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AssetClass)> {
        self.entries.iter().map(|(t, &(c, _))| (t.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const ALTERNATIVE_KEYWORDS: &[&str] = &[
    "real estate",
    "reit",
    "commodit",
    "precious metal",
    "natural resources",
    "alternative",
    "managed futures",
    "market neutral",
    "long-short",
];

const US_SIZE_BOX_KEYWORDS: &[&str] = &[
    "large blend",
    "large growth",
    "large value",
    "mid blend",
    "mid growth",
    "mid value",
    "mid-cap blend",
    "mid-cap growth",
    "mid-cap value",
    "small blend",
    "small growth",
    "small value",
];

const FOREIGN_SUFFIXES: &[&str] = &[
    ".TO", ".V", ".L", ".F", ".DE", ".PA", ".AS", ".SW", ".HK", ".T", ".AX",
];

const INTERNATIONAL_KEYWORDS: &[&str] = &[
    "foreign",
    "international",
    "emerging",
    "developed",
    "europe",
    "asia",
    "pacific",
    "japan",
    "china",
    "latin america",
];

const GLOBAL_EQUITY_KEYWORDS: &[&str] = &["intl", "global", "world"];

const BOND_KEYWORDS: &[&str] = &[
    "bond",
    "fixed",
    "treasury",
    "government",
    "muni",
    "ultrashort",
    "short-term",
    "inflation-protected",
];

const US_COUNTRIES: &[&str] = &["united states", "usa", "us"];

pub struct Classifier {
    tables: Vec<(AssetClass, Vec<String>)>,
}

impl Default for Classifier {
    fn default() -> Self {
        fn table(tickers: &[&str]) -> Vec<String> {
            tickers.iter().map(|t| t.to_string()).collect()
        }
        Self {
            tables: vec![
                (
                    AssetClass::UsEquities,
                    table(&["SPY", "QQQ", "VTI", "VOO", "IVV", "IWM", "DIA", "SCHB", "ITOT"]),
                ),
                (
                    AssetClass::InternationalEquities,
                    table(&[
                        "VXUS", "VEA", "VWO", "IEFA", "IEMG", "EFA", "EEM", "IXUS", "SCHF",
                    ]),
                ),
                (
                    AssetClass::CoreFixedIncome,
                    table(&[
                        "AGG", "BND", "VGIT", "VGLT", "TLT", "SHY", "IEF", "BNDX", "SCHZ",
                    ]),
                ),
                (
                    AssetClass::Alternatives,
                    table(&[
                        "VNQ", "VNQI", "SCHH", "IYR", "GLD", "IAU", "SLV", "DBC", "PDBC", "GSG",
                    ]),
                ),
            ],
        }
    }
}

impl Classifier {
    pub fn with_tables(tables: Vec<(AssetClass, Vec<String>)>) -> Self {
        Self { tables }
    }

    pub fn classify(&self, ticker: &str, metadata: Option<&InstrumentMetadata>) -> Classification {
        match self.classify_with_source(ticker, metadata) {
            Some((class, _)) => Classification::Known(class),
            None => Classification::Unknown,
        }
    }

    /// Automatic classification plus the rule family that produced it.
    pub fn classify_with_source(
        &self,
        ticker: &str,
        metadata: Option<&InstrumentMetadata>,
    ) -> Option<(AssetClass, ClassificationSource)> {
        let ticker = ticker.trim().to_uppercase();
        if let Some(class) = self.classify_by_pattern(&ticker) {
            tracing::debug!(%ticker, %class, "classified by pattern table");
            return Some((class, ClassificationSource::Pattern));
        }
        if let Some(class) = metadata.and_then(|m| self.classify_by_metadata(&ticker, m)) {
            tracing::debug!(%ticker, %class, "classified by metadata");
            return Some((class, ClassificationSource::Metadata));
        }
        None
    }

    pub fn classify_by_pattern(&self, ticker: &str) -> Option<AssetClass> {
        self.tables
            .iter()
            .find(|(_, tickers)| tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker)))
            .map(|(class, _)| *class)
    }

    /// Keyword heuristics in fixed priority: alternatives, domestic equity,
    /// foreign listing suffix, international equity, bonds, then direct
    /// equities by country of domicile.
    pub fn classify_by_metadata(
        &self,
        ticker: &str,
        metadata: &InstrumentMetadata,
    ) -> Option<AssetClass> {
        let category = lower(&metadata.category);
        let asset_class = lower(&metadata.asset_class);
        let ticker_upper = ticker.to_uppercase();

        if contains_any(&category, ALTERNATIVE_KEYWORDS)
            || contains_any(&asset_class, ALTERNATIVE_KEYWORDS)
        {
            return Some(AssetClass::Alternatives);
        }

        if contains_any(&category, US_SIZE_BOX_KEYWORDS)
            || (category.contains("equity") && (has_word(&category, "us") || category.contains("domestic")))
        {
            return Some(AssetClass::UsEquities);
        }

        if FOREIGN_SUFFIXES.iter().any(|s| ticker_upper.ends_with(s)) {
            return Some(AssetClass::InternationalEquities);
        }

        if contains_any(&category, INTERNATIONAL_KEYWORDS)
            || (category.contains("equity") && contains_any(&category, GLOBAL_EQUITY_KEYWORDS))
        {
            return Some(AssetClass::InternationalEquities);
        }

        if contains_any(&category, BOND_KEYWORDS)
            || asset_class.contains("bond")
            || asset_class.contains("fixed")
        {
            if contains_any(&category, INTERNATIONAL_KEYWORDS)
                || contains_any(&category, GLOBAL_EQUITY_KEYWORDS)
            {
                tracing::debug!(ticker, "international bond folded into core fixed income");
            }
            return Some(AssetClass::CoreFixedIncome);
        }

        if metadata
            .quote_type
            .as_deref()
            .is_some_and(|q| q.eq_ignore_ascii_case("EQUITY"))
        {
            let country = lower(&metadata.country);
            let country = country.trim();
            if US_COUNTRIES.contains(&country) {
                return Some(AssetClass::UsEquities);
            }
            if !country.is_empty() {
                return Some(AssetClass::InternationalEquities);
            }
        }

        None
    }

    /// Classifies every ticker, honouring overrides and applying `resolver`
    /// to anything left unknown.
    pub fn classify_all(
        &self,
        tickers: &[String],
        metadata: &HashMap<String, InstrumentMetadata>,
        overrides: &HashMap<String, AssetClass>,
        resolver: ClassificationResolver<'_>,
    ) -> Result<ClassificationMap, ModelfolioError> {
        let mut map = ClassificationMap::new();

        for ticker in tickers {
            if let Some(&class) = overrides.get(ticker) {
                tracing::debug!(%ticker, %class, "using classification override");
                map.set_override(ticker, class);
                continue;
            }

            let (class, source) = match self.classify_with_source(ticker, metadata.get(ticker)) {
                Some(found) => found,
                None => {
                    let class = match resolver {
                        ClassificationResolver::Prompting(prompt) => {
                            prompt.choose(ticker, &AssetClass::ALL)?
                        }
                        ClassificationResolver::DefaultingTo(class) => {
                            tracing::warn!(%ticker, %class, "could not classify, using default");
                            class
                        }
                        ClassificationResolver::Strict => {
                            return Err(ModelfolioError::UnresolvedClassification {
                                ticker: ticker.clone(),
                            });
                        }
                    };
                    (class, ClassificationSource::Fallback)
                }
            };
            map.insert_automatic(ticker, class, source);
        }

        Ok(map)
    }
}

fn lower(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn has_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}
