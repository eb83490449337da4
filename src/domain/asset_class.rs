//! Asset-class taxonomy.
//!
//! A single closed enumeration is used end to end: classifier rules, the
//! growth/volatility tables, the model catalog and user overrides all speak
//! these four labels.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetClass {
    UsEquities,
    InternationalEquities,
    CoreFixedIncome,
    Alternatives,
}

impl AssetClass {
    /// Menu order used for prompting.
    pub const ALL: [AssetClass; 4] = [
        AssetClass::UsEquities,
        AssetClass::InternationalEquities,
        AssetClass::CoreFixedIncome,
        AssetClass::Alternatives,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::UsEquities => "US Equities",
            AssetClass::InternationalEquities => "International Equities",
            AssetClass::CoreFixedIncome => "Core Fixed Income",
            AssetClass::Alternatives => "Alternatives",
        }
    }

    /// 1-based position in [`AssetClass::ALL`].
    pub fn menu_number(&self) -> usize {
        match self {
            AssetClass::UsEquities => 1,
            AssetClass::InternationalEquities => 2,
            AssetClass::CoreFixedIncome => 3,
            AssetClass::Alternatives => 4,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset class: {0}")]
pub struct ParseAssetClassError(pub String);

impl FromStr for AssetClass {
    type Err = ParseAssetClassError;

    /// Accepts the display label (case-insensitive) or a menu number 1-4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<usize>() {
            return AssetClass::ALL
                .iter()
                .copied()
                .find(|c| c.menu_number() == n)
                .ok_or_else(|| ParseAssetClassError(trimmed.to_string()));
        }
        AssetClass::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseAssetClassError(trimmed.to_string()))
    }
}

/// Aggregated weight per asset class. Ordered by label so vector
/// construction and reporting are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetClassAllocation {
    entries: BTreeMap<String, (AssetClass, f64)>,
}

impl AssetClassAllocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, class: AssetClass, weight: f64) {
        self.entries
            .entry(class.label().to_string())
            .or_insert((class, 0.0))
            .1 += weight;
    }

    pub fn get(&self, class: AssetClass) -> f64 {
        self.entries
            .get(class.label())
            .map(|&(_, w)| w)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, class: AssetClass) -> bool {
        self.entries.contains_key(class.label())
    }

    /// Iterates in lexicographic label order.
    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.entries.values().copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = AssetClass> + '_ {
        self.entries.values().map(|&(c, _)| c)
    }

    pub fn total(&self) -> f64 {
        self.entries.values().map(|&(_, w)| w).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(AssetClass, f64)> for AssetClassAllocation {
    fn from_iter<I: IntoIterator<Item = (AssetClass, f64)>>(iter: I) -> Self {
        let mut allocation = AssetClassAllocation::new();
        for (class, weight) in iter {
            allocation.add(class, weight);
        }
        allocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for class in AssetClass::ALL {
            assert_eq!(class.label().parse::<AssetClass>().unwrap(), class);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(
            "core fixed income".parse::<AssetClass>().unwrap(),
            AssetClass::CoreFixedIncome
        );
        assert_eq!(
            "  US EQUITIES ".parse::<AssetClass>().unwrap(),
            AssetClass::UsEquities
        );
    }

    #[test]
    fn from_str_accepts_menu_numbers() {
        assert_eq!("1".parse::<AssetClass>().unwrap(), AssetClass::UsEquities);
        assert_eq!("4".parse::<AssetClass>().unwrap(), AssetClass::Alternatives);
        assert!("5".parse::<AssetClass>().is_err());
        assert!("0".parse::<AssetClass>().is_err());
    }

    #[test]
    fn from_str_rejects_legacy_taxonomy() {
        assert!("US Stock".parse::<AssetClass>().is_err());
        assert!("International Bond".parse::<AssetClass>().is_err());
    }

    #[test]
    fn allocation_accumulates_per_class() {
        let mut allocation = AssetClassAllocation::new();
        allocation.add(AssetClass::UsEquities, 0.25);
        allocation.add(AssetClass::CoreFixedIncome, 0.5);
        allocation.add(AssetClass::UsEquities, 0.25);

        assert_eq!(allocation.len(), 2);
        assert!((allocation.get(AssetClass::UsEquities) - 0.5).abs() < 1e-12);
        assert!((allocation.get(AssetClass::Alternatives) - 0.0).abs() < f64::EPSILON);
        assert!(!allocation.contains(AssetClass::Alternatives));
        assert!((allocation.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn allocation_iterates_in_label_order() {
        let allocation: AssetClassAllocation = [
            (AssetClass::UsEquities, 0.4),
            (AssetClass::Alternatives, 0.1),
            (AssetClass::InternationalEquities, 0.2),
            (AssetClass::CoreFixedIncome, 0.3),
        ]
        .into_iter()
        .collect();

        let order: Vec<AssetClass> = allocation.classes().collect();
        assert_eq!(
            order,
            vec![
                AssetClass::Alternatives,
                AssetClass::CoreFixedIncome,
                AssetClass::InternationalEquities,
                AssetClass::UsEquities,
            ]
        );
    }
}
