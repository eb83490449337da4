//! INI file configuration adapter.
//!
//! A modelfolio config has scalar sections (`[portfolio]`, `[analysis]`,
//! `[data]`) read key by key, and override sections (`[classification]`,
//! `[growth_rates]`, `[volatility]`) whose keys are tickers or class names
//! and are enumerated with `section_keys`.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

/// Section and key names are case-insensitive; lookups are lower-cased.
/// Override keys therefore come back lower-cased and callers upper-case
/// tickers themselves.
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn section_keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
