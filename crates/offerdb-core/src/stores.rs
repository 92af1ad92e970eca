use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A store whose weekly promotions are scraped.
///
/// `url_slug` is appended to the listing root to build the store's page URL,
/// and reused when synthesizing per-offer product links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub name: String,
    pub url_slug: String,
}

impl Store {
    /// The store's promotion listing page under `base_url`.
    #[must_use]
    pub fn listing_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.url_slug)
    }
}

#[derive(Debug, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<Store>,
}

impl StoresFile {
    /// Finds a configured store by its URL slug.
    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&Store> {
        self.stores.iter().find(|s| s.url_slug == slug)
    }
}

/// Load and validate the store list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_stores(path: &Path) -> Result<StoresFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_stores(&content)
}

fn parse_stores(content: &str) -> Result<StoresFile, ConfigError> {
    let stores_file: StoresFile = serde_yaml::from_str(content)?;
    validate_stores(&stores_file)?;
    Ok(stores_file)
}

fn validate_stores(stores_file: &StoresFile) -> Result<(), ConfigError> {
    if stores_file.stores.is_empty() {
        return Err(ConfigError::Validation(
            "no stores configured; add at least one entry under `stores`".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for store in &stores_file.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }

        if store.url_slug.is_empty()
            || !store
                .url_slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "store '{}' has invalid url_slug '{}'; use lowercase letters, digits, and '-'",
                store.name, store.url_slug
            )));
        }

        if !seen_names.insert(store.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store name: '{}'",
                store.name
            )));
        }

        if !seen_slugs.insert(store.url_slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store url_slug: '{}' (from store '{}')",
                store.url_slug, store.name
            )));
        }
    }

    Ok(())
}
