//! Environmentally relevant OSM tag taxonomy.
//!
//! The taxonomy is a categorized JSON document:
//!
//! ```json
//! { "natural": { "values": { "water": ["water", "spring"], "bare": ["sand"] } } }
//! ```
//!
//! Subcategories only organise the file; they are flattened into one value
//! set per category (an OSM tag key).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{OsmError, Result};

/// Default taxonomy shipped with the crate.
const DEFAULT_TAXONOMY_JSON: &str = include_str!("../config/osm_feature_types.json");

/// Categories checked first, in this order, when resolving a feature type.
pub const CATEGORY_PRIORITY: &[&str] = &[
    "natural",
    "water",
    "wetland",
    "landcover",
    "vegetation",
    "ecosystem",
    "geological",
    "soil",
    "landuse",
    "protected_area",
    "waterway",
    "agriculture",
    "climate",
];

#[derive(Debug, Deserialize)]
struct CategoryConfig {
    values: BTreeMap<String, Vec<String>>,
}

/// Tag key -> accepted tag values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureTaxonomy {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl FeatureTaxonomy {
    /// Load the embedded default taxonomy.
    pub fn embedded() -> Result<Self> {
        Self::from_json(DEFAULT_TAXONOMY_JSON, Path::new("<embedded>"))
    }

    /// Load a taxonomy from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OsmError::io(path, e))?;
        Self::from_json(&text, path)
    }

    fn from_json(text: &str, origin: &Path) -> Result<Self> {
        let config: BTreeMap<String, CategoryConfig> =
            serde_json::from_str(text).map_err(|e| OsmError::InvalidTaxonomy {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        let categories: BTreeMap<String, BTreeSet<String>> = config
            .into_iter()
            .map(|(category, data)| (category, data.values.into_values().flatten().collect()))
            .collect();

        if categories.values().all(BTreeSet::is_empty) {
            return Err(OsmError::InvalidTaxonomy {
                path: origin.to_path_buf(),
                message: "taxonomy defines no tag values".to_string(),
            });
        }
        Ok(Self { categories })
    }

    /// Build directly from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (key, value) in pairs {
            categories.entry(key.into()).or_default().insert(value.into());
        }
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn contains(&self, category: &str, value: &str) -> bool {
        self.categories
            .get(category)
            .is_some_and(|values| values.contains(value))
    }

    /// Every `(key, value)` pair, in key then value order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    pub fn pair_count(&self) -> usize {
        self.categories.values().map(BTreeSet::len).sum()
    }

    /// Resolve `category:value` from an element's tags.
    ///
    /// Only [`CATEGORY_PRIORITY`] categories are tried, in that order.
    /// Returns `None` when none of them matches, even if another taxonomy
    /// category does.
    pub fn feature_type(&self, tags: &BTreeMap<String, String>) -> Option<String> {
        CATEGORY_PRIORITY.iter().find_map(|&category| {
            let value = tags.get(category)?;
            self.contains(category, value)
                .then(|| format!("{category}:{value}"))
        })
    }

    /// Tags whose key is a taxonomy category.
    pub fn environmental_tags(&self, tags: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        tags.iter()
            .filter(|(key, _)| self.contains_category(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
