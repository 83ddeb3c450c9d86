//! Feature-to-EnvO mapping records and per-biosample aggregates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::term::TermId;

/// Minimum length of a mapping's reasoning text.
pub const MIN_REASONING_LEN: usize = 10;

/// Biosample environment slot a mapping can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    /// Biomes and other large environmental systems.
    EnvBroadScale,
    /// Habitats and ecosystems around the sample.
    EnvLocalScale,
    /// The environmental material, e.g. soil or water.
    EnvMedium,
}

impl TargetField {
    pub const ALL: [TargetField; 3] = [
        TargetField::EnvBroadScale,
        TargetField::EnvLocalScale,
        TargetField::EnvMedium,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EnvBroadScale => "env_broad_scale",
            Self::EnvLocalScale => "env_local_scale",
            Self::EnvMedium => "env_medium",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::EnvBroadScale => {
                "The broad-scale environment context (e.g., biomes, large environmental systems)"
            }
            Self::EnvLocalScale => {
                "The local environment context (e.g., habitats, ecosystems)"
            }
            Self::EnvMedium => "The environmental material (e.g., soil, water, air, sediment)",
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::Message(format!("unknown target field: {s}")))
    }
}

/// A validated mapping from one OSM feature to one EnvO term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvoMapping {
    pub envo_id: TermId,
    pub envo_label: String,
    pub confidence: f64,
    pub reasoning: String,
    pub feature_id: String,
    pub feature_type: String,
    pub distance: f64,
    #[serde(rename = "nmdc_field", default)]
    pub target_field: Option<TargetField>,
    #[serde(rename = "nmdc_field_confidence", default)]
    pub target_field_confidence: Option<f64>,
}

impl EnvoMapping {
    /// Check the range and length constraints every emitted mapping must hold.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("confidence", self.confidence)?;
        if let Some(value) = self.target_field_confidence {
            check_unit_interval("nmdc_field_confidence", value)?;
        }
        if self.envo_label.trim().is_empty() {
            return Err(ModelError::TooShort {
                field: "envo_label",
                min: 1,
            });
        }
        if self.reasoning.trim().chars().count() < MIN_REASONING_LEN {
            return Err(ModelError::TooShort {
                field: "reasoning",
                min: MIN_REASONING_LEN,
            });
        }
        Ok(())
    }

    /// Ranking key within a field group: field confidence times mapping confidence.
    ///
    /// A missing field confidence counts as zero.
    pub fn combined_confidence(&self) -> f64 {
        self.target_field_confidence.unwrap_or(0.0) * self.confidence
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::OutOfRange { field, value })
    }
}

/// Accepted mappings regrouped by target field.
///
/// Always carries all three fields, each sorted by descending combined confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingsByField {
    #[serde(default)]
    pub env_broad_scale: Vec<EnvoMapping>,
    #[serde(default)]
    pub env_local_scale: Vec<EnvoMapping>,
    #[serde(default)]
    pub env_medium: Vec<EnvoMapping>,
}

impl MappingsByField {
    pub fn get(&self, field: TargetField) -> &[EnvoMapping] {
        match field {
            TargetField::EnvBroadScale => &self.env_broad_scale,
            TargetField::EnvLocalScale => &self.env_local_scale,
            TargetField::EnvMedium => &self.env_medium,
        }
    }

    pub fn get_mut(&mut self, field: TargetField) -> &mut Vec<EnvoMapping> {
        match field {
            TargetField::EnvBroadScale => &mut self.env_broad_scale,
            TargetField::EnvLocalScale => &mut self.env_local_scale,
            TargetField::EnvMedium => &mut self.env_medium,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetField, &[EnvoMapping])> {
        TargetField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    pub fn total(&self) -> usize {
        self.iter().map(|(_, mappings)| mappings.len()).sum()
    }
}

/// Summary statistics attached to an enriched biosample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingStats {
    pub total_features_processed: usize,
    pub features_with_mappings: usize,
    /// `features_with_mappings / total_features_processed`, zero when nothing was processed.
    pub mapping_coverage: f64,
    pub confidence_threshold: f64,
    pub field_coverage: BTreeMap<TargetField, bool>,
    pub agreement_with_asserted: BTreeMap<TargetField, bool>,
}

impl MappingStats {
    pub fn mapped_fields(&self) -> usize {
        self.field_coverage.values().filter(|covered| **covered).count()
    }

    pub fn agreeing_fields(&self) -> usize {
        self.agreement_with_asserted
            .values()
            .filter(|agrees| **agrees)
            .count()
    }
}
