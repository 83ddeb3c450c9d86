//! Per-biosample enrichment and the `normalize` batch.

use envo_model::{Biosample, MappingStats, record_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::aggregate::{Reconciled, accept_mappings, reconcile};
use crate::config::NormalizerConfig;
use crate::engine::MappingEngine;
use crate::features::extract_features;
use crate::select::select_features;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeMetadata {
    pub total_input_samples: usize,
    pub processed_samples: usize,
    pub confidence_threshold: f64,
    pub max_features_per_sample: usize,
}

/// Output document of the `normalize` batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOutput {
    pub biosamples: Vec<Value>,
    pub metadata: NormalizeMetadata,
}

/// Outcome for one sample, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub id: String,
    /// `None` when the sample was passed through unenriched.
    pub stats: Option<MappingStats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeRun {
    pub output: NormalizeOutput,
    pub reports: Vec<SampleReport>,
}

/// Runs feature selection, mapping and reconciliation for biosamples.
pub struct Normalizer {
    engine: MappingEngine,
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(engine: MappingEngine, config: NormalizerConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Add `envo_mappings`, `envo_mappings_by_field` and
    /// `envo_mapping_stats` to a sample.
    ///
    /// A sample without OSM features, or whose features are all out of
    /// range, is returned unchanged.
    pub async fn enrich_biosample(&self, mut sample: Biosample) -> Biosample {
        if let Some(reconciled) = self.map_sample(&sample).await {
            sample.envo_mappings = Some(reconciled.by_type);
            sample.envo_mappings_by_field = Some(reconciled.by_field);
            sample.envo_mapping_stats = Some(reconciled.stats);
        }
        sample
    }

    /// Select, map and reconcile the sample's features.
    ///
    /// `None` when there is nothing in range to map.
    pub async fn map_sample(&self, sample: &Biosample) -> Option<Reconciled> {
        let Some(summary) = sample.osm_features.as_ref() else {
            warn!(
                biosample_id = sample.display_id(),
                "No OSM features found for biosample"
            );
            return None;
        };

        let candidates = extract_features(summary, self.config.max_distance_m);
        if candidates.is_empty() {
            warn!(
                biosample_id = sample.display_id(),
                "No OSM features found for biosample"
            );
            return None;
        }
        let candidate_count = candidates.len();
        let features = select_features(candidates, self.config.max_features);
        if features.len() < candidate_count {
            info!(
                biosample_id = sample.display_id(),
                from = candidate_count,
                to = features.len(),
                "Limiting features for biosample"
            );
        }

        let asserted = sample.asserted_terms();
        let mut mappings = Vec::new();
        for feature in &features {
            if let Some(mapping) = self.engine.map_feature(feature, &asserted).await {
                mappings.push(mapping);
            }
        }

        let threshold = self.config.confidence_threshold;
        let reconciled = reconcile(
            accept_mappings(mappings, threshold),
            features.len(),
            threshold,
            &asserted,
        );
        info!(
            biosample_id = sample.display_id(),
            features = features.len(),
            accepted = reconciled.stats.features_with_mappings,
            "Mapped biosample features"
        );
        Some(reconciled)
    }

    /// Enrich raw biosample records one after another.
    ///
    /// A record that cannot be read as a biosample, or whose enrichment
    /// cannot be written back, is passed through unchanged.
    pub async fn normalize_batch<F>(
        &self,
        mut records: Vec<Value>,
        max_samples: Option<usize>,
        mut on_sample: F,
    ) -> NormalizeRun
    where
        F: FnMut(usize),
    {
        if let Some(max) = max_samples.filter(|max| *max < records.len()) {
            info!(max, "Limiting biosamples");
            records.truncate(max);
        }
        let total = records.len();

        let mut biosamples = Vec::with_capacity(total);
        let mut reports = Vec::with_capacity(total);
        for (index, record) in records.into_iter().enumerate() {
            on_sample(index);
            let (value, report) = self.normalize_record(record).await;
            biosamples.push(value);
            reports.push(report);
        }

        NormalizeRun {
            output: NormalizeOutput {
                metadata: NormalizeMetadata {
                    total_input_samples: total,
                    processed_samples: biosamples.len(),
                    confidence_threshold: self.config.confidence_threshold,
                    max_features_per_sample: self.config.max_features,
                },
                biosamples,
            },
            reports,
        }
    }

    async fn normalize_record(&self, mut record: Value) -> (Value, SampleReport) {
        let id = record_id(&record).unwrap_or_else(|| "<unknown>".to_string());
        if !record.is_object() {
            error!(biosample_id = %id, "Biosample is not a JSON object, passing through");
            return (record, SampleReport { id, stats: None });
        }
        let sample = match Biosample::deserialize(&record) {
            Ok(sample) => sample,
            Err(e) => {
                error!(biosample_id = %id, error = %e, "Unreadable biosample, passing through");
                return (record, SampleReport { id, stats: None });
            }
        };

        let Some(reconciled) = self.map_sample(&sample).await else {
            return (record, SampleReport { id, stats: None });
        };
        let entries = match mapping_entries(&reconciled) {
            Ok(entries) => entries,
            Err(e) => {
                error!(biosample_id = %id, error = %e, "Could not write mappings, passing through");
                return (record, SampleReport { id, stats: None });
            }
        };
        if let Value::Object(object) = &mut record {
            for (key, value) in entries {
                object.insert(key.to_string(), value);
            }
        }
        (
            record,
            SampleReport {
                id,
                stats: Some(reconciled.stats),
            },
        )
    }
}

/// The keys `normalize` adds to a record. Everything else is left as read.
fn mapping_entries(reconciled: &Reconciled) -> serde_json::Result<[(&'static str, Value); 3]> {
    Ok([
        ("envo_mappings", serde_json::to_value(&reconciled.by_type)?),
        ("envo_mappings_by_field", serde_json::to_value(&reconciled.by_field)?),
        ("envo_mapping_stats", serde_json::to_value(&reconciled.stats)?),
    ])
}
