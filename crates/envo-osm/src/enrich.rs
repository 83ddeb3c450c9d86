//! Attach OSM feature summaries to biosamples.

use std::time::Duration;

use envo_model::{Biosample, OsmFeatureSummary, record_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::client::FeatureSource;
use crate::error::{OsmError, Result};
use crate::summary::summarize_features;
use crate::taxonomy::FeatureTaxonomy;

/// Options for the `enrich-osm` batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OsmEnrichOptions {
    /// Feature search radius around the asserted coordinates.
    pub radius_m: f64,
    /// Largest accepted distance between asserted and inferred coordinates.
    pub max_coordinate_distance_m: f64,
    pub max_samples: Option<usize>,
    /// Pause between consecutive samples.
    pub sample_delay: Duration,
}

impl Default for OsmEnrichOptions {
    fn default() -> Self {
        Self {
            radius_m: 1000.0,
            max_coordinate_distance_m: 10_000.0,
            max_samples: None,
            sample_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmEnrichMetadata {
    pub total_input_samples: usize,
    pub confident_coordinate_samples: usize,
    pub successfully_enriched_samples: usize,
    pub skipped_samples: Vec<Option<String>>,
    pub coordinate_confidence_threshold_meters: f64,
    pub feature_radius_meters: f64,
}

/// Output document of the `enrich-osm` batch.
///
/// Records are written back as read, with `osm_features` added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsmEnrichOutput {
    pub biosamples: Vec<Value>,
    pub metadata: OsmEnrichMetadata,
}

/// Whether asserted and inferred coordinates agree closely enough to query.
///
/// Both coordinate pairs must parse and `inferred_lat_lon` must carry a
/// `distance_from_asserted_meters` at or below `max_distance_m`.
pub fn has_confident_coordinates(sample: &Biosample, max_distance_m: f64) -> bool {
    let id = sample.display_id();
    if sample.asserted_point().is_none() || sample.inferred_point().is_none() {
        info!(biosample_id = id, "Skipping biosample: missing coordinates");
        return false;
    }
    let Some(distance) = sample
        .inferred_lat_lon
        .as_ref()
        .and_then(envo_model::LatLon::distance_from_asserted)
    else {
        info!(biosample_id = id, "Skipping biosample: no distance calculation");
        return false;
    };
    if distance > max_distance_m {
        info!(
            biosample_id = id,
            distance_m = distance,
            threshold_m = max_distance_m,
            "Skipping biosample: coordinate distance exceeds threshold"
        );
        return false;
    }
    true
}

/// Query features around the sample's asserted coordinates.
///
/// Returns the sample with `osm_features` set. A sample without usable
/// coordinates is returned unchanged.
pub async fn enrich_sample(
    source: &dyn FeatureSource,
    taxonomy: &FeatureTaxonomy,
    mut sample: Biosample,
    radius_m: f64,
) -> Result<Biosample> {
    if let Some(summary) = query_summary(source, taxonomy, &sample, radius_m).await? {
        sample.osm_features = Some(summary);
    }
    Ok(sample)
}

async fn query_summary(
    source: &dyn FeatureSource,
    taxonomy: &FeatureTaxonomy,
    sample: &Biosample,
    radius_m: f64,
) -> Result<Option<OsmFeatureSummary>> {
    let Some(center) = sample.asserted_point() else {
        warn!(
            biosample_id = sample.display_id(),
            "Missing or invalid coordinates"
        );
        return Ok(None);
    };
    let features = source.query_features(center, radius_m).await?;
    Ok(Some(summarize_features(&features, center, taxonomy)))
}

/// A record together with its typed view.
struct Record {
    raw: Value,
    sample: Biosample,
}

/// Read the typed view of each record.
///
/// Records that are not JSON objects or cannot be read are reported by id,
/// or by `#<index>` when they carry none, and left out of the batch.
fn read_records(records: Vec<Value>, skipped: &mut Vec<Option<String>>) -> Vec<Record> {
    let mut readable = Vec::with_capacity(records.len());
    for (index, raw) in records.into_iter().enumerate() {
        let id = record_id(&raw).unwrap_or_else(|| format!("#{index}"));
        if !raw.is_object() {
            warn!(biosample_id = %id, "Skipping biosample: not a JSON object");
            skipped.push(Some(id));
            continue;
        }
        match Biosample::deserialize(&raw) {
            Ok(sample) => readable.push(Record { raw, sample }),
            Err(e) => {
                warn!(biosample_id = %id, error = %e, "Skipping unreadable biosample");
                skipped.push(Some(id));
            }
        }
    }
    readable
}

/// Run the coordinate filter and feature query over a batch of records.
///
/// Unreadable records and samples whose query fails are listed in
/// `skipped_samples`; the batch itself never fails. `on_sample` is called
/// once per processed sample.
pub async fn enrich_batch<F>(
    source: &dyn FeatureSource,
    taxonomy: &FeatureTaxonomy,
    records: Vec<Value>,
    options: &OsmEnrichOptions,
    mut on_sample: F,
) -> OsmEnrichOutput
where
    F: FnMut(&Biosample),
{
    let total_input_samples = records.len();
    let mut skipped = Vec::new();
    let mut confident: Vec<Record> = read_records(records, &mut skipped)
        .into_iter()
        .filter(|record| {
            has_confident_coordinates(&record.sample, options.max_coordinate_distance_m)
        })
        .collect();

    info!(
        confident = confident.len(),
        total = total_input_samples,
        threshold_m = options.max_coordinate_distance_m,
        "Found samples with confident coordinates"
    );

    if let Some(max) = options.max_samples {
        confident.truncate(max);
    }
    let confident_count = confident.len();

    let mut enriched = Vec::new();
    for (index, record) in confident.into_iter().enumerate() {
        if index > 0 && !options.sample_delay.is_zero() {
            tokio::time::sleep(options.sample_delay).await;
        }
        on_sample(&record.sample);

        let id = record.sample.id.clone();
        let summary = query_summary(source, taxonomy, &record.sample, options.radius_m)
            .await
            .and_then(|summary| {
                summary
                    .map(serde_json::to_value)
                    .transpose()
                    .map_err(OsmError::from)
            });
        match summary {
            Ok(Some(summary)) => {
                let mut raw = record.raw;
                if let Value::Object(object) = &mut raw {
                    object.insert("osm_features".to_string(), summary);
                }
                enriched.push(raw);
            }
            Ok(None) => skipped.push(id),
            Err(e) => {
                error!(biosample_id = id.as_deref().unwrap_or("<unknown>"), error = %e, "Error processing biosample");
                skipped.push(id);
            }
        }
    }

    OsmEnrichOutput {
        metadata: OsmEnrichMetadata {
            total_input_samples,
            confident_coordinate_samples: confident_count,
            successfully_enriched_samples: enriched.len(),
            skipped_samples: skipped,
            coordinate_confidence_threshold_meters: options.max_coordinate_distance_m,
            feature_radius_meters: options.radius_m,
        },
        biosamples: enriched,
    }
}
