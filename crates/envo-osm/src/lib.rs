//! Environmental OpenStreetMap features around a point.
//!
//! [`OverpassClient`] queries the Overpass API for every tag pair in a
//! [`FeatureTaxonomy`]; [`summarize_features`] turns the result into the
//! per-category, distance-sorted document stored on biosamples.

#![deny(unsafe_code)]

pub mod client;
pub mod distance;
pub mod enrich;
pub mod error;
pub mod query;
pub mod summary;
pub mod taxonomy;

pub use client::{DEFAULT_OVERPASS_URL, FeatureSource, OverpassClient, OverpassConfig};
pub use distance::{EARTH_RADIUS_M, haversine_m};
pub use enrich::{
    OsmEnrichMetadata, OsmEnrichOptions, OsmEnrichOutput, enrich_batch, enrich_sample,
    has_confident_coordinates,
};
pub use error::{OsmError, Result};
pub use query::{QueriedFeature, build_overpass_query, parse_response};
pub use summary::{summarize_features, summarize_features_at, to_osm_features};
pub use taxonomy::{CATEGORY_PRIORITY, FeatureTaxonomy};
