use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use envo_cli::io::{read_biosamples, to_json, write_json};
use envo_cli::progress::sample_bar;
use envo_cli::summary::{enrich_table, feature_counts_table, lookup_table, normalize_table};
use envo_map::{MappingEngine, NormalizerConfig, Normalizer, OpenAiCompatibleClient, ReasoningConfig};
use envo_model::{Biosample, GeoPoint};
use envo_ontology::LexicalIndex;
use envo_osm::{
    FeatureSource, FeatureTaxonomy, OsmEnrichOptions, OverpassClient, OverpassConfig,
    enrich_batch, has_confident_coordinates, summarize_features,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::cli::{EnrichOsmArgs, FeaturesArgs, LookupArgs, NormalizeArgs, OntologyArgs, OverpassArgs};

pub async fn run_features(args: &FeaturesArgs) -> Result<()> {
    if !(-90.0..=90.0).contains(&args.lat) || !(-180.0..=180.0).contains(&args.lon) {
        bail!("coordinates out of range: {}, {}", args.lat, args.lon);
    }
    let client = overpass_client(&args.overpass)?;
    let center = GeoPoint::new(args.lat, args.lon);

    let features = client
        .query_features(center, args.radius)
        .await
        .context("query Overpass")?;
    let summary = summarize_features(&features, center, client.taxonomy());
    info!(
        total = summary.metadata.total_features,
        radius_m = args.radius,
        "Collected OSM features"
    );

    match &args.output {
        Some(path) => {
            write_json(path, &summary, !args.compact)?;
            println!("Wrote {} features to {}", summary.metadata.total_features, path.display());
            println!("{}", feature_counts_table(&summary));
        }
        None => println!("{}", to_json(&summary, !args.compact)?),
    }
    Ok(())
}

pub async fn run_enrich_osm(args: &EnrichOsmArgs, show_progress: bool) -> Result<()> {
    let started = Instant::now();

    let client = overpass_client(&args.overpass)?;
    let records = read_biosamples(&args.input)?;
    let options = OsmEnrichOptions {
        radius_m: args.radius,
        max_coordinate_distance_m: args.max_distance,
        max_samples: args.max_samples,
        ..OsmEnrichOptions::default()
    };

    let confident = records
        .iter()
        .filter_map(|record| Biosample::deserialize(record).ok())
        .filter(|sample| has_confident_coordinates(sample, options.max_coordinate_distance_m))
        .count();
    let bar = sample_bar(
        options.max_samples.map_or(confident, |max| max.min(confident)),
        show_progress,
    );
    let output = enrich_batch(&client, client.taxonomy(), records, &options, |sample| {
        bar.set_message(sample.display_id().to_string());
        bar.inc(1);
    })
    .await;
    bar.finish_and_clear();

    write_json(&args.output, &output, true)?;
    info!(
        enriched = output.metadata.successfully_enriched_samples,
        skipped = output.metadata.skipped_samples.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        output = %args.output.display(),
        "Wrote OSM-enriched biosamples"
    );
    println!("Output: {}", args.output.display());
    println!("{}", enrich_table(&output.metadata));
    Ok(())
}

pub async fn run_normalize(args: &NormalizeArgs, show_progress: bool) -> Result<()> {
    if !(0.0..=1.0).contains(&args.confidence) {
        bail!("--confidence must be between 0 and 1, got {}", args.confidence);
    }
    let started = Instant::now();

    let ontology = Arc::new(load_ontology(&args.ontology)?);

    let mut reasoning = ReasoningConfig::default()
        .with_base_url(&args.llm.base_url)
        .with_model(&args.llm.model)
        .with_temperature(args.llm.temperature);
    match &args.llm.api_key {
        Some(key) => reasoning = reasoning.with_api_key(key),
        None => warn!("No LLM API key set; requests are sent without authorization"),
    }
    let reasoner = OpenAiCompatibleClient::new(reasoning).context("create LLM client")?;

    let config = NormalizerConfig::default()
        .with_max_features(args.max_features)
        .with_max_distance(args.max_distance)
        .with_confidence_threshold(args.confidence)
        .with_call_timeout(Duration::from_secs(args.timeout_secs));
    let engine = MappingEngine::new(ontology, Arc::new(reasoner), &config);
    let normalizer = Normalizer::new(engine, config);

    let records = read_biosamples(&args.input)?;
    let bar = sample_bar(
        args.max_samples.map_or(records.len(), |max| max.min(records.len())),
        show_progress,
    );
    let run = normalizer
        .normalize_batch(records, args.max_samples, |index| {
            bar.set_position(index as u64);
        })
        .await;
    bar.finish_and_clear();

    write_json(&args.output, &run.output, true)?;
    info!(
        processed = run.output.metadata.processed_samples,
        duration_ms = started.elapsed().as_millis() as u64,
        output = %args.output.display(),
        "Wrote normalized biosamples"
    );
    println!("Output: {}", args.output.display());
    println!("{}", normalize_table(&run.reports, &run.output.metadata));
    Ok(())
}

pub fn run_lookup(args: &LookupArgs) -> Result<()> {
    let index = load_ontology(&args.ontology)?;
    let results = match &args.search {
        Some(query) => index.search_terms(query, args.max_results),
        None => args.ids.iter().map(|id| index.lookup_term(id)).collect(),
    };
    if results.is_empty() {
        println!("No matching terms");
    } else {
        println!("{}", lookup_table(&results));
    }
    Ok(())
}

fn overpass_client(args: &OverpassArgs) -> Result<OverpassClient> {
    let taxonomy = match &args.config {
        Some(path) => FeatureTaxonomy::load(path)
            .with_context(|| format!("load feature taxonomy {}", path.display()))?,
        None => FeatureTaxonomy::embedded().context("load bundled feature taxonomy")?,
    };
    let config = OverpassConfig::default().with_endpoint(&args.overpass_url);
    OverpassClient::new(config, taxonomy).context("create Overpass client")
}

fn load_ontology(args: &OntologyArgs) -> Result<LexicalIndex> {
    let Some(path) = &args.ontology else {
        let index = LexicalIndex::bundled().context("load bundled EnvO terms")?;
        info!(terms = index.len(), "Using bundled EnvO terms");
        return Ok(index);
    };
    let index = LexicalIndex::load(path)
        .with_context(|| format!("load EnvO terms from {}", path.display()))?;
    info!(terms = index.len(), path = %path.display(), "Loaded EnvO terms");
    Ok(index)
}
