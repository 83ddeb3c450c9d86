//! CLI argument definitions for `biosample-envo`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use envo_map::{DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use envo_osm::DEFAULT_OVERPASS_URL;

#[derive(Parser)]
#[command(
    name = "biosample-envo",
    version,
    about = "Enrich biosamples with nearby OSM features and EnvO term mappings",
    long_about = "Enrich biosample records with environmental context.\n\n\
                  Queries OpenStreetMap for environmental features around each sample\n\
                  and maps those features to Environment Ontology (EnvO) terms."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query environmental OSM features around a single point.
    Features(FeaturesArgs),

    /// Add OSM feature summaries to biosamples with confident coordinates.
    EnrichOsm(EnrichOsmArgs),

    /// Map the OSM features of enriched biosamples to EnvO terms.
    Normalize(NormalizeArgs),

    /// Look up EnvO terms by id, or search them by text.
    Lookup(LookupArgs),
}

#[derive(Args)]
pub struct OverpassArgs {
    /// Overpass API endpoint.
    #[arg(long = "overpass-url", env = "OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
    pub overpass_url: String,

    /// Feature taxonomy JSON (defaults to the bundled taxonomy).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct OntologyArgs {
    /// EnvO term table (.csv or .json). Defaults to the bundled table.
    #[arg(long = "ontology", env = "ENVO_TERMS_PATH", value_name = "PATH")]
    pub ontology: Option<PathBuf>,
}

#[derive(Args)]
pub struct LlmArgs {
    /// API key for the chat completions endpoint.
    #[arg(long = "llm-api-key", env = "ENVO_LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long = "llm-base-url", env = "ENVO_LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    pub base_url: String,

    /// Model name.
    #[arg(long = "llm-model", env = "ENVO_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub model: String,

    /// Sampling temperature.
    #[arg(long = "temperature", default_value_t = 0.1)]
    pub temperature: f32,
}

#[derive(Args)]
pub struct FeaturesArgs {
    /// Latitude of the query center.
    #[arg(long = "lat", allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the query center.
    #[arg(long = "lon", allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius in meters.
    #[arg(long = "radius", default_value_t = 1000.0)]
    pub radius: f64,

    /// Write the summary to a file instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Emit compact JSON.
    #[arg(long = "compact")]
    pub compact: bool,

    #[command(flatten)]
    pub overpass: OverpassArgs,
}

#[derive(Args)]
pub struct EnrichOsmArgs {
    /// Input biosample JSON (a list or `{"biosamples": [...]}`).
    #[arg(long = "input", short = 'i', value_name = "PATH")]
    pub input: PathBuf,

    /// Output JSON path.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    /// Process at most this many confident samples.
    #[arg(long = "max-samples")]
    pub max_samples: Option<usize>,

    /// Largest accepted distance between asserted and inferred coordinates, in meters.
    #[arg(long = "max-distance", default_value_t = 10_000.0)]
    pub max_distance: f64,

    /// Feature search radius in meters.
    #[arg(long = "radius", default_value_t = 1000.0)]
    pub radius: f64,

    #[command(flatten)]
    pub overpass: OverpassArgs,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Input biosample JSON with `osm_features`.
    #[arg(long = "input", short = 'i', value_name = "PATH")]
    pub input: PathBuf,

    /// Output JSON path.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: PathBuf,

    /// Process at most this many samples.
    #[arg(long = "max-samples")]
    pub max_samples: Option<usize>,

    /// Features mapped per sample.
    #[arg(long = "max-features", default_value_t = 20)]
    pub max_features: usize,

    /// Minimum confidence for a mapping to be kept.
    #[arg(long = "confidence", default_value_t = 0.7)]
    pub confidence: f64,

    /// Ignore features farther than this from the sample, in meters.
    #[arg(long = "max-distance", default_value_t = 500.0)]
    pub max_distance: f64,

    /// Timeout for each ontology or reasoning call, in seconds.
    #[arg(long = "timeout-secs", default_value_t = 60)]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub ontology: OntologyArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Term ids such as `ENVO:00000063`.
    #[arg(value_name = "TERM_ID", required_unless_present = "search")]
    pub ids: Vec<String>,

    /// Search terms by label and synonym instead.
    #[arg(long = "search", value_name = "TEXT", conflicts_with = "ids")]
    pub search: Option<String>,

    /// Maximum search results.
    #[arg(long = "max-results", default_value_t = envo_ontology::DEFAULT_SEARCH_RESULTS)]
    pub max_results: usize,

    #[command(flatten)]
    pub ontology: OntologyArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
