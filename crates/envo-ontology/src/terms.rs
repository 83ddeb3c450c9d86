//! Term table loading.
//!
//! Tables are CSV (`id,label,synonyms,definition,obsolete`, synonyms
//! separated by `;`) or a JSON array of [`TermRecord`] objects.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::{Reader, ReaderBuilder};
use envo_model::TermId;
use serde::{Deserialize, Serialize};

use crate::error::{OntologyError, Result};

const BUNDLED_TERMS_CSV: &str = include_str!("../data/envo_terms.csv");

/// One ontology term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: TermId,
    pub label: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub obsolete: bool,
}

/// The term table compiled into the crate, used when no path is given.
pub fn bundled_terms() -> Result<Vec<TermRecord>> {
    let reader = csv_reader().from_reader(BUNDLED_TERMS_CSV.as_bytes());
    parse_csv_terms(reader, Path::new("<embedded>"))
}

/// Load a term table, choosing the format from the file extension.
pub fn load_terms(path: &Path) -> Result<Vec<TermRecord>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => load_terms_csv(path),
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_terms_json(path),
        _ => Err(OntologyError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

pub fn load_terms_json(path: &Path) -> Result<Vec<TermRecord>> {
    let text = std::fs::read_to_string(path).map_err(|e| OntologyError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| OntologyError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn load_terms_csv(path: &Path) -> Result<Vec<TermRecord>> {
    let reader = csv_reader().from_path(path).map_err(|e| OntologyError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_csv_terms(reader, path)
}

fn csv_reader() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true);
    builder
}

/// `path` only labels errors.
fn parse_csv_terms<R: Read>(reader: Reader<R>, path: &Path) -> Result<Vec<TermRecord>> {
    let rows = read_csv_rows(reader, path)?;
    let mut terms = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 2;
        let invalid = |message: String| OntologyError::InvalidTerm {
            path: path.to_path_buf(),
            row: row_number,
            message,
        };

        let raw_id = get_field(row, "id");
        if raw_id.is_empty() {
            continue;
        }
        let id = TermId::parse(&raw_id).map_err(|e| invalid(e.to_string()))?;
        let label = get_field(row, "label");
        if label.is_empty() {
            return Err(invalid(format!("term {id} has no label")));
        }

        terms.push(TermRecord {
            id,
            label,
            synonyms: parse_synonyms(&get_field(row, "synonyms")),
            definition: get_optional(row, "definition"),
            obsolete: parse_bool(&get_field(row, "obsolete")),
        });
    }
    Ok(terms)
}

fn read_csv_rows<R: Read>(
    mut reader: Reader<R>,
    path: &Path,
) -> Result<Vec<BTreeMap<String, String>>> {
    let csv_error = |e: csv::Error| OntologyError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut row = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            let key = headers
                .get(idx)
                .unwrap_or("")
                .trim_matches('\u{feff}')
                .trim()
                .to_ascii_lowercase();
            row.insert(key, value.trim().to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

fn get_field(row: &BTreeMap<String, String>, key: &str) -> String {
    row.get(key).cloned().unwrap_or_default()
}

fn get_optional(row: &BTreeMap<String, String>, key: &str) -> Option<String> {
    row.get(key).filter(|v| !v.is_empty()).cloned()
}

fn parse_synonyms(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}
