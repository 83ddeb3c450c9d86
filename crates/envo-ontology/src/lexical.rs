//! In-memory lexical index over a term table.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use envo_model::{
    AnnotationMatch, ENVO_PREFIX, EnvoLookupResult, TermId, TextAnnotationResult,
};
use rapidfuzz::distance::jaro_winkler;
use tracing::{debug, info};

use crate::annotation::{annotation_coverage, filter_annotations};
use crate::error::{OntologyError, Result};
use crate::service::OntologyLookupService;
use crate::terms::{TermRecord, bundled_terms, load_terms};

/// Lowest similarity accepted by fuzzy search.
const MIN_FUZZY_SIMILARITY: f64 = 0.85;

/// Term lookup, search and annotation backed by a loaded term table.
///
/// Annotation uses an Aho-Corasick automaton over every label and synonym,
/// matched ASCII case-insensitively at word boundaries.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    terms: Vec<TermRecord>,
    by_id: HashMap<String, usize>,
    matcher: Option<AhoCorasick>,
    /// Pattern index -> term index.
    pattern_terms: Vec<usize>,
    prefix: String,
}

impl LexicalIndex {
    pub fn new(terms: Vec<TermRecord>) -> Result<Self> {
        let by_id = terms
            .iter()
            .enumerate()
            .map(|(index, term)| (term.id.to_string(), index))
            .collect();

        let mut patterns = Vec::new();
        let mut pattern_terms = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            let names: BTreeSet<String> = std::iter::once(&term.label)
                .chain(&term.synonyms)
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect();
            for name in names {
                patterns.push(name);
                pattern_terms.push(index);
            }
        }

        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(&patterns)
                    .map_err(|e| OntologyError::Matcher(e.to_string()))?,
            )
        };

        Ok(Self {
            terms,
            by_id,
            matcher,
            pattern_terms,
            prefix: ENVO_PREFIX.to_string(),
        })
    }

    /// Load a CSV or JSON term table.
    pub fn load(path: &Path) -> Result<Self> {
        let terms = load_terms(path)?;
        info!(path = %path.display(), terms = terms.len(), "Loaded ontology term table");
        Self::new(terms)
    }

    /// Index the term table compiled into the crate.
    pub fn bundled() -> Result<Self> {
        let terms = bundled_terms()?;
        info!(terms = terms.len(), "Loaded bundled ontology term table");
        Self::new(terms)
    }

    /// Report only terms with this prefix from annotation and search.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, term_id: &str) -> Option<&TermRecord> {
        let id = TermId::parse(term_id).ok()?;
        self.by_id.get(&id.to_string()).map(|&index| &self.terms[index])
    }

    /// Resolve an id; unknown or malformed ids give the not-found result.
    pub fn lookup_term(&self, term_id: &str) -> EnvoLookupResult {
        match self.term(term_id) {
            Some(term) => to_lookup_result(term),
            None => {
                debug!(term_id, "Term not found");
                EnvoLookupResult::not_found(term_id.trim())
            }
        }
    }

    /// Annotate `text` with term mentions.
    pub fn annotate_text(&self, text: &str) -> TextAnnotationResult {
        let Some(matcher) = &self.matcher else {
            return TextAnnotationResult::empty(text);
        };

        let mut seen = BTreeSet::new();
        let mut raw = Vec::new();
        for found in matcher.find_overlapping_iter(text) {
            let (start, end) = (found.start(), found.end());
            if !is_word_boundary(text, start, end) {
                continue;
            }
            let term = &self.terms[self.pattern_terms[found.pattern().as_usize()]];
            if !seen.insert((term.id.to_string(), start, end)) {
                continue;
            }
            raw.push(AnnotationMatch {
                id: term.id.to_string(),
                label: term.label.clone(),
                matched: text[start..end].to_string(),
                start,
                end,
            });
        }

        let mut matches = filter_annotations(text, raw, &self.prefix);
        matches.sort_by_key(|m| (m.start, m.end));
        let coverage = annotation_coverage(text, &matches);
        TextAnnotationResult {
            text: text.to_string(),
            matches,
            coverage,
        }
    }

    /// Ranked search over labels and synonyms.
    ///
    /// Exact label matches rank first, then exact synonym matches, then
    /// containment, then fuzzy matches. Obsolete terms are removed before
    /// the result is truncated.
    pub fn search_terms(&self, query: &str, max_results: usize) -> Vec<EnvoLookupResult> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(u8, f64, &TermRecord)> = self
            .terms
            .iter()
            .filter(|term| !term.obsolete && term.id.has_prefix(&self.prefix))
            .filter_map(|term| rank_term(term, &needle).map(|(tier, score)| (tier, score, term)))
            .collect();

        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.total_cmp(&a.1))
                .then_with(|| a.2.id.cmp(&b.2.id))
        });

        ranked
            .into_iter()
            .take(max_results)
            .map(|(_, _, term)| to_lookup_result(term))
            .collect()
    }
}

fn to_lookup_result(term: &TermRecord) -> EnvoLookupResult {
    EnvoLookupResult {
        id: term.id.to_string(),
        label: term.label.clone(),
        is_obsolete: term.obsolete,
        definition: term.definition.clone(),
    }
}

fn rank_term(term: &TermRecord, needle: &str) -> Option<(u8, f64)> {
    let label = term.label.to_lowercase();
    let synonyms: Vec<String> = term.synonyms.iter().map(|s| s.to_lowercase()).collect();
    let similarity = std::iter::once(&label)
        .chain(&synonyms)
        .map(|name| jaro_winkler::similarity(name.chars(), needle.chars()))
        .fold(0.0_f64, f64::max);

    if label == needle {
        Some((0, similarity))
    } else if synonyms.iter().any(|s| s == needle) {
        Some((1, similarity))
    } else if label.contains(needle) || synonyms.iter().any(|s| s.contains(needle)) {
        Some((2, similarity))
    } else if similarity >= MIN_FUZZY_SIMILARITY {
        Some((3, similarity))
    } else {
        None
    }
}

/// Neither side of the span touches another word character.
fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back().is_none_or(|c| !is_word(c));
    let after = text[end..].chars().next().is_none_or(|c| !is_word(c));
    before && after
}

#[async_trait]
impl OntologyLookupService for LexicalIndex {
    async fn lookup(&self, term_id: &str) -> Result<EnvoLookupResult> {
        Ok(self.lookup_term(term_id))
    }

    async fn annotate(&self, text: &str) -> Result<TextAnnotationResult> {
        Ok(self.annotate_text(text))
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EnvoLookupResult>> {
        Ok(self.search_terms(query, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(id: &str, label: &str, synonyms: &[&str], obsolete: bool) -> TermRecord {
        TermRecord {
            id: TermId::parse(id).unwrap(),
            label: label.to_string(),
            synonyms: synonyms.iter().map(|s| (*s).to_string()).collect(),
            definition: None,
            obsolete,
        }
    }

    fn index() -> LexicalIndex {
        LexicalIndex::new(vec![
            term("ENVO:00000063", "water body", &["body of water"], false),
            term("ENVO:00002006", "liquid water", &["water"], false),
            term("ENVO:00000020", "lake", &[], false),
            term("ENVO:00000001", "water body old", &[], true),
            term("ENVO:01000174", "forest biome", &["forest"], false),
            term("PO:00000001", "water plant", &[], false),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_normalizes_prefix_and_reports_missing_terms() {
        let index = index();
        assert_eq!(index.lookup_term("envo:00000020").label, "lake");
        assert!(index.lookup_term("ENVO:99999999").is_not_found());
        assert!(index.lookup_term("not an id").is_not_found());
        assert!(index.lookup_term("ENVO:00000001").is_obsolete);
    }

    #[test]
    fn annotation_finds_whole_words_only() {
        let index = index();
        let result = index.annotate_text("Tags: natural=water, waterway=stream near Lake");
        let ids: Vec<&str> = result.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["ENVO:00002006", "ENVO:00000020"]);
        assert_eq!(result.matches[1].matched, "Lake");
        assert!(result.coverage > 0.0 && result.coverage < 1.0);
    }

    #[test]
    fn annotation_keeps_overlapping_terms() {
        let index = index();
        let result = index.annotate_text("water body");
        let ids: BTreeSet<&str> = result.matches.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains("ENVO:00000063"));
        assert!(ids.contains("ENVO:00002006"));
        assert!((result.coverage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn search_ranks_exact_labels_and_skips_obsolete() {
        let index = index();
        let results = index.search_terms("water body", 5);
        assert_eq!(results[0].id, "ENVO:00000063");
        assert!(results.iter().all(|r| !r.is_obsolete));
        assert!(results.iter().all(|r| r.id.starts_with("ENVO:")));

        let forest = index.search_terms("forest", 1);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].label, "forest biome");
    }

    #[test]
    fn empty_index_annotates_nothing() {
        let index = LexicalIndex::new(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.annotate_text("lake").coverage, 0.0);
    }
}
