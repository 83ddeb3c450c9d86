//! Annotation quality filters and coverage.

use envo_model::AnnotationMatch;

/// Shortest match, in characters, kept after filtering.
pub const MIN_ANNOTATION_LEN: usize = 3;

/// Whether `matched` occurs as one of the words of `text`, ignoring case.
pub fn is_whole_word_match(text: &str, matched: &str) -> bool {
    let needle = matched.to_lowercase();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|word| word == needle)
}

fn match_chars(text: &str, m: &AnnotationMatch) -> usize {
    text.get(m.start..m.end)
        .map_or_else(|| m.len(), |span| span.chars().count())
}

/// Drop matches that are too short, single-word matches that are only part
/// of a word, and matches whose id lacks `prefix`.
pub fn filter_annotations(
    text: &str,
    matches: Vec<AnnotationMatch>,
    prefix: &str,
) -> Vec<AnnotationMatch> {
    let id_prefix = format!("{prefix}:");
    matches
        .into_iter()
        .filter(|m| m.end <= text.len() && m.start < m.end)
        .filter(|m| match_chars(text, m) >= MIN_ANNOTATION_LEN)
        .filter(|m| m.matched.contains(' ') || is_whole_word_match(text, &m.matched))
        .filter(|m| m.id.starts_with(&id_prefix))
        .collect()
}

/// Fraction of `text` characters covered by the union of match spans.
///
/// Overlapping and touching spans are merged first. Spans outside the text
/// are clamped, so the result is always in `[0, 1]`.
pub fn annotation_coverage(text: &str, matches: &[AnnotationMatch]) -> f64 {
    let total = text.chars().count();
    if total == 0 || matches.is_empty() {
        return 0.0;
    }

    let mut spans: Vec<(usize, usize)> = matches
        .iter()
        .map(|m| (m.start.min(text.len()), m.end.min(text.len())))
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let covered: usize = merged
        .iter()
        .map(|&(start, end)| {
            text.get(start..end)
                .map_or(end - start, |span| span.chars().count())
        })
        .sum();
    (covered as f64 / total as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn m(id: &str, text: &str, start: usize, end: usize) -> AnnotationMatch {
        AnnotationMatch {
            id: id.to_string(),
            label: text[start..end].to_string(),
            matched: text[start..end].to_string(),
            start,
            end,
        }
    }

    #[test]
    fn whole_word_rejects_fragments() {
        assert!(is_whole_word_match("natural:water feature", "water"));
        assert!(is_whole_word_match("Lake shore", "lake"));
        assert!(!is_whole_word_match("waterway", "water"));
    }

    #[test]
    fn filter_applies_length_word_and_prefix_rules() {
        let text = "sea waterway lake";
        let matches = vec![
            m("ENVO:00000015", text, 0, 2),
            m("ENVO:00002006", text, 4, 9),
            m("ENVO:00000020", text, 13, 17),
            m("UBERON:00000020", text, 13, 17),
        ];
        let kept = filter_annotations(text, matches, "ENVO");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "ENVO:00000020");
    }

    #[test]
    fn coverage_merges_overlaps_and_adjacent_spans() {
        let text = "abcdefghij";
        let matches = vec![m("X", text, 0, 4), m("X", text, 2, 6), m("X", text, 6, 8)];
        assert!((annotation_coverage(text, &matches) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn coverage_is_zero_for_empty_input() {
        assert_eq!(annotation_coverage("", &[]), 0.0);
        assert_eq!(annotation_coverage("text", &[]), 0.0);
    }

    proptest! {
        #[test]
        fn coverage_is_bounded_and_monotonic(
            len in 1usize..64,
            spans in prop::collection::vec((0usize..64, 0usize..16), 0..8),
            extra in (0usize..64, 1usize..16),
        ) {
            let text = "x".repeat(len);
            let to_match = |(start, width): (usize, usize)| AnnotationMatch {
                id: "ENVO:00000001".to_string(),
                label: String::new(),
                matched: String::new(),
                start,
                end: start + width,
            };
            let mut matches: Vec<AnnotationMatch> = spans.into_iter().map(to_match).collect();
            let before = annotation_coverage(&text, &matches);
            prop_assert!((0.0..=1.0).contains(&before));

            matches.push(to_match(extra));
            let after = annotation_coverage(&text, &matches);
            prop_assert!(after >= before);
            prop_assert!(after <= 1.0);
        }
    }
}
