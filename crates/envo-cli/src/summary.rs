//! Result tables printed after each command.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use envo_map::{NormalizeMetadata, SampleReport};
use envo_model::{EnvoLookupResult, OsmFeatureSummary, TargetField};
use envo_osm::OsmEnrichMetadata;

/// One row per sample: id, features, mapped, coverage, fields mapped, agreement.
pub fn normalize_table(reports: &[SampleReport], metadata: &NormalizeMetadata) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Biosample"),
        header_cell("Features"),
        header_cell("Mapped"),
        header_cell("Coverage"),
        header_cell("Fields mapped"),
        header_cell("Agreement"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let field_count = TargetField::ALL.len();
    let mut total_features = 0usize;
    let mut total_mapped = 0usize;
    for report in reports {
        let Some(stats) = &report.stats else {
            table.add_row(vec![
                Cell::new(&report.id),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        };
        total_features += stats.total_features_processed;
        total_mapped += stats.features_with_mappings;
        table.add_row(vec![
            Cell::new(&report.id),
            Cell::new(stats.total_features_processed),
            count_cell(stats.features_with_mappings, Color::Green),
            Cell::new(format!("{:.0}%", stats.mapping_coverage * 100.0)),
            Cell::new(format!("{}/{field_count}", stats.mapped_fields())),
            Cell::new(format!("{}/{field_count}", stats.agreeing_fields())),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("TOTAL ({} samples)", metadata.processed_samples))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_features).add_attribute(Attribute::Bold),
        count_cell(total_mapped, Color::Green).add_attribute(Attribute::Bold),
        dim_cell(format!("threshold {}", metadata.confidence_threshold)),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    table
}

pub fn enrich_table(metadata: &OsmEnrichMetadata) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Samples"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Input"), Cell::new(metadata.total_input_samples)]);
    table.add_row(vec![
        Cell::new(format!(
            "Confident coordinates (<= {} m)",
            metadata.coordinate_confidence_threshold_meters
        )),
        Cell::new(metadata.confident_coordinate_samples),
    ]);
    table.add_row(vec![
        Cell::new("Enriched"),
        count_cell(metadata.successfully_enriched_samples, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Skipped"),
        count_cell(metadata.skipped_samples.len(), Color::Yellow),
    ]);
    table
}

/// Feature counts per category and subtype.
pub fn feature_counts_table(summary: &OsmFeatureSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Category"),
        header_cell("Type"),
        header_cell("Count"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (category, counts) in &summary.metadata.feature_type_counts {
        for (subtype, count) in counts {
            table.add_row(vec![
                Cell::new(category),
                Cell::new(subtype),
                Cell::new(*count),
            ]);
        }
    }
    table
}

pub fn lookup_table(results: &[EnvoLookupResult]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Label"),
        header_cell("Obsolete"),
        header_cell("Definition"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for result in results {
        let label = if result.is_not_found() {
            Cell::new(&result.label).fg(Color::Red)
        } else {
            Cell::new(&result.label)
        };
        let obsolete = if result.is_obsolete {
            Cell::new("yes").fg(Color::Yellow)
        } else {
            dim_cell("no")
        };
        table.add_row(vec![
            Cell::new(&result.id),
            label,
            obsolete,
            Cell::new(result.definition.as_deref().unwrap_or("")),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string())
        .fg(Color::DarkGrey)
        .add_attribute(Attribute::Dim)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use envo_model::MappingStats;

    use super::*;

    #[test]
    fn normalize_table_lists_every_sample() {
        let stats = MappingStats {
            total_features_processed: 4,
            features_with_mappings: 2,
            mapping_coverage: 0.5,
            confidence_threshold: 0.7,
            field_coverage: BTreeMap::from([
                (TargetField::EnvBroadScale, true),
                (TargetField::EnvLocalScale, false),
                (TargetField::EnvMedium, true),
            ]),
            agreement_with_asserted: BTreeMap::from([(TargetField::EnvMedium, true)]),
        };
        let reports = vec![
            SampleReport {
                id: "nmdc:bsm-1".to_string(),
                stats: Some(stats),
            },
            SampleReport {
                id: "nmdc:bsm-2".to_string(),
                stats: None,
            },
        ];
        let metadata = NormalizeMetadata {
            total_input_samples: 2,
            processed_samples: 2,
            confidence_threshold: 0.7,
            max_features_per_sample: 20,
        };

        let table = normalize_table(&reports, &metadata);
        assert_eq!(table.row_count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("nmdc:bsm-1"));
        assert!(rendered.contains("50%"));
        assert!(rendered.contains("2/3"));
        assert!(rendered.contains("1/3"));
    }

    #[test]
    fn lookup_table_shows_missing_terms() {
        let table = lookup_table(&[EnvoLookupResult::not_found("ENVO:99999999")]);
        assert_eq!(table.row_count(), 1);
        assert!(table.to_string().contains("ENVO:99999999"));
    }
}
