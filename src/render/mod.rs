//! Result Rendering
//!
//! Three output formats over one result set: a human table with summary
//! and breakdown sections, a single JSON object, and newline-delimited
//! JSON for streaming consumers. No currency conversion happens here;
//! results are shown in whatever currency they carry.

use crate::engine::aggregate_results;
use crate::error::{CostError, Result};
use crate::schemas::{CostResult, CrossProviderAggregation};
use comfy_table::{presets, Cell, Table};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;

const MAX_LABEL_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Ndjson,
}

impl FromStr for OutputFormat {
    type Err = CostError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "ndjson" => Ok(OutputFormat::Ndjson),
            other => Err(CostError::InvalidArgument(format!(
                "unknown output format '{other}'; expected table, json, or ndjson"
            ))),
        }
    }
}

/// Render a result set in the requested format.
pub fn render_results(
    results: &[CostResult],
    format: OutputFormat,
    show_confidence: bool,
) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(results, show_confidence)),
        OutputFormat::Json => {
            let summary = aggregate_results(results);
            Ok(serde_json::to_string_pretty(&json!({
                "summary": summary,
                "resources": results,
            }))?)
        }
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for result in results {
                out.push_str(&serde_json::to_string(result)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Render cross-provider aggregations (time-based group-by output).
pub fn render_aggregations(
    aggregations: &[CrossProviderAggregation],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_header(vec!["Period", "Provider", "Cost", "Currency"]);
            for agg in aggregations {
                for (provider, amount) in &agg.providers {
                    table.add_row(vec![
                        Cell::new(&agg.period),
                        Cell::new(provider),
                        Cell::new(format!("{amount:.2}")),
                        Cell::new(&agg.currency),
                    ]);
                }
                table.add_row(vec![
                    Cell::new(&agg.period),
                    Cell::new("total"),
                    Cell::new(format!("{:.2}", agg.total)),
                    Cell::new(&agg.currency),
                ]);
            }
            Ok(table.to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(aggregations)?),
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for agg in aggregations {
                out.push_str(&serde_json::to_string(agg)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Render direct (non-time) group totals.
pub fn render_group_totals(
    buckets: &BTreeMap<String, f64>,
    currency: &str,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_header(vec!["Group", "Cost", "Currency"]);
            for (group, amount) in buckets {
                table.add_row(vec![
                    Cell::new(truncate_label(group)),
                    Cell::new(format!("{amount:.2}")),
                    Cell::new(currency),
                ]);
            }
            Ok(table.to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(buckets)?),
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for (group, amount) in buckets {
                out.push_str(&serde_json::to_string(
                    &json!({"group": group, "cost": amount, "currency": currency}),
                )?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn render_table(results: &[CostResult], show_confidence: bool) -> String {
    let summary = aggregate_results(results);
    let mut out = String::new();

    let mut totals = Table::new();
    totals.load_preset(presets::UTF8_FULL_CONDENSED);
    totals.set_header(vec!["Total Monthly", "Total Hourly", "Currency", "Resources"]);
    totals.add_row(vec![
        Cell::new(format!("{:.2}", summary.total_monthly)),
        Cell::new(format!("{:.4}", summary.total_hourly)),
        Cell::new(&summary.currency),
        Cell::new(summary.resource_count),
    ]);
    out.push_str("Summary\n");
    out.push_str(&totals.to_string());
    out.push('\n');

    for (title, breakdown) in [
        ("By Provider", &summary.by_provider),
        ("By Service", &summary.by_service),
        ("By Adapter", &summary.by_adapter),
    ] {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_header(vec![title, "Monthly"]);
        for (key, amount) in breakdown {
            table.add_row(vec![
                Cell::new(truncate_label(key)),
                Cell::new(format!("{amount:.2}")),
            ]);
        }
        out.push('\n');
        out.push_str(&table.to_string());
        out.push('\n');
    }

    let mut details = Table::new();
    details.load_preset(presets::UTF8_FULL_CONDENSED);
    let mut header = vec!["Resource", "Type", "Adapter", "Monthly", "Hourly", "Currency"];
    if show_confidence {
        header.push("Confidence");
    }
    header.push("Notes");
    details.set_header(header);
    for result in results {
        let mut row = vec![
            Cell::new(truncate_label(&result.resource_id)),
            Cell::new(truncate_label(&result.resource_type)),
            Cell::new(&result.adapter),
            Cell::new(format!("{:.2}", result.monthly)),
            Cell::new(format!("{:.4}", result.hourly)),
            Cell::new(&result.currency),
        ];
        if show_confidence {
            row.push(Cell::new(result.confidence.to_string()));
        }
        row.push(Cell::new(result.notes.as_deref().unwrap_or("")));
        details.add_row(row);
    }
    out.push('\n');
    out.push_str("Resources\n");
    out.push_str(&details.to_string());
    out.push('\n');

    out
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut truncated: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Confidence;

    fn results() -> Vec<CostResult> {
        vec![
            CostResult::projected("aws:ec2/instance:Instance", "web", "local-spec", "USD", 7.59, 0.0104)
                .with_confidence(Confidence::Medium),
            CostResult::none("aws:rds/instance:Instance", "db"),
        ]
    }

    #[test]
    fn output_format_parses() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn json_output_has_summary_and_resources() {
        let rendered = render_results(&results(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(value.get("summary").is_some());
        assert_eq!(value["resources"].as_array().unwrap().len(), 2);
        // two-space indentation
        assert!(rendered.contains("\n  \"summary\""));
    }

    #[test]
    fn ndjson_is_one_object_per_line() {
        let rendered = render_results(&results(), OutputFormat::Ndjson, false).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[test]
    fn table_contains_sections_and_totals() {
        let rendered = render_results(&results(), OutputFormat::Table, true).unwrap();
        assert!(rendered.contains("Summary"));
        assert!(rendered.contains("By Provider"));
        assert!(rendered.contains("By Service"));
        assert!(rendered.contains("By Adapter"));
        assert!(rendered.contains("Resources"));
        assert!(rendered.contains("7.59"));
        assert!(rendered.contains("medium"));
    }

    #[test]
    fn long_labels_truncate_with_ellipsis() {
        let long = "a".repeat(60);
        let truncated = truncate_label(&long);
        assert_eq!(truncated.chars().count(), MAX_LABEL_CHARS);
        assert!(truncated.ends_with('…'));
    }
}
