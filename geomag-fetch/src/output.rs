//! Rendering of decoded records for the command line
//!
//! Everything renders to a `String` so the binary decides where it goes
//! (stdout for data, stderr for logs).

use clap::ValueEnum;
use geomag_common::record::Sample;
use geomag_common::summary::{axis_ranges, ComponentSummary};
use geomag_common::{Component, DerivedFieldEngine, StructuredRecord};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Metadata table, summary table and samples
    Table,
    /// `datetime` column then one column per component
    Csv,
    /// `{meta, datetime, components}` document
    Json,
}

/// A requested component with its samples
pub type Series = (Component, Vec<Sample>);

/// Resolve each requested component, skipping those that cannot be derived
pub fn collect_series(engine: &DerivedFieldEngine<'_>, requested: &[Component]) -> Vec<Series> {
    requested
        .iter()
        .filter_map(|component| match engine.get(*component) {
            Ok(samples) => Some((*component, samples)),
            Err(e) => {
                warn!(component = %component, error = %e, "Skipping component");
                None
            }
        })
        .collect()
}

/// Parse a comma-separated component list such as `x,y,z,f`
pub fn parse_components(list: &str) -> geomag_common::Result<Vec<Component>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Component>())
        .collect()
}

fn format_sample(sample: Sample) -> String {
    sample.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

/// Key/value metadata table in file order
pub fn meta_table(record: &StructuredRecord) -> String {
    let width = record.meta().keys().map(|k| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in record.meta() {
        let _ = writeln!(out, "{:<width$}  {}", key, value, width = width);
    }
    out
}

/// CSV with a `datetime` column then one column per series; empty cell for missing
pub fn csv(record: &StructuredRecord, series: &[Series]) -> String {
    let mut out = String::from("datetime");
    for (component, _) in series {
        let _ = write!(out, ",{}", component);
    }
    out.push('\n');

    for (idx, stamp) in record.timestamp_strings().iter().enumerate() {
        out.push_str(stamp);
        for (_, samples) in series {
            out.push(',');
            out.push_str(&format_sample(samples.get(idx).copied().flatten()));
        }
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    meta: &'a IndexMap<String, String>,
    datetime: Vec<String>,
    components: Vec<JsonSeries<'a>>,
}

#[derive(Serialize)]
struct JsonSeries<'a> {
    component: Component,
    unit: &'static str,
    samples: &'a [Sample],
}

/// JSON document; metadata keeps file order, missing samples are `null`
pub fn json(record: &StructuredRecord, series: &[Series]) -> serde_json::Result<String> {
    let document = JsonDocument {
        meta: record.meta(),
        datetime: record.timestamp_strings(),
        components: series
            .iter()
            .map(|(component, samples)| JsonSeries {
                component: *component,
                unit: component.unit(),
                samples,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document)
}

/// Mean / min / max / missing per component plus one axis range per unit
pub fn summary_table(series: &[Series]) -> String {
    let summaries: Vec<ComponentSummary> = series
        .iter()
        .map(|(component, samples)| ComponentSummary::from_samples(*component, samples))
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:>12} {:>12} {:>12} {:>8}  unit",
        "comp", "mean", "min", "max", "missing"
    );
    for summary in &summaries {
        let _ = writeln!(
            out,
            "{:<4} {:>12} {:>12} {:>12} {:>8}  {}",
            summary.component,
            format_sample(summary.mean),
            format_sample(summary.min),
            format_sample(summary.max),
            summary.missing,
            summary.component.unit()
        );
    }
    for (unit, range) in axis_ranges(&summaries) {
        let _ = writeln!(out, "axis range ({}): ±{}", unit, range);
    }
    out
}

/// Full human-readable report
pub fn table(record: &StructuredRecord, series: &[Series]) -> String {
    let mut out = String::new();
    if let Some(title) = record.title() {
        let _ = writeln!(out, "{}\n", title);
    }
    out.push_str(&meta_table(record));
    out.push('\n');
    out.push_str(&summary_table(series));
    out.push('\n');
    out.push_str(&csv(record, series));
    out
}
