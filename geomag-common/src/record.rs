//! Structured record decoded from one IAGA2002 body

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::Component;

/// Timestamp rendering used for display and JSON output
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Per-sample value; `None` marks a missing sample
pub type Sample = Option<f64>;

/// Station metadata plus the raw component series of one file
///
/// Every populated component series has exactly `timestamps.len()`
/// samples. A record without metadata is the "no data yet" sentinel
/// (see [`StructuredRecord::is_empty`]), whatever samples it holds.
/// Immutable once decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredRecord {
    meta: IndexMap<String, String>,
    timestamps: Vec<NaiveDateTime>,
    components: BTreeMap<Component, Vec<Sample>>,
}

impl StructuredRecord {
    pub(crate) fn new(
        meta: IndexMap<String, String>,
        timestamps: Vec<NaiveDateTime>,
        components: BTreeMap<Component, Vec<Sample>>,
    ) -> Self {
        debug_assert!(components.values().all(|s| s.len() == timestamps.len()));
        Self {
            meta,
            timestamps,
            components,
        }
    }

    /// True for the "no data yet" record: no station metadata was decoded
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Station metadata in file order
    pub fn meta(&self) -> &IndexMap<String, String> {
        &self.meta
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Timestamps rendered as `YYYY-MM-DDTHH:MM:SS`
    pub fn timestamp_strings(&self) -> Vec<String> {
        self.timestamps
            .iter()
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .collect()
    }

    /// Number of samples per series
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Stored (not derived) series for a component
    pub fn raw(&self, component: Component) -> Option<&[Sample]> {
        self.components.get(&component).map(Vec::as_slice)
    }

    /// Components present in the file, in canonical order
    pub fn raw_components(&self) -> impl Iterator<Item = Component> + '_ {
        self.components.keys().copied()
    }

    /// "Station Name" metadata entry
    pub fn station_name(&self) -> Option<&str> {
        self.meta.get("Station Name").map(String::as_str)
    }

    /// "IAGA CODE" metadata entry
    pub fn iaga_code(&self) -> Option<&str> {
        self.meta.get("IAGA CODE").map(String::as_str)
    }

    /// Display title, e.g. `Ottawa (OTT)`
    pub fn title(&self) -> Option<String> {
        match (self.station_name(), self.iaga_code()) {
            (Some(name), Some(code)) => Some(format!("{} ({})", name, code)),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(code)) => Some(code.to_string()),
            (None, None) => None,
        }
    }
}
