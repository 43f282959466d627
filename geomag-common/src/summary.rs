//! Component summaries for presentation
//!
//! Charts show each component as its deviation from the daily mean.
//! Components in the same unit share one symmetric axis range.

use serde::Serialize;

use crate::derived::DerivedFieldEngine;
use crate::record::Sample;
use crate::{Component, Result};

/// Mean of the present samples, `None` if every sample is missing
pub fn mean(samples: &[Sample]) -> Option<f64> {
    let (sum, count) = samples
        .iter()
        .flatten()
        .fold((0.0_f64, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Subtract `baseline` from every present sample
pub fn remove_baseline(samples: &[Sample], baseline: f64) -> Vec<Sample> {
    samples.iter().map(|s| s.map(|v| v - baseline)).collect()
}

/// Statistics for one component series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSummary {
    pub component: Component,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Number of missing samples
    pub missing: usize,
    /// Samples with the mean removed
    pub deviations: Vec<Sample>,
}

impl ComponentSummary {
    pub fn from_samples(component: Component, samples: &[Sample]) -> Self {
        let mean = mean(samples);
        let present = samples.iter().flatten().copied();
        let min = present.clone().reduce(f64::min);
        let max = present.reduce(f64::max);
        let missing = samples.iter().filter(|s| s.is_none()).count();
        let deviations = match mean {
            Some(m) => remove_baseline(samples, m),
            None => samples.to_vec(),
        };

        Self {
            component,
            mean,
            min,
            max,
            missing,
            deviations,
        }
    }

    /// Largest absolute deviation from the mean
    pub fn max_abs_deviation(&self) -> Option<f64> {
        self.deviations.iter().flatten().map(|v| v.abs()).reduce(f64::max)
    }
}

/// Summarize one component, stored or derived
pub fn summarize(engine: &DerivedFieldEngine<'_>, component: Component) -> Result<ComponentSummary> {
    let samples = engine.get(component)?;
    Ok(ComponentSummary::from_samples(component, &samples))
}

/// Shared symmetric axis range: largest deviation rounded up to a multiple of 10
pub fn symmetric_range(summaries: &[ComponentSummary]) -> f64 {
    let widest = summaries
        .iter()
        .filter_map(ComponentSummary::max_abs_deviation)
        .fold(0.0, f64::max);
    (widest / 10.0).ceil() * 10.0
}

/// One symmetric range per unit, units in order of first appearance
///
/// Intensities (nT) and angles (arc-min) never share an axis.
pub fn axis_ranges(summaries: &[ComponentSummary]) -> Vec<(&'static str, f64)> {
    let mut units: Vec<&'static str> = Vec::new();
    for summary in summaries {
        let unit = summary.component.unit();
        if !units.contains(&unit) {
            units.push(unit);
        }
    }

    units
        .into_iter()
        .map(|unit| {
            let same_unit: Vec<ComponentSummary> = summaries
                .iter()
                .filter(|s| s.component.unit() == unit)
                .cloned()
                .collect();
            (unit, symmetric_range(&same_unit))
        })
        .collect()
}
