//! Derived field engine
//!
//! Answers "give me component C" for a decoded record. A stored series is
//! returned as-is; otherwise the first rule whose operands are all stored
//! in the record computes it sample by sample. Operands are only ever
//! looked up among the stored series, never derived recursively.
//!
//! | code | stored | fallback 1           | fallback 2                        |
//! |------|--------|----------------------|-----------------------------------|
//! | x    | x      | north(h, d)          |                                   |
//! | y    | y      | east(h, d)           |                                   |
//! | z    | z      |                      |                                   |
//! | f    | f      |                      |                                   |
//! | d    | d      | declination(x, y)    |                                   |
//! | h    | h      | horizontal(x, y)     |                                   |
//! | i    | i      | inclination(h, z)    | inclination(horizontal(x, y), z)  |
//!
//! Angles (d, i) are in arc-minutes. A derived sample is missing whenever
//! any operand sample at the same index is missing.

use std::f64::consts::PI;

use crate::record::{Sample, StructuredRecord};
use crate::{Component, Error, Result};

/// Arc-minutes per radian numerator: 180 degrees × 60 minutes
const ARC_MINUTES_PER_PI: f64 = 180.0 * 60.0;

/// Declination from north and east intensity (arc-minutes)
pub fn declination(x: f64, y: f64) -> f64 {
    y.atan2(x) * (180.0 / PI) * 60.0
}

/// Inclination from horizontal and vertical intensity (arc-minutes)
pub fn inclination(h: f64, z: f64) -> f64 {
    z.atan2(h) * (180.0 / PI) * 60.0
}

/// Horizontal intensity from north and east intensity
pub fn horizontal(x: f64, y: f64) -> f64 {
    (x.powi(2) + y.powi(2)).sqrt()
}

/// North intensity from horizontal intensity and declination (arc-minutes)
pub fn north(h: f64, d: f64) -> f64 {
    h * (d * PI / ARC_MINUTES_PER_PI).cos()
}

/// East intensity from horizontal intensity and declination (arc-minutes)
pub fn east(h: f64, d: f64) -> f64 {
    h * (d * PI / ARC_MINUTES_PER_PI).sin()
}

/// One way of answering a component query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The stored series itself
    Stored(Component),
    /// x = north(h, d)
    North,
    /// y = east(h, d)
    East,
    /// d = declination(x, y)
    Declination,
    /// h = horizontal(x, y)
    Horizontal,
    /// i = inclination(h, z)
    Inclination,
    /// i = inclination(horizontal(x, y), z)
    InclinationFromXyz,
}

impl Rule {
    /// Stored components this rule reads
    pub fn operands(self) -> &'static [Component] {
        use Component::*;
        match self {
            Rule::Stored(X) => &[X],
            Rule::Stored(Y) => &[Y],
            Rule::Stored(Z) => &[Z],
            Rule::Stored(H) => &[H],
            Rule::Stored(D) => &[D],
            Rule::Stored(I) => &[I],
            Rule::Stored(F) => &[F],
            Rule::North | Rule::East => &[H, D],
            Rule::Declination | Rule::Horizontal => &[X, Y],
            Rule::Inclination => &[H, Z],
            Rule::InclinationFromXyz => &[X, Y, Z],
        }
    }

    /// Apply the rule to one index worth of operand values
    fn apply(self, values: &[f64]) -> f64 {
        match self {
            Rule::Stored(_) => values[0],
            Rule::North => north(values[0], values[1]),
            Rule::East => east(values[0], values[1]),
            Rule::Declination => declination(values[0], values[1]),
            Rule::Horizontal => horizontal(values[0], values[1]),
            Rule::Inclination => inclination(values[0], values[1]),
            Rule::InclinationFromXyz => {
                inclination(horizontal(values[0], values[1]), values[2])
            }
        }
    }
}

/// Resolution table: per component, rules in priority order, plus the
/// alternatives quoted when none applies
const RESOLUTION: [(Component, &[Rule], &str); 7] = [
    (Component::X, &[Rule::Stored(Component::X), Rule::North], "x or (h and d)"),
    (Component::Y, &[Rule::Stored(Component::Y), Rule::East], "y or (h and d)"),
    (Component::Z, &[Rule::Stored(Component::Z)], "z"),
    (Component::H, &[Rule::Stored(Component::H), Rule::Horizontal], "h or (x and y)"),
    (Component::D, &[Rule::Stored(Component::D), Rule::Declination], "d or (x and y)"),
    (
        Component::I,
        &[Rule::Stored(Component::I), Rule::Inclination, Rule::InclinationFromXyz],
        "i or (z and h) or (z, x and y)",
    ),
    (Component::F, &[Rule::Stored(Component::F)], "f"),
];

fn resolution_entry(component: Component) -> (&'static [Rule], &'static str) {
    let (_, rules, alternatives) = RESOLUTION[component.index()];
    (rules, alternatives)
}

/// Which components a record stores, as a bit-set over [`Component::ALL`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub fn of(record: &StructuredRecord) -> Self {
        record
            .raw_components()
            .fold(Capabilities::default(), |caps, c| caps.with(c))
    }

    pub fn with(self, component: Component) -> Self {
        Capabilities(self.0 | (1 << component.index()))
    }

    pub fn has(self, component: Component) -> bool {
        self.0 & (1 << component.index()) != 0
    }

    /// True when every operand of `rule` is stored
    pub fn satisfies(self, rule: Rule) -> bool {
        rule.operands().iter().all(|c| self.has(*c))
    }
}

/// Read-only view over a record answering component queries
#[derive(Debug, Clone, Copy)]
pub struct DerivedFieldEngine<'a> {
    record: &'a StructuredRecord,
    capabilities: Capabilities,
}

impl<'a> DerivedFieldEngine<'a> {
    pub fn new(record: &'a StructuredRecord) -> Self {
        Self {
            record,
            capabilities: Capabilities::of(record),
        }
    }

    pub fn record(&self) -> &'a StructuredRecord {
        self.record
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Rule that would answer a query for `component`, if any
    pub fn resolution(&self, component: Component) -> Option<Rule> {
        let (rules, _) = resolution_entry(component);
        rules
            .iter()
            .copied()
            .find(|rule| self.capabilities.satisfies(*rule))
    }

    /// Every component this record can answer, in canonical order
    pub fn available(&self) -> Vec<Component> {
        Component::ALL
            .into_iter()
            .filter(|c| self.resolution(*c).is_some())
            .collect()
    }

    /// Series for `component`, stored or derived
    pub fn get(&self, component: Component) -> Result<Vec<Sample>> {
        let (_, alternatives) = resolution_entry(component);
        let rule = self.resolution(component).ok_or(Error::MissingComponent {
            component,
            alternatives,
        })?;
        Ok(self.evaluate(rule))
    }

    /// Series for a component letter (e.g. `'d'`)
    pub fn get_code(&self, code: char) -> Result<Vec<Sample>> {
        let component =
            Component::from_code(code).ok_or_else(|| Error::UnknownComponent(code.to_string()))?;
        self.get(component)
    }

    fn evaluate(&self, rule: Rule) -> Vec<Sample> {
        if let Rule::Stored(component) = rule {
            return self.stored(component).to_vec();
        }

        let operands: Vec<&[Sample]> = rule.operands().iter().map(|c| self.stored(*c)).collect();
        let mut values = vec![0.0; operands.len()];

        (0..self.record.len())
            .map(|idx| {
                for (slot, series) in values.iter_mut().zip(&operands) {
                    *slot = series.get(idx).copied().flatten()?;
                }
                Some(rule.apply(&values))
            })
            .collect()
    }

    fn stored(&self, component: Component) -> &'a [Sample] {
        self.record.raw(component).unwrap_or(&[])
    }
}

/// Series for `component` in `record`, stored or derived
pub fn get(record: &StructuredRecord, component: Component) -> Result<Vec<Sample>> {
    DerivedFieldEngine::new(record).get(component)
}
