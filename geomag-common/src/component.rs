//! Magnetic field component codes
//!
//! The seven canonical components an observatory can report. IAGA2002
//! headers name at most four of them; the rest are derived on demand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One of the seven canonical field components
///
/// - X, Y, Z: north, east and vertical intensity (nT)
/// - H: horizontal intensity (nT)
/// - D: declination (arc-minutes)
/// - I: inclination (arc-minutes)
/// - F: total field intensity (nT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    X,
    Y,
    Z,
    H,
    D,
    I,
    F,
}

impl Component {
    /// All components in canonical order
    pub const ALL: [Component; 7] = [
        Component::X,
        Component::Y,
        Component::Z,
        Component::H,
        Component::D,
        Component::I,
        Component::F,
    ];

    /// Look up a component by its letter (case-insensitive)
    pub fn from_code(code: char) -> Option<Component> {
        match code.to_ascii_lowercase() {
            'x' => Some(Component::X),
            'y' => Some(Component::Y),
            'z' => Some(Component::Z),
            'h' => Some(Component::H),
            'd' => Some(Component::D),
            'i' => Some(Component::I),
            'f' => Some(Component::F),
            _ => None,
        }
    }

    /// Lowercase letter for this component
    pub fn code(self) -> char {
        match self {
            Component::X => 'x',
            Component::Y => 'y',
            Component::Z => 'z',
            Component::H => 'h',
            Component::D => 'd',
            Component::I => 'i',
            Component::F => 'f',
        }
    }

    /// Display unit: angles are carried in arc-minutes, intensities in nT
    pub fn unit(self) -> &'static str {
        match self {
            Component::D | Component::I => "arc-min",
            _ => "nT",
        }
    }

    /// Position in [`Component::ALL`], used for capability bit-sets
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 4];
        f.pad(self.code().encode_utf8(&mut buf))
    }
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Component::from_code(c).ok_or_else(|| Error::UnknownComponent(trimmed.to_string()))
            }
            _ => Err(Error::UnknownComponent(trimmed.to_string())),
        }
    }
}
