//! Retrieval query parameters
//!
//! A query names the station, day, sampling period and data quality tier
//! the caller wants. Every field is validated up front: an unrecognized
//! sampling period or data type is a configuration error, never silently
//! coerced.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The only exchange format with a decoder
pub const IAGA2002: &str = "IAGA2002";

/// Sampling period of the published series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPeriod {
    /// One sample per minute (60 s)
    Minute,
    /// One sample per second (1 s)
    Second,
}

impl SamplingPeriod {
    /// Map a period in seconds to a sampling period
    ///
    /// Only 60 and 1 are published; anything else is a configuration error.
    pub fn from_seconds(seconds: u32) -> Result<Self> {
        match seconds {
            60 => Ok(SamplingPeriod::Minute),
            1 => Ok(SamplingPeriod::Second),
            other => Err(Error::Config(format!(
                "Unknown sampling period: {} seconds",
                other
            ))),
        }
    }

    /// Period length in seconds
    pub fn seconds(self) -> u32 {
        match self {
            SamplingPeriod::Minute => 60,
            SamplingPeriod::Second => 1,
        }
    }

    /// Directory token ("minute" / "second")
    pub fn token(self) -> &'static str {
        match self {
            SamplingPeriod::Minute => "minute",
            SamplingPeriod::Second => "second",
        }
    }

    /// Three-letter code used in file names and extensions ("min" / "sec")
    pub fn code(self) -> &'static str {
        &self.token()[..3]
    }
}

impl fmt::Display for SamplingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SamplingPeriod {
    type Err = Error;

    /// Accepts "minute"/"second" (any case) or the period in seconds
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if let Ok(seconds) = value.parse::<u32>() {
            return SamplingPeriod::from_seconds(seconds);
        }
        match value.to_ascii_lowercase().as_str() {
            "minute" => Ok(SamplingPeriod::Minute),
            "second" => Ok(SamplingPeriod::Second),
            _ => Err(Error::Config(format!("Unknown sampling period: {}", value))),
        }
    }
}

/// Data quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    Definitive,
    QuasiDefinitive,
    Provisional,
    Variation,
}

impl DataType {
    /// Expansion order for [`DataTypeSelection::All`]
    pub const ALL: [DataType; 4] = [
        DataType::Definitive,
        DataType::QuasiDefinitive,
        DataType::Provisional,
        DataType::Variation,
    ];

    /// Directory name on the data server
    pub fn directory(self) -> &'static str {
        match self {
            DataType::Definitive => "definitive",
            DataType::QuasiDefinitive => "quasi-definitive",
            DataType::Provisional => "provisional",
            DataType::Variation => "variation",
        }
    }

    /// Single-letter tag used in file names
    pub fn initial(self) -> char {
        match self {
            DataType::Definitive => 'd',
            DataType::QuasiDefinitive => 'q',
            DataType::Provisional => 'p',
            DataType::Variation => 'v',
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        DataType::ALL
            .into_iter()
            .find(|dt| dt.directory() == value)
            .ok_or_else(|| Error::Config(format!("Unknown data type: {}", s.trim())))
    }
}

/// Either one data type or every data type in fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeSelection {
    All,
    Only(DataType),
}

impl DataTypeSelection {
    /// Concrete data types to try, in order
    pub fn resolve(self) -> Vec<DataType> {
        match self {
            DataTypeSelection::All => DataType::ALL.to_vec(),
            DataTypeSelection::Only(data_type) => vec![data_type],
        }
    }
}

impl Default for DataTypeSelection {
    fn default() -> Self {
        DataTypeSelection::Only(DataType::Variation)
    }
}

impl fmt::Display for DataTypeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeSelection::All => f.write_str("all"),
            DataTypeSelection::Only(data_type) => fmt::Display::fmt(data_type, f),
        }
    }
}

impl FromStr for DataTypeSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(DataTypeSelection::All)
        } else {
            s.parse().map(DataTypeSelection::Only)
        }
    }
}

/// Parameters of one retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalQuery {
    /// Base URI of the data tree (e.g. `http://origin1.intermagnet.org/data`)
    pub source_root: String,
    /// IAGA station code, any case
    pub station: String,
    pub sampling: SamplingPeriod,
    pub data_type: DataTypeSelection,
    /// Exchange format directory; only IAGA2002 is decodable
    pub format: String,
    pub date: NaiveDate,
}

impl RetrievalQuery {
    /// Query with minute sampling of variation data in IAGA2002
    pub fn new(source_root: impl Into<String>, station: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            source_root: source_root.into(),
            station: station.into(),
            sampling: SamplingPeriod::Minute,
            data_type: DataTypeSelection::default(),
            format: IAGA2002.to_string(),
            date,
        }
    }

    /// Basic validation performed before planning
    pub fn validate(&self) -> Result<()> {
        if self.source_root.trim().is_empty() {
            return Err(Error::Config("Source root must not be empty".to_string()));
        }
        if self.station.trim().is_empty() {
            return Err(Error::Config("Station code must not be empty".to_string()));
        }
        if !self.format.eq_ignore_ascii_case(IAGA2002) {
            return Err(Error::Config(format!(
                "Unsupported format: {} (only {} is supported)",
                self.format, IAGA2002
            )));
        }
        Ok(())
    }
}
