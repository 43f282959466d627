//! IAGA2002 decoder
//!
//! Turns the text of one IAGA2002 file into a [`StructuredRecord`].
//! Each line is classified on its own, in file order:
//!
//! - **Header** (`DATE ...`): names the four recorded components. The last
//!   character of each of the four tokens after DATE/TIME/DOY is the
//!   component letter (`OTTX` -> x).
//! - **Data** (`YYYY-MM-DD ...`): one sample per active component. Values
//!   above [`MISSING_THRESHOLD`] are the format's missing-data marker.
//! - **Metadata** (space + uppercase letter): fixed-width key in columns
//!   0..22, value from column 23 up to the two-character terminator.
//! - Anything else (comments, blank lines) is ignored.
//!
//! Decoding is all-or-nothing: an error never yields a partial record.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::debug;

use crate::record::{Sample, StructuredRecord};
use crate::{Component, Error, Result};

/// Values strictly above this are missing samples (88888, 99999)
pub const MISSING_THRESHOLD: f64 = 80000.0;

/// Components per header / values per data line
const RECORDED_COMPONENTS: usize = 4;

/// Leading DATE, TIME, DOY columns
const LEADING_COLUMNS: usize = 3;

const KEY_WIDTH: usize = 22;
const VALUE_START: usize = 23;
const TERMINATOR_WIDTH: usize = 2;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Header,
    Data,
    Meta,
    Other,
}

fn classify(line: &str) -> LineKind {
    let bytes = line.as_bytes();
    if line.starts_with("DATE ") {
        LineKind::Header
    } else if is_date_prefix(bytes) {
        LineKind::Data
    } else if bytes.len() >= 2 && bytes[0] == b' ' && bytes[1].is_ascii_uppercase() {
        LineKind::Meta
    } else {
        LineKind::Other
    }
}

/// `^\d{4}-\d{2}-\d{2}`
fn is_date_prefix(bytes: &[u8]) -> bool {
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// Mutable state while walking the lines of one body
#[derive(Default)]
struct Decoder {
    meta: IndexMap<String, String>,
    timestamps: Vec<NaiveDateTime>,
    components: BTreeMap<Component, Vec<Sample>>,
    active: Vec<Component>,
}

impl Decoder {
    fn header(&mut self, line_no: usize, line: &str) -> Result<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let codes = header_codes(&tokens).map_err(|reason| Error::format_at(line_no, reason))?;

        for (idx, code) in codes.iter().enumerate() {
            if codes[..idx].contains(code) {
                return Err(Error::format_at(
                    line_no,
                    format!("component {} listed twice in header", code),
                ));
            }
        }

        // Components first seen after samples were read are backfilled as missing
        let existing = self.timestamps.len();
        for code in &codes {
            self.components
                .entry(*code)
                .or_insert_with(|| vec![None; existing]);
        }

        debug!(line = line_no, components = ?codes, "IAGA2002 header");
        self.active = codes;
        Ok(())
    }

    fn data(&mut self, line_no: usize, line: &str) -> Result<()> {
        if self.active.len() != RECORDED_COMPONENTS {
            return Err(Error::format_at(line_no, "missing header"));
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < LEADING_COLUMNS + RECORDED_COMPONENTS {
            return Err(Error::format_at(
                line_no,
                format!(
                    "expected {} columns, found {}",
                    LEADING_COLUMNS + RECORDED_COMPONENTS,
                    tokens.len()
                ),
            ));
        }

        let stamp = format!("{}T{}", tokens[0], tokens[1]);
        let timestamp = NaiveDateTime::parse_from_str(&stamp, DATETIME_FORMAT)
            .map_err(|e| Error::format_at(line_no, format!("invalid timestamp {}: {}", stamp, e)))?;

        let mut values = Vec::with_capacity(RECORDED_COMPONENTS);
        for (idx, code) in self.active.iter().enumerate() {
            let raw = tokens[LEADING_COLUMNS + idx];
            let value = parse_value(raw).ok_or_else(|| {
                Error::format_at(line_no, format!("invalid {} value: {}", code, raw))
            })?;
            values.push((*code, value));
        }

        // Validated in full before anything is pushed, so series stay aligned
        self.timestamps.push(timestamp);
        for (code, series) in self.components.iter_mut() {
            let sample = values
                .iter()
                .find(|(active, _)| active == code)
                .and_then(|(_, value)| *value);
            series.push(sample);
        }
        Ok(())
    }

    fn meta(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let key: String = chars[..chars.len().min(KEY_WIDTH)].iter().collect();
        let value: String = if chars.len() > VALUE_START + TERMINATOR_WIDTH {
            chars[VALUE_START..chars.len() - TERMINATOR_WIDTH].iter().collect()
        } else {
            String::new()
        };
        // IndexMap::insert keeps the first position and takes the latest value
        self.meta.insert(key.trim().to_string(), value.trim().to_string());
    }

    fn finish(self) -> StructuredRecord {
        if self.meta.is_empty() && self.timestamps.is_empty() && self.components.is_empty() {
            return StructuredRecord::default();
        }
        StructuredRecord::new(self.meta, self.timestamps, self.components)
    }
}

/// Component letters from a header's tokens
///
/// Standard headers carry one token per component
/// (`DATE TIME DOY OTTX OTTY OTTZ OTTF |`). A compact header with a single
/// orientation token (`DATE TIME DOY XYZF`) is also accepted.
fn header_codes(tokens: &[&str]) -> std::result::Result<Vec<Component>, String> {
    if tokens.len() >= LEADING_COLUMNS + RECORDED_COMPONENTS {
        tokens[LEADING_COLUMNS..LEADING_COLUMNS + RECORDED_COMPONENTS]
            .iter()
            .map(|token| {
                token
                    .chars()
                    .last()
                    .and_then(Component::from_code)
                    .ok_or_else(|| format!("unrecognized component column: {}", token))
            })
            .collect()
    } else if tokens.len() == LEADING_COLUMNS + 1
        && tokens[LEADING_COLUMNS].chars().count() == RECORDED_COMPONENTS
    {
        tokens[LEADING_COLUMNS]
            .chars()
            .map(|c| {
                Component::from_code(c).ok_or_else(|| format!("unrecognized component: {}", c))
            })
            .collect()
    } else {
        Err(format!(
            "header names {} columns, expected {} components",
            tokens.len().saturating_sub(LEADING_COLUMNS),
            RECORDED_COMPONENTS
        ))
    }
}

/// Parse one sample; `Some(None)` is a missing-data marker, `None` is garbage
fn parse_value(raw: &str) -> Option<Sample> {
    let value: f64 = raw.parse().ok()?;
    if value.is_nan() {
        return None;
    }
    if value > MISSING_THRESHOLD {
        Some(None)
    } else {
        Some(Some(value))
    }
}

/// Decode the text of an IAGA2002 file
pub fn decode(text: &str) -> Result<StructuredRecord> {
    let mut decoder = Decoder::default();

    for (idx, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let line_no = idx + 1;
        match classify(line) {
            LineKind::Header => decoder.header(line_no, line)?,
            LineKind::Data => decoder.data(line_no, line)?,
            LineKind::Meta => decoder.meta(line),
            LineKind::Other => {}
        }
    }

    debug!(
        meta_entries = decoder.meta.len(),
        samples = decoder.timestamps.len(),
        components = decoder.components.len(),
        "Decoded IAGA2002 body"
    );

    Ok(decoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("DATE       TIME"), LineKind::Header);
        assert_eq!(classify("2020-01-01 00:00:00.000 001"), LineKind::Data);
        assert_eq!(classify(" Format                 IAGA-2002     |"), LineKind::Meta);
        assert_eq!(classify(" # comment line |"), LineKind::Other);
        assert_eq!(classify(""), LineKind::Other);
        assert_eq!(classify("DATEX"), LineKind::Other);
        assert_eq!(classify("2020-1-01"), LineKind::Other);
    }

    #[test]
    fn test_parse_value_threshold() {
        assert_eq!(parse_value("88888.00"), Some(None));
        assert_eq!(parse_value("80000.01"), Some(None));
        assert_eq!(parse_value("80000"), Some(Some(80000.0)));
        assert_eq!(parse_value("-12.5"), Some(Some(-12.5)));
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("NaN"), None);
    }

    #[test]
    fn test_header_codes_standard_and_compact() {
        let standard = ["DATE", "TIME", "DOY", "OTTH", "OTTD", "OTTZ", "OTTF", "|"];
        assert_eq!(
            header_codes(&standard).unwrap(),
            vec![Component::H, Component::D, Component::Z, Component::F]
        );
        let compact = ["DATE", "TIME", "DOY", "XYZF"];
        assert_eq!(
            header_codes(&compact).unwrap(),
            vec![Component::X, Component::Y, Component::Z, Component::F]
        );
        assert!(header_codes(&["DATE", "TIME", "DOY", "OTTX", "OTTY"]).is_err());
        assert!(header_codes(&["DATE", "TIME", "DOY", "OTTQ", "OTTY", "OTTZ", "OTTF"]).is_err());
    }

    #[test]
    fn test_meta_key_and_value_columns() {
        let mut decoder = Decoder::default();
        decoder.meta(" Station Name           Ottawa                                       |");
        decoder.meta(" IAGA CODE              OTT                                          |");
        assert_eq!(decoder.meta.get("Station Name").map(String::as_str), Some("Ottawa"));
        assert_eq!(decoder.meta.get("IAGA CODE").map(String::as_str), Some("OTT"));
    }

    #[test]
    fn test_short_meta_line_has_empty_value() {
        let mut decoder = Decoder::default();
        decoder.meta(" Reported");
        assert_eq!(decoder.meta.get("Reported").map(String::as_str), Some(""));
    }

    #[test]
    fn test_repeated_meta_key_keeps_first_position_last_value() {
        let text = concat!(
            " Source of Data         First                                        |\n",
            " Station Name           Ottawa                                       |\n",
            " Source of Data         Second                                       |\n",
        );
        let record = decode(text).unwrap();
        let keys: Vec<&str> = record.meta().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Source of Data", "Station Name"]);
        assert_eq!(record.meta()["Source of Data"], "Second");
    }

    #[test]
    fn test_compact_header_scenario() {
        let text = "DATE TIME DOY XYZF\n2020-01-01 00:00:00 001 100.0 200.0 300.0 99999.0\n";
        let record = decode(text).unwrap();
        assert_eq!(record.timestamp_strings(), vec!["2020-01-01T00:00:00"]);
        assert_eq!(record.raw(Component::X).unwrap(), &[Some(100.0)]);
        assert_eq!(record.raw(Component::Y).unwrap(), &[Some(200.0)]);
        assert_eq!(record.raw(Component::Z).unwrap(), &[Some(300.0)]);
        assert_eq!(record.raw(Component::F).unwrap(), &[None]);
    }

    #[test]
    fn test_data_before_header_is_format_error() {
        let err = decode("2020-01-01 00:00:00 001 1 2 3 4\n").unwrap_err();
        match err {
            Error::Format(reason) => assert!(reason.contains("missing header")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unparsable_value_is_format_error() {
        let text = "DATE TIME DOY XYZF\n2020-01-01 00:00:00 001 1.0 oops 3.0 4.0\n";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_short_data_line_is_format_error() {
        let text = "DATE TIME DOY XYZF\n2020-01-01 00:00:00 001 1.0 2.0\n";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_bad_timestamp_is_format_error() {
        let text = "DATE TIME DOY XYZF\n2020-13-45 00:00:00 001 1.0 2.0 3.0 4.0\n";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_duplicate_header_component_is_format_error() {
        let text = "DATE TIME DOY OTTX OTTX OTTZ OTTF |\n";
        assert!(matches!(decode(text), Err(Error::Format(_))));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = " IAGA CODE              OTT                   |\r\nDATE TIME DOY XYZF\r\n2020-01-01 00:00:00.000 001 1.0 2.0 3.0 4.0\r\n";
        let record = decode(text).unwrap();
        assert_eq!(record.iaga_code(), Some("OTT"));
        assert_eq!(record.raw(Component::F).unwrap(), &[Some(4.0)]);
    }

    #[test]
    fn test_empty_input_is_sentinel() {
        let record = decode("").unwrap();
        assert!(record.is_empty());
        assert_eq!(record, StructuredRecord::default());

        let record = decode("# just a comment\n\n").unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_samples_without_metadata_are_empty() {
        let record = decode("DATE TIME DOY XYZF\n2020-01-01 00:00:00 001 1 2 3 4\n").unwrap();
        assert_eq!(record.len(), 1);
        assert!(record.meta().is_empty());
        assert!(record.is_empty());
    }

    #[test]
    fn test_superseding_header_keeps_series_aligned() {
        let text = concat!(
            "DATE TIME DOY XYZF\n",
            "2020-01-01 00:00:00 001 1.0 2.0 3.0 4.0\n",
            "DATE TIME DOY HDZF\n",
            "2020-01-01 00:01:00 001 5.0 6.0 7.0 8.0\n",
        );
        let record = decode(text).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.raw(Component::X).unwrap(), &[Some(1.0), None]);
        assert_eq!(record.raw(Component::H).unwrap(), &[None, Some(5.0)]);
        assert_eq!(record.raw(Component::Z).unwrap(), &[Some(3.0), Some(7.0)]);
        for component in record.raw_components() {
            assert_eq!(record.raw(component).unwrap().len(), record.len());
        }
    }
}
