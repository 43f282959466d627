//! Candidate location planner
//!
//! Expands a [`RetrievalQuery`] into the ordered list of locations a
//! fetcher should try. For every concrete data type the compressed file
//! comes first, then its uncompressed counterpart; data types keep the
//! order the query resolved them in.
//!
//! Layout produced:
//! `{root}/{sampling}/{data type}/{format}/{YYYY}/{MM}/{station}{YYYYMMDD}{t}{min|sec}.{min|sec}[.gz]`

use std::fmt;

use tracing::debug;

use crate::query::{DataType, RetrievalQuery, IAGA2002};
use crate::Result;

const GZIP_SUFFIX: &str = ".gz";

/// One location a fetcher may attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub uri: String,
    /// Quality tier this location belongs to
    pub data_type: DataType,
    /// Whether the body is gzip-compressed
    pub compressed: bool,
}

impl Candidate {
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Plan every candidate location for a query, in fetch order
pub fn plan(query: &RetrievalQuery) -> Result<Vec<Candidate>> {
    query.validate()?;

    let station = query.station.trim().to_lowercase();
    let root = query.source_root.trim();
    let root = root.strip_suffix('/').unwrap_or(root);
    let sampling = query.sampling;
    let day = query.date.format("%Y%m%d").to_string();
    let year_month = query.date.format("%Y/%m").to_string();

    let candidates: Vec<Candidate> = query
        .data_type
        .resolve()
        .into_iter()
        .flat_map(|data_type| {
            let filename = format!(
                "{}{}{}{}.{}",
                station,
                day,
                data_type.initial(),
                sampling.code(),
                sampling.code()
            );
            let directory = format!(
                "{}/{}/{}/{}/{}/",
                root,
                sampling.token(),
                data_type.directory(),
                IAGA2002,
                year_month
            );
            let plain = format!("{}{}", directory, filename);
            [
                Candidate {
                    uri: format!("{}{}", plain, GZIP_SUFFIX),
                    data_type,
                    compressed: true,
                },
                Candidate {
                    uri: plain,
                    data_type,
                    compressed: false,
                },
            ]
        })
        .collect();

    debug!(
        station = %station,
        date = %query.date,
        sampling = %sampling,
        data_type = %query.data_type,
        count = candidates.len(),
        "Planned candidate locations"
    );

    Ok(candidates)
}

/// Plan the bare URIs for a query, in fetch order
pub fn plan_uris(query: &RetrievalQuery) -> Result<Vec<String>> {
    Ok(plan(query)?.into_iter().map(|c| c.uri).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DataTypeSelection, SamplingPeriod};
    use crate::Error;
    use chrono::NaiveDate;

    fn query() -> RetrievalQuery {
        RetrievalQuery::new(
            "http://origin1.intermagnet.org/data",
            "OTT",
            NaiveDate::from_ymd_opt(2019, 3, 7).unwrap(),
        )
    }

    #[test]
    fn test_single_data_type_yields_gz_then_plain() {
        let uris = plan_uris(&query()).unwrap();
        assert_eq!(
            uris,
            vec![
                "http://origin1.intermagnet.org/data/minute/variation/IAGA2002/2019/03/ott20190307vmin.min.gz",
                "http://origin1.intermagnet.org/data/minute/variation/IAGA2002/2019/03/ott20190307vmin.min",
            ]
        );
    }

    #[test]
    fn test_all_expands_to_eight_in_fixed_order() {
        let mut q = query();
        q.data_type = DataTypeSelection::All;
        let candidates = plan(&q).unwrap();
        assert_eq!(candidates.len(), 8);

        for (pair, data_type) in candidates.chunks(2).zip(DataType::ALL) {
            assert_eq!(pair[0].data_type, data_type);
            assert_eq!(pair[1].data_type, data_type);
            assert!(pair[0].compressed);
            assert!(!pair[1].compressed);
            assert_eq!(pair[0].uri, format!("{}.gz", pair[1].uri));
            assert!(pair[1].uri.contains(&format!("/{}/", data_type.directory())));
        }

        assert!(candidates[2].uri.ends_with("ott20190307qmin.min.gz"));
        assert!(candidates[7].uri.ends_with("ott20190307vmin.min"));
    }

    #[test]
    fn test_second_sampling_uses_sec_code() {
        let mut q = query();
        q.sampling = SamplingPeriod::Second;
        q.data_type = DataTypeSelection::Only(DataType::Definitive);
        let uris = plan_uris(&q).unwrap();
        assert_eq!(
            uris[1],
            "http://origin1.intermagnet.org/data/second/definitive/IAGA2002/2019/03/ott20190307dsec.sec"
        );
    }

    #[test]
    fn test_trailing_slash_on_root_is_not_doubled() {
        let mut q = query();
        q.source_root = "file:///mirror/".to_string();
        let uris = plan_uris(&q).unwrap();
        assert!(uris[0].starts_with("file:///mirror/minute/"));
    }

    #[test]
    fn test_only_one_trailing_slash_is_dropped() {
        let mut q = query();
        q.source_root = "file:///".to_string();
        let uris = plan_uris(&q).unwrap();
        assert!(uris[0].starts_with("file:///minute/variation/"), "{}", uris[0]);
    }

    #[test]
    fn test_format_directory_is_canonical_case() {
        let mut q = query();
        q.format = "iaga2002".to_string();
        let uris = plan_uris(&q).unwrap();
        assert!(uris[0].contains("/variation/IAGA2002/2019/03/"), "{}", uris[0]);
    }

    #[test]
    fn test_invalid_query_is_config_error() {
        let mut q = query();
        q.station = String::new();
        assert!(matches!(plan(&q), Err(Error::Config(_))));
    }

    #[test]
    fn test_candidate_display_is_uri() {
        let candidates = plan(&query()).unwrap();
        assert_eq!(candidates[0].to_string(), candidates[0].as_str());
    }
}
