//! Retrieval orchestrator
//!
//! Walks the candidates [`geomag_common::plan`] produced strictly in
//! order. A fetch failure or an undecodable body moves on to the next
//! candidate; the first candidate that decodes ends the walk and no later
//! candidate is touched. Cancellation stops the walk between or during
//! attempts.

use flate2::read::GzDecoder;
use geomag_common::planner::{plan, Candidate};
use geomag_common::{decode, RetrievalQuery, StructuredRecord};
use std::io::Read;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FailedAttempt, FetchError, Result, RetrieveError};
use crate::fetcher::Fetcher;

/// Successful retrieval
#[derive(Debug)]
pub struct Retrieved {
    /// Candidate whose body was decoded
    pub candidate: Candidate,
    pub record: StructuredRecord,
    /// Candidates tried (and failed) before this one
    pub failed: Vec<FailedAttempt>,
}

/// Fetch-and-decode loop over planned candidates
pub struct Orchestrator<F> {
    fetcher: F,
}

impl<F: Fetcher> Orchestrator<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Retrieve the first decodable body for `query`
    pub async fn retrieve(
        &self,
        query: &RetrievalQuery,
        cancel_token: &CancellationToken,
    ) -> Result<Retrieved> {
        let candidates = plan(query)?;
        let mut failed = Vec::new();

        info!(
            station = %query.station,
            date = %query.date,
            candidates = candidates.len(),
            fetcher = self.fetcher.name(),
            "Starting retrieval"
        );

        for candidate in candidates {
            if cancel_token.is_cancelled() {
                return Err(RetrieveError::Cancelled {
                    attempted: failed.len(),
                });
            }

            let body = tokio::select! {
                _ = cancel_token.cancelled() => {
                    return Err(RetrieveError::Cancelled { attempted: failed.len() });
                }
                body = self.fetcher.fetch(&candidate.uri) => body,
            };

            match body.and_then(|bytes| inflate(&candidate, bytes)) {
                Ok(text) => match decode(&text) {
                    Ok(record) if record.is_empty() => {
                        debug!(uri = %candidate, "Body held no IAGA2002 content");
                        failed.push(FailedAttempt::Empty {
                            uri: candidate.uri.clone(),
                        });
                    }
                    Ok(record) => {
                        info!(
                            uri = %candidate,
                            data_type = %candidate.data_type,
                            samples = record.len(),
                            "Retrieved IAGA2002 data"
                        );
                        return Ok(Retrieved {
                            candidate,
                            record,
                            failed,
                        });
                    }
                    Err(e) => {
                        warn!(uri = %candidate, error = %e, "Body failed to decode, trying next candidate");
                        failed.push(FailedAttempt::Decode {
                            uri: candidate.uri.clone(),
                            source: e,
                        });
                    }
                },
                Err(e) => {
                    debug!(uri = %candidate, error = %e, "Fetch failed, trying next candidate");
                    failed.push(FailedAttempt::Fetch {
                        uri: candidate.uri.clone(),
                        source: e,
                    });
                }
            }
        }

        warn!(
            station = %query.station,
            attempts = failed.len(),
            "All candidates exhausted"
        );
        Err(RetrieveError::Exhausted { attempts: failed })
    }
}

/// Gunzip compressed candidates and decode the body as text
fn inflate(candidate: &Candidate, bytes: Vec<u8>) -> std::result::Result<String, FetchError> {
    let bytes = if candidate.compressed {
        let mut inflated = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut inflated)
            .map_err(|e| FetchError::Decompress {
                uri: candidate.uri.clone(),
                reason: e.to_string(),
            })?;
        inflated
    } else {
        bytes
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use geomag_common::{DataType, DataTypeSelection};
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    const BODY: &str = " IAGA CODE              TST                   |\nDATE TIME DOY XYZF\n2020-01-01 00:00:00 001 1.0 2.0 3.0 4.0\n";

    /// In-memory fetcher recording every URI it was asked for
    #[derive(Default)]
    struct MapFetcher {
        bodies: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        fn with(mut self, uri: &str, body: Vec<u8>) -> Self {
            self.bodies.insert(uri.to_string(), body);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        fn name(&self) -> &'static str {
            "map"
        }

        async fn fetch(&self, uri: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.requested.lock().unwrap().push(uri.to_string());
            self.bodies
                .get(uri)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(uri.to_string()))
        }
    }

    fn query(selection: DataTypeSelection) -> RetrievalQuery {
        let mut q = RetrievalQuery::new("mem://root", "TST", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        q.data_type = selection;
        q
    }

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_first_success_stops_the_walk() {
        let q = query(DataTypeSelection::All);
        let uris = geomag_common::plan_uris(&q).unwrap();
        // Provisional plain file exists, variation gz exists too
        let fetcher = MapFetcher::default()
            .with(&uris[5], BODY.as_bytes().to_vec())
            .with(&uris[6], gzip(BODY));

        let orchestrator = Orchestrator::new(fetcher);
        let retrieved = orchestrator
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(retrieved.candidate.uri, uris[5]);
        assert_eq!(retrieved.candidate.data_type, DataType::Provisional);
        assert_eq!(retrieved.failed.len(), 5);
        assert_eq!(orchestrator.fetcher().requested(), uris[..6].to_vec());
        assert_eq!(retrieved.record.iaga_code(), Some("TST"));
    }

    #[tokio::test]
    async fn test_compressed_candidate_is_inflated() {
        let q = query(DataTypeSelection::Only(DataType::Variation));
        let uris = geomag_common::plan_uris(&q).unwrap();
        let fetcher = MapFetcher::default().with(&uris[0], gzip(BODY));

        let retrieved = Orchestrator::new(fetcher)
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap();
        assert!(retrieved.candidate.compressed);
        assert_eq!(retrieved.record.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_gzip_and_bad_body_fall_through() {
        let q = query(DataTypeSelection::Only(DataType::Variation));
        let uris = geomag_common::plan_uris(&q).unwrap();
        let fetcher = MapFetcher::default()
            .with(&uris[0], b"not gzip".to_vec())
            .with(&uris[1], b"2020-01-01 00:00:00 001 1 2 3 4\n".to_vec());

        let err = Orchestrator::new(fetcher)
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RetrieveError::Exhausted { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(matches!(
                    attempts[0],
                    FailedAttempt::Fetch { source: FetchError::Decompress { .. }, .. }
                ));
                assert!(matches!(attempts[1], FailedAttempt::Decode { .. }));
                assert_eq!(attempts[1].uri(), uris[1]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_not_a_success() {
        let q = query(DataTypeSelection::Only(DataType::Definitive));
        let uris = geomag_common::plan_uris(&q).unwrap();
        let fetcher = MapFetcher::default()
            .with(&uris[0], gzip("<html>moved</html>"))
            .with(&uris[1], BODY.as_bytes().to_vec());

        let retrieved = Orchestrator::new(fetcher)
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(retrieved.candidate.uri, uris[1]);
        assert!(matches!(retrieved.failed[0], FailedAttempt::Empty { .. }));
    }

    #[tokio::test]
    async fn test_samples_without_metadata_are_not_a_success() {
        let q = query(DataTypeSelection::Only(DataType::Definitive));
        let uris = geomag_common::plan_uris(&q).unwrap();
        let fetcher = MapFetcher::default()
            .with(&uris[0], gzip("DATE TIME DOY XYZF\n2020-01-01 00:00:00 001 1 2 3 4\n"))
            .with(&uris[1], BODY.as_bytes().to_vec());

        let retrieved = Orchestrator::new(fetcher)
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(retrieved.candidate.uri, uris[1]);
        assert_eq!(retrieved.failed.len(), 1);
        assert!(matches!(retrieved.failed[0], FailedAttempt::Empty { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_token_attempts_nothing() {
        let q = query(DataTypeSelection::All);
        let token = CancellationToken::new();
        token.cancel();

        let orchestrator = Orchestrator::new(MapFetcher::default());
        let err = orchestrator.retrieve(&q, &token).await.unwrap_err();
        assert!(matches!(err, RetrieveError::Cancelled { attempted: 0 }));
        assert!(orchestrator.fetcher().requested().is_empty());
    }

    /// Fetcher whose requests never complete; signals when one starts
    #[derive(Default)]
    struct StalledFetcher {
        started: Arc<Notify>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for StalledFetcher {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn fetch(&self, uri: &str) -> std::result::Result<Vec<u8>, FetchError> {
            self.requested.lock().unwrap().push(uri.to_string());
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_during_fetch_stops_the_walk() {
        let q = query(DataTypeSelection::All);
        let uris = geomag_common::plan_uris(&q).unwrap();
        let fetcher = StalledFetcher::default();
        let started = fetcher.started.clone();

        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                started.notified().await;
                token.cancel();
            })
        };

        let orchestrator = Orchestrator::new(fetcher);
        let err = tokio::time::timeout(Duration::from_secs(5), orchestrator.retrieve(&q, &token))
            .await
            .expect("retrieval should stop once cancelled")
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, RetrieveError::Cancelled { attempted: 0 }));
        assert_eq!(
            *orchestrator.fetcher().requested.lock().unwrap(),
            vec![uris[0].clone()]
        );
    }

    #[tokio::test]
    async fn test_invalid_query_fails_before_fetching() {
        let mut q = query(DataTypeSelection::All);
        q.format = "CDF".to_string();

        let orchestrator = Orchestrator::new(MapFetcher::default());
        let err = orchestrator
            .retrieve(&q, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::Query(geomag_common::Error::Config(_))));
        assert!(orchestrator.fetcher().requested().is_empty());
    }
}
