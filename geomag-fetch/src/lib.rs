//! geomag-fetch library interface
//!
//! Retrieval orchestration on top of `geomag-common`: walks the planned
//! candidate locations in order, fetches and gunzips bodies, and stops at
//! the first one that decodes. Also renders decoded records for the CLI.

pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod output;

pub use crate::error::{FailedAttempt, FetchError, RetrieveError};
pub use crate::fetcher::{AnyFetcher, Fetcher, FileFetcher, HttpFetcher};
pub use crate::orchestrator::{Orchestrator, Retrieved};
