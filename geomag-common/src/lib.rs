//! # Geomag Common Library
//!
//! Core of the geomagnetic observatory viewer, shared by every front end:
//! - Component codes (x, y, z, h, d, i, f)
//! - Retrieval queries and candidate location planning
//! - IAGA2002 decoding into structured records
//! - Derived field engine (components computed from the ones present)
//! - Component summaries (baseline removal, shared axis range)
//! - Configuration loading
//!
//! Nothing in this crate performs network I/O. Fetching is left to the
//! caller, which walks the planned candidates in order and stops at the
//! first body that decodes.

pub mod component;
pub mod config;
pub mod derived;
pub mod error;
pub mod iaga2002;
pub mod planner;
pub mod query;
pub mod record;
pub mod summary;

pub use component::Component;
pub use derived::DerivedFieldEngine;
pub use error::{Error, Result};
pub use iaga2002::decode;
pub use planner::{plan, plan_uris, Candidate};
pub use query::{DataType, DataTypeSelection, RetrievalQuery, SamplingPeriod};
pub use record::StructuredRecord;
