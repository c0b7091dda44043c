//! Normalization and time-windowed merging of amateur radio logbook records.
//!
//! The same contact often shows up in several logs (the logging program,
//! LoTW, eQSL, QRZ, ...), each formatted a little differently. This crate
//! normalizes the records, groups those sharing call, band and mode, merges
//! records that start within a short window of each other, and keeps every
//! value it could not reconcile as residue for review.
//!
//! # Examples
//!
//! ```
//! use qsomerge::{config::MergeConfig, pipeline::QsoMerger, qso::RawRecord};
//!
//! let wsjtx: RawRecord = [
//!     ("CALL", "K1ABC"), ("QSO_DATE", "20200412"), ("TIME_ON", "123000"),
//!     ("BAND", "20m"), ("MODE", "FT8"), ("RST_SENT", "599"),
//! ].into_iter().collect();
//! let lotw: RawRecord = [
//!     ("CALL", "K1ABC"), ("QSO_DATE", "20200412"), ("TIME_ON", "123010"),
//!     ("BAND", "20M"), ("MODE", "FT8"), ("RST_SENT", "+05"),
//! ].into_iter().collect();
//!
//! let mut merger = QsoMerger::new(MergeConfig::default()).expect("config");
//! merger.add_source("wsjtx_log.adi", [wsjtx]);
//! merger.add_source("lotwreport.adi", [lotw]);
//! let outcome = merger.finish();
//!
//! assert_eq!(outcome.records.len(), 1);
//! assert_eq!(outcome.records[0].get("RST_SENT").map(|v| v.to_string()).as_deref(), Some("+05"));
//! assert!(outcome.problem_report().is_empty());
//! ```
#![deny(missing_docs)]

/// ADIF text reader.
pub mod adif;
/// Merge configuration and its compiled policy.
pub mod config;
/// Merge keys, timestamps and bucketing.
pub mod core;
/// Conflict resolver and merge engine.
pub mod engine;
/// Error types.
pub mod error;
/// ADIF and CSV writers.
pub mod export;
/// Per-record normalization.
pub mod normalize;
/// Batch orchestration.
pub mod pipeline;
/// Record types.
pub mod qso;
/// Problem report.
pub mod report;
/// Shared primitive types and enums.
pub mod types;
