//! Batch orchestration: sources in, merged records and diagnostics out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::{MergeConfig, Policy},
    engine::merge::MergeEngine,
    error::{ConfigError, FieldCoercionError, NormalizeError},
    normalize::Normalizer,
    qso::{MalformedRecord, NormalizedRecord, RawRecord, ResolvedRecord},
    report::ProblemReport,
    types::InputSeq,
};

/// Counters describing one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Sources added.
    pub sources: usize,
    /// Raw records received.
    pub input: usize,
    /// Records rejected by validation.
    pub malformed: usize,
    /// Field values dropped by coercion.
    pub coercion_errors: usize,
    /// Records absorbed into an earlier record.
    pub duplicates_merged: usize,
    /// Records produced.
    pub output: usize,
    /// Produced records carrying residue.
    pub problems: usize,
}

/// Everything a merge run produces.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Merged records in start time order.
    pub records: Vec<ResolvedRecord>,
    /// Records excluded from merging.
    pub malformed: Vec<MalformedRecord>,
    /// Field values dropped during normalization.
    pub coercion_errors: Vec<FieldCoercionError>,
    /// Run counters.
    pub stats: MergeStats,
}

impl MergeOutcome {
    /// Builds the residue/malformed diagnostic report.
    pub fn problem_report(&self) -> ProblemReport {
        ProblemReport::build(&self.records, &self.malformed)
    }
}

/// Accumulates sources, then merges them in one batch.
#[derive(Debug)]
pub struct QsoMerger {
    normalizer: Normalizer,
    engine: MergeEngine,
    pending: Vec<NormalizedRecord>,
    malformed: Vec<MalformedRecord>,
    coercion_errors: Vec<FieldCoercionError>,
    next_seq: InputSeq,
    stats: MergeStats,
}

impl QsoMerger {
    /// Compiles `config` and creates an empty merger.
    pub fn new(config: MergeConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_policy(Arc::new(Policy::compile(config)?)))
    }

    /// Creates an empty merger around an already compiled policy.
    pub fn with_policy(policy: Arc<Policy>) -> Self {
        Self {
            normalizer: Normalizer::new(policy.clone()),
            engine: MergeEngine::new(policy),
            pending: Vec::new(),
            malformed: Vec::new(),
            coercion_errors: Vec::new(),
            next_seq: 0,
            stats: MergeStats::default(),
        }
    }

    /// Normalizes every record of one source, returning how many were accepted.
    ///
    /// Malformed records are set aside; they never stop the batch.
    pub fn add_source<I>(&mut self, source: &str, records: I) -> usize
    where
        I: IntoIterator<Item = RawRecord>,
    {
        self.stats.sources += 1;
        let mut accepted = 0;
        for raw in records {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.stats.input += 1;
            match self.normalizer.normalize(raw, source, seq) {
                Ok(normalized) => {
                    for err in &normalized.coercion_errors {
                        warn!("dropped field: {err}");
                    }
                    self.coercion_errors.extend(normalized.coercion_errors);
                    self.pending.push(normalized.record);
                    accepted += 1;
                }
                Err(NormalizeError::Malformed(bad)) => {
                    warn!("skipping {bad}");
                    self.malformed.push(bad);
                }
            }
        }
        info!(source, accepted, "loaded source");
        accepted
    }

    /// Merges everything added so far.
    pub fn finish(self) -> MergeOutcome {
        let accepted = self.pending.len();
        let records = self.engine.merge(self.pending);

        let stats = MergeStats {
            malformed: self.malformed.len(),
            coercion_errors: self.coercion_errors.len(),
            duplicates_merged: accepted - records.len(),
            output: records.len(),
            problems: records.iter().filter(|r| r.is_problem()).count(),
            ..self.stats
        };
        info!(
            input = stats.input,
            malformed = stats.malformed,
            merged = stats.duplicates_merged,
            output = stats.output,
            problems = stats.problems,
            "merge complete"
        );

        MergeOutcome {
            records,
            malformed: self.malformed,
            coercion_errors: self.coercion_errors,
            stats,
        }
    }
}
