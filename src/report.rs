//! Diagnostic report of unresolved residue and malformed records.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::{
    error::ReportError,
    qso::{FieldValue, MalformedRecord, ResolvedRecord},
    types::QsoId,
};

/// Key holding the merged record's own value next to each losing source.
pub const SELECTED_KEY: &str = "#SELECTED#";

/// Every QSO in which one field was left unresolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldProblems {
    /// Number of distinct QSOs affected.
    pub count: usize,
    /// Per QSO: [`SELECTED_KEY`] and every losing source mapped to its value.
    pub qsos: BTreeMap<QsoId, BTreeMap<String, Option<FieldValue>>>,
}

/// Residue broken down by field and by QSO, plus rejected records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProblemReport {
    /// Field name to affected QSOs.
    pub problems_by_field: BTreeMap<String, FieldProblems>,
    /// Merged records carrying residue.
    pub problems_by_qso: Vec<ResolvedRecord>,
    /// Records rejected by validation.
    pub malformed_qsos: Vec<MalformedRecord>,
}

impl ProblemReport {
    /// Collects the problem records among `resolved` and every malformed record.
    pub fn build<'a>(
        resolved: impl IntoIterator<Item = &'a ResolvedRecord>,
        malformed: &[MalformedRecord],
    ) -> Self {
        let mut report = Self {
            malformed_qsos: malformed.to_vec(),
            ..Self::default()
        };

        for qso in resolved.into_iter().filter(|r| r.is_problem()) {
            let qso_id = qso.qso_id();
            for (source, dupe) in &qso.unmerged {
                for (field, value) in dupe {
                    let problems = report.problems_by_field.entry(field.clone()).or_default();
                    if !problems.qsos.contains_key(&qso_id) {
                        problems.count += 1;
                    }
                    problems
                        .qsos
                        .entry(qso_id.clone())
                        .or_insert_with(|| {
                            BTreeMap::from([(SELECTED_KEY.to_string(), qso.get(field).cloned())])
                        })
                        .insert(source.clone(), Some(value.clone()));
                }
            }
            report.problems_by_qso.push(qso.clone());
        }
        report
    }

    /// True when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.problems_by_qso.is_empty() && self.malformed_qsos.is_empty()
    }

    /// Writes the report as indented JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Writes the report as indented JSON to `path`.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_json(&mut out)?;
        out.flush()?;
        Ok(())
    }
}
