use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::{
    config::Policy,
    core::{bucket::bucketize, key::fields_timestamp},
    qso::{NormalizedRecord, Residue, ResolvedRecord},
};

use super::resolver::{ConflictResolver, Resolution};

/// Windowed merge of same-key records.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    policy: Arc<Policy>,
    resolver: ConflictResolver,
}

impl MergeEngine {
    /// Creates an engine applying `policy`.
    pub fn new(policy: Arc<Policy>) -> Self {
        Self {
            resolver: ConflictResolver::new(policy.clone()),
            policy,
        }
    }

    /// Merges every record into the earliest same-key record whose window it
    /// starts in, returning the surviving records in start time order.
    ///
    /// The window is measured from the current primary; a record at or past
    /// the cutoff becomes the next primary.
    pub fn merge(&self, records: Vec<NormalizedRecord>) -> Vec<ResolvedRecord> {
        let window = self.policy.window();
        let mut out = Vec::new();

        for (key, bucket) in bucketize(records) {
            let mut rest = bucket.into_iter();
            let Some(first) = rest.next() else {
                continue;
            };
            let mut cutoff = first.timestamp + window;
            let mut primary = ResolvedRecord::new(first);

            for rec in rest {
                if rec.timestamp < cutoff {
                    debug!(call = %key.call, band = %key.band, source = %rec.source, "merging duplicate");
                    self.merge_pair(&mut primary, rec);
                } else {
                    cutoff = rec.timestamp + window;
                    out.push(std::mem::replace(&mut primary, ResolvedRecord::new(rec)));
                }
            }
            out.push(primary);
        }

        for rec in &mut out {
            if let Some(ts) = fields_timestamp(&rec.record.fields) {
                rec.record.timestamp = ts;
            }
        }
        out.sort_by_key(|r| (r.record.timestamp, r.record.seq));
        out
    }

    /// Absorbs `dupe` into `primary`, returning how many fields became residue.
    pub fn merge_pair(&self, primary: &mut ResolvedRecord, dupe: NormalizedRecord) -> usize {
        let NormalizedRecord { fields, source, .. } = dupe;
        let mut leftover = BTreeMap::new();

        for (name, value) in fields {
            match self
                .resolver
                .resolve(&name, primary.record.get(&name), &value, &source)
            {
                Resolution::Adopt => {
                    primary.record.fields.insert(name, value);
                }
                Resolution::KeepPrimary | Resolution::Skip => {}
                Resolution::Unresolved => {
                    leftover.insert(name, value);
                }
            }
        }

        let residue = leftover.len();
        if residue > 0 {
            debug!(qso = %primary.qso_id(), source = %source, fields = residue, "unresolved residue");
            let key = residue_key(&primary.unmerged, &source);
            primary.unmerged.insert(key, leftover);
        }
        primary.sources.push(source);
        residue
    }
}

// A second duplicate from the same source gets "#2", "#3", ... appended.
fn residue_key(residue: &Residue, source: &str) -> String {
    if !residue.contains_key(source) {
        return source.to_string();
    }
    (2..)
        .map(|n| format!("{source}#{n}"))
        .find(|k| !residue.contains_key(k))
        .unwrap_or_else(|| source.to_string())
}
