use hashbrown::HashMap;

use crate::qso::NormalizedRecord;

use super::key::MergeGroupKey;

/// Merge groups keyed by call, band, mode and sub-mode.
pub type Buckets = HashMap<MergeGroupKey, Vec<NormalizedRecord>>;

/// Orders records by start time; input position breaks ties.
pub fn sort_by_time(records: &mut [NormalizedRecord]) {
    records.sort_by_key(|r| (r.timestamp, r.seq));
}

/// Groups records by [`MergeGroupKey`], each group in time order.
pub fn bucketize(mut records: Vec<NormalizedRecord>) -> Buckets {
    sort_by_time(&mut records);
    let mut buckets = Buckets::new();
    for rec in records {
        buckets.entry(MergeGroupKey::of(&rec)).or_default().push(rec);
    }
    buckets
}
